use crate::error::{BnkError, Result};
use crate::types::*;
use byteorder::{LE, WriteBytesExt};
use std::io::Write;
use utils::BinWriteExt;

impl BankHeader {
    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LE>(self.version)?;
        writer.write_u32::<LE>(self.id)?;
        writer.write_all(&self.trailing)?;
        Ok(())
    }
}

impl WemInfo {
    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LE>(self.id)?;
        writer.write_u32::<LE>(self.offset)?;
        writer.write_u32::<LE>(self.size)?;
        Ok(())
    }
}

impl HircObject {
    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.obj_type)?;
        writer.write_u32::<LE>(len_u32(self.data.len().saturating_add(4), "HIRC object")?)?;
        writer.write_u32::<LE>(self.id)?;
        writer.write_all(&self.data)?;
        Ok(())
    }
}

impl StringEntry {
    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LE>(self.id)?;
        let name_len = u8::try_from(self.name.len()).map_err(|_| {
            BnkError::malformed(format!(
                "STID name {:?} is {} bytes, the limit is 255",
                self.name,
                self.name.len()
            ))
        })?;
        writer.write_u8(name_len)?;
        writer.write_all(self.name.as_bytes())?;
        Ok(())
    }
}

impl Section {
    /// Serialize the payload, without the section header.
    pub fn payload(&self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(self.payload_len());
        match self {
            Section::Header(header) => header.write(&mut data)?,
            Section::Index(index) => {
                for entry in &index.entries {
                    entry.write(&mut data)?;
                }
            }
            Section::Data(section) => data.extend_from_slice(&section.bytes),
            Section::Hierarchy(hirc) => {
                data.write_u32::<LE>(len_u32(hirc.objects.len(), "HIRC object count")?)?;
                for obj in &hirc.objects {
                    obj.write(&mut data)?;
                }
            }
            Section::Strings(stid) => {
                data.write_u32::<LE>(stid.unknown_type)?;
                data.write_u32::<LE>(len_u32(stid.entries.len(), "STID entry count")?)?;
                for entry in &stid.entries {
                    entry.write(&mut data)?;
                }
            }
            Section::Opaque(opaque) => data.extend_from_slice(&opaque.payload),
        }
        Ok(data)
    }
}

fn len_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| BnkError::malformed(format!("{what} of {len} exceeds u32")))
}

impl Bnk {
    /// Write every section back in encounter order.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        for section in &self.sections {
            writer.write_chunk(&section.tag(), &section.payload()?)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(out)
    }
}
