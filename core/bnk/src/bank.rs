use crate::error::{BnkError, Result};
use crate::media::Wem;
use crate::types::*;
use utils::{BinWriteExt, FourCc, fourcc_to_string};

impl Bnk {
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Section tags in the order they appear in the file.
    pub fn section_tags(&self) -> Vec<FourCc> {
        self.sections.iter().map(Section::tag).collect()
    }

    pub fn header(&self) -> Option<&BankHeader> {
        self.sections.iter().find_map(|s| match s {
            Section::Header(header) => Some(header),
            _ => None,
        })
    }

    pub fn wem_infos(&self) -> &[WemInfo] {
        self.sections
            .iter()
            .find_map(|s| match s {
                Section::Index(index) => Some(index.entries.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Payload of the DATA section.
    pub fn data(&self) -> Option<&[u8]> {
        self.sections.iter().find_map(|s| match s {
            Section::Data(data) => Some(data.bytes.as_slice()),
            _ => None,
        })
    }

    pub fn strings(&self) -> Option<&StringTable> {
        self.sections.iter().find_map(|s| match s {
            Section::Strings(table) => Some(table),
            _ => None,
        })
    }

    pub fn add_section(&mut self, section: Section) -> Result<()> {
        let tag = section.tag();
        if self.sections.is_empty() && tag != BKHD {
            return Err(BnkError::malformed(format!(
                "cannot start a bank with {}",
                fourcc_to_string(&tag)
            )));
        }
        if RECOGNIZED.contains(&tag) && self.sections.iter().any(|s| s.tag() == tag) {
            return Err(BnkError::malformed(format!(
                "bank already has a {} section",
                fourcc_to_string(&tag)
            )));
        }
        self.sections.push(section);
        Ok(())
    }

    /// Pair every index entry with its bytes in DATA.
    pub fn resolve_wem_entities(&self) -> Result<Vec<Wem>> {
        let data = self.data().unwrap_or(&[]);
        self.wem_infos()
            .iter()
            .map(|&info| {
                let start = info.offset as usize;
                let bytes = start
                    .checked_add(info.size as usize)
                    .and_then(|end| data.get(start..end))
                    .ok_or(BnkError::IndexOutOfRange {
                        id: info.id,
                        offset: info.offset,
                        size: info.size,
                        data_len: data.len(),
                    })?;
                Ok(Wem::with_info(info, bytes.to_vec()))
            })
            .collect()
    }

    pub fn wem(&self, id: u32) -> Result<Option<Wem>> {
        Ok(self
            .resolve_wem_entities()?
            .into_iter()
            .find(|wem| wem.id() == id))
    }

    /// Rebuild DIDX and DATA from `wems`, in the given order.
    ///
    /// Every payload starts on a 16-byte boundary; the last one is not padded.
    pub fn replace_wems(&mut self, wems: &[Wem]) -> Result<()> {
        let mut bytes: Vec<u8> = Vec::new();
        let mut entries = Vec::with_capacity(wems.len());

        for wem in wems {
            bytes.align(bytes.len() as u64, WEM_ALIGNMENT)?;

            let offset = u32::try_from(bytes.len())
                .map_err(|_| BnkError::malformed("DATA section exceeds 4 GiB"))?;
            let size = u32::try_from(wem.size()).map_err(|_| {
                BnkError::malformed(format!("WEM {} exceeds 4 GiB", wem.id()))
            })?;
            entries.push(WemInfo {
                id: wem.id(),
                offset,
                size,
            });
            bytes.extend_from_slice(wem.payload());
        }

        tracing::debug!(
            wems = entries.len(),
            data_size = bytes.len(),
            "rebuilt media index"
        );

        self.put_section(DIDX, 1, Section::Index(DataIndex { entries }));
        let after_index = self.position(DIDX).map_or(1, |pos| pos + 1);
        self.put_section(DATA, after_index, Section::Data(DataSection { bytes }));
        Ok(())
    }

    fn position(&self, tag: FourCc) -> Option<usize> {
        self.sections.iter().position(|s| s.tag() == tag)
    }

    /// Replace the section with `tag` in place, or insert it at `insert_at`.
    fn put_section(&mut self, tag: FourCc, insert_at: usize, section: Section) {
        match self.position(tag) {
            Some(pos) => self.sections[pos] = section,
            None => {
                let at = insert_at.min(self.sections.len());
                self.sections.insert(at, section);
            }
        }
    }
}
