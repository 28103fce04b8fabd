use crate::error::{BnkError, Result};
use crate::types::*;
use byteorder::{LE, ReadBytesExt};
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use utils::{BinReadExt, FourCc, fourcc_to_string};

// Parsing functions

pub(crate) fn parse_bnk<R: Read + Seek>(reader: &mut R, end: u64, bnk: &mut Bnk) -> Result<()> {
    let mut pos = reader.stream_position()?;
    if pos >= end {
        return Err(BnkError::malformed("empty container"));
    }

    while pos < end {
        if end - pos < 8 {
            return Err(BnkError::malformed(format!(
                "truncated section header at offset {pos}"
            )));
        }
        let (tag, size) = reader.read_chunk_header()?;
        let payload_start = pos + 8;
        let payload_end = payload_start + u64::from(size);
        if payload_end > end {
            return Err(BnkError::malformed(format!(
                "{} section at offset {pos} declares {size} bytes, stream ends at {end}",
                fourcc_to_string(&tag)
            )));
        }

        if bnk.sections.is_empty() && tag != BKHD {
            return Err(BnkError::malformed(format!(
                "first section is {}, expected BKHD",
                fourcc_to_string(&tag)
            )));
        }
        if RECOGNIZED.contains(&tag) && bnk.section_tags().contains(&tag) {
            return Err(BnkError::malformed(format!(
                "duplicate {} section at offset {pos}",
                fourcc_to_string(&tag)
            )));
        }

        let payload = reader.read_vec(size as usize)?;
        tracing::debug!(tag = %fourcc_to_string(&tag), offset = pos, size, "read section");
        bnk.sections.push(parse_section(tag, payload)?);

        pos = payload_end;
        reader.seek(SeekFrom::Start(pos))?;
    }

    let has_index = bnk.sections.iter().any(|s| matches!(s, Section::Index(_)));
    let has_data = bnk.sections.iter().any(|s| matches!(s, Section::Data(_)));
    match (has_index, has_data) {
        (true, false) => Err(BnkError::malformed("DIDX section without DATA section")),
        (false, true) => Err(BnkError::malformed("DATA section without DIDX section")),
        _ => Ok(()),
    }
}

fn parse_section(tag: FourCc, payload: Vec<u8>) -> Result<Section> {
    let section = match &tag {
        b"BKHD" => Section::Header(parse_bkhd(&payload)?),
        b"DIDX" => Section::Index(parse_didx(&payload)?),
        b"DATA" => Section::Data(DataSection { bytes: payload }),
        b"HIRC" => match decode_exact(&payload, parse_hirc) {
            Some(hirc) => Section::Hierarchy(hirc),
            None => opaque_fallback(tag, payload),
        },
        b"STID" => match decode_exact(&payload, parse_stid) {
            Some(stid) => Section::Strings(stid),
            None => opaque_fallback(tag, payload),
        },
        _ => Section::Opaque(OpaqueSection { tag, payload }),
    };
    Ok(section)
}

fn opaque_fallback(tag: FourCc, payload: Vec<u8>) -> Section {
    tracing::warn!(
        tag = %fourcc_to_string(&tag),
        size = payload.len(),
        "section does not decode cleanly, keeping it opaque"
    );
    Section::Opaque(OpaqueSection { tag, payload })
}

/// Decode `payload` with `parse`, accepting the result only if every byte was consumed.
fn decode_exact<T>(payload: &[u8], parse: fn(&mut Cursor<&[u8]>) -> io::Result<T>) -> Option<T> {
    let mut cursor = Cursor::new(payload);
    let value = parse(&mut cursor).ok()?;
    (cursor.position() == payload.len() as u64).then_some(value)
}

fn parse_bkhd(payload: &[u8]) -> Result<BankHeader> {
    if payload.len() < 8 {
        return Err(BnkError::malformed(format!(
            "BKHD section is {} bytes, need at least 8",
            payload.len()
        )));
    }
    let mut reader = Cursor::new(payload);
    let version = reader.read_u32::<LE>()?;
    let id = reader.read_u32::<LE>()?;

    Ok(BankHeader {
        version,
        id,
        trailing: payload[8..].to_vec(),
    })
}

fn parse_didx(payload: &[u8]) -> Result<DataIndex> {
    if payload.len() % WEM_INFO_SIZE != 0 {
        return Err(BnkError::malformed(format!(
            "DIDX section of {} bytes is not a whole number of entries",
            payload.len()
        )));
    }

    let mut reader = Cursor::new(payload);
    let count = payload.len() / WEM_INFO_SIZE;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let id = reader.read_u32::<LE>()?;
        let offset = reader.read_u32::<LE>()?;
        let size = reader.read_u32::<LE>()?;
        entries.push(WemInfo { id, offset, size });
    }
    Ok(DataIndex { entries })
}

fn parse_hirc(reader: &mut Cursor<&[u8]>) -> io::Result<Hierarchy> {
    let count = reader.read_u32::<LE>()?;
    let mut objects = Vec::new();
    for _ in 0..count {
        let obj_type = reader.read_u8()?;
        let length = reader.read_u32::<LE>()?;
        // the id is counted in `length`
        let data_len = length
            .checked_sub(4)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "HIRC object too short"))?;
        let id = reader.read_u32::<LE>()?;
        let data = read_bounded(reader, data_len as usize, "HIRC object")?;
        objects.push(HircObject { obj_type, id, data });
    }
    Ok(Hierarchy { objects })
}

fn parse_stid(reader: &mut Cursor<&[u8]>) -> io::Result<StringTable> {
    let unknown_type = reader.read_u32::<LE>()?;
    let count = reader.read_u32::<LE>()?;
    let mut entries = Vec::new();
    for _ in 0..count {
        let id = reader.read_u32::<LE>()?;
        let name_len = reader.read_u8()?;
        let name_bytes = read_bounded(reader, name_len as usize, "STID name")?;
        let name = String::from_utf8(name_bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        entries.push(StringEntry { id, name });
    }
    Ok(StringTable {
        unknown_type,
        entries,
    })
}

/// Read `len` bytes, refusing lengths past the end of the payload before allocating.
fn read_bounded(reader: &mut Cursor<&[u8]>, len: usize, what: &str) -> io::Result<Vec<u8>> {
    let remaining = (reader.get_ref().len() as u64).saturating_sub(reader.position());
    if len as u64 > remaining {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{what} declares {len} bytes, {remaining} remain"),
        ));
    }
    reader.read_vec(len)
}

// API for instantiating Bnk struct

impl Bnk {
    pub fn new<R: Read + Seek>(mut reader: R) -> Result<Self> {
        let start = reader.stream_position()?;
        let end = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(start))?;

        let mut bnk = Bnk::default();
        parse_bnk(&mut reader, end, &mut bnk)?;
        Ok(bnk)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::new(Cursor::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = tag.to_vec();
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn bkhd() -> Vec<u8> {
        section(b"BKHD", &[0x8C, 0, 0, 0, 0x11, 0x22, 0x33, 0x44, 0xAA, 0xBB])
    }

    #[test]
    fn test_header_fields() {
        let bnk = Bnk::from_bytes(&bkhd()).unwrap();
        let header = bnk.header().unwrap();
        assert_eq!(header.version, 0x8C);
        assert_eq!(header.id, 0x44332211);
        assert_eq!(header.trailing, vec![0xAA, 0xBB]);
    }

    #[test]
    fn test_first_section_must_be_bkhd() {
        let bytes = section(b"HIRC", &[0, 0, 0, 0]);
        assert!(matches!(
            Bnk::from_bytes(&bytes),
            Err(BnkError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_empty_container() {
        assert!(matches!(
            Bnk::from_bytes(&[]),
            Err(BnkError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_size_overrun() {
        let mut bytes = bkhd();
        bytes.extend_from_slice(b"DATA");
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.extend_from_slice(&[0; 10]);
        let err = Bnk::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("declares 100 bytes"));
    }

    #[test]
    fn test_truncated_section_header() {
        let mut bytes = bkhd();
        bytes.extend_from_slice(b"DA");
        assert!(matches!(
            Bnk::from_bytes(&bytes),
            Err(BnkError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_index_requires_data() {
        let mut bytes = bkhd();
        bytes.extend(section(b"DIDX", &[0; 12]));
        let err = Bnk::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("without DATA"));

        let mut bytes = bkhd();
        bytes.extend(section(b"DATA", &[1, 2, 3]));
        let err = Bnk::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("without DIDX"));
    }

    #[test]
    fn test_duplicate_recognized_section() {
        let mut bytes = bkhd();
        bytes.extend(section(b"STID", &[1, 0, 0, 0, 0, 0, 0, 0]));
        bytes.extend(section(b"STID", &[1, 0, 0, 0, 0, 0, 0, 0]));
        assert!(matches!(
            Bnk::from_bytes(&bytes),
            Err(BnkError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_unknown_sections_may_repeat() {
        let mut bytes = bkhd();
        bytes.extend(section(b"PLAT", b"Windows\0"));
        bytes.extend(section(b"PLAT", b"Android\0"));
        let bnk = Bnk::from_bytes(&bytes).unwrap();
        assert_eq!(bnk.section_tags(), vec![BKHD, *b"PLAT", *b"PLAT"]);
    }

    #[test]
    fn test_didx_must_be_whole_entries() {
        let mut bytes = bkhd();
        bytes.extend(section(b"DIDX", &[0; 13]));
        bytes.extend(section(b"DATA", &[]));
        let err = Bnk::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("whole number"));
    }

    #[test]
    fn test_hirc_decodes() {
        let mut hirc = 1u32.to_le_bytes().to_vec();
        hirc.push(2); // sound
        hirc.extend_from_slice(&6u32.to_le_bytes());
        hirc.extend_from_slice(&77u32.to_le_bytes());
        hirc.extend_from_slice(&[0xDE, 0xAD]);

        let mut bytes = bkhd();
        bytes.extend(section(b"HIRC", &hirc));
        let bnk = Bnk::from_bytes(&bytes).unwrap();
        match &bnk.sections()[1] {
            Section::Hierarchy(h) => {
                assert_eq!(h.objects.len(), 1);
                assert_eq!(h.objects[0].obj_type, 2);
                assert_eq!(h.objects[0].id, 77);
                assert_eq!(h.objects[0].data, vec![0xDE, 0xAD]);
            }
            other => panic!("expected hierarchy, got {other:?}"),
        }
    }

    #[test]
    fn test_undecodable_hirc_stays_opaque() {
        // count says 5 objects, payload holds none
        let mut bytes = bkhd();
        bytes.extend(section(b"HIRC", &[5, 0, 0, 0, 0xFF]));
        let bnk = Bnk::from_bytes(&bytes).unwrap();
        assert!(matches!(&bnk.sections()[1], Section::Opaque(o) if o.tag == HIRC));
    }

    #[test]
    fn test_oversized_hirc_object_stays_opaque() {
        let mut hirc = 1u32.to_le_bytes().to_vec();
        hirc.push(2);
        hirc.extend_from_slice(&u32::MAX.to_le_bytes());
        hirc.extend_from_slice(&77u32.to_le_bytes());

        let mut cursor = Cursor::new(hirc.as_slice());
        let err = parse_hirc(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let mut bytes = bkhd();
        bytes.extend(section(b"HIRC", &hirc));
        let bnk = Bnk::from_bytes(&bytes).unwrap();
        match &bnk.sections()[1] {
            Section::Opaque(o) => assert_eq!(o.payload, hirc),
            other => panic!("expected opaque section, got {other:?}"),
        }
    }

    #[test]
    fn test_stid_decodes() {
        let mut stid = 1u32.to_le_bytes().to_vec();
        stid.extend_from_slice(&1u32.to_le_bytes());
        stid.extend_from_slice(&9u32.to_le_bytes());
        stid.push(4);
        stid.extend_from_slice(b"Main");

        let mut bytes = bkhd();
        bytes.extend(section(b"STID", &stid));
        let bnk = Bnk::from_bytes(&bytes).unwrap();
        assert!(matches!(
            &bnk.sections()[1],
            Section::Strings(t) if t.entries[0].name == "Main" && t.entries[0].id == 9
        ));
    }
}
