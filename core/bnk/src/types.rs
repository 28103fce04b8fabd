use serde::{Deserialize, Serialize};
use utils::FourCc;

pub const BKHD: FourCc = *b"BKHD";
pub const DIDX: FourCc = *b"DIDX";
pub const DATA: FourCc = *b"DATA";
pub const HIRC: FourCc = *b"HIRC";
pub const STID: FourCc = *b"STID";

/// Tags that may appear at most once and are decoded into typed sections.
pub const RECOGNIZED: [FourCc; 5] = [BKHD, DIDX, DATA, HIRC, STID];

/// Size of one DIDX record.
pub const WEM_INFO_SIZE: usize = 12;

/// Alignment of each WEM inside DATA when the index is rebuilt.
pub const WEM_ALIGNMENT: u64 = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankHeader {
    pub version: u32,
    pub id: u32,
    /// Everything after `id`, kept verbatim.
    pub trailing: Vec<u8>,
}

/// One DIDX record. `offset` is relative to the start of the DATA payload.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WemInfo {
    pub id: u32,
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataIndex {
    pub entries: Vec<WemInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSection {
    pub bytes: Vec<u8>,
}

/// A hierarchy object; `data` is the body after the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HircObject {
    pub obj_type: u8,
    pub id: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hierarchy {
    pub objects: Vec<HircObject>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StringEntry {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    pub unknown_type: u32,
    pub entries: Vec<StringEntry>,
}

/// A section kept as raw bytes, either unknown or not decodable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueSection {
    pub tag: FourCc,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    Header(BankHeader),
    Index(DataIndex),
    Data(DataSection),
    Hierarchy(Hierarchy),
    Strings(StringTable),
    Opaque(OpaqueSection),
}

impl Section {
    pub fn tag(&self) -> FourCc {
        match self {
            Section::Header(_) => BKHD,
            Section::Index(_) => DIDX,
            Section::Data(_) => DATA,
            Section::Hierarchy(_) => HIRC,
            Section::Strings(_) => STID,
            Section::Opaque(opaque) => opaque.tag,
        }
    }

    /// Payload size as it will be written, excluding the 8-byte section header.
    pub fn payload_len(&self) -> usize {
        match self {
            Section::Header(header) => 8 + header.trailing.len(),
            Section::Index(index) => index.entries.len() * WEM_INFO_SIZE,
            Section::Data(data) => data.bytes.len(),
            Section::Hierarchy(hirc) => {
                4 + hirc
                    .objects
                    .iter()
                    .map(|obj| 9 + obj.data.len())
                    .sum::<usize>()
            }
            Section::Strings(stid) => {
                8 + stid
                    .entries
                    .iter()
                    .map(|entry| 5 + entry.name.len())
                    .sum::<usize>()
            }
            Section::Opaque(opaque) => opaque.payload.len(),
        }
    }
}

/// A parsed SoundBank: its sections in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bnk {
    pub(crate) sections: Vec<Section>,
}
