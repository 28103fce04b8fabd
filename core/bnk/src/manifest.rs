use crate::types::*;
use serde::{Deserialize, Serialize};
use utils::fourcc_to_string;

/// JSON view of a bank: header, section layout, and media index.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BnkManifest {
    #[serde(rename = "bank_header", skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderManifest>,
    pub sections: Vec<SectionManifest>,
    #[serde(rename = "embedded_media")]
    pub media: Vec<WemInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub strings: Vec<StringEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HeaderManifest {
    pub version: u32,
    pub id: u32,
    pub head_expand: String, // Hex string
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SectionManifest {
    pub tag: String,
    pub kind: String,
    pub size: usize,
}

impl From<&Bnk> for BnkManifest {
    fn from(bnk: &Bnk) -> Self {
        let sections = bnk
            .sections()
            .iter()
            .map(|section| SectionManifest {
                tag: fourcc_to_string(&section.tag()),
                kind: match section {
                    Section::Header(_) => "header",
                    Section::Index(_) => "index",
                    Section::Data(_) => "data",
                    Section::Hierarchy(_) => "hierarchy",
                    Section::Strings(_) => "strings",
                    Section::Opaque(_) => "opaque",
                }
                .to_string(),
                size: section.payload_len(),
            })
            .collect();

        BnkManifest {
            header: bnk.header().map(|header| HeaderManifest {
                version: header.version,
                id: header.id,
                head_expand: bytes_to_hex_space(&header.trailing),
            }),
            sections,
            media: bnk.wem_infos().to_vec(),
            strings: bnk
                .strings()
                .map(|table| table.entries.clone())
                .unwrap_or_default(),
        }
    }
}

// Utils
fn bytes_to_hex_space(bytes: &[u8]) -> String {
    let hex_string = hex::encode_upper(bytes);
    let mut result = String::with_capacity(hex_string.len() + hex_string.len() / 2);
    for (i, c) in hex_string.char_indices() {
        if i > 0 && i % 2 == 0 {
            result.push(' ');
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_spacing() {
        assert_eq!(bytes_to_hex_space(&[0x0A, 0xFF, 0x10]), "0A FF 10");
        assert_eq!(bytes_to_hex_space(&[]), "");
    }

    #[test]
    fn test_manifest_json() {
        let mut bnk = Bnk::default();
        bnk.add_section(Section::Header(BankHeader {
            version: 0x8C,
            id: 42,
            trailing: vec![0xAB, 0xCD],
        }))
        .unwrap();
        bnk.add_section(Section::Opaque(OpaqueSection {
            tag: *b"PLAT",
            payload: vec![0; 6],
        }))
        .unwrap();

        let manifest = BnkManifest::from(&bnk);
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["bank_header"]["head_expand"], "AB CD");
        assert_eq!(json["bank_header"]["version"], 0x8C);
        assert_eq!(json["sections"][1]["tag"], "PLAT");
        assert_eq!(json["sections"][1]["kind"], "opaque");
        assert_eq!(json["sections"][1]["size"], 6);
        assert_eq!(json["embedded_media"].as_array().unwrap().len(), 0);
        assert!(json.get("strings").is_none());
    }
}
