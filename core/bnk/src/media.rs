use crate::error::Result;
use crate::types::WemInfo;
use wem::{CodebookLibrary, Converted, VorbisOptions};

/// One embedded stream: its index record plus an editable payload.
///
/// The payload length is the only size; `info().size` is kept equal to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wem {
    info: WemInfo,
    payload: Vec<u8>,
    saved: Vec<u8>,
    /// Event name slot, filled in by the caller.
    pub name: Option<String>,
}

impl Wem {
    pub fn new(id: u32, payload: Vec<u8>) -> Self {
        Self::with_info(
            WemInfo {
                id,
                offset: 0,
                size: payload.len() as u32,
            },
            payload,
        )
    }

    pub(crate) fn with_info(info: WemInfo, payload: Vec<u8>) -> Self {
        Self {
            info,
            saved: payload.clone(),
            payload,
            name: None,
        }
    }

    pub fn id(&self) -> u32 {
        self.info.id
    }

    /// Index record; `offset` is where the payload sat when it was resolved.
    pub fn info(&self) -> WemInfo {
        self.info
    }

    pub fn size(&self) -> usize {
        self.payload.len()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.info.size = payload.len() as u32;
        self.payload = payload;
    }

    pub fn is_modified(&self) -> bool {
        self.payload != self.saved
    }

    /// Make the current payload the new baseline.
    pub fn mark_saved(&mut self) {
        self.saved = self.payload.clone();
    }

    /// Discard edits since the last baseline.
    pub fn revert(&mut self) {
        self.payload = self.saved.clone();
        self.info.size = self.payload.len() as u32;
    }

    /// Convert the payload to its standard container (Ogg or WAV).
    pub fn to_standard(
        &self,
        codebooks: &CodebookLibrary,
        options: &VorbisOptions,
    ) -> Result<Converted> {
        Ok(wem::to_standard(&self.payload, codebooks, options)?)
    }
}
