//! Wwise audio packet headers.
//!
//! Every packet in a Wwise Vorbis data chunk is prefixed by a little-endian
//! `u16` payload size, followed by a `u32` granule position unless the stream
//! omits granules (the 0x2A `vorb` layout).

use crate::error::{WemError, WemResult};
use byteorder::{ByteOrder, LE};

/// A packet header located inside the data chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    /// Size of the header in bytes (2 or 6).
    pub header_size: usize,
    /// Offset of the payload within the data chunk.
    pub offset: usize,
    /// Size of the payload in bytes.
    pub size: usize,
    /// Granule position, zero when the layout has none.
    pub granule: u32,
}

impl Packet {
    /// Read the packet header at `offset`.
    pub fn read(data: &[u8], offset: usize, no_granule: bool) -> WemResult<Self> {
        let header_size = if no_granule { 2 } else { 6 };
        let header = data
            .get(offset..offset + header_size)
            .ok_or_else(|| {
                WemError::end_of_stream(format!("packet header at {offset} truncated"))
            })?;

        Ok(Self {
            header_size,
            offset: offset + header_size,
            size: usize::from(LE::read_u16(header)),
            granule: if no_granule {
                0
            } else {
                LE::read_u32(&header[2..])
            },
        })
    }

    /// Offset of the header that follows this packet.
    pub fn next_offset(&self) -> usize {
        self.offset + self.size
    }

    /// The payload bytes, bounds-checked against the data chunk.
    pub fn payload<'a>(&self, data: &'a [u8]) -> WemResult<&'a [u8]> {
        data.get(self.offset..self.next_offset()).ok_or_else(|| {
            WemError::end_of_stream(format!(
                "packet at {} declares {} bytes, data chunk is {} bytes",
                self.offset - self.header_size,
                self.size,
                data.len()
            ))
        })
    }
}
