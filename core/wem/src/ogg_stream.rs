//! Ogg page framing for rebuilt Vorbis packets.
//!
//! Packets are assembled bit by bit in a [`BitWriter`] and handed to
//! [`ogg::PacketWriter`], which takes care of segment tables, CRCs and page
//! sequence numbers. The whole stream stays in memory until [`OggStream::finish`].

use crate::bit_writer::BitWriter;
use crate::error::WemResult;
use ogg::{PacketWriteEndInfo, PacketWriter};

/// How a packet closes the page it lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEnd {
    /// More packets may share the page.
    Continue,
    /// Flush the page after this packet.
    EndPage,
    /// Flush the page and mark it end-of-stream.
    EndStream,
}

impl From<PageEnd> for PacketWriteEndInfo {
    fn from(end: PageEnd) -> Self {
        match end {
            PageEnd::Continue => PacketWriteEndInfo::NormalPacket,
            PageEnd::EndPage => PacketWriteEndInfo::EndPage,
            PageEnd::EndStream => PacketWriteEndInfo::EndStream,
        }
    }
}

/// Sequential bit-granularity Ogg packet writer for a single logical stream.
pub struct OggStream {
    writer: PacketWriter<'static, Vec<u8>>,
    serial: u32,
    packet: BitWriter,
    packets_written: u64,
}

impl OggStream {
    pub fn new(serial: u32) -> Self {
        Self {
            writer: PacketWriter::new(Vec::new()),
            serial,
            packet: BitWriter::new(),
            packets_written: 0,
        }
    }

    /// Append bits to the packet under construction.
    pub fn write_bits(&mut self, value: u32, count: u8) {
        self.packet.write_bits(value, count);
    }

    /// The packet under construction.
    pub fn packet_mut(&mut self) -> &mut BitWriter {
        &mut self.packet
    }

    /// Close the packet under construction and frame it.
    pub fn flush_packet(&mut self, granule: u64, end: PageEnd) -> WemResult<()> {
        let packet = std::mem::take(&mut self.packet).into_inner();
        self.write_packet(packet, granule, end)
    }

    /// Frame an already assembled packet.
    pub fn write_packet(&mut self, packet: Vec<u8>, granule: u64, end: PageEnd) -> WemResult<()> {
        self.writer
            .write_packet(packet, self.serial, end.into(), granule)?;
        self.packets_written += 1;
        Ok(())
    }

    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    /// Return the framed bytes. Pending bits that were never flushed are dropped.
    pub fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ogg::PacketReader;
    use std::io::Cursor;

    #[test]
    fn test_packets_survive_framing() {
        let mut stream = OggStream::new(0x1234);
        stream.write_bits(0xAB, 8);
        stream.write_bits(0x3, 2);
        stream.flush_packet(0, PageEnd::EndPage).unwrap();
        stream.write_packet(vec![1, 2, 3], 960, PageEnd::EndStream).unwrap();
        assert_eq!(stream.packets_written(), 2);

        let bytes = stream.finish();
        assert_eq!(&bytes[..4], b"OggS");

        let mut reader = PacketReader::new(Cursor::new(bytes));
        let first = reader.read_packet_expected().unwrap();
        assert_eq!(first.data, vec![0xAB, 0x03]);
        assert_eq!(first.stream_serial(), 0x1234);
        assert!(first.first_in_stream());

        let second = reader.read_packet_expected().unwrap();
        assert_eq!(second.data, vec![1, 2, 3]);
        assert_eq!(second.absgp_page(), 960);
        assert!(second.last_in_stream());
        assert!(reader.read_packet().unwrap().is_none());
    }
}
