use byteorder::{LE, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Four-character chunk tag as stored on disk.
pub type FourCc = [u8; 4];

/// Extension trait for reading the chunked little-endian layouts shared by BNK and RIFF.
pub trait BinReadExt: Read {
    /// Read a raw four-character tag.
    fn read_fourcc(&mut self) -> io::Result<FourCc> {
        let mut tag = [0u8; 4];
        self.read_exact(&mut tag)?;
        Ok(tag)
    }

    /// Read a `{tag, u32 LE size}` chunk header.
    fn read_chunk_header(&mut self) -> io::Result<(FourCc, u32)> {
        let tag = self.read_fourcc()?;
        let size = self.read_u32::<LE>()?;
        Ok((tag, size))
    }

    /// Read exactly `len` bytes into a fresh buffer.
    fn read_vec(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// Extension trait for writing binary data
pub trait BinWriteExt: Write {
    /// Write a `{tag, u32 LE size}` chunk header.
    fn write_chunk_header(&mut self, tag: &FourCc, size: usize) -> io::Result<()> {
        let size = u32::try_from(size).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} chunk of {size} bytes exceeds 4 GiB", fourcc_to_string(tag)),
            )
        })?;
        self.write_all(tag)?;
        self.write_u32::<LE>(size)
    }

    /// Write a chunk header followed by its payload, without padding.
    fn write_chunk(&mut self, tag: &FourCc, payload: &[u8]) -> io::Result<()> {
        self.write_chunk_header(tag, payload.len())?;
        self.write_all(payload)
    }

    /// Write padding bytes to align to the given boundary
    fn align(&mut self, pos: u64, alignment: u64) -> io::Result<usize> {
        let padding = padding_for(pos, alignment);
        if padding == 0 {
            return Ok(0);
        }
        self.write_all(&vec![0u8; padding as usize])?;
        Ok(padding as usize)
    }
}

// Implement for all types that implement Read/Write
impl<R: Read + ?Sized> BinReadExt for R {}
impl<W: Write + ?Sized> BinWriteExt for W {}

/// Number of zero bytes needed to move `pos` onto an `alignment` boundary.
pub fn padding_for(pos: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return 0;
    }
    let remainder = pos % alignment;
    if remainder == 0 { 0 } else { alignment - remainder }
}

/// Render a tag for logs and manifests, escaping non-printable bytes.
pub fn fourcc_to_string(tag: &FourCc) -> String {
    tag.iter()
        .flat_map(|&b| std::ascii::escape_default(b))
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_chunk_header_roundtrip() {
        let mut buf = Vec::new();
        buf.write_chunk(b"DIDX", &[1, 2, 3]).unwrap();
        assert_eq!(buf, b"DIDX\x03\x00\x00\x00\x01\x02\x03");

        let mut cursor = Cursor::new(buf);
        let (tag, size) = cursor.read_chunk_header().unwrap();
        assert_eq!(&tag, b"DIDX");
        assert_eq!(size, 3);
        assert_eq!(cursor.read_vec(3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_padding_for() {
        assert_eq!(padding_for(0, 16), 0);
        assert_eq!(padding_for(1, 16), 15);
        assert_eq!(padding_for(16, 16), 0);
        assert_eq!(padding_for(17, 16), 15);
        assert_eq!(padding_for(5, 0), 0);
    }

    #[test]
    fn test_align_writes_zeros() {
        let mut buf = vec![0xAAu8; 5];
        let written = buf.align(5, 8).unwrap();
        assert_eq!(written, 3);
        assert_eq!(buf.len(), 8);
        assert_eq!(&buf[5..], &[0, 0, 0]);
    }

    #[test]
    fn test_fourcc_to_string_escapes() {
        assert_eq!(fourcc_to_string(b"BKHD"), "BKHD");
        assert_eq!(fourcc_to_string(&[b'A', 0, b'B', b'C']), "A\\x00BC");
    }
}
