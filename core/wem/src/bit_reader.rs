//! Bit-level reader for Vorbis data.
//!
//! Reads individual bits LSB-first from byte slices.

use crate::error::{WemError, WemResult};

/// Trait for reading bits from a source.
pub trait BitRead {
    /// Read a single bit.
    fn read_bit(&mut self) -> WemResult<bool>;

    /// Get the total number of bits read so far.
    fn total_bits_read(&self) -> u64;

    /// Read multiple bits (up to 32) and return as u32.
    fn read_bits(&mut self, count: u8) -> WemResult<u32> {
        if count > 32 {
            return Err(WemError::parse("Cannot read more than 32 bits at once"));
        }

        let mut result = 0u32;
        for i in 0..count {
            if self.read_bit()? {
                result |= 1u32 << i;
            }
        }

        Ok(result)
    }
}

/// Reads individual bits (LSB first) from a byte slice.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    /// Create a new BitReader over a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// Get the total number of bits read so far.
    pub fn total_bits_read(&self) -> u64 {
        self.byte_pos as u64 * 8 + u64::from(self.bit_pos)
    }

    /// Bits left before the end of the slice.
    pub fn remaining_bits(&self) -> u64 {
        self.data.len() as u64 * 8 - self.total_bits_read()
    }

    /// Read a single bit.
    pub fn read_bit(&mut self) -> WemResult<bool> {
        let byte = *self
            .data
            .get(self.byte_pos)
            .ok_or_else(|| WemError::end_of_stream("Out of bits"))?;

        let bit = (byte & (1 << self.bit_pos)) != 0;
        self.bit_pos += 1;

        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }

        Ok(bit)
    }

    /// Read multiple bits (up to 32) and return as u32.
    pub fn read_bits(&mut self, count: u8) -> WemResult<u32> {
        BitRead::read_bits(self, count)
    }
}

impl BitRead for BitReader<'_> {
    fn read_bit(&mut self) -> WemResult<bool> {
        BitReader::read_bit(self)
    }

    fn total_bits_read(&self) -> u64 {
        BitReader::total_bits_read(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_lsb_first() {
        let data = [0b10110100u8, 0b11001010u8];
        let mut reader = BitReader::new(&data);

        // Read 4 bits: should be 0100 = 4
        assert_eq!(reader.read_bits(4).unwrap(), 0b0100);
        // Read 4 bits: should be 1011 = 11
        assert_eq!(reader.read_bits(4).unwrap(), 0b1011);
        // Read 8 bits: should be 11001010 = 202
        assert_eq!(reader.read_bits(8).unwrap(), 0b11001010);
    }

    #[test]
    fn test_single_bits() {
        let data = [0b10110100u8];
        let mut reader = BitReader::new(&data);

        let bits: Vec<bool> = (0..8).map(|_| reader.read_bit().unwrap()).collect();
        assert_eq!(
            bits,
            vec![false, false, true, false, true, true, false, true]
        );
    }

    #[test]
    fn test_read_zero_bits() {
        let data = [0xFF];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_bits(0).unwrap(), 0);
        assert_eq!(reader.total_bits_read(), 0);
    }

    #[test]
    fn test_total_and_remaining_bits() {
        let data = [0xFF, 0xFF, 0xFF];
        let mut reader = BitReader::new(&data);

        reader.read_bits(5).unwrap();
        assert_eq!(reader.total_bits_read(), 5);

        reader.read_bits(7).unwrap();
        assert_eq!(reader.total_bits_read(), 12);
        assert_eq!(reader.remaining_bits(), 12);
    }

    #[test]
    fn test_read_across_byte_boundary() {
        // 0xAB = 0b10101011, 0xCD = 0b11001101
        let data = [0xAB, 0xCD];
        let mut reader = BitReader::new(&data);

        // Combined LSB-first: 1101 10101011 = 0xDAB
        assert_eq!(reader.read_bits(12).unwrap(), 0xDAB);
    }

    #[test]
    fn test_read_full_32_bits() {
        let data = [0x78, 0x56, 0x34, 0x12];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_bits(32).unwrap(), 0x12345678);
    }

    #[test]
    fn test_more_than_32_bits_rejected() {
        let data = [0u8; 8];
        let mut reader = BitReader::new(&data);
        assert!(matches!(reader.read_bits(33), Err(WemError::Parse { .. })));
    }

    #[test]
    fn test_read_past_end() {
        let data = [0xFF];
        let mut reader = BitReader::new(&data);

        reader.read_bits(8).unwrap();

        let result = reader.read_bit();
        assert!(matches!(result, Err(WemError::EndOfStream { .. })));
    }
}
