/// Accumulates bits LSB-first into a growing byte buffer.
#[derive(Debug, Clone)]
pub struct BitWriter {
    buffer: Vec<u8>,
    bit_buffer: u8,
    bits_stored: u8,
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWriter {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            bit_buffer: 0,
            bits_stored: 0,
        }
    }

    pub fn write_bit(&mut self, bit: bool) {
        if bit {
            self.bit_buffer |= 1 << self.bits_stored;
        }
        self.bits_stored += 1;

        if self.bits_stored == 8 {
            self.buffer.push(self.bit_buffer);
            self.bit_buffer = 0;
            self.bits_stored = 0;
        }
    }

    /// Write the low `count` bits of `value`; `count` is at most 32.
    pub fn write_bits(&mut self, value: u32, count: u8) {
        for i in 0..count {
            self.write_bit((value >> i) & 1 != 0);
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.bits_stored == 0 {
            self.buffer.extend_from_slice(bytes);
        } else {
            for &b in bytes {
                self.write_bits(u32::from(b), 8);
            }
        }
    }

    pub fn total_bits_written(&self) -> u64 {
        self.buffer.len() as u64 * 8 + u64::from(self.bits_stored)
    }

    pub fn is_empty(&self) -> bool {
        self.total_bits_written() == 0
    }

    /// Flush the partial byte (zero-padded) and return the buffer.
    pub fn into_inner(mut self) -> Vec<u8> {
        if self.bits_stored > 0 {
            self.buffer.push(self.bit_buffer);
        }
        self.buffer
    }
}
