//! Vorbis codebook library for rebuilding Wwise audio.
//!
//! Wwise strips Vorbis setup headers down to a compact form: codebooks are
//! either referenced by index into an external library or stored inline in a
//! packed layout. This module loads such libraries and expands packed
//! codebooks back into the layout a Vorbis decoder expects.
//!
//! # Library layout
//!
//! A library blob is the concatenation of packed codebooks, followed by a
//! table of little-endian `u32` start offsets. The final four bytes of the
//! blob hold the offset of that table; they double as the last table entry,
//! marking the end of the last codebook.
//!
//! ```text
//! [codebook 0][codebook 1]...[codebook n-1][off 0][off 1]...[off n-1][table offset]
//! ```
//!
//! Different games ship different libraries. If conversion fails with a size
//! mismatch, the wrong library is the usual cause.
//!
//! No library is bundled with this crate. Streams that reference external
//! codebooks need the caller to supply the matching `packed_codebooks*.bin`
//! (the aoTuV 6.03 table covers most titles) through
//! [`CodebookLibrary::from_file`] or [`CodebookLibrary::from_bytes`].

use crate::bit_reader::{BitRead, BitReader};
use crate::bit_writer::BitWriter;
use crate::error::{WemError, WemResult};
use crate::vorbis::helpers::{book_map_type1_quantvals, ilog};
use byteorder::{ByteOrder, LE};
use std::path::Path;

/// Sync pattern opening every standard Vorbis codebook ("BCV").
const CODEBOOK_SYNC: u32 = 0x564342;

/// Immutable set of packed codebooks, shared by reference across conversions.
///
/// The crate carries no built-in table. Load a caller-supplied
/// `packed_codebooks*.bin`, or use [`CodebookLibrary::empty`] only for
/// streams whose codebooks are stored inline.
#[derive(Debug, Clone, Default)]
pub struct CodebookLibrary {
    data: Vec<u8>,
    offsets: Vec<usize>,
}

impl CodebookLibrary {
    /// Create an empty codebook library, for streams with inline codebooks.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load codebooks from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> WemResult<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Load codebooks from a library blob.
    pub fn from_bytes(blob: &[u8]) -> WemResult<Self> {
        let len = blob.len();
        if len < 4 {
            return Err(WemError::corrupt_library(format!(
                "library is {len} bytes, too short for an offset table"
            )));
        }

        let table_offset = LE::read_u32(&blob[len - 4..]) as usize;
        if table_offset > len - 4 {
            return Err(WemError::corrupt_library(format!(
                "offset table at {table_offset} lies outside the {len}-byte library"
            )));
        }

        let table = &blob[table_offset..];
        if table.len() % 4 != 0 {
            return Err(WemError::corrupt_library(format!(
                "offset table of {} bytes is not a whole number of entries",
                table.len()
            )));
        }

        let mut offsets = Vec::with_capacity(table.len() / 4);
        for entry in table.chunks_exact(4) {
            let offset = LE::read_u32(entry) as usize;
            if offset > table_offset {
                return Err(WemError::corrupt_library(format!(
                    "codebook offset {offset} points past the codebook data ({table_offset} bytes)"
                )));
            }
            if offsets.last().is_some_and(|&prev| offset < prev) {
                return Err(WemError::corrupt_library(format!(
                    "codebook offsets decrease at entry {}",
                    offsets.len()
                )));
            }
            offsets.push(offset);
        }

        tracing::debug!(
            codebooks = offsets.len() - 1,
            bytes = table_offset,
            "loaded codebook library"
        );

        Ok(Self {
            data: blob[..table_offset].to_vec(),
            offsets,
        })
    }

    /// Get the number of codebooks in the library.
    pub fn codebook_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Get a packed codebook by index.
    pub fn get_codebook(&self, index: usize) -> WemResult<&[u8]> {
        if index >= self.codebook_count() {
            return Err(WemError::invalid_codebook_id(index as u32));
        }

        let start = self.offsets[index];
        let end = self.offsets[index + 1];
        Ok(&self.data[start..end])
    }

    /// Expand the packed codebook at `index` into `output` in standard layout.
    pub fn rebuild(&self, index: usize, output: &mut BitWriter) -> WemResult<()> {
        let codebook = self.get_codebook(index)?;
        let mut reader = BitReader::new(codebook);
        rebuild_packed(&mut reader, Some(codebook.len() as u64), output)
    }

    /// Expand a packed codebook stored inline in a setup packet.
    pub fn rebuild_from_reader<B: BitRead>(input: &mut B, output: &mut BitWriter) -> WemResult<()> {
        rebuild_packed(input, None, output)
    }

    /// Copy a codebook that is already in standard layout, validating it on the way.
    pub fn copy<B: BitRead>(input: &mut B, output: &mut BitWriter) -> WemResult<()> {
        truncation_is_corruption(copy_standard(input, output))
    }
}

fn truncation_is_corruption(result: WemResult<()>) -> WemResult<()> {
    result.map_err(|err| match err {
        WemError::EndOfStream { message } => {
            WemError::codebook(format!("codebook truncated: {message}"))
        }
        other => other,
    })
}

fn rebuild_packed<B: BitRead>(
    input: &mut B,
    codebook_size: Option<u64>,
    output: &mut BitWriter,
) -> WemResult<()> {
    truncation_is_corruption(rebuild_packed_inner(input, codebook_size, output))
}

fn rebuild_packed_inner<B: BitRead>(
    input: &mut B,
    codebook_size: Option<u64>,
    output: &mut BitWriter,
) -> WemResult<()> {
    // IN: 4 bit dimensions, 14 bit entry count
    let dimensions = input.read_bits(4)?;
    let entries = input.read_bits(14)?;

    // OUT: 24 bit sync, 16 bit dimensions, 24 bit entry count
    output.write_bits(CODEBOOK_SYNC, 24);
    output.write_bits(dimensions, 16);
    output.write_bits(entries, 24);

    let ordered = input.read_bits(1)?;
    output.write_bits(ordered, 1);

    if ordered != 0 {
        copy_ordered_lengths(input, output, entries)?;
    } else {
        // IN: 3 bit codeword length length, 1 bit sparse flag
        let codeword_length_length = input.read_bits(3)?;
        let sparse = input.read_bits(1)? != 0;

        if codeword_length_length == 0 || codeword_length_length > 5 {
            return Err(WemError::codebook(format!(
                "nonsense codeword length width {codeword_length_length}"
            )));
        }

        output.write_bits(u32::from(sparse), 1);

        for _ in 0..entries {
            let present = if sparse {
                let flag = input.read_bits(1)?;
                output.write_bits(flag, 1);
                flag != 0
            } else {
                true
            };

            if present {
                // IN: n bit codeword length-1, OUT: 5 bit codeword length-1
                let codeword_length = input.read_bits(codeword_length_length as u8)?;
                output.write_bits(codeword_length, 5);
            }
        }
    }

    // IN: 1 bit lookup type, OUT: 4 bit lookup type
    let lookup_type = input.read_bits(1)?;
    output.write_bits(lookup_type, 4);
    copy_lookup_table(input, output, entries, dimensions, lookup_type)?;

    if let Some(size) = codebook_size
        && size != 0
    {
        let bytes_read = input.total_bits_read() / 8 + 1;
        if bytes_read != size {
            return Err(WemError::codebook(format!(
                "expected {size} bytes, read {bytes_read} - likely wrong codebook library"
            )));
        }
    }

    Ok(())
}

fn copy_standard<B: BitRead>(input: &mut B, output: &mut BitWriter) -> WemResult<()> {
    let sync = input.read_bits(24)?;
    let dimensions = input.read_bits(16)?;
    let entries = input.read_bits(24)?;

    if sync != CODEBOOK_SYNC {
        return Err(WemError::codebook(format!(
            "invalid codebook sync 0x{sync:06x}"
        )));
    }

    output.write_bits(sync, 24);
    output.write_bits(dimensions, 16);
    output.write_bits(entries, 24);

    let ordered = input.read_bits(1)?;
    output.write_bits(ordered, 1);

    if ordered != 0 {
        copy_ordered_lengths(input, output, entries)?;
    } else {
        let sparse = input.read_bits(1)? != 0;
        output.write_bits(u32::from(sparse), 1);

        for _ in 0..entries {
            let present = if sparse {
                let flag = input.read_bits(1)?;
                output.write_bits(flag, 1);
                flag != 0
            } else {
                true
            };

            if present {
                let codeword_length = input.read_bits(5)?;
                output.write_bits(codeword_length, 5);
            }
        }
    }

    let lookup_type = input.read_bits(4)?;
    output.write_bits(lookup_type, 4);
    copy_lookup_table(input, output, entries, dimensions, lookup_type)
}

fn copy_ordered_lengths<B: BitRead>(
    input: &mut B,
    output: &mut BitWriter,
    entries: u32,
) -> WemResult<()> {
    let initial_length = input.read_bits(5)?;
    output.write_bits(initial_length, 5);

    let mut current_entry = 0u32;
    while current_entry < entries {
        let num_bits = ilog(entries - current_entry);
        let number = input.read_bits(num_bits)?;
        output.write_bits(number, num_bits);
        current_entry += number;
    }

    if current_entry > entries {
        return Err(WemError::codebook(format!(
            "ordered lengths cover {current_entry} of {entries} entries"
        )));
    }
    Ok(())
}

fn copy_lookup_table<B: BitRead>(
    input: &mut B,
    output: &mut BitWriter,
    entries: u32,
    dimensions: u32,
    lookup_type: u32,
) -> WemResult<()> {
    match lookup_type {
        0 => Ok(()),
        1 => {
            let min = input.read_bits(32)?;
            let max = input.read_bits(32)?;
            let value_length = input.read_bits(4)?;
            let sequence_flag = input.read_bits(1)?;
            output.write_bits(min, 32);
            output.write_bits(max, 32);
            output.write_bits(value_length, 4);
            output.write_bits(sequence_flag, 1);

            let value_bits = (value_length + 1) as u8;
            for _ in 0..book_map_type1_quantvals(entries, dimensions) {
                let val = input.read_bits(value_bits)?;
                output.write_bits(val, value_bits);
            }
            Ok(())
        }
        other => Err(WemError::codebook(format!("invalid lookup type {other}"))),
    }
}
