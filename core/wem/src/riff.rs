//! RIFF/WAVE reader and writer shared by every codec.
//!
//! [`RiffExtensibleFormat::read`] validates the container strictly: the RIFF
//! size must cover the buffer exactly, `fmt ` must be the first chunk, and a
//! non-empty `data` chunk must be present. Chunks other than `fmt ` and `data`
//! are kept so codecs can pick up `vorb`, `smpl` or `fact` payloads.

use crate::error::{RiffError, WemError, WemResult};
use byteorder::{ByteOrder, LE, WriteBytesExt};
use utils::{BinWriteExt, FourCc, fourcc_to_string};

pub const WAVE_FORMAT_PCM: u16 = 0x0001;
pub const WAVE_FORMAT_IMA_ADPCM: u16 = 0x0011;
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;
pub const WWISE_FORMAT_IMA_ADPCM: u16 = 0x0002;
/// Later Wwise releases tag IMA streams with this value.
pub const WWISE_FORMAT_IMA_ADPCM_ALT: u16 = 0x8311;
pub const WWISE_FORMAT_VORBIS: u16 = 0xFFFF;

const RIFF_HEADER_SIZE: usize = 12;
const FMT_BASE_SIZE: u32 = 16;

/// A `{tag, payload}` pair handed to [`write_wave`].
pub(crate) type ChunkRef<'a> = (&'a FourCc, &'a [u8]);

/// A chunk found after `fmt `, with its payload copied out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiffChunk {
    pub id: FourCc,
    /// Offset of the payload within the file.
    pub offset: usize,
    pub data: Vec<u8>,
}

/// Parsed `fmt ` fields plus the `data` payload of a RIFF/WAVE file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiffExtensibleFormat {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub fmt_size: u32,
    /// `cbSize`; zero when the fmt chunk is the bare 16-byte form.
    pub extra_size: u16,
    pub valid_bits_per_sample: u16,
    pub channel_mask: u32,
    /// Extension bytes after the channel mask (or all of them when `extra_size < 6`).
    pub extension: Vec<u8>,
    /// Chunks other than `fmt ` and `data`, in file order.
    pub chunks: Vec<RiffChunk>,
    pub data_offset: usize,
    pub data: Vec<u8>,
}

impl RiffExtensibleFormat {
    pub fn read(bytes: &[u8]) -> WemResult<Self> {
        let file_size = bytes.len();

        if bytes.get(0..4) != Some(b"RIFF".as_slice()) {
            return Err(RiffError::MissingRiff.into());
        }
        let declared = bytes
            .get(4..8)
            .map(|b| u64::from(LE::read_u32(b)) + 8)
            .ok_or(RiffError::TruncatedHeader { offset: 4 })?;
        if declared != file_size as u64 {
            return Err(RiffError::SizeMismatch {
                declared,
                actual: file_size as u64,
            }
            .into());
        }
        if bytes.get(8..12) != Some(b"WAVE".as_slice()) {
            return Err(RiffError::MissingWave.into());
        }
        if bytes.get(12..16) != Some(b"fmt ".as_slice()) {
            return Err(RiffError::MissingFmt.into());
        }
        let fmt_size = bytes
            .get(16..20)
            .map(LE::read_u32)
            .ok_or(RiffError::TruncatedHeader { offset: 16 })?;
        if fmt_size < FMT_BASE_SIZE {
            return Err(RiffError::FmtSize { size: fmt_size }.into());
        }

        let fmt_start = RIFF_HEADER_SIZE + 8;
        let fmt = fmt_start
            .checked_add(fmt_size as usize)
            .and_then(|end| bytes.get(fmt_start..end))
            .ok_or_else(|| RiffError::ChunkOverrun {
                id: "fmt ".to_string(),
                offset: fmt_start,
                size: fmt_size,
                file_size,
            })?;

        let mut format = Self {
            format_tag: LE::read_u16(&fmt[0..]),
            channels: LE::read_u16(&fmt[2..]),
            sample_rate: LE::read_u32(&fmt[4..]),
            avg_bytes_per_sec: LE::read_u32(&fmt[8..]),
            block_align: LE::read_u16(&fmt[12..]),
            bits_per_sample: LE::read_u16(&fmt[14..]),
            fmt_size,
            extra_size: 0,
            valid_bits_per_sample: 0,
            channel_mask: 0,
            extension: Vec::new(),
            chunks: Vec::new(),
            data_offset: 0,
            data: Vec::new(),
        };

        if fmt_size > FMT_BASE_SIZE {
            let extra = fmt
                .get(16..18)
                .map(LE::read_u16)
                .ok_or(RiffError::FmtSize { size: fmt_size })?;
            if u32::from(extra) + 18 != fmt_size {
                return Err(RiffError::ExtraSize {
                    extra,
                    size: fmt_size,
                }
                .into());
            }
            format.extra_size = extra;
            let ext = &fmt[18..];
            if ext.len() >= 6 {
                format.valid_bits_per_sample = LE::read_u16(&ext[0..]);
                format.channel_mask = LE::read_u32(&ext[2..]);
                format.extension = ext[6..].to_vec();
            } else {
                format.extension = ext.to_vec();
            }
        }

        let mut pos = fmt_start + fmt_size as usize + (fmt_size as usize & 1);
        let mut data = None;
        while pos < file_size {
            let header = bytes
                .get(pos..pos + 8)
                .ok_or(RiffError::TruncatedHeader { offset: pos })?;
            let id: FourCc = [header[0], header[1], header[2], header[3]];
            let size = LE::read_u32(&header[4..]);
            let start = pos + 8;
            let end = start + size as usize;

            if &id == b"data" {
                if end > file_size {
                    return Err(RiffError::DataOverrun {
                        offset: start,
                        size,
                        file_size,
                    }
                    .into());
                }
                if size == 0 {
                    return Err(RiffError::EmptyData.into());
                }
                if data.is_none() {
                    data = Some((start, bytes[start..end].to_vec()));
                }
            } else {
                if end > file_size {
                    return Err(RiffError::ChunkOverrun {
                        id: fourcc_to_string(&id),
                        offset: start,
                        size,
                        file_size,
                    }
                    .into());
                }
                format.chunks.push(RiffChunk {
                    id,
                    offset: start,
                    data: bytes[start..end].to_vec(),
                });
            }

            pos = end + (size as usize & 1);
        }

        let (data_offset, data) = data.ok_or(RiffError::MissingData)?;
        format.data_offset = data_offset;
        format.data = data;

        tracing::trace!(
            format_tag = format.format_tag,
            channels = format.channels,
            sample_rate = format.sample_rate,
            fmt_size,
            data_size = format.data.len(),
            "parsed RIFF header"
        );

        Ok(format)
    }

    /// Payload of the first chunk with the given tag.
    pub fn chunk(&self, id: &FourCc) -> Option<&RiffChunk> {
        self.chunks.iter().find(|chunk| &chunk.id == id)
    }

    /// Kept chunks split into those before and after `data`, minus any tag in `skip`.
    pub(crate) fn chunks_around_data(&self, skip: &[FourCc]) -> (Vec<ChunkRef<'_>>, Vec<ChunkRef<'_>>) {
        let (before, after): (Vec<&RiffChunk>, Vec<&RiffChunk>) = self
            .chunks
            .iter()
            .filter(|chunk| !skip.contains(&chunk.id))
            .partition(|chunk| chunk.offset < self.data_offset);
        (chunk_refs(before), chunk_refs(after))
    }

    /// Block alignment from the header, or `ceil(channels * bits / 8)` when it is zero.
    pub fn effective_block_align(&self) -> WemResult<u16> {
        if self.block_align != 0 {
            return Ok(self.block_align);
        }
        let bits = u32::from(self.channels) * u32::from(self.bits_per_sample);
        u16::try_from(bits.div_ceil(8)).map_err(|_| {
            RiffError::BlockAlignOverflow {
                channels: self.channels,
                bits: self.bits_per_sample,
            }
            .into()
        })
    }

    /// Average byte rate from the header, or `sample_rate * block_align` when it is zero.
    pub fn effective_avg_bytes_per_sec(&self) -> WemResult<u32> {
        if self.avg_bytes_per_sec != 0 {
            return Ok(self.avg_bytes_per_sec);
        }
        let block_align = u32::from(self.effective_block_align()?);
        self.sample_rate.checked_mul(block_align).ok_or_else(|| {
            WemError::parse(format!(
                "{} Hz x {block_align}-byte blocks overflows the byte rate",
                self.sample_rate
            ))
        })
    }
}

fn chunk_refs(chunks: Vec<&RiffChunk>) -> Vec<ChunkRef<'_>> {
    chunks
        .into_iter()
        .map(|chunk| (&chunk.id, chunk.data.as_slice()))
        .collect()
}

/// The fixed 16-byte head shared by every fmt chunk this crate writes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FmtHead {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl FmtHead {
    /// Serialize the head followed by `cbSize` and `extension`.
    pub fn encode(&self, extension: &[u8]) -> WemResult<Vec<u8>> {
        let mut fmt = Vec::with_capacity(18 + extension.len());
        fmt.write_u16::<LE>(self.format_tag)?;
        fmt.write_u16::<LE>(self.channels)?;
        fmt.write_u32::<LE>(self.sample_rate)?;
        fmt.write_u32::<LE>(self.avg_bytes_per_sec)?;
        fmt.write_u16::<LE>(self.block_align)?;
        fmt.write_u16::<LE>(self.bits_per_sample)?;
        let extra_size = u16::try_from(extension.len()).map_err(|_| {
            WemError::parse(format!("fmt extension of {} bytes", extension.len()))
        })?;
        fmt.write_u16::<LE>(extra_size)?;
        fmt.extend_from_slice(extension);
        Ok(fmt)
    }
}

/// Assemble a RIFF/WAVE file: `fmt `, the `before` chunks, `data`, then the
/// `after` chunks. Odd-sized chunks get a pad byte.
pub(crate) fn write_wave(
    fmt: &[u8],
    before: &[ChunkRef<'_>],
    data: &[u8],
    after: &[ChunkRef<'_>],
) -> WemResult<Vec<u8>> {
    let padded = |len: usize| 8 + len + (len & 1);
    let body = 4
        + padded(fmt.len())
        + before
            .iter()
            .chain(after)
            .map(|(_, payload)| padded(payload.len()))
            .sum::<usize>()
        + padded(data.len());

    let mut out = Vec::with_capacity(8 + body);
    out.write_chunk_header(b"RIFF", body)?;
    out.extend_from_slice(b"WAVE");
    write_padded_chunk(&mut out, b"fmt ", fmt)?;
    for (id, payload) in before {
        write_padded_chunk(&mut out, id, payload)?;
    }
    write_padded_chunk(&mut out, b"data", data)?;
    for (id, payload) in after {
        write_padded_chunk(&mut out, id, payload)?;
    }
    Ok(out)
}

fn write_padded_chunk(out: &mut Vec<u8>, id: &FourCc, payload: &[u8]) -> WemResult<()> {
    out.write_chunk(id, payload)?;
    if payload.len() & 1 == 1 {
        out.push(0);
    }
    Ok(())
}
