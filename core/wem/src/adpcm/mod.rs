//! Wwise IMA ADPCM <-> Microsoft IMA ADPCM WAVE.
//!
//! Both layouts carry the same 4-bit IMA nibbles, so conversion is purely
//! structural. A frame of `block_align` bytes holds one sub-block per channel.
//! Wwise stores those sub-blocks back to back (chained). The standard layout
//! starts with every channel's 4-byte header and then alternates 4-byte groups
//! of nibbles between channels. No samples are decoded.

use crate::error::{WemError, WemResult};
use crate::pcm::channel_mask;
use crate::riff::{
    FmtHead, RiffExtensibleFormat, WAVE_FORMAT_IMA_ADPCM, WWISE_FORMAT_IMA_ADPCM,
    WWISE_FORMAT_IMA_ADPCM_ALT, write_wave,
};
use byteorder::{ByteOrder, LE, WriteBytesExt};

/// Per-channel sub-block size Wwise uses when the fmt chunk leaves it zero.
const WWISE_BLOCK_PER_CHANNEL: u16 = 0x24;
const GROUP: usize = 4;
const IMA_BITS: u16 = 4;

/// Stream geometry shared by both directions.
#[derive(Debug, Clone, Copy)]
struct Layout {
    channels: usize,
    block_align: u16,
    samples_per_block: u16,
}

impl Layout {
    fn from_format(format: &RiffExtensibleFormat, samples_hint: u16) -> WemResult<Self> {
        let channels = usize::from(format.channels);
        if channels == 0 {
            return Err(WemError::UnsupportedChannelCount { channels: 0 });
        }
        if format.bits_per_sample != 0 && format.bits_per_sample != IMA_BITS {
            return Err(WemError::unknown_format(format!(
                "{}-bit IMA ADPCM",
                format.bits_per_sample
            )));
        }

        let block_align = if format.block_align == 0 {
            WWISE_BLOCK_PER_CHANNEL
                .checked_mul(format.channels)
                .ok_or_else(|| {
                    WemError::parse(format!(
                        "default block align overflows for {channels} channels"
                    ))
                })?
        } else {
            format.block_align
        };
        let frame_len = usize::from(block_align);
        // each channel needs a header group plus whole nibble groups
        if frame_len % (channels * GROUP) != 0 || frame_len / channels < GROUP {
            return Err(WemError::DataSizeMismatch {
                len: frame_len,
                block: channels * GROUP,
            });
        }

        let samples_per_block = if samples_hint != 0 {
            samples_hint
        } else {
            let header_bytes = GROUP * channels;
            let samples = (frame_len - header_bytes) * 8 / (usize::from(IMA_BITS) * channels) + 1;
            u16::try_from(samples).map_err(|_| {
                WemError::parse(format!("{samples} samples per block do not fit in 16 bits"))
            })?
        };

        Ok(Self {
            channels,
            block_align,
            samples_per_block,
        })
    }

    fn avg_bytes_per_sec(&self, format: &RiffExtensibleFormat) -> u32 {
        if format.avg_bytes_per_sec != 0 {
            return format.avg_bytes_per_sec;
        }
        let bytes = u64::from(format.sample_rate) * u64::from(self.block_align)
            / u64::from(self.samples_per_block.max(1));
        u32::try_from(bytes).unwrap_or(u32::MAX)
    }

    fn frame_len(&self) -> usize {
        usize::from(self.block_align)
    }

    fn check_whole_frames(&self, data: &[u8]) -> WemResult<usize> {
        if data.len() % self.frame_len() != 0 {
            return Err(WemError::DataSizeMismatch {
                len: data.len(),
                block: self.frame_len(),
            });
        }
        Ok(data.len() / self.frame_len())
    }
}

/// Convert a Wwise IMA stream into a standard IMA ADPCM WAVE with a `fact` chunk.
pub fn to_standard(wem: &[u8]) -> WemResult<Vec<u8>> {
    let format = RiffExtensibleFormat::read(wem)?;
    if !matches!(
        format.format_tag,
        WWISE_FORMAT_IMA_ADPCM | WWISE_FORMAT_IMA_ADPCM_ALT
    ) {
        return Err(WemError::unknown_format(format!(
            "format tag 0x{:04X} is not Wwise IMA ADPCM",
            format.format_tag
        )));
    }

    let layout = Layout::from_format(&format, format.valid_bits_per_sample)?;
    let frames = layout.check_whole_frames(&format.data)?;
    let data = interleave(&format.data, layout.channels, layout.frame_len())?;
    let samples_per_channel = u32::try_from(frames)
        .ok()
        .and_then(|frames| frames.checked_mul(u32::from(layout.samples_per_block)))
        .ok_or_else(|| WemError::parse(format!("{frames} frames overflow the fact sample count")))?;

    tracing::debug!(
        channels = layout.channels,
        block_align = layout.block_align,
        samples_per_block = layout.samples_per_block,
        frames,
        "interleaving Wwise IMA ADPCM"
    );

    let head = FmtHead {
        format_tag: WAVE_FORMAT_IMA_ADPCM,
        channels: format.channels,
        sample_rate: format.sample_rate,
        avg_bytes_per_sec: layout.avg_bytes_per_sec(&format),
        block_align: layout.block_align,
        bits_per_sample: IMA_BITS,
    };
    let mut fact = Vec::with_capacity(4);
    fact.write_u32::<LE>(samples_per_channel)?;

    let (mut before, after) = format.chunks_around_data(&[*b"fact"]);
    before.insert(0, (b"fact", fact.as_slice()));
    write_wave(
        &head.encode(&layout.samples_per_block.to_le_bytes())?,
        &before,
        &data,
        &after,
    )
}

/// Convert a standard IMA ADPCM WAVE into the Wwise chained layout.
pub fn to_wem(standard: &[u8]) -> WemResult<Vec<u8>> {
    let format = RiffExtensibleFormat::read(standard)?;
    if format.format_tag != WAVE_FORMAT_IMA_ADPCM {
        return Err(WemError::unknown_format(format!(
            "format tag 0x{:04X} is not IMA ADPCM",
            format.format_tag
        )));
    }

    // cbSize 2 carries samplesPerBlock directly in the extension bytes
    let samples_hint = if format.extension.len() >= 2 {
        LE::read_u16(&format.extension)
    } else {
        0
    };
    let layout = Layout::from_format(&format, samples_hint)?;
    layout.check_whole_frames(&format.data)?;
    let mask = channel_mask(format.channels)?;
    let data = deinterleave(&format.data, layout.channels, layout.frame_len())?;

    let head = FmtHead {
        format_tag: WWISE_FORMAT_IMA_ADPCM,
        channels: format.channels,
        sample_rate: format.sample_rate,
        avg_bytes_per_sec: layout.avg_bytes_per_sec(&format),
        block_align: layout.block_align,
        bits_per_sample: IMA_BITS,
    };
    let mut extension = Vec::with_capacity(6);
    extension.write_u16::<LE>(layout.samples_per_block)?;
    extension.write_u32::<LE>(mask)?;

    let (before, after) = format.chunks_around_data(&[*b"fact"]);
    write_wave(&head.encode(&extension)?, &before, &data, &after)
}

/// Reorder chained per-channel sub-blocks into round-robin 4-byte groups.
pub fn interleave(chained: &[u8], channels: usize, block_align: usize) -> WemResult<Vec<u8>> {
    reorder(chained, channels, block_align, false)
}

/// Inverse of [`interleave`].
pub fn deinterleave(interleaved: &[u8], channels: usize, block_align: usize) -> WemResult<Vec<u8>> {
    reorder(interleaved, channels, block_align, true)
}

fn reorder(input: &[u8], channels: usize, block_align: usize, inverse: bool) -> WemResult<Vec<u8>> {
    if channels == 0 || block_align == 0 || block_align % (channels * GROUP) != 0 {
        return Err(WemError::DataSizeMismatch {
            len: block_align,
            block: channels.max(1) * GROUP,
        });
    }
    if input.len() % block_align != 0 {
        return Err(WemError::DataSizeMismatch {
            len: input.len(),
            block: block_align,
        });
    }
    if channels == 1 {
        return Ok(input.to_vec());
    }

    let per_channel = block_align / channels;
    let groups = per_channel / GROUP;
    let mut out = Vec::with_capacity(input.len());

    for frame in input.chunks_exact(block_align) {
        if inverse {
            for ch in 0..channels {
                for group in 0..groups {
                    let start = (group * channels + ch) * GROUP;
                    out.extend_from_slice(&frame[start..start + GROUP]);
                }
            }
        } else {
            for group in 0..groups {
                for ch in 0..channels {
                    let start = ch * per_channel + group * GROUP;
                    out.extend_from_slice(&frame[start..start + GROUP]);
                }
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RiffError;

    fn wwise_ima(channels: u16, block_align: u16, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(4 + 8 + 24 + 8 + data.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&24u32.to_le_bytes());
        out.extend_from_slice(&0x0002u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&22050u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&4u16.to_le_bytes());
        out.extend_from_slice(&6u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&channel_mask(channels).unwrap().to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn test_interleave_stereo_groups() {
        let chained: Vec<u8> = (0..16).collect();
        let out = interleave(&chained, 2, 16).unwrap();
        assert_eq!(
            out,
            vec![0, 1, 2, 3, 8, 9, 10, 11, 4, 5, 6, 7, 12, 13, 14, 15]
        );
        assert_eq!(deinterleave(&out, 2, 16).unwrap(), chained);
    }

    #[test]
    fn test_interleave_mono_is_identity() {
        let chained: Vec<u8> = (0..36).collect();
        assert_eq!(interleave(&chained, 1, 36).unwrap(), chained);
    }

    #[test]
    fn test_interleave_rejects_partial_frame() {
        let result = interleave(&[0u8; 20], 2, 16);
        assert!(matches!(
            result,
            Err(WemError::DataSizeMismatch { len: 20, block: 16 })
        ));
    }

    #[test]
    fn test_to_standard_writes_fact_and_extension() {
        // two frames of 2 x 0x24 bytes
        let data: Vec<u8> = (0..144u32).map(|i| i as u8).collect();
        let wem = wwise_ima(2, 0x48, &data);
        let wav = to_standard(&wem).unwrap();

        let format = RiffExtensibleFormat::read(&wav).unwrap();
        assert_eq!(format.format_tag, WAVE_FORMAT_IMA_ADPCM);
        assert_eq!(format.bits_per_sample, 4);
        assert_eq!(format.extra_size, 2);
        // (0x48 - 8) * 8 / 8 + 1
        assert_eq!(format.extension, 65u16.to_le_bytes().to_vec());
        assert_eq!(format.avg_bytes_per_sec, 22050 * 0x48 / 65);

        let fact = format.chunk(b"fact").unwrap();
        assert_eq!(fact.data, 130u32.to_le_bytes().to_vec());

        assert_eq!(&format.data[0..4], &data[0..4]);
        assert_eq!(&format.data[4..8], &data[0x24..0x28]);
        assert_eq!(&format.data[8..12], &data[4..8]);
    }

    #[test]
    fn test_zero_block_align_uses_wwise_default() {
        let wem = wwise_ima(1, 0, &[0u8; 0x24 * 3]);
        let wav = to_standard(&wem).unwrap();
        let format = RiffExtensibleFormat::read(&wav).unwrap();
        assert_eq!(format.block_align, 0x24);
        assert_eq!(format.chunk(b"fact").unwrap().data, (65u32 * 3).to_le_bytes().to_vec());
    }

    #[test]
    fn test_round_trip_through_standard() {
        let data: Vec<u8> = (0..0x90u32).map(|i| (i * 7) as u8).collect();
        let wav = to_standard(&wwise_ima(2, 0x48, &data)).unwrap();
        let back = to_wem(&wav).unwrap();

        let format = RiffExtensibleFormat::read(&back).unwrap();
        assert_eq!(format.format_tag, WWISE_FORMAT_IMA_ADPCM);
        assert_eq!(format.data, data);
        assert_eq!(format.valid_bits_per_sample, 65);
        assert_eq!(to_standard(&back).unwrap(), wav);
    }

    #[test]
    fn test_round_trip_keeps_other_chunks() {
        let data: Vec<u8> = (0..0x48u32).map(|i| i as u8).collect();
        let mut wem = wwise_ima(2, 0x48, &data);
        wem.extend_from_slice(b"cue \x04\x00\x00\x00\x01\x02\x03\x04");
        let riff_size = wem.len() as u32 - 8;
        wem[4..8].copy_from_slice(&riff_size.to_le_bytes());

        let wav = to_standard(&wem).unwrap();
        let format = RiffExtensibleFormat::read(&wav).unwrap();
        assert_eq!(format.chunks[0].id, *b"fact");
        assert_eq!(format.chunk(b"cue ").unwrap().data, vec![1, 2, 3, 4]);

        let back = to_wem(&wav).unwrap();
        let format = RiffExtensibleFormat::read(&back).unwrap();
        assert!(format.chunk(b"fact").is_none());
        assert_eq!(format.chunk(b"cue ").unwrap().data, vec![1, 2, 3, 4]);
        assert_eq!(to_standard(&back).unwrap(), wav);
    }

    #[test]
    fn test_default_block_align_overflow() {
        let mut wem = wwise_ima(2, 0, &[0u8; 0x48]);
        wem[22..24].copy_from_slice(&2000u16.to_le_bytes());
        assert!(matches!(to_standard(&wem), Err(WemError::Parse { .. })));
    }

    #[test]
    fn test_alt_tag_is_accepted() {
        let mut wem = wwise_ima(1, 0x24, &[0u8; 0x24]);
        wem[20..22].copy_from_slice(&0x8311u16.to_le_bytes());
        assert!(to_standard(&wem).is_ok());
    }

    #[test]
    fn test_partial_frame_in_file() {
        let wem = wwise_ima(2, 0x48, &[0u8; 0x50]);
        assert!(matches!(
            to_standard(&wem),
            Err(WemError::DataSizeMismatch { len: 0x50, block: 0x48 })
        ));
    }

    #[test]
    fn test_not_riff() {
        let err = to_standard(b"OggS").unwrap_err();
        assert!(matches!(err, WemError::Format(RiffError::MissingRiff)));
    }
}
