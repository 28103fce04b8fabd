//! Wwise PCM <-> standard PCM WAVE.
//!
//! Wwise stores PCM in a `WAVE_FORMAT_EXTENSIBLE` container with a 24-byte fmt
//! chunk. Conversion only rewrites the header; sample bytes and any other
//! chunks (`JUNK`, `LIST`, `cue `, ...) pass through in place.

use crate::error::{WemError, WemResult};
use crate::riff::{
    FmtHead, RiffExtensibleFormat, WAVE_FORMAT_EXTENSIBLE, WAVE_FORMAT_PCM, write_wave,
};
use byteorder::{LE, WriteBytesExt};

const SUPPORTED_BITS: [u16; 4] = [8, 16, 24, 32];

/// Speaker mask for 1 (center) through 8 (7.1) channels.
pub fn channel_mask(channels: u16) -> WemResult<u32> {
    let mask = match channels {
        1 => 0x4,   // FC
        2 => 0x3,   // FL FR
        3 => 0x7,   // FL FR FC
        4 => 0x33,  // FL FR BL BR
        5 => 0x37,  // FL FR FC BL BR
        6 => 0x3F,  // 5.1
        7 => 0x70F, // 6.1: FL FR FC LFE BC SL SR
        8 => 0x63F, // 7.1
        _ => return Err(WemError::UnsupportedChannelCount { channels }),
    };
    Ok(mask)
}

/// Convert a Wwise PCM stream into a plain PCM WAVE with an 18-byte fmt chunk.
pub fn to_standard(wem: &[u8]) -> WemResult<Vec<u8>> {
    let format = RiffExtensibleFormat::read(wem)?;
    if format.format_tag != WAVE_FORMAT_EXTENSIBLE && format.format_tag != WAVE_FORMAT_PCM {
        return Err(WemError::unknown_format(format!(
            "format tag 0x{:04X} is not PCM",
            format.format_tag
        )));
    }
    let head = standard_head(&format)?;

    tracing::debug!(
        channels = head.channels,
        sample_rate = head.sample_rate,
        bits = head.bits_per_sample,
        bytes = format.data.len(),
        "rewrapping Wwise PCM"
    );

    let (before, after) = format.chunks_around_data(&[]);
    write_wave(&head.encode(&[])?, &before, &format.data, &after)
}

/// Convert a PCM WAVE (plain or extensible) into the Wwise extensible layout.
pub fn to_wem(standard: &[u8]) -> WemResult<Vec<u8>> {
    let format = RiffExtensibleFormat::read(standard)?;
    if format.format_tag != WAVE_FORMAT_PCM && format.format_tag != WAVE_FORMAT_EXTENSIBLE {
        return Err(WemError::unknown_format(format!(
            "format tag 0x{:04X} is not PCM",
            format.format_tag
        )));
    }
    let mut head = standard_head(&format)?;
    let mask = channel_mask(head.channels)?;
    head.format_tag = WAVE_FORMAT_EXTENSIBLE;

    let mut extension = Vec::with_capacity(6);
    extension.write_u16::<LE>(head.bits_per_sample)?;
    extension.write_u32::<LE>(mask)?;

    let (before, after) = format.chunks_around_data(&[]);
    write_wave(&head.encode(&extension)?, &before, &format.data, &after)
}

/// Validate the PCM fields and fill in zero block-align/byte-rate values.
fn standard_head(format: &RiffExtensibleFormat) -> WemResult<FmtHead> {
    if format.channels == 0 {
        return Err(WemError::UnsupportedChannelCount { channels: 0 });
    }
    if !SUPPORTED_BITS.contains(&format.bits_per_sample) {
        return Err(WemError::unknown_format(format!(
            "{}-bit PCM",
            format.bits_per_sample
        )));
    }

    let block_align = format.effective_block_align()?;
    if format.data.len() % usize::from(block_align) != 0 {
        return Err(WemError::DataSizeMismatch {
            len: format.data.len(),
            block: usize::from(block_align),
        });
    }

    Ok(FmtHead {
        format_tag: WAVE_FORMAT_PCM,
        channels: format.channels,
        sample_rate: format.sample_rate,
        avg_bytes_per_sec: format.effective_avg_bytes_per_sec()?,
        block_align,
        bits_per_sample: format.bits_per_sample,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RiffError;

    /// Hand-assembled Wwise PCM file with a 24-byte fmt chunk.
    fn wwise_pcm(channels: u16, bits: u16, block_align: u16, avg: u32, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(4 + 8 + 24 + 8 + data.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&24u32.to_le_bytes());
        out.extend_from_slice(&0xFFFEu16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&48000u32.to_le_bytes());
        out.extend_from_slice(&avg.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(&6u16.to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(&channel_mask(channels).unwrap_or(0).to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    /// Insert a chunk at byte `at` and fix up the RIFF size.
    fn splice_chunk(mut wem: Vec<u8>, at: usize, id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut chunk = id.to_vec();
        chunk.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        chunk.extend_from_slice(payload);
        wem.splice(at..at, chunk);
        let riff_size = wem.len() as u32 - 8;
        wem[4..8].copy_from_slice(&riff_size.to_le_bytes());
        wem
    }

    #[test]
    fn test_to_standard_shrinks_header() {
        let wem = wwise_pcm(1, 16, 2, 96000, &[1, 2, 3, 4]);
        assert_eq!(wem.len(), 56);
        let wav = to_standard(&wem).unwrap();
        assert_eq!(wav.len(), wem.len() - 0x2C + 0x26);

        let format = RiffExtensibleFormat::read(&wav).unwrap();
        assert_eq!(format.format_tag, WAVE_FORMAT_PCM);
        assert_eq!(format.fmt_size, 18);
        assert_eq!(format.extra_size, 0);
        assert_eq!(format.data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_to_standard_derives_zero_fields() {
        let wem = wwise_pcm(3, 24, 0, 0, &[0; 18]);
        let wav = to_standard(&wem).unwrap();
        let format = RiffExtensibleFormat::read(&wav).unwrap();
        assert_eq!(format.block_align, 9);
        assert_eq!(format.avg_bytes_per_sec, 48000 * 9);
    }

    #[test]
    fn test_output_is_readable_by_hound() {
        let samples: Vec<u8> = [100i16, -100, 2000, -2000]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let wem = wwise_pcm(2, 16, 4, 192000, &samples);
        let wav = to_standard(&wem).unwrap();

        let mut reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().bits_per_sample, 16);
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![100, -100, 2000, -2000]);
    }

    #[test]
    fn test_round_trip_all_channel_counts() {
        for channels in 1..=8u16 {
            let block_align = channels * 2;
            let data = vec![0x5Au8; usize::from(block_align) * 4];
            let wem = wwise_pcm(channels, 16, block_align, 48000 * u32::from(block_align), &data);

            let wav = to_standard(&wem).unwrap();
            assert_eq!(to_wem(&wav).unwrap(), wem, "channels = {channels}");
        }
    }

    #[test]
    fn test_extra_chunks_survive_round_trip() {
        let wem = wwise_pcm(2, 16, 4, 192000, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let end = wem.len();
        // JUNK right after the 24-byte fmt chunk, LIST after data
        let wem = splice_chunk(wem, 44, b"JUNK", &[9; 4]);
        let wem = splice_chunk(wem, end + 12, b"LIST", &[7; 2]);

        let wav = to_standard(&wem).unwrap();
        assert_eq!(wav.len(), wem.len() - 0x2C + 0x26);

        let format = RiffExtensibleFormat::read(&wav).unwrap();
        let junk = format.chunk(b"JUNK").unwrap();
        assert_eq!(junk.data, vec![9; 4]);
        assert!(junk.offset < format.data_offset);
        assert!(format.chunk(b"LIST").unwrap().offset > format.data_offset);

        assert_eq!(to_wem(&wav).unwrap(), wem);
    }

    #[test]
    fn test_to_wem_rejects_nine_channels() {
        let wem = wwise_pcm(9, 8, 9, 48000 * 9, &[0; 9]);
        let wav = to_standard(&wem).unwrap();
        assert!(matches!(
            to_wem(&wav),
            Err(WemError::UnsupportedChannelCount { channels: 9 })
        ));
    }

    #[test]
    fn test_partial_frame_is_rejected() {
        let wem = wwise_pcm(2, 16, 4, 192000, &[0; 6]);
        assert!(matches!(
            to_standard(&wem),
            Err(WemError::DataSizeMismatch { len: 6, block: 4 })
        ));
    }

    #[test]
    fn test_missing_wave_tag() {
        let mut wem = wwise_pcm(1, 16, 2, 96000, &[1, 2]);
        wem[8..12].copy_from_slice(b"WAVX");
        let err = to_standard(&wem).unwrap_err();
        assert!(matches!(err, WemError::Format(RiffError::MissingWave)));
        assert!(err.to_string().contains("WAVE chunk not found"));
    }
}
