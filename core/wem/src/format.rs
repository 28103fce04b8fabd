//! Audio format detection from leading bytes.

use crate::error::{WemError, WemResult};
use crate::riff::{
    WAVE_FORMAT_EXTENSIBLE, WAVE_FORMAT_IMA_ADPCM, WAVE_FORMAT_PCM, WWISE_FORMAT_IMA_ADPCM,
    WWISE_FORMAT_IMA_ADPCM_ALT, WWISE_FORMAT_VORBIS,
};
use byteorder::{ByteOrder, LE};

/// Every audio encoding this crate recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    WwiseVorbis,
    WwiseImaAdpcm,
    WwisePcm,
    Pcm,
    ImaAdpcm,
    OggVorbis,
    Mp3,
}

impl AudioFormat {
    /// Map a RIFF `fmt ` format tag to a format.
    ///
    /// `0xFFFE` is how Wwise writes PCM, so it maps to [`AudioFormat::WwisePcm`].
    pub fn from_format_tag(tag: u16) -> Option<Self> {
        match tag {
            WWISE_FORMAT_VORBIS => Some(Self::WwiseVorbis),
            WWISE_FORMAT_IMA_ADPCM | WWISE_FORMAT_IMA_ADPCM_ALT => Some(Self::WwiseImaAdpcm),
            WAVE_FORMAT_EXTENSIBLE => Some(Self::WwisePcm),
            WAVE_FORMAT_PCM => Some(Self::Pcm),
            WAVE_FORMAT_IMA_ADPCM => Some(Self::ImaAdpcm),
            _ => None,
        }
    }

    pub fn is_wwise(self) -> bool {
        matches!(
            self,
            Self::WwiseVorbis | Self::WwiseImaAdpcm | Self::WwisePcm
        )
    }

    /// File extension of the standard form of this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::WwiseVorbis | Self::OggVorbis => "ogg",
            Self::Mp3 => "mp3",
            Self::WwiseImaAdpcm | Self::WwisePcm | Self::Pcm | Self::ImaAdpcm => "wav",
        }
    }
}

/// Identify a file from its leading bytes.
pub fn detect(bytes: &[u8]) -> WemResult<AudioFormat> {
    if bytes.starts_with(b"OggS") {
        // first packet of the first page must be a Vorbis identification header
        let segments = bytes.get(26).copied().map(usize::from).unwrap_or(0);
        let packet_at = 27 + segments;
        if bytes.get(packet_at..packet_at + 7) == Some(b"\x01vorbis".as_slice()) {
            return Ok(AudioFormat::OggVorbis);
        }
        return Err(WemError::unknown_format("Ogg stream is not Vorbis"));
    }

    if bytes.starts_with(b"ID3") || matches!(bytes, [0xFF, second, ..] if second & 0xE0 == 0xE0)
    {
        return Ok(AudioFormat::Mp3);
    }

    if bytes.starts_with(b"RIFF") {
        let tag = format_tag(bytes)
            .ok_or_else(|| WemError::unknown_format("RIFF file without fmt chunk"))?;
        return AudioFormat::from_format_tag(tag).ok_or_else(|| {
            WemError::unknown_format(format!("unsupported format tag 0x{tag:04X}"))
        });
    }

    Err(WemError::unknown_format("unrecognised leading bytes"))
}

/// Find the `fmt ` tag without validating the rest of the container.
fn format_tag(bytes: &[u8]) -> Option<u16> {
    if bytes.get(8..12) != Some(b"WAVE".as_slice()) {
        return None;
    }

    let mut pos = 12usize;
    while let Some(header) = bytes.get(pos..pos + 8) {
        let size = LE::read_u32(&header[4..]) as usize;
        if &header[..4] == b"fmt " {
            return bytes.get(pos + 8..pos + 10).map(LE::read_u16);
        }
        pos = pos.checked_add(8 + size + (size & 1))?;
    }
    None
}
