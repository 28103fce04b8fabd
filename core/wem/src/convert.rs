//! Format dispatch between Wwise streams and their standard counterparts.

use crate::adpcm;
use crate::error::{WemError, WemResult};
use crate::format::{AudioFormat, detect};
use crate::pcm;
use crate::vorbis::{CodebookLibrary, VorbisOptions, rebuild_ogg};

/// Output of a conversion, tagged with the format it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converted {
    pub format: AudioFormat,
    pub bytes: Vec<u8>,
}

impl Converted {
    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }
}

/// Convert any recognised input into its standard form.
///
/// Wwise Vorbis becomes Ogg Vorbis, Wwise IMA ADPCM becomes a standard IMA
/// WAVE and Wwise PCM becomes a plain PCM WAVE. Inputs that are already
/// standard are returned unchanged.
pub fn to_standard(
    bytes: &[u8],
    codebooks: &CodebookLibrary,
    options: &VorbisOptions,
) -> WemResult<Converted> {
    to_standard_as(detect(bytes)?, bytes, codebooks, options)
}

/// Like [`to_standard`], with the input format already known.
pub fn to_standard_as(
    format: AudioFormat,
    bytes: &[u8],
    codebooks: &CodebookLibrary,
    options: &VorbisOptions,
) -> WemResult<Converted> {
    let (format, bytes) = match format {
        AudioFormat::WwiseVorbis => (
            AudioFormat::OggVorbis,
            rebuild_ogg(bytes, codebooks, options)?,
        ),
        AudioFormat::WwiseImaAdpcm => (AudioFormat::ImaAdpcm, adpcm::to_standard(bytes)?),
        AudioFormat::WwisePcm => (AudioFormat::Pcm, pcm::to_standard(bytes)?),
        standard => (standard, bytes.to_vec()),
    };
    tracing::trace!(?format, len = bytes.len(), "converted to standard");
    Ok(Converted { format, bytes })
}

/// Convert a standard PCM or IMA ADPCM WAVE into its Wwise layout.
pub fn to_wem(bytes: &[u8]) -> WemResult<Vec<u8>> {
    match detect(bytes)? {
        AudioFormat::Pcm | AudioFormat::WwisePcm => pcm::to_wem(bytes),
        AudioFormat::ImaAdpcm => adpcm::to_wem(bytes),
        other => Err(WemError::unknown_format(format!(
            "{other:?} has no Wwise encoder"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_pcm() -> Vec<u8> {
        let mut out = b"RIFF".to_vec();
        out.extend_from_slice(&(4 + 8 + 18 + 8 + 4u32).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&18u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&8000u32.to_le_bytes());
        out.extend_from_slice(&16000u32.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&4u32.to_le_bytes());
        out.extend_from_slice(&[1, 2, 3, 4]);
        out
    }

    #[test]
    fn test_standard_input_passes_through() {
        let wav = plain_pcm();
        let converted =
            to_standard(&wav, &CodebookLibrary::empty(), &VorbisOptions::default()).unwrap();
        assert_eq!(converted.format, AudioFormat::Pcm);
        assert_eq!(converted.extension(), "wav");
        assert_eq!(converted.bytes, wav);
    }

    #[test]
    fn test_pcm_to_wem_and_back() {
        let wav = plain_pcm();
        let wem = to_wem(&wav).unwrap();
        assert_eq!(detect(&wem).unwrap(), AudioFormat::WwisePcm);

        let converted =
            to_standard(&wem, &CodebookLibrary::empty(), &VorbisOptions::default()).unwrap();
        assert_eq!(converted.format, AudioFormat::Pcm);
        assert_eq!(converted.bytes, wav);
    }

    #[test]
    fn test_to_wem_rejects_mp3() {
        assert!(matches!(
            to_wem(b"ID3\x03\0\0"),
            Err(WemError::UnknownAudioFormat { .. })
        ));
    }
}
