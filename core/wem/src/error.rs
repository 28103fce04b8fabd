//! Error types for Wwise stream conversion.

use thiserror::Error;

/// Result type alias for wem operations.
pub type WemResult<T> = Result<T, WemError>;

/// Structural violations found while walking a RIFF/WAVE container.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RiffError {
    #[error("RIFF chunk not found")]
    MissingRiff,

    /// The RIFF size field plus the 8-byte header must cover the buffer exactly.
    #[error("RIFF size mismatch: header declares {declared} bytes, buffer holds {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    #[error("WAVE chunk not found")]
    MissingWave,

    #[error("fmt chunk not found")]
    MissingFmt,

    #[error("invalid fmt chunk size {size}")]
    FmtSize { size: u32 },

    #[error("fmt extra size {extra} does not match fmt chunk size {size}")]
    ExtraSize { extra: u16, size: u32 },

    #[error("truncated chunk header at offset {offset}")]
    TruncatedHeader { offset: usize },

    #[error("{id} chunk at offset {offset} declares {size} bytes, file is {file_size} bytes")]
    ChunkOverrun {
        id: String,
        offset: usize,
        size: u32,
        file_size: usize,
    },

    #[error("data chunk not found")]
    MissingData,

    #[error("data chunk at offset {offset} declares {size} bytes, file is {file_size} bytes")]
    DataOverrun {
        offset: usize,
        size: u32,
        file_size: usize,
    },

    #[error("data chunk is empty")]
    EmptyData,

    #[error("{channels} channels of {bits}-bit samples overflow the block align")]
    BlockAlignOverflow { channels: u16, bits: u16 },
}

/// Errors that can occur during Wwise audio conversion.
#[derive(Debug, Error)]
pub enum WemError {
    /// The input is not a well-formed RIFF/WAVE container.
    #[error("Format error: {0}")]
    Format(#[from] RiffError),

    /// Only 1 through 8 channels have a defined speaker mask.
    #[error("Unsupported channel count {channels}")]
    UnsupportedChannelCount {
        /// Channel count found in the fmt chunk.
        channels: u16,
    },

    /// A payload does not divide into whole blocks.
    #[error("Data size {len} is not a multiple of the {block}-byte block")]
    DataSizeMismatch {
        /// Length of the offending buffer.
        len: usize,
        /// Required block size.
        block: usize,
    },

    /// The codebook library blob has an inconsistent offset table.
    #[error("Corrupt codebook library: {message}")]
    CorruptLibrary {
        /// Description of the inconsistency.
        message: String,
    },

    /// A codebook ID referenced in the audio file is not found in the codebook library.
    #[error("Invalid codebook id {id}, try --inline-codebooks")]
    InvalidCodebookId {
        /// The invalid codebook ID that was not found.
        id: u32,
    },

    /// Codebook bits did not follow the expected layout.
    /// This typically indicates the wrong codebook library is being used.
    #[error("Codebook rebuild error: {message}")]
    CodebookRebuild {
        /// Description of the codebook error.
        message: String,
    },

    /// A Wwise Vorbis layout this converter does not handle.
    #[error("Unsupported Vorbis variant: {message}")]
    UnsupportedVorbisVariant {
        /// Which layout was found.
        message: String,
    },

    /// The input matches none of the known audio formats.
    #[error("Unknown audio format: {message}")]
    UnknownAudioFormat {
        /// What was found instead.
        message: String,
    },

    /// Unexpected end of stream.
    #[error("Unexpected end of stream: {message}")]
    EndOfStream {
        /// Description of where the end of stream occurred.
        message: String,
    },

    /// The input file contains invalid or malformed data.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parse error.
        message: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WemError {
    /// Create a new parse error with the given message.
    pub fn parse(message: impl Into<String>) -> Self {
        WemError::Parse {
            message: message.into(),
        }
    }

    /// Create a new codebook rebuild error with the given message.
    pub fn codebook(message: impl Into<String>) -> Self {
        WemError::CodebookRebuild {
            message: message.into(),
        }
    }

    /// Create a new corrupt library error.
    pub fn corrupt_library(message: impl Into<String>) -> Self {
        WemError::CorruptLibrary {
            message: message.into(),
        }
    }

    /// Create a new unsupported Vorbis variant error.
    pub fn unsupported_vorbis(message: impl Into<String>) -> Self {
        WemError::UnsupportedVorbisVariant {
            message: message.into(),
        }
    }

    /// Create a new unknown audio format error.
    pub fn unknown_format(message: impl Into<String>) -> Self {
        WemError::UnknownAudioFormat {
            message: message.into(),
        }
    }

    /// Create a new invalid codebook ID error.
    pub fn invalid_codebook_id(id: u32) -> Self {
        WemError::InvalidCodebookId { id }
    }

    /// Create a new end of stream error.
    pub fn end_of_stream(message: impl Into<String>) -> Self {
        WemError::EndOfStream {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error() {
        let err = WemError::parse("test message");
        assert!(matches!(err, WemError::Parse { .. }));
        assert!(err.to_string().contains("test message"));
    }

    #[test]
    fn test_codebook_error() {
        let err = WemError::codebook("codebook issue");
        assert!(matches!(err, WemError::CodebookRebuild { .. }));
        assert!(err.to_string().contains("codebook issue"));
    }

    #[test]
    fn test_riff_error_wraps_into_format() {
        let err: WemError = RiffError::MissingWave.into();
        assert!(matches!(err, WemError::Format(RiffError::MissingWave)));
        assert!(err.to_string().contains("WAVE chunk not found"));
    }

    #[test]
    fn test_data_size_mismatch_error() {
        let err = WemError::DataSizeMismatch { len: 100, block: 36 };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("36"));
    }

    #[test]
    fn test_invalid_codebook_id_error() {
        let err = WemError::invalid_codebook_id(42);
        assert!(matches!(err, WemError::InvalidCodebookId { .. }));
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_end_of_stream_error() {
        let err = WemError::end_of_stream("reading header");
        assert!(matches!(err, WemError::EndOfStream { .. }));
        assert!(err.to_string().contains("reading header"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let wem_err: WemError = io_err.into();
        assert!(matches!(wem_err, WemError::Io(_)));
    }

    #[test]
    fn test_error_display() {
        let errors: Vec<WemError> = vec![
            WemError::parse("parse"),
            WemError::codebook("codebook"),
            WemError::corrupt_library("library"),
            WemError::unsupported_vorbis("triad"),
            WemError::unknown_format("tag 0x1234"),
            WemError::UnsupportedChannelCount { channels: 9 },
            WemError::invalid_codebook_id(1),
            WemError::end_of_stream("eos"),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }
}
