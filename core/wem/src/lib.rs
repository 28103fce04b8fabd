//! wem library for converting Wwise audio streams.
//!
//! Wwise Vorbis is rebuilt into Ogg Vorbis, Wwise IMA ADPCM and PCM are
//! rewrapped as standard WAVE files, and the reverse direction is available
//! for PCM and IMA ADPCM.

pub mod adpcm;
pub mod bit_reader;
pub mod bit_writer;
pub mod convert;
pub mod error;
pub mod format;
pub mod ogg_stream;
pub mod pcm;
pub mod riff;
pub mod vorbis;

pub use bit_reader::{BitRead, BitReader};
pub use bit_writer::BitWriter;
pub use convert::{Converted, to_standard, to_standard_as, to_wem};
pub use error::*;
pub use format::{AudioFormat, detect};
pub use riff::{RiffChunk, RiffExtensibleFormat};
pub use vorbis::{
    CodebookLibrary, ForcePacketFormat, LoopPoints, VorbisOptions, WwiseVorbis, rebuild_ogg,
};
