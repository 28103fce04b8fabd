//! Wwise Vorbis support.

pub mod codebook;
mod helpers;
pub mod packet;
pub mod rebuilder;
mod setup;

pub use codebook::CodebookLibrary;
pub use rebuilder::{ForcePacketFormat, LoopPoints, VorbisOptions, WwiseVorbis, rebuild_ogg};
