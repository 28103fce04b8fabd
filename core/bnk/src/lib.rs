mod bank;
pub mod error;
pub mod manifest;
pub mod media;
pub mod reader;
pub mod types;
pub mod writer;

pub use error::{BnkError, Result};
pub use manifest::BnkManifest;
pub use media::Wem;
pub use types::*;
