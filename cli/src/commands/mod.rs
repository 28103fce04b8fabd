pub mod bnk;
pub mod wem;

use anyhow::{Context, Result};
use std::path::Path;
use ::wem::CodebookLibrary;

/// Load the codebook library, or an empty one when none was given.
pub(crate) fn load_codebooks(path: Option<&Path>) -> Result<CodebookLibrary> {
    match path {
        Some(path) => CodebookLibrary::from_file(path)
            .with_context(|| format!("Failed to load codebooks from {:?}", path)),
        None => Ok(CodebookLibrary::empty()),
    }
}
