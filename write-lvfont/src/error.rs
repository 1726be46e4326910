//! Errors that abort a conversion

use crate::{config::ConfigError, tables::cmap::CmapConflict, validate::ValidationReport};

/// A conversion job failed; nothing should be written.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("invalid options: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Validation(#[from] ValidationReport),
    #[error(transparent)]
    CmapConflict(#[from] CmapConflict),
    #[error("no glyphs found for the requested codepoints")]
    NoGlyphs,
    #[error("conversion cancelled")]
    Cancelled,
}
