//! Errors reported by the command line tool

use std::path::PathBuf;

use thiserror::Error;
use write_lvfont::{ConfigError, ConvertError};

use crate::range::RangeError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{}: invalid project file: {source}", .path.display())]
    Project {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{}: cannot load font: {reason}", .path.display())]
    FontLoad { path: PathBuf, reason: String },
    #[error("vertical sub-pixel rendering is not supported by the rasterizer")]
    VerticalSubpixel,
    #[error("{0}")]
    Usage(&'static str),
    #[error("{name}: {source}")]
    Convert { name: String, source: ConvertError },
}

impl CliError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> CliError {
        let path = path.into();
        move |source| CliError::Io { path, source }
    }
}
