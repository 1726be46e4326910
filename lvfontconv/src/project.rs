//! JSON project files
//!
//! A project describes one conversion job:
//!
//! ```json
//! {
//!   "version": "1",
//!   "name": "ui_font_16",
//!   "output": "out/ui_font_16.c",
//!   "fonts": [
//!     { "path": "fonts/Inter.ttf", "ranges": ["ascii", "0xB0"] },
//!     { "path": "fonts/icons.ttf", "ranges": ["0xE000-0xE010=>0xF000"], "symbols": "" }
//!   ],
//!   "options": { "size": 16, "bpp": 4, "compression": "rle", "lvgl_version": 9 }
//! }
//! ```
//!
//! Relative paths are resolved against the directory holding the project file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use write_lvfont::ConvertOptions;

use crate::{
    error::CliError,
    job::{Job, JobFont},
    range::{expand, parse_ranges, parse_symbols},
};

/// The project format version written by this tool.
pub const PROJECT_VERSION: &str = "1";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Project {
    #[serde(default = "default_version")]
    pub version: String,
    /// The C identifier of the generated font.
    pub name: String,
    pub output: PathBuf,
    pub fonts: Vec<FontSource>,
    #[serde(default)]
    pub options: ConvertOptions,
}

/// One source font and the codepoints taken from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FontSource {
    pub path: PathBuf,
    #[serde(default)]
    pub ranges: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub symbols: String,
}

fn default_version() -> String {
    PROJECT_VERSION.to_owned()
}

impl Project {
    pub fn load(path: &Path) -> Result<Project, CliError> {
        let text = std::fs::read_to_string(path).map_err(CliError::io(path))?;
        let mut project: Project = serde_json::from_str(&text).map_err(|source| CliError::Project {
            path: path.to_owned(),
            source,
        })?;
        if project.version != PROJECT_VERSION {
            log::warn!(
                "{}: project version {} (expected {PROJECT_VERSION})",
                path.display(),
                project.version
            );
        }
        if let Some(base) = path.parent() {
            project.resolve_paths(base);
        }
        Ok(project)
    }

    fn resolve_paths(&mut self, base: &Path) {
        self.output = base.join(&self.output);
        for font in &mut self.fonts {
            font.path = base.join(&font.path);
        }
    }

    /// Parse the codepoint selections.
    pub fn into_job(self) -> Result<Job, CliError> {
        if self.fonts.is_empty() {
            return Err(CliError::Usage("a project needs at least one font"));
        }
        let fonts = self
            .fonts
            .into_iter()
            .map(|font| {
                let mut ranges = Vec::new();
                for range in &font.ranges {
                    ranges.extend(parse_ranges(range)?);
                }
                ranges.extend(parse_symbols(&font.symbols));
                Ok(JobFont {
                    path: font.path,
                    mappings: expand(&ranges),
                })
            })
            .collect::<Result<_, CliError>>()?;
        Ok(Job {
            name: self.name,
            output: self.output,
            options: self.options,
            fonts,
        })
    }
}
