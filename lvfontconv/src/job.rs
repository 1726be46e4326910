//! Running one conversion job end to end

use std::{io::Write, path::{Path, PathBuf}};

use write_lvfont::{CSourceWriter, CodepointMapping, ConvertError, ConvertOptions, Converter, Progress};

use crate::{error::CliError, raster::FontStack};

/// Everything needed to produce one output file.
///
/// Jobs own their inputs; running several at once shares nothing.
#[derive(Clone, Debug, PartialEq)]
pub struct Job {
    pub name: String,
    pub output: PathBuf,
    pub options: ConvertOptions,
    /// When several fonts select one codepoint, the first that has a glyph
    /// for it renders it.
    pub fonts: Vec<JobFont>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JobFont {
    pub path: PathBuf,
    /// The codepoints selected from this font.
    pub mappings: Vec<CodepointMapping>,
}

/// What a finished job produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobSummary {
    pub output: PathBuf,
    pub glyphs: usize,
    pub bitmap_bytes: usize,
}

impl Job {
    /// All selections in font order, each tagged with the index of its font.
    pub fn mappings(&self) -> Vec<CodepointMapping> {
        self.fonts
            .iter()
            .enumerate()
            .flat_map(|(i, font)| font.mappings.iter().map(move |m| m.with_font(i)))
            .collect()
    }

    /// Rasterize, convert and write the output file.
    ///
    /// Nothing is written unless the whole job succeeds.
    pub fn run(&self, progress: impl FnMut(Progress) + Send) -> Result<JobSummary, CliError> {
        self.options.validate()?;
        let fonts = FontStack::load(&self.fonts, self.options.size, self.options.subpixel)?;
        let convert_err = |source: ConvertError| CliError::Convert {
            name: self.name.clone(),
            source,
        };
        let font = Converter::new(self.name.clone(), self.options.clone())
            .on_progress(progress)
            .convert(&fonts, &self.mappings())
            .map_err(convert_err)?;
        let source = CSourceWriter::new(&self.options)
            .write(&font)
            .map_err(|report| convert_err(report.into()))?;
        write_atomic(&self.output, source.as_bytes())?;
        log::info!("{}: wrote {}", self.name, self.output.display());
        Ok(JobSummary {
            output: self.output.clone(),
            glyphs: font.glyph_count(),
            bitmap_bytes: font.glyf.bitmap_len(),
        })
    }
}

/// Write through a temporary file in the target directory, then rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CliError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(CliError::io(dir))?;
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(CliError::io(dir))?;
    file.write_all(contents).map_err(CliError::io(file.path()))?;
    file.persist(path)
        .map_err(|err| CliError::io(path)(err.error))?;
    Ok(())
}
