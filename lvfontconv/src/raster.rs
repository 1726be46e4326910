//! A [`Rasterizer`] over one or more font files, backed by fontdue

use std::path::Path;

use fontdue::{Font, FontSettings, Metrics};
use write_lvfont::{tables::head::SubpixelMode, LineMetrics, RasterGlyph, Rasterizer};

use crate::{error::CliError, job::JobFont};

/// The fonts of one job, indexed like [`Job::fonts`](crate::Job::fonts).
///
/// Line metrics come from the first font.
pub struct FontStack {
    fonts: Vec<Font>,
    size: f32,
    subpixel: SubpixelMode,
}

impl FontStack {
    /// Load every font of a job.
    pub fn load(fonts: &[JobFont], size: u16, subpixel: SubpixelMode) -> Result<Self, CliError> {
        if subpixel == SubpixelMode::Vertical {
            return Err(CliError::VerticalSubpixel);
        }
        let fonts = fonts
            .iter()
            .map(|font| {
                let data = std::fs::read(&font.path).map_err(CliError::io(&font.path))?;
                load_font(&font.path, data, size)
            })
            .collect::<Result<Vec<_>, CliError>>()?;
        Ok(Self {
            fonts,
            size: size as f32,
            subpixel,
        })
    }

    /// The font at `index` and the character, if that font has a glyph for it.
    fn glyph(&self, index: usize, codepoint: u32) -> Option<(&Font, char)> {
        let font = self.fonts.get(index)?;
        let c = char::from_u32(codepoint)?;
        (font.lookup_glyph_index(c) != 0).then_some((font, c))
    }
}

fn load_font(path: &Path, data: Vec<u8>, size: u16) -> Result<Font, CliError> {
    let settings = FontSettings {
        scale: size as f32,
        ..FontSettings::default()
    };
    Font::from_bytes(data, settings).map_err(|reason| CliError::FontLoad {
        path: path.to_owned(),
        reason: reason.to_owned(),
    })
}

impl Rasterizer for FontStack {
    fn line_metrics(&self) -> LineMetrics {
        let Some(metrics) = self
            .fonts
            .first()
            .and_then(|font| font.horizontal_line_metrics(self.size))
        else {
            return LineMetrics::default();
        };
        // fontdue does not expose the post table, so the underline is
        // approximated from the size and the descender.
        LineMetrics {
            ascent: metrics.ascent,
            descent: metrics.descent,
            underline_position: (metrics.descent / 2.0).round(),
            underline_thickness: (self.size / 14.0).round().max(1.0),
        }
    }

    fn rasterize(&self, font: usize, codepoint: u32) -> Option<RasterGlyph> {
        let (font, c) = self.glyph(font, codepoint)?;
        let glyph = match self.subpixel {
            SubpixelMode::Horizontal => {
                let (metrics, pixels) = font.rasterize_subpixel(c, self.size);
                raster_glyph(metrics, metrics.width as u32 * 3, pixels)
            }
            _ => {
                let (metrics, pixels) = font.rasterize(c, self.size);
                raster_glyph(metrics, metrics.width as u32, pixels)
            }
        };
        Some(glyph)
    }

    fn kerning(&self, font: usize, left: u32, right: u32) -> Option<f32> {
        let (font, left) = self.glyph(font, left)?;
        let right = char::from_u32(right)?;
        font.horizontal_kern(left, right, self.size)
    }
}

fn raster_glyph(metrics: Metrics, width: u32, pixels: Vec<u8>) -> RasterGlyph {
    RasterGlyph {
        width,
        height: metrics.height as u32,
        x_offset: metrics.xmin,
        y_offset: metrics.ymin,
        advance: metrics.advance_width,
        pixels,
    }
}
