//! The conversion pipeline: rasterized glyphs in, a validated font out

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use lvfont_types::{F12Dot4, GlyphId, MAX_CODEPOINT};

use crate::{
    config::ConvertOptions,
    error::ConvertError,
    font::Font,
    font_builder::{FontBuilder, LineMetrics},
    tables::{
        cmap::Cmap,
        glyf::{GlyfBuilder, GlyphBitmap, GlyphBox},
        kern::KernBuilder,
    },
    validate::Validate,
};

/// A source of glyph renderings.
///
/// Implementations render at a fixed size chosen when they are created. A
/// rasterizer may hold several fonts; `font` is the [`CodepointMapping::font`]
/// index of the mapping being rendered, and single font implementations can
/// ignore it.
pub trait Rasterizer {
    /// Vertical metrics at the target size.
    fn line_metrics(&self) -> LineMetrics;

    /// Render one codepoint, or `None` if the font has no glyph for it.
    ///
    /// With sub-pixel rendering the returned width (or height) counts
    /// samples, three per pixel.
    fn rasterize(&self, font: usize, codepoint: u32) -> Option<RasterGlyph>;

    /// The horizontal kerning between two codepoints of one font, in pixels.
    fn kerning(&self, font: usize, left: u32, right: u32) -> Option<f32>;
}

impl<T: Rasterizer + ?Sized> Rasterizer for &T {
    fn line_metrics(&self) -> LineMetrics {
        (**self).line_metrics()
    }

    fn rasterize(&self, font: usize, codepoint: u32) -> Option<RasterGlyph> {
        (**self).rasterize(font, codepoint)
    }

    fn kerning(&self, font: usize, left: u32, right: u32) -> Option<f32> {
        (**self).kerning(font, left, right)
    }
}

/// One rendered glyph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RasterGlyph {
    pub width: u32,
    pub height: u32,
    /// Left edge relative to the pen position.
    pub x_offset: i32,
    /// Bottom edge relative to the baseline.
    pub y_offset: i32,
    /// Advance in pixels.
    pub advance: f32,
    /// `width * height` coverage samples, row-major, top row first.
    pub pixels: Vec<u8>,
}

/// Render `source` from font `font` and store it under `codepoint`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CodepointMapping {
    pub source: u32,
    pub codepoint: u32,
    /// Which of the rasterizer's fonts renders `source`.
    pub font: usize,
}

impl CodepointMapping {
    pub fn new(source: u32, codepoint: u32) -> Self {
        Self {
            source,
            codepoint,
            font: 0,
        }
    }

    /// Store a codepoint under itself.
    pub fn identity(codepoint: u32) -> Self {
        Self::new(codepoint, codepoint)
    }

    pub fn with_font(self, font: usize) -> Self {
        Self { font, ..self }
    }
}

/// The phases of a conversion, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Rasterize,
    Kerning,
    Assemble,
    Validate,
}

/// Reported to the progress callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub stage: Stage,
    pub current: usize,
    pub total: usize,
}

/// Requests cancellation of a running conversion.
///
/// Clones share the flag; set it from any thread. The conversion stops at
/// the next glyph boundary with [`ConvertError::Cancelled`].
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

type ProgressFn<'a> = Box<dyn FnMut(Progress) + Send + 'a>;

/// Runs one conversion job.
pub struct Converter<'a> {
    name: String,
    options: ConvertOptions,
    cancel: CancelFlag,
    progress: Option<ProgressFn<'a>>,
}

struct Placed {
    id: GlyphId,
    mapping: CodepointMapping,
}

impl<'a> Converter<'a> {
    /// `name` becomes the C identifier of the font.
    pub fn new(name: impl Into<String>, options: ConvertOptions) -> Self {
        Self {
            name: name.into(),
            options,
            cancel: CancelFlag::default(),
            progress: None,
        }
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    pub fn on_progress(mut self, f: impl FnMut(Progress) + Send + 'a) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Render, encode and assemble the requested codepoints.
    ///
    /// When several mappings target one codepoint they are tried in order
    /// and the first one that renders is used. Codepoints no mapping can
    /// render are skipped. The returned font has passed validation.
    pub fn convert<R: Rasterizer + ?Sized>(
        &mut self,
        rasterizer: &R,
        mappings: &[CodepointMapping],
    ) -> Result<Font, ConvertError> {
        self.options.validate()?;
        let mappings = normalize(mappings);

        let total = mappings.len();
        log::info!("{}: rasterizing {total} codepoints", self.name);
        self.report(Stage::Rasterize, 0, total);
        let mut glyf = GlyfBuilder::new(self.options.bpp, self.options.compression);
        let mut placed = Vec::with_capacity(total);
        for (i, (codepoint, candidates)) in mappings.iter().enumerate() {
            self.check_cancelled()?;
            if let Some((mapping, raster)) = render_first(rasterizer, *codepoint, candidates) {
                let id = glyf.add_glyph(GlyphBitmap {
                    codepoint: mapping.codepoint,
                    source_codepoint: mapping.source,
                    advance: F12Dot4::from_f32(raster.advance),
                    bbox: GlyphBox {
                        width: raster.width,
                        height: raster.height,
                        x_offset: raster.x_offset,
                        y_offset: raster.y_offset,
                    },
                    samples: raster.pixels,
                });
                placed.push(Placed { id, mapping });
            }
            self.report(Stage::Rasterize, i + 1, total);
        }
        if glyf.is_empty() {
            return Err(ConvertError::NoGlyphs);
        }

        let mut kern = KernBuilder::new();
        if self.options.kerning {
            log::info!("{}: collecting kerning for {} glyphs", self.name, placed.len());
            self.report(Stage::Kerning, 0, placed.len());
            for (i, left) in placed.iter().enumerate() {
                self.check_cancelled()?;
                let font = left.mapping.font;
                for right in placed.iter().filter(|right| right.mapping.font == font) {
                    let (l, r) = (left.mapping.source, right.mapping.source);
                    if let Some(delta) = rasterizer.kerning(font, l, r) {
                        kern.add(left.id, right.id, delta);
                    }
                }
                self.report(Stage::Kerning, i + 1, placed.len());
            }
            log::debug!("{} kerning pairs", kern.len());
        }

        self.report(Stage::Assemble, 0, 1);
        let glyph_count = glyf.len();
        let cmap = Cmap::from_mappings(placed.iter().map(|p| (p.mapping.codepoint, p.id)))?;
        let mut builder = FontBuilder::new(self.name.clone(), self.options.size);
        builder
            .line_metrics(rasterizer.line_metrics())
            .subpixel(self.options.subpixel)
            .glyf(glyf.build())
            .cmap(cmap);
        if let Some((kern, scale)) = kern.build(glyph_count, self.options.force_fast_kern) {
            builder.kern(kern, scale);
        }
        if let Some(fallback) = &self.options.fallback {
            builder.fallback(fallback.clone());
        }
        let font = builder.build();
        self.report(Stage::Assemble, 1, 1);

        self.report(Stage::Validate, 0, 1);
        font.validate()?;
        self.report(Stage::Validate, 1, 1);
        log::info!(
            "{}: {} glyphs, {} cmap subtables, {} bitmap bytes",
            self.name,
            font.glyph_count(),
            font.cmap.subtables.len(),
            font.glyf.bitmap_len()
        );
        Ok(font)
    }

    fn check_cancelled(&self) -> Result<(), ConvertError> {
        if self.cancel.is_cancelled() {
            log::info!("{}: cancelled", self.name);
            return Err(ConvertError::Cancelled);
        }
        Ok(())
    }

    fn report(&mut self, stage: Stage, current: usize, total: usize) {
        if let Some(progress) = self.progress.as_mut() {
            progress(Progress {
                stage,
                current,
                total,
            });
        }
    }
}

/// Drop invalid mappings and group the rest by target codepoint.
///
/// Mappings for one target keep their relative order.
fn normalize(mappings: &[CodepointMapping]) -> BTreeMap<u32, Vec<CodepointMapping>> {
    let mut result: BTreeMap<_, Vec<_>> = BTreeMap::new();
    for mapping in mappings {
        if mapping.codepoint > MAX_CODEPOINT || mapping.source > MAX_CODEPOINT {
            log::warn!("U+{:04X}: not a Unicode codepoint, skipping", mapping.codepoint);
            continue;
        }
        result.entry(mapping.codepoint).or_default().push(*mapping);
    }
    result
}

/// Render the first candidate the rasterizer has a usable glyph for.
fn render_first<R: Rasterizer + ?Sized>(
    rasterizer: &R,
    codepoint: u32,
    candidates: &[CodepointMapping],
) -> Option<(CodepointMapping, RasterGlyph)> {
    for mapping in candidates {
        match rasterizer.rasterize(mapping.font, mapping.source) {
            Some(raster)
                if raster.pixels.len() == raster.width as usize * raster.height as usize =>
            {
                return Some((*mapping, raster));
            }
            Some(raster) => log::warn!(
                "U+{:04X}: rasterizer returned {} samples for a {}x{} bitmap, skipping",
                mapping.source,
                raster.pixels.len(),
                raster.width,
                raster.height
            ),
            None => log::debug!(
                "U+{:04X}: no glyph in font {}",
                mapping.source,
                mapping.font
            ),
        }
    }
    log::warn!("U+{codepoint:04X}: glyph not found, skipping");
    None
}
