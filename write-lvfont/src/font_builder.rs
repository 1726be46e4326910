//! Assembling tables into a font

use lvfont_types::F12Dot4;

use crate::{
    font::Font,
    tables::{
        cmap::Cmap,
        glyf::Glyf,
        head::{BitWidths, Head, SubpixelMode},
        kern::Kern,
    },
};

/// Vertical metrics of the source font at the target size, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LineMetrics {
    /// Above the baseline; positive.
    pub ascent: f32,
    /// Below the baseline; zero or negative.
    pub descent: f32,
    /// Top of the underline relative to the baseline; usually negative.
    pub underline_position: f32,
    pub underline_thickness: f32,
}

/// Build a [`Font`] from its tables, deriving the header.
#[derive(Debug, Clone, Default)]
pub struct FontBuilder {
    name: String,
    font_size: u16,
    subpixel: SubpixelMode,
    line_metrics: LineMetrics,
    glyf: Glyf,
    cmap: Cmap,
    kern: Option<(Kern, F12Dot4)>,
    fallback: Option<String>,
}

impl FontBuilder {
    pub fn new(name: impl Into<String>, font_size: u16) -> Self {
        Self {
            name: name.into(),
            font_size,
            ..Default::default()
        }
    }

    pub fn line_metrics(&mut self, metrics: LineMetrics) -> &mut Self {
        self.line_metrics = metrics;
        self
    }

    pub fn subpixel(&mut self, mode: SubpixelMode) -> &mut Self {
        self.subpixel = mode;
        self
    }

    pub fn glyf(&mut self, glyf: Glyf) -> &mut Self {
        self.glyf = glyf;
        self
    }

    pub fn cmap(&mut self, cmap: Cmap) -> &mut Self {
        self.cmap = cmap;
        self
    }

    /// Set the kerning table and the scale its values were stored with.
    pub fn kern(&mut self, kern: Kern, scale: F12Dot4) -> &mut Self {
        self.kern = Some((kern, scale));
        self
    }

    pub fn fallback(&mut self, name: impl Into<String>) -> &mut Self {
        self.fallback = Some(name.into());
        self
    }

    /// Compute the header and assemble the font.
    ///
    /// The result is not validated.
    pub fn build(self) -> Font {
        let head = self.compute_head();
        let (kern, _) = self.kern.unzip();
        Font {
            name: self.name,
            head,
            cmap: self.cmap,
            glyf: self.glyf,
            kern,
            fallback: self.fallback,
        }
    }

    fn compute_head(&self) -> Head {
        let glyphs = &self.glyf.glyphs;
        let inked = || glyphs.iter().filter(|glyph| !glyph.bbox.is_empty());
        let max_y = inked()
            .map(|glyph| glyph.bbox.y_offset + glyph.bbox.height as i32)
            .max()
            .unwrap_or(0);
        let min_y = inked().map(|glyph| glyph.bbox.y_offset).min().unwrap_or(0);

        let ascent = (self.line_metrics.ascent.round() as i32).max(max_y);
        let descent = (self.line_metrics.descent.round() as i32).min(min_y);

        let default_advance_width = match glyphs.first() {
            Some(first) if glyphs.iter().all(|glyph| glyph.advance == first.advance) => {
                first.advance
            }
            _ => F12Dot4::ZERO,
        };
        let fractional = glyphs.iter().any(|glyph| !glyph.advance.is_integer());

        let max_advance = glyphs
            .iter()
            .map(|glyph| {
                if fractional {
                    glyph.advance.to_bits()
                } else {
                    glyph.advance.round().to_i32()
                }
            })
            .max()
            .unwrap_or(0);
        let bit_widths = BitWidths {
            x: glyphs
                .iter()
                .map(|glyph| BitWidths::signed(glyph.bbox.x_offset))
                .max()
                .unwrap_or(1),
            y: glyphs
                .iter()
                .map(|glyph| BitWidths::signed(glyph.bbox.y_offset))
                .max()
                .unwrap_or(1),
            width: BitWidths::unsigned(glyphs.iter().map(|g| g.bbox.width).max().unwrap_or(0)),
            height: BitWidths::unsigned(glyphs.iter().map(|g| g.bbox.height).max().unwrap_or(0)),
            advance: BitWidths::unsigned(max_advance.max(0) as u32),
        };

        let head = Head {
            font_size: self.font_size,
            ascent,
            descent,
            min_y,
            max_y,
            default_advance_width,
            kerning_scale: self
                .kern
                .as_ref()
                .map(|(_, scale)| *scale)
                .unwrap_or(F12Dot4::ZERO),
            index_to_loc_format: (self.glyf.bitmap_len() > u16::MAX as usize) as u8,
            glyph_id_format: (self.glyf.max_id().to_u32() > u8::MAX as u32) as u8,
            advance_width_format: fractional as u8,
            bpp: self.glyf.bpp,
            bit_widths,
            compression: self.glyf.compression,
            subpixel: self.subpixel,
            underline_position: self.line_metrics.underline_position.round() as i32,
            underline_thickness: self.line_metrics.underline_thickness.round() as i32,
        };
        log::debug!(
            "head: ascent {} descent {} line height {} base line {}",
            head.ascent,
            head.descent,
            head.line_height(),
            head.base_line()
        );
        head
    }
}

#[cfg(test)]
mod tests {
    use lvfont_types::{Bpp, GlyphId};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::tables::{
        glyf::{GlyfBuilder, GlyphBitmap, GlyphBox},
        head::Compression,
        kern::KernBuilder,
    };

    fn glyph(codepoint: u32, advance: f32, bbox: GlyphBox) -> GlyphBitmap {
        GlyphBitmap {
            codepoint,
            source_codepoint: codepoint,
            advance: F12Dot4::from_f32(advance),
            bbox,
            samples: vec![0xFF; bbox.area()],
        }
    }

    fn bbox(width: u32, height: u32, x_offset: i32, y_offset: i32) -> GlyphBox {
        GlyphBox {
            width,
            height,
            x_offset,
            y_offset,
        }
    }

    #[test]
    fn head_metrics() {
        let mut glyf = GlyfBuilder::new(Bpp::Two, Compression::Rle);
        glyf.add_glyph(glyph(0x20, 4.0, bbox(0, 0, 0, 0)));
        glyf.add_glyph(glyph(0x67, 8.0, bbox(7, 12, 1, -3)));
        glyf.add_glyph(glyph(0xC5, 9.0, bbox(9, 15, -1, 0)));
        let mut builder = FontBuilder::new("metrics", 14);
        builder
            .line_metrics(LineMetrics {
                ascent: 13.2,
                descent: -3.4,
                underline_position: -1.6,
                underline_thickness: 0.9,
            })
            .subpixel(SubpixelMode::Horizontal)
            .glyf(glyf.build());
        let font = builder.build();
        let head = font.head;
        // the ring of U+00C5 reaches above the nominal ascent
        assert_eq!((head.ascent, head.descent), (15, -3));
        assert_eq!((head.min_y, head.max_y), (-3, 15));
        assert_eq!(head.line_height(), 18);
        assert_eq!(head.base_line(), 3);
        assert_eq!(head.default_advance_width, F12Dot4::ZERO);
        assert_eq!(head.advance_width_format, 0);
        assert_eq!(
            head.bit_widths,
            BitWidths {
                x: 2,
                y: 3,
                width: 4,
                height: 4,
                advance: 4,
            }
        );
        assert_eq!(head.bpp, Bpp::Two);
        assert_eq!(head.compression, Compression::Rle);
        assert_eq!(head.subpixel, SubpixelMode::Horizontal);
        assert_eq!((head.underline_position, head.underline_thickness), (-2, 1));
        assert_eq!(head.kerning_scale, F12Dot4::ZERO);
        assert_eq!(head.glyph_id_format, 0);
        assert_eq!(head.index_to_loc_format, 0);
    }

    #[test]
    fn monospace_and_fractional_advances() {
        let mut glyf = GlyfBuilder::new(Bpp::Four, Compression::None);
        glyf.add_glyph(glyph(0x30, 6.5, bbox(4, 7, 1, 0)));
        glyf.add_glyph(glyph(0x31, 6.5, bbox(3, 7, 1, 0)));
        let mut builder = FontBuilder::new("mono", 10);
        builder.glyf(glyf.build());
        let head = builder.build().head;
        assert_eq!(head.default_advance_width, F12Dot4::from_f32(6.5));
        assert_eq!(head.advance_width_format, 1);
        // 104 in 1/16 px
        assert_eq!(head.bit_widths.advance, 7);
    }

    #[test]
    fn kerning_scale_is_carried() {
        let mut glyf = GlyfBuilder::new(Bpp::Four, Compression::None);
        glyf.add_glyph(glyph(0x41, 8.0, bbox(8, 8, 0, 0)));
        glyf.add_glyph(glyph(0x56, 8.0, bbox(8, 8, 0, 0)));
        let mut kern = KernBuilder::new();
        kern.add(GlyphId::new(1), GlyphId::new(2), -12.0);
        let (kern, scale) = kern.build(2, false).unwrap();
        let mut builder = FontBuilder::new("kerned", 40);
        builder.glyf(glyf.build()).kern(kern, scale);
        let font = builder.build();
        assert_eq!(font.head.kerning_scale, scale);
        assert!(font.head.kerning_scale > F12Dot4::ONE);
        assert!(font.kern.is_some());
    }
}
