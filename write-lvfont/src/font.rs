//! The assembled font

use std::collections::BTreeSet;

use lvfont_types::GlyphId;

use crate::{
    config::is_c_identifier,
    tables::{
        cmap::Cmap,
        glyf::Glyf,
        head::{BitWidths, Head},
        kern::Kern,
    },
    validate::{Validate, ValidationCtx, Violation},
};

/// A complete bitmap font, ready to be written out.
///
/// Fonts are normally produced by a [`FontBuilder`](crate::FontBuilder), which
/// derives the header from the other tables. Run [`Validate::validate`]
/// before emitting; [`CSourceWriter`](crate::CSourceWriter) does this itself.
#[derive(Clone, Debug, PartialEq)]
pub struct Font {
    /// The C identifier of the public `lv_font_t`.
    pub name: String,
    pub head: Head,
    pub cmap: Cmap,
    pub glyf: Glyf,
    pub kern: Option<Kern>,
    /// Name of an `lv_font_t` consulted for glyphs this font lacks.
    pub fallback: Option<String>,
}

impl Font {
    pub fn glyph_count(&self) -> usize {
        self.glyf.glyphs.len()
    }
}

impl Validate for Font {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_table("Font", |ctx| {
            ctx.in_field("name", |ctx| {
                if self.name.is_empty() {
                    ctx.report(Violation::EmptyName);
                } else if !is_c_identifier(&self.name) {
                    ctx.report(Violation::InvalidName(self.name.clone()));
                }
            });
            ctx.in_field("fallback", |ctx| {
                if let Some(fallback) = self.fallback.as_ref().filter(|f| !is_c_identifier(f)) {
                    ctx.report(Violation::InvalidName(fallback.clone()));
                }
            });
            if self.glyf.glyphs.is_empty() {
                ctx.report(Violation::NoGlyphs);
            }
            ctx.in_field("head", |ctx| self.validate_head(ctx));
            ctx.in_field("glyf", |ctx| {
                self.glyf.validate_impl(ctx);
                self.validate_bit_widths(ctx);
            });
            ctx.in_field("cmap", |ctx| {
                self.cmap.validate_impl(ctx);
                let known: BTreeSet<_> = self.glyf.glyphs.iter().map(|g| g.id).collect();
                let mut dangling: Vec<_> = self
                    .cmap
                    .mappings()
                    .map(|(_, gid)| gid)
                    .filter(|gid| !known.contains(gid))
                    .collect();
                dangling.sort();
                dangling.dedup();
                for gid in dangling {
                    ctx.report(Violation::DanglingGlyphId(gid));
                }
            });
            if let Some(kern) = &self.kern {
                ctx.in_field("kern", |ctx| self.validate_kern(ctx, kern));
            }
        })
    }
}

impl Font {
    fn validate_head(&self, ctx: &mut ValidationCtx) {
        let head = &self.head;
        if head.bpp != self.glyf.bpp {
            ctx.report(Violation::BppMismatch {
                head: head.bpp,
                glyf: self.glyf.bpp,
            });
        }
        if head.compression != self.glyf.compression {
            ctx.report(Violation::CompressionMismatch {
                head: head.compression,
                glyf: self.glyf.compression,
            });
        }
        ctx.in_field("glyph_id_format", |ctx| {
            let bits = if head.glyph_id_format == 0 { 8 } else { 16 };
            ctx.check_unsigned(self.glyf.max_id().to_u32() as i64, bits);
        });
        ctx.in_field("kerning_scale", |ctx| {
            ctx.check_unsigned(head.kerning_scale.to_bits() as i64, 16)
        });
    }

    /// Glyph geometry must fit the widths the header declares.
    fn validate_bit_widths(&self, ctx: &mut ValidationCtx) {
        let BitWidths {
            x,
            y,
            width,
            height,
            advance,
        } = self.head.bit_widths;
        let fractional = self.head.advance_width_format != 0;
        ctx.in_array(|ctx| {
            for glyph in &self.glyf.glyphs {
                ctx.array_item(|ctx| {
                    let adv = if fractional {
                        glyph.advance.to_bits()
                    } else {
                        glyph.advance.round().to_i32()
                    };
                    ctx.in_field("advance", |ctx| ctx.check_unsigned(adv as i64, advance));
                    ctx.in_field("width", |ctx| {
                        ctx.check_unsigned(glyph.bbox.width as i64, width)
                    });
                    ctx.in_field("height", |ctx| {
                        ctx.check_unsigned(glyph.bbox.height as i64, height)
                    });
                    ctx.in_field("x_offset", |ctx| {
                        ctx.check_signed(glyph.bbox.x_offset as i64, x)
                    });
                    ctx.in_field("y_offset", |ctx| {
                        ctx.check_signed(glyph.bbox.y_offset as i64, y)
                    });
                })
            }
        });
    }

    fn validate_kern(&self, ctx: &mut ValidationCtx, kern: &Kern) {
        kern.validate_impl(ctx);
        let max_id = self.glyf.max_id();
        let referenced = kern.referenced_glyphs();
        for gid in referenced
            .into_iter()
            .filter(|gid| gid.is_notdef() || self.glyf.get(*gid).is_none())
        {
            ctx.report(Violation::DanglingGlyphId(gid));
        }
        if let Kern::Classes(classes) = kern {
            let expected = max_id.to_u32() as usize + 1;
            for mapping in [&classes.left_class_mapping, &classes.right_class_mapping] {
                if mapping.len() != expected {
                    ctx.report(Violation::LengthMismatch {
                        expected,
                        actual: mapping.len(),
                    });
                }
            }
        }
    }
}

impl Font {
    /// Look up the glyph id for a codepoint, as the consumer does.
    pub fn glyph_id(&self, codepoint: u32) -> Option<GlyphId> {
        self.cmap.map_codepoint(codepoint)
    }
}

#[cfg(test)]
mod tests {
    use lvfont_types::{Bpp, F12Dot4};

    use super::*;
    use crate::tables::{
        cmap::{CmapSubtable, CmapSubtableKind},
        glyf::{GlyfBuilder, GlyphBitmap, GlyphBox},
        head::Compression,
    };
    use crate::FontBuilder;

    fn glyph(codepoint: u32) -> GlyphBitmap {
        GlyphBitmap {
            codepoint,
            source_codepoint: codepoint,
            advance: F12Dot4::from_i32(5),
            bbox: GlyphBox {
                width: 4,
                height: 6,
                x_offset: 0,
                y_offset: 0,
            },
            samples: vec![0x80; 24],
        }
    }

    fn single_glyph_font(cmap: Cmap) -> Font {
        let mut glyf = GlyfBuilder::new(Bpp::Four, Compression::None);
        glyf.add_glyph(glyph(0x41));
        let mut builder = FontBuilder::new("font", 8);
        builder.glyf(glyf.build()).cmap(cmap);
        builder.build()
    }

    fn tiny(range_start: u32, glyph_id_start: u32) -> Cmap {
        Cmap {
            subtables: vec![CmapSubtable {
                range_start,
                range_length: 1,
                glyph_id_start: GlyphId::new(glyph_id_start),
                kind: CmapSubtableKind::Format0Tiny,
            }],
        }
    }

    #[test]
    fn bpp_mismatch() {
        let mut font = single_glyph_font(tiny(0x41, 1));
        font.head.bpp = Bpp::Four;
        font.glyf.bpp = Bpp::Two;
        let report = font.validate().unwrap_err();
        assert!(report.contains(|v| *v
            == Violation::BppMismatch {
                head: Bpp::Four,
                glyf: Bpp::Two
            }));
    }

    #[test]
    fn compression_mismatch() {
        let mut font = single_glyph_font(tiny(0x41, 1));
        font.head.compression = Compression::Rle;
        let report = font.validate().unwrap_err();
        assert!(report.contains(|v| matches!(v, Violation::CompressionMismatch { .. })));
    }

    #[test]
    fn unreferenced_glyph_is_fine() {
        assert!(single_glyph_font(Cmap::default()).validate().is_ok());
        assert!(single_glyph_font(tiny(0x41, 1)).validate().is_ok());
    }

    #[test]
    fn dangling_cmap_reference() {
        let report = single_glyph_font(tiny(0x42, 2)).validate().unwrap_err();
        assert!(report.contains(|v| *v == Violation::DanglingGlyphId(GlyphId::new(2))));
        assert_eq!(report.errors()[0].path(), "Font.cmap");
    }

    #[test]
    fn names() {
        let mut font = single_glyph_font(Cmap::default());
        font.name = String::new();
        assert!(font.validate().unwrap_err().contains(|v| *v == Violation::EmptyName));
        font.name = "2x".into();
        assert!(font
            .validate()
            .unwrap_err()
            .contains(|v| *v == Violation::InvalidName("2x".into())));
    }

    #[test]
    fn empty_font() {
        let font = FontBuilder::new("empty", 8).build();
        assert!(font.validate().unwrap_err().contains(|v| *v == Violation::NoGlyphs));
    }

    #[test]
    fn head_bit_widths_are_enforced() {
        let mut font = single_glyph_font(Cmap::default());
        font.head.bit_widths.width = 2;
        let report = font.validate().unwrap_err();
        assert_eq!(report.errors()[0].path(), "Font.glyf[0].width");
        assert!(report.contains(|v| *v == Violation::FieldOverflow { value: 4, bits: 2 }));
    }
}
