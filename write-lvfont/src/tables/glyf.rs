//! The glyph table: bitmaps and descriptors

use lvfont_types::{Bpp, F12Dot4, GlyphId};

use crate::{
    compress::{self, DecodeError},
    quantize,
    tables::head::Compression,
    validate::{Validate, ValidationCtx, Violation},
};

/// Width of the `bitmap_index` field of `lv_font_fmt_txt_glyph_dsc_t`.
pub const BITMAP_INDEX_BITS: u8 = 20;
/// Width of the `adv_w` field, in 1/16 px.
pub const ADVANCE_BITS: u8 = 12;
/// Width of `box_w`/`box_h`.
pub const BOX_SIZE_BITS: u8 = 8;
/// Width of `ofs_x`/`ofs_y`, signed.
pub const OFFSET_BITS: u8 = 8;

/// The bounding box of a glyph bitmap relative to the pen position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlyphBox {
    /// Width in samples.
    pub width: u32,
    pub height: u32,
    /// Left edge relative to the pen.
    pub x_offset: i32,
    /// Bottom edge relative to the baseline.
    pub y_offset: i32,
}

impl GlyphBox {
    /// The number of samples in the bitmap.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }
}

/// One encoded glyph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphRecord {
    pub id: GlyphId,
    /// The codepoint this glyph is mapped to.
    pub codepoint: u32,
    /// The codepoint it was rendered from; differs from `codepoint` when remapped.
    pub source_codepoint: u32,
    /// Packed or compressed samples.
    pub bitmap: Vec<u8>,
    /// Byte offset of `bitmap` in the font's bitmap buffer.
    pub bitmap_index: u32,
    pub advance: F12Dot4,
    pub bbox: GlyphBox,
}

/// The glyph table, ordered by ascending id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Glyf {
    pub bpp: Bpp,
    pub compression: Compression,
    pub glyphs: Vec<GlyphRecord>,
}

/// An 8-bit rendering of one glyph, ready to be encoded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlyphBitmap {
    pub codepoint: u32,
    pub source_codepoint: u32,
    pub advance: F12Dot4,
    pub bbox: GlyphBox,
    /// `bbox.width * bbox.height` coverage samples, row-major.
    pub samples: Vec<u8>,
}

impl Glyf {
    /// Look up a glyph by id.
    pub fn get(&self, id: GlyphId) -> Option<&GlyphRecord> {
        self.glyphs
            .binary_search_by_key(&id, |glyph| glyph.id)
            .ok()
            .map(|idx| &self.glyphs[idx])
    }

    /// The total length of the bitmap buffer.
    pub fn bitmap_len(&self) -> usize {
        self.glyphs.iter().map(|glyph| glyph.bitmap.len()).sum()
    }

    /// The largest glyph id, or `NOTDEF` for an empty table.
    pub fn max_id(&self) -> GlyphId {
        self.glyphs.last().map(|glyph| glyph.id).unwrap_or_default()
    }

    /// Decode a glyph back to its quantized samples.
    pub fn decode(&self, glyph: &GlyphRecord) -> Result<Vec<u8>, DecodeError> {
        compress::decode_bitmap(
            &glyph.bitmap,
            glyph.bbox.width as usize,
            glyph.bbox.area(),
            self.bpp,
            self.compression,
        )
    }
}

/// Encodes glyphs and lays out the bitmap buffer.
///
/// Glyphs must be added in the order they should receive ids; the first glyph
/// gets id 1.
#[derive(Clone, Debug)]
pub struct GlyfBuilder {
    bpp: Bpp,
    compression: Compression,
    glyphs: Vec<GlyphRecord>,
    next_index: u32,
}

impl GlyfBuilder {
    pub fn new(bpp: Bpp, compression: Compression) -> Self {
        Self {
            bpp,
            compression,
            glyphs: Vec::new(),
            next_index: 0,
        }
    }

    /// Quantize and encode a glyph, returning its id.
    pub fn add_glyph(&mut self, glyph: GlyphBitmap) -> GlyphId {
        let id = GlyphId::new(self.glyphs.len() as u32 + 1);
        debug_assert_eq!(glyph.samples.len(), glyph.bbox.area());
        let quantized = quantize::quantize(&glyph.samples, self.bpp);
        let bitmap = compress::encode_bitmap(
            &quantized,
            glyph.bbox.width as usize,
            self.bpp,
            self.compression,
        );
        log::debug!(
            "U+{:04X} -> {id}: {}x{} at {:+},{:+}, {} bytes",
            glyph.codepoint,
            glyph.bbox.width,
            glyph.bbox.height,
            glyph.bbox.x_offset,
            glyph.bbox.y_offset,
            bitmap.len()
        );
        let bitmap_index = self.next_index;
        self.next_index = self.next_index.saturating_add(bitmap.len() as u32);
        self.glyphs.push(GlyphRecord {
            id,
            codepoint: glyph.codepoint,
            source_codepoint: glyph.source_codepoint,
            bitmap,
            bitmap_index,
            advance: glyph.advance,
            bbox: glyph.bbox,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn build(self) -> Glyf {
        Glyf {
            bpp: self.bpp,
            compression: self.compression,
            glyphs: self.glyphs,
        }
    }
}

impl Validate for Glyf {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_table("glyf", |ctx| {
            ctx.in_field("glyphs", |ctx| {
                if let Some(first) = self.glyphs.first() {
                    if first.id.is_notdef() {
                        ctx.report(Violation::ReservedGlyphId(first.id));
                    }
                }
                let mut prev: Option<GlyphId> = None;
                let mut expected_index = 0u64;
                ctx.in_array(|ctx| {
                    for glyph in &self.glyphs {
                        ctx.array_item(|ctx| {
                            if let Some(prev) = prev.filter(|prev| *prev >= glyph.id) {
                                ctx.report(Violation::UnsortedGlyphIds {
                                    prev,
                                    next: glyph.id,
                                });
                            }
                            prev = Some(glyph.id);
                            ctx.in_field("bitmap_index", |ctx| {
                                if glyph.bitmap_index as u64 != expected_index {
                                    ctx.report(Violation::BitmapIndexMismatch {
                                        expected: expected_index as u32,
                                        actual: glyph.bitmap_index,
                                    });
                                }
                                ctx.check_unsigned(glyph.bitmap_index as i64, BITMAP_INDEX_BITS);
                            });
                            expected_index += glyph.bitmap.len() as u64;
                            glyph.validate_impl(ctx);
                        })
                    }
                })
            })
        })
    }
}

impl Validate for GlyphRecord {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_field("adv_w", |ctx| {
            ctx.check_unsigned(self.advance.to_bits() as i64, ADVANCE_BITS)
        });
        ctx.in_field("box_w", |ctx| {
            ctx.check_unsigned(self.bbox.width as i64, BOX_SIZE_BITS)
        });
        ctx.in_field("box_h", |ctx| {
            ctx.check_unsigned(self.bbox.height as i64, BOX_SIZE_BITS)
        });
        ctx.in_field("ofs_x", |ctx| {
            ctx.check_signed(self.bbox.x_offset as i64, OFFSET_BITS)
        });
        ctx.in_field("ofs_y", |ctx| {
            ctx.check_signed(self.bbox.y_offset as i64, OFFSET_BITS)
        });
    }
}
