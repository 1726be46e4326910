//! Common scalar data types used in LVGL bitmap fonts
//!
//! These mirror the field encodings of `lv_font_fmt_txt`: advances are stored
//! as 12.4 fixed point, kerning values as 4.4 fixed point, and glyph bitmaps
//! use a per-font bit depth.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

mod bpp;
mod fixed;
mod glyph_id;


pub use bpp::{Bpp, InvalidBpp};
pub use fixed::{F12Dot4, F4Dot4};
pub use glyph_id::GlyphId;

/// The largest valid Unicode scalar value.
pub const MAX_CODEPOINT: u32 = 0x10FFFF;
