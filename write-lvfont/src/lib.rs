//! Encoding glyph bitmaps into LVGL bitmap fonts.
//!
//! The typical flow is to implement [`Rasterizer`] for a glyph source, run a
//! [`Converter`] over the codepoints you need, and render the resulting
//! [`Font`] with a [`CSourceWriter`]:
//!
//! ```no_run
//! # fn load_rasterizer() -> Box<dyn write_lvfont::Rasterizer> { unimplemented!() }
//! use write_lvfont::{CSourceWriter, CodepointMapping, ConvertOptions, Converter};
//!
//! let rasterizer = load_rasterizer();
//! let options = ConvertOptions::default();
//! let mappings: Vec<_> = (0x20..0x7F).map(CodepointMapping::identity).collect();
//! let font = Converter::new("my_font_16", options.clone())
//!     .convert(&*rasterizer, &mappings)
//!     .unwrap();
//! let source = CSourceWriter::new(&options).write(&font).unwrap();
//! std::fs::write("my_font_16.c", source).unwrap();
//! ```
//!
//! The lower level pieces ([`tables`], [`compress`], [`bitpack`]) are public
//! as well, for callers that want to assemble a font by hand with a
//! [`FontBuilder`].

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod bitpack;
pub mod compress;
mod config;
mod convert;
mod emit;
mod error;
mod font;
mod font_builder;
pub mod quantize;
pub mod tables;
pub mod validate;

pub use config::{is_c_identifier, ConfigError, ConvertOptions};
pub use convert::{
    CancelFlag, CodepointMapping, Converter, Progress, RasterGlyph, Rasterizer, Stage,
};
pub use emit::{CSourceWriter, LvglVersion};
pub use error::ConvertError;
pub use font::Font;
pub use font_builder::{FontBuilder, LineMetrics};
pub use validate::{Validate, ValidationReport};

/// Public re-export of the lvfont-types crate.
pub extern crate lvfont_types as types;
