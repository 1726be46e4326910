//! The tables that make up an LVGL bitmap font.

pub mod cmap;
pub mod glyf;
pub mod head;
pub mod kern;
