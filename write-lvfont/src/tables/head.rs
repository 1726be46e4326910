//! The font header: global metrics and encoding parameters

use lvfont_types::{Bpp, F12Dot4};

use crate::config::ConfigError;

/// How glyph bitmaps are stored.
///
/// The discriminants are the `bitmap_format` values of `lv_font_fmt_txt_dsc_t`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[repr(u8)]
pub enum Compression {
    /// Plain bit-packed samples.
    #[default]
    None = 0,
    /// XOR pre-filter followed by run-length encoding.
    Rle = 1,
    /// Run-length encoding without the pre-filter.
    RleNoPrefilter = 2,
}

impl Compression {
    /// Returns `true` for both run-length modes.
    pub fn is_rle(self) -> bool {
        !matches!(self, Compression::None)
    }

    /// The name used on the command line and in project files.
    pub fn name(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Rle => "rle",
            Compression::RleNoPrefilter => "rle-no-prefilter",
        }
    }
}

impl TryFrom<u8> for Compression {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Rle),
            2 => Ok(Compression::RleNoPrefilter),
            other => Err(ConfigError::UnsupportedCompression(other.to_string())),
        }
    }
}

impl std::str::FromStr for Compression {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Compression::None,
            Compression::Rle,
            Compression::RleNoPrefilter,
        ]
        .into_iter()
        .find(|c| c.name() == s)
        .ok_or_else(|| ConfigError::UnsupportedCompression(s.to_owned()))
    }
}

/// Sub-pixel rendering, where each sample drives one color channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum SubpixelMode {
    #[default]
    None,
    /// Three samples per pixel along x.
    Horizontal,
    /// Three samples per pixel along y.
    Vertical,
}

impl SubpixelMode {
    /// The `lv_font_subpx_t` enumerator.
    pub fn c_name(self) -> &'static str {
        match self {
            SubpixelMode::None => "LV_FONT_SUBPX_NONE",
            SubpixelMode::Horizontal => "LV_FONT_SUBPX_HOR",
            SubpixelMode::Vertical => "LV_FONT_SUBPX_VER",
        }
    }
}

/// The number of bits needed for each glyph descriptor field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BitWidths {
    /// signed
    pub x: u8,
    /// signed
    pub y: u8,
    pub width: u8,
    pub height: u8,
    pub advance: u8,
}

impl BitWidths {
    /// The bits needed to store `value` as an unsigned integer.
    pub fn unsigned(value: u32) -> u8 {
        (u32::BITS - value.leading_zeros()) as u8
    }

    /// The bits needed to store `value` as a two's complement integer.
    pub fn signed(value: i32) -> u8 {
        let magnitude = (if value < 0 { !value } else { value }) as u32;
        Self::unsigned(magnitude) + 1
    }
}

/// Global font metrics and encoding parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Head {
    /// Nominal size in pixels.
    pub font_size: u16,
    /// Distance from the baseline to the top of the line; positive.
    pub ascent: i32,
    /// Distance from the baseline to the bottom of the line; zero or negative.
    pub descent: i32,
    /// Lowest glyph extent below the baseline.
    pub min_y: i32,
    /// Highest glyph extent above the baseline.
    pub max_y: i32,
    /// The advance shared by every glyph, or zero if advances differ.
    pub default_advance_width: F12Dot4,
    /// Multiplier applied to kerning values; zero when there is no kerning.
    pub kerning_scale: F12Dot4,
    /// 0 if the bitmap buffer is below 64 KiB, else 1.
    pub index_to_loc_format: u8,
    /// 0 if every glyph id fits a byte, else 1.
    pub glyph_id_format: u8,
    /// 0 for integer advances, 1 if any advance has a fractional part.
    pub advance_width_format: u8,
    pub bpp: Bpp,
    pub bit_widths: BitWidths,
    pub compression: Compression,
    pub subpixel: SubpixelMode,
    pub underline_position: i32,
    pub underline_thickness: i32,
}

impl Head {
    /// The height of one line of text.
    pub fn line_height(&self) -> i32 {
        self.ascent - self.descent
    }

    /// The baseline, measured from the bottom of the line.
    pub fn base_line(&self) -> i32 {
        -self.descent
    }
}
