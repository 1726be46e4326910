//! Conversion options

use lvfont_types::{Bpp, InvalidBpp};

use crate::{
    emit::LvglVersion,
    tables::head::{Compression, SubpixelMode},
};

/// An option value that cannot be used.
///
/// All of these are detected before any glyph is rasterized.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported bits per pixel {0} (expected 1, 2, 3, 4 or 8)")]
    UnsupportedBpp(u8),
    #[error("unsupported compression '{0}' (expected none, rle or rle-no-prefilter)")]
    UnsupportedCompression(String),
    #[error("unsupported LVGL version {0} (expected 7, 8 or 9)")]
    UnsupportedVersion(u8),
    #[error("font size must be at least 1 px")]
    ZeroSize,
    #[error("{compression} compression needs 1 to 4 bits per pixel, not {bpp}")]
    RleBpp { compression: &'static str, bpp: Bpp },
    #[error("fallback '{0}' is not a valid C identifier")]
    InvalidFallback(String),
}

impl From<InvalidBpp> for ConfigError {
    fn from(value: InvalidBpp) -> Self {
        ConfigError::UnsupportedBpp(value.0)
    }
}

/// Everything that controls one conversion job.
///
/// This is passed explicitly to the [`Converter`](crate::Converter) and the
/// [`CSourceWriter`](crate::CSourceWriter).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct ConvertOptions {
    /// Font size in pixels.
    pub size: u16,
    pub bpp: Bpp,
    pub compression: Compression,
    /// Include kerning from the source font.
    pub kerning: bool,
    /// Always use the class-matrix kerning form, which is faster to look up.
    pub force_fast_kern: bool,
    pub subpixel: SubpixelMode,
    /// The LVGL major version the output targets.
    pub lvgl_version: LvglVersion,
    /// Overrides the default LVGL include path.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub lv_include: Option<String>,
    /// Name of an `lv_font_t` to use for missing glyphs.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub fallback: Option<String>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            size: 16,
            bpp: Bpp::Four,
            compression: Compression::None,
            kerning: true,
            force_fast_kern: false,
            subpixel: SubpixelMode::None,
            lvgl_version: LvglVersion::V9,
            lv_include: None,
            fallback: None,
        }
    }
}

impl ConvertOptions {
    /// Check the options for combinations the output cannot represent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::ZeroSize);
        }
        if self.compression.is_rle() && self.bpp == Bpp::Eight {
            return Err(ConfigError::RleBpp {
                compression: self.compression.name(),
                bpp: self.bpp,
            });
        }
        if let Some(fallback) = &self.fallback {
            if !is_c_identifier(fallback) {
                return Err(ConfigError::InvalidFallback(fallback.clone()));
            }
        }
        Ok(())
    }

    /// A command line equivalent of these options, for the output header.
    pub fn to_args(&self) -> String {
        let mut args = format!("--bpp {} --size {}", self.bpp, self.size);
        match self.compression {
            Compression::None => args.push_str(" --no-compress"),
            Compression::Rle => (),
            Compression::RleNoPrefilter => args.push_str(" --no-prefilter"),
        }
        match self.subpixel {
            SubpixelMode::None => (),
            SubpixelMode::Horizontal => args.push_str(" --lcd"),
            SubpixelMode::Vertical => args.push_str(" --lcd-v"),
        }
        if !self.kerning {
            args.push_str(" --no-kerning");
        } else if self.force_fast_kern {
            args.push_str(" --force-fast-kern");
        }
        args.push_str(&format!(" --lvgl-version {}", self.lvgl_version.major()));
        if let Some(include) = &self.lv_include {
            args.push_str(&format!(" --lv-include {include}"));
        }
        if let Some(fallback) = &self.fallback {
            args.push_str(&format!(" --fallback {fallback}"));
        }
        args
    }
}

/// Returns `true` if `name` can be used as a C identifier.
pub fn is_c_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(ConvertOptions::default().validate(), Ok(()));
    }

    #[test]
    fn rle_needs_low_bpp() {
        let options = ConvertOptions {
            bpp: Bpp::Eight,
            compression: Compression::Rle,
            ..Default::default()
        };
        assert_eq!(
            options.validate(),
            Err(ConfigError::RleBpp {
                compression: "rle",
                bpp: Bpp::Eight
            })
        );
        let options = ConvertOptions {
            bpp: Bpp::Eight,
            ..Default::default()
        };
        assert_eq!(options.validate(), Ok(()));
    }

    #[test]
    fn zero_size() {
        let options = ConvertOptions {
            size: 0,
            ..Default::default()
        };
        assert_eq!(options.validate(), Err(ConfigError::ZeroSize));
    }

    #[test]
    fn bad_fallback() {
        let options = ConvertOptions {
            fallback: Some("lv_font 14".into()),
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::InvalidFallback(_))
        ));
    }

    #[test]
    fn raw_values() {
        assert_eq!(
            Bpp::try_from(6).map_err(ConfigError::from),
            Err(ConfigError::UnsupportedBpp(6))
        );
        assert_eq!(
            LvglVersion::try_from(6),
            Err(ConfigError::UnsupportedVersion(6))
        );
    }

    #[test]
    fn args_line() {
        let options = ConvertOptions {
            compression: Compression::Rle,
            bpp: Bpp::Two,
            size: 24,
            lvgl_version: LvglVersion::V8,
            lv_include: Some("lvgl.h".into()),
            ..Default::default()
        };
        assert_eq!(
            options.to_args(),
            "--bpp 2 --size 24 --lvgl-version 8 --lv-include lvgl.h"
        );
        assert_eq!(
            ConvertOptions::default().to_args(),
            "--bpp 4 --size 16 --no-compress --lvgl-version 9"
        );
    }

    #[test]
    fn identifiers() {
        assert!(is_c_identifier("lv_font_montserrat_14"));
        assert!(is_c_identifier("_x1"));
        assert!(!is_c_identifier("1font"));
        assert!(!is_c_identifier(""));
        assert!(!is_c_identifier("font-name"));
    }
}
