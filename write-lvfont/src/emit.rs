//! Rendering a font as LVGL C source
//!
//! The output compiles against LVGL 7, 8 and 9: version differences are
//! handled by preprocessor guards in the generated code, so the target
//! version only selects the default include path and the fields that exist
//! only in newer releases.

use std::fmt::{self, Display, Formatter};

use crate::{
    config::{ConfigError, ConvertOptions},
    font::Font,
    tables::{
        cmap::{CmapSubtable, CmapSubtableKind},
        kern::{Kern, KernClasses, KernPairs},
    },
    validate::{Validate, ValidationReport},
};

/// Values per line in emitted arrays.
const ITEMS_PER_LINE: usize = 12;

/// The LVGL major version the output is written for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub enum LvglVersion {
    V7,
    V8,
    #[default]
    V9,
}

impl LvglVersion {
    pub fn major(self) -> u8 {
        match self {
            LvglVersion::V7 => 7,
            LvglVersion::V8 => 8,
            LvglVersion::V9 => 9,
        }
    }

    /// The include path used when none is configured.
    pub fn default_include(self) -> &'static str {
        match self {
            LvglVersion::V7 | LvglVersion::V8 => "lvgl/lvgl.h",
            LvglVersion::V9 => "lvgl.h",
        }
    }
}

impl TryFrom<u8> for LvglVersion {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            7 => Ok(LvglVersion::V7),
            8 => Ok(LvglVersion::V8),
            9 => Ok(LvglVersion::V9),
            other => Err(ConfigError::UnsupportedVersion(other)),
        }
    }
}

impl From<LvglVersion> for u8 {
    fn from(value: LvglVersion) -> Self {
        value.major()
    }
}

impl Display for LvglVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.major().fmt(f)
    }
}

/// Writes a validated [`Font`] as a C source file.
///
/// Output is a pure function of the font and the writer settings.
#[derive(Clone, Debug)]
pub struct CSourceWriter {
    version: LvglVersion,
    lv_include: Option<String>,
    opts: String,
}

impl Default for CSourceWriter {
    fn default() -> Self {
        Self::new(&ConvertOptions::default())
    }
}

impl CSourceWriter {
    pub fn new(options: &ConvertOptions) -> Self {
        Self {
            version: options.lvgl_version,
            lv_include: options.lv_include.clone(),
            opts: options.to_args(),
        }
    }

    /// Validate the font and render it.
    pub fn write(&self, font: &Font) -> Result<String, ValidationReport> {
        font.validate()?;
        Ok(CSource { writer: self, font }.to_string())
    }

    fn include(&self) -> &str {
        self.lv_include
            .as_deref()
            .unwrap_or(self.version.default_include())
    }
}

struct CSource<'a> {
    writer: &'a CSourceWriter,
    font: &'a Font,
}

impl Display for CSource<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let guard = self.font.name.to_uppercase();
        self.write_header(f)?;
        writeln!(f)?;
        writeln!(f, "#ifndef {guard}")?;
        writeln!(f, "#define {guard} 1")?;
        writeln!(f, "#endif")?;
        writeln!(f)?;
        writeln!(f, "#if {guard}")?;
        writeln!(f)?;
        self.write_bitmaps(f)?;
        self.write_glyph_dsc(f)?;
        self.write_cmaps(f)?;
        match &self.font.kern {
            Some(Kern::Pairs(pairs)) => self.write_kern_pairs(f, pairs)?,
            Some(Kern::Classes(classes)) => write_kern_classes(f, classes)?,
            None => (),
        }
        self.write_font_dsc(f)?;
        self.write_public_font(f)?;
        writeln!(f)?;
        writeln!(f, "#endif /*#if {guard}*/")
    }
}

impl CSource<'_> {
    fn write_header(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let head = &self.font.head;
        writeln!(f, "/*******************************************************************************")?;
        writeln!(f, " * Size: {} px", head.font_size)?;
        writeln!(f, " * Bpp: {}", head.bpp)?;
        writeln!(f, " * Opts: {}", self.writer.opts)?;
        writeln!(f, " ******************************************************************************/")?;
        writeln!(f)?;
        writeln!(f, "#ifdef __has_include")?;
        writeln!(f, "    #if __has_include(\"lvgl.h\")")?;
        writeln!(f, "        #ifndef LV_LVGL_H_INCLUDE_SIMPLE")?;
        writeln!(f, "            #define LV_LVGL_H_INCLUDE_SIMPLE")?;
        writeln!(f, "        #endif")?;
        writeln!(f, "    #endif")?;
        writeln!(f, "#endif")?;
        writeln!(f)?;
        writeln!(f, "#ifdef LV_LVGL_H_INCLUDE_SIMPLE")?;
        writeln!(f, "    #include \"lvgl.h\"")?;
        writeln!(f, "#else")?;
        writeln!(f, "    #include \"{}\"", self.writer.include())?;
        writeln!(f, "#endif")
    }

    fn write_bitmaps(&self, f: &mut Formatter<'_>) -> fmt::Result {
        section(f, "BITMAPS", false)?;
        writeln!(f, "/*Store the image of the glyphs*/")?;
        writeln!(f, "static LV_ATTRIBUTE_LARGE_CONST const uint8_t glyph_bitmap[] = {{")?;
        if self.font.glyf.bitmap_len() == 0 {
            writeln!(f, "    0x00 /* all glyphs are empty */")?;
        }
        for (i, glyph) in self.font.glyf.glyphs.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "    /* U+{:04X} \"{}\"", glyph.codepoint, label(glyph.codepoint))?;
            if glyph.source_codepoint != glyph.codepoint {
                write!(f, " from U+{:04X}", glyph.source_codepoint)?;
            }
            writeln!(f, " */")?;
            write_rows(f, glyph.bitmap.iter().map(|byte| format!("0x{byte:02x}")))?;
        }
        writeln!(f, "}};")?;
        writeln!(f)?;
        writeln!(f)
    }

    fn write_glyph_dsc(&self, f: &mut Formatter<'_>) -> fmt::Result {
        section(f, "GLYPH DESCRIPTION", true)?;
        writeln!(f, "static const lv_font_fmt_txt_glyph_dsc_t glyph_dsc[] = {{")?;
        writeln!(
            f,
            "    {{.bitmap_index = 0, .adv_w = 0, .box_w = 0, .box_h = 0, .ofs_x = 0, .ofs_y = 0}} /* id = 0 reserved */,"
        )?;
        for glyph in &self.font.glyf.glyphs {
            writeln!(
                f,
                "    {{.bitmap_index = {}, .adv_w = {}, .box_w = {}, .box_h = {}, .ofs_x = {}, .ofs_y = {}}},",
                glyph.bitmap_index,
                glyph.advance.to_bits(),
                glyph.bbox.width,
                glyph.bbox.height,
                glyph.bbox.x_offset,
                glyph.bbox.y_offset
            )?;
        }
        writeln!(f, "}};")?;
        writeln!(f)
    }

    fn write_cmaps(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let subtables = &self.font.cmap.subtables;
        if subtables.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        section(f, "CHARACTER MAPPING", true)?;
        for (i, subtable) in subtables.iter().enumerate() {
            write_cmap_lists(f, i, subtable)?;
        }
        writeln!(f, "/*Collect the unicode lists and glyph_id offsets*/")?;
        writeln!(f, "static const lv_font_fmt_txt_cmap_t cmaps[] =")?;
        writeln!(f, "{{")?;
        for (i, subtable) in subtables.iter().enumerate() {
            let unicode_list = match subtable.unicode_list() {
                Some(_) => format!("unicode_list_{i}"),
                None => "NULL".into(),
            };
            let ofs_list = match subtable.kind {
                CmapSubtableKind::Format0Full { .. } | CmapSubtableKind::SparseFull { .. } => {
                    format!("glyph_id_ofs_list_{i}")
                }
                _ => "NULL".into(),
            };
            writeln!(f, "    {{")?;
            writeln!(
                f,
                "        .range_start = {}, .range_length = {}, .glyph_id_start = {},",
                subtable.range_start,
                subtable.range_length,
                subtable.glyph_id_start.to_u32()
            )?;
            writeln!(
                f,
                "        .unicode_list = {unicode_list}, .glyph_id_ofs_list = {ofs_list}, .list_length = {}, .type = {}",
                subtable.list_length(),
                subtable.kind.c_name()
            )?;
            let sep = if i + 1 < subtables.len() { "," } else { "" };
            writeln!(f, "    }}{sep}")?;
        }
        writeln!(f, "}};")?;
        writeln!(f)
    }

    fn write_kern_pairs(&self, f: &mut Formatter<'_>, pairs: &KernPairs) -> fmt::Result {
        let gid_type = if pairs.glyph_ids_size == 0 {
            "uint8_t"
        } else {
            "uint16_t"
        };
        writeln!(f)?;
        section(f, "KERNING", false)?;
        writeln!(f, "/*Pair left and right glyphs for kerning*/")?;
        writeln!(f, "static const {gid_type} kern_pair_glyph_ids[] =")?;
        writeln!(f, "{{")?;
        for pair in &pairs.pairs {
            writeln!(f, "    {}, {},", pair.left.to_u32(), pair.right.to_u32())?;
        }
        writeln!(f, "}};")?;
        writeln!(f)?;
        writeln!(f, "/* Kerning between the respective left and right glyphs")?;
        writeln!(f, " * 4.4 format which needs to scaled with `kern_scale`*/")?;
        writeln!(f, "static const int8_t kern_pair_values[] =")?;
        writeln!(f, "{{")?;
        write_rows(f, pairs.pairs.iter().map(|pair| pair.value.to_bits()))?;
        writeln!(f, "}};")?;
        writeln!(f)?;
        writeln!(f, "/*Collect the kern pair's data in one place*/")?;
        writeln!(f, "static const lv_font_fmt_txt_kern_pair_t kern_pairs =")?;
        writeln!(f, "{{")?;
        writeln!(f, "    .glyph_ids = kern_pair_glyph_ids,")?;
        writeln!(f, "    .values = kern_pair_values,")?;
        writeln!(f, "    .pair_cnt = {},", pairs.pairs.len())?;
        writeln!(f, "    .glyph_ids_size = {}", pairs.glyph_ids_size)?;
        writeln!(f, "}};")?;
        writeln!(f)
    }

    fn write_font_dsc(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let font = self.font;
        let head = &font.head;
        let (kern_dsc, kern_classes) = match font.kern {
            Some(Kern::Pairs(_)) => ("&kern_pairs", 0),
            Some(Kern::Classes(_)) => ("&kern_classes", 1),
            None => ("NULL", 0),
        };
        let cmaps = if font.cmap.subtables.is_empty() {
            "NULL"
        } else {
            "cmaps"
        };
        writeln!(f)?;
        if let Some(fallback) = &font.fallback {
            writeln!(f, "extern const lv_font_t {fallback};")?;
            writeln!(f)?;
        }
        section(f, "ALL CUSTOM DATA", true)?;
        writeln!(f, "#if LVGL_VERSION_MAJOR == 8")?;
        writeln!(f, "/*Store all the custom data of the font*/")?;
        writeln!(f, "static  lv_font_fmt_txt_glyph_cache_t cache;")?;
        writeln!(f, "#endif")?;
        writeln!(f)?;
        writeln!(f, "#if LVGL_VERSION_MAJOR >= 8")?;
        writeln!(f, "static const lv_font_fmt_txt_dsc_t font_dsc = {{")?;
        writeln!(f, "#else")?;
        writeln!(f, "static lv_font_fmt_txt_dsc_t font_dsc = {{")?;
        writeln!(f, "#endif")?;
        writeln!(f, "    .glyph_bitmap = glyph_bitmap,")?;
        writeln!(f, "    .glyph_dsc = glyph_dsc,")?;
        writeln!(f, "    .cmaps = {cmaps},")?;
        writeln!(f, "    .kern_dsc = {kern_dsc},")?;
        writeln!(f, "    .kern_scale = {},", head.kerning_scale.to_bits())?;
        writeln!(f, "    .cmap_num = {},", font.cmap.subtables.len())?;
        writeln!(f, "    .bpp = {},", head.bpp)?;
        writeln!(f, "    .kern_classes = {kern_classes},")?;
        writeln!(f, "    .bitmap_format = {},", head.compression as u8)?;
        writeln!(f, "#if LVGL_VERSION_MAJOR == 8")?;
        writeln!(f, "    .cache = &cache")?;
        writeln!(f, "#endif")?;
        writeln!(f, "}};")?;
        writeln!(f)
    }

    fn write_public_font(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let font = self.font;
        let head = &font.head;
        let fallback = font
            .fallback
            .as_ref()
            .map(|name| format!("&{name}"))
            .unwrap_or_else(|| "NULL".into());
        writeln!(f)?;
        writeln!(f)?;
        section(f, "PUBLIC FONT", false)?;
        writeln!(f, "/*Initialize a public general font descriptor*/")?;
        writeln!(f, "#if LVGL_VERSION_MAJOR >= 8")?;
        writeln!(f, "const lv_font_t {} = {{", font.name)?;
        writeln!(f, "#else")?;
        writeln!(f, "lv_font_t {} = {{", font.name)?;
        writeln!(f, "#endif")?;
        writeln!(f, "    .get_glyph_dsc = lv_font_get_glyph_dsc_fmt_txt,    /*Function pointer to get glyph's data*/")?;
        writeln!(f, "    .get_glyph_bitmap = lv_font_get_bitmap_fmt_txt,    /*Function pointer to get glyph's bitmap*/")?;
        writeln!(f, "    .line_height = {},          /*The maximum line height required by the font*/", head.line_height())?;
        writeln!(f, "    .base_line = {},             /*Baseline measured from the bottom of the line*/", head.base_line())?;
        writeln!(f, "#if !(LVGL_VERSION_MAJOR == 6 && LVGL_VERSION_MINOR == 0)")?;
        writeln!(f, "    .subpx = {},", head.subpixel.c_name())?;
        writeln!(f, "#endif")?;
        writeln!(f, "#if LV_VERSION_CHECK(7, 4, 0) || LVGL_VERSION_MAJOR >= 8")?;
        writeln!(f, "    .underline_position = {},", head.underline_position)?;
        writeln!(f, "    .underline_thickness = {},", head.underline_thickness)?;
        writeln!(f, "#endif")?;
        writeln!(f, "    .dsc = &font_dsc,          /*The custom font data. Will be accessed by `get_glyph_bitmap/dsc` */")?;
        writeln!(f, "#if LV_VERSION_CHECK(8, 2, 0) || LVGL_VERSION_MAJOR >= 9")?;
        writeln!(f, "    .fallback = {fallback},")?;
        writeln!(f, "#endif")?;
        writeln!(f, "    .user_data = NULL,")?;
        if self.writer.version == LvglVersion::V9 {
            writeln!(f, "#if LVGL_VERSION_MAJOR >= 9")?;
            writeln!(f, "    .static_bitmap = 0,")?;
            writeln!(f, "#endif")?;
        }
        writeln!(f, "}};")?;
        writeln!(f)
    }
}

fn write_cmap_lists(f: &mut Formatter<'_>, idx: usize, subtable: &CmapSubtable) -> fmt::Result {
    if let Some(unicode_list) = subtable.unicode_list() {
        writeln!(f, "static const uint16_t unicode_list_{idx}[] = {{")?;
        write_rows(f, unicode_list.iter().map(|ofs| format!("0x{ofs:x}")))?;
        writeln!(f, "}};")?;
        writeln!(f)?;
    }
    match &subtable.kind {
        CmapSubtableKind::Format0Full { glyph_id_ofs } => {
            writeln!(f, "static const uint8_t glyph_id_ofs_list_{idx}[] = {{")?;
            write_rows(f, glyph_id_ofs)?;
        }
        CmapSubtableKind::SparseFull { glyph_id_ofs, .. } => {
            writeln!(f, "static const uint16_t glyph_id_ofs_list_{idx}[] = {{")?;
            write_rows(f, glyph_id_ofs)?;
        }
        _ => return Ok(()),
    }
    writeln!(f, "}};")?;
    writeln!(f)
}

fn write_kern_classes(f: &mut Formatter<'_>, classes: &KernClasses) -> fmt::Result {
    writeln!(f)?;
    section(f, "KERNING", false)?;
    writeln!(f, "/*Map glyph_ids to kern left classes*/")?;
    writeln!(f, "static const uint8_t kern_left_class_mapping[] =")?;
    writeln!(f, "{{")?;
    write_rows(f, &classes.left_class_mapping)?;
    writeln!(f, "}};")?;
    writeln!(f)?;
    writeln!(f, "/*Map glyph_ids to kern right classes*/")?;
    writeln!(f, "static const uint8_t kern_right_class_mapping[] =")?;
    writeln!(f, "{{")?;
    write_rows(f, &classes.right_class_mapping)?;
    writeln!(f, "}};")?;
    writeln!(f)?;
    writeln!(f, "/*Kern values between classes*/")?;
    writeln!(f, "static const int8_t kern_class_values[] =")?;
    writeln!(f, "{{")?;
    write_rows(f, classes.class_pair_values.iter().map(|value| value.to_bits()))?;
    writeln!(f, "}};")?;
    writeln!(f)?;
    writeln!(f)?;
    writeln!(f, "/*Collect the kern class' data in one place*/")?;
    writeln!(f, "static const lv_font_fmt_txt_kern_classes_t kern_classes =")?;
    writeln!(f, "{{")?;
    writeln!(f, "    .class_pair_values   = kern_class_values,")?;
    writeln!(f, "    .left_class_mapping  = kern_left_class_mapping,")?;
    writeln!(f, "    .right_class_mapping = kern_right_class_mapping,")?;
    writeln!(f, "    .left_class_cnt      = {},", classes.left_class_count)?;
    writeln!(f, "    .right_class_cnt     = {},", classes.right_class_count)?;
    writeln!(f, "}};")?;
    writeln!(f)
}

/// A section banner comment.
fn section(f: &mut Formatter<'_>, title: &str, wide: bool) -> fmt::Result {
    let rule = if wide { "---------------------" } else { "-----------------" };
    writeln!(f, "/*{rule}")?;
    writeln!(f, " *  {title}")?;
    writeln!(f, " *{}*/", &rule[1..])?;
    writeln!(f)
}

/// Write items indented, a fixed number per line, each line comma terminated.
fn write_rows<I>(f: &mut Formatter<'_>, items: I) -> fmt::Result
where
    I: IntoIterator,
    I::Item: Display,
{
    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
        write!(f, "    ")?;
        for (i, item) in items.by_ref().take(ITEMS_PER_LINE).enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{item},")?;
        }
        writeln!(f)?;
    }
    Ok(())
}

/// The character shown in a glyph comment.
fn label(codepoint: u32) -> String {
    match char::from_u32(codepoint) {
        Some(c) if c == ' ' || !(c.is_control() || c.is_whitespace()) => c.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use lvfont_types::{Bpp, F12Dot4, F4Dot4, GlyphId};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{
        tables::{
            cmap::Cmap,
            glyf::{GlyfBuilder, GlyphBitmap, GlyphBox},
            head::Compression,
            kern::KernBuilder,
        },
        FontBuilder, LineMetrics,
    };

    fn bitmap(codepoint: u32, width: u32, height: u32) -> GlyphBitmap {
        GlyphBitmap {
            codepoint,
            source_codepoint: codepoint,
            advance: F12Dot4::from_i32(width as i32 + 1),
            bbox: GlyphBox {
                width,
                height,
                x_offset: 0,
                y_offset: 0,
            },
            samples: vec![0xFF; (width * height) as usize],
        }
    }

    fn font(glyphs: Vec<GlyphBitmap>) -> Font {
        let mut glyf = GlyfBuilder::new(Bpp::Four, Compression::None);
        let mappings: Vec<_> = glyphs
            .into_iter()
            .map(|glyph| (glyph.codepoint, glyf.add_glyph(glyph)))
            .collect();
        let mut builder = FontBuilder::new("test_font", 8);
        builder
            .line_metrics(LineMetrics {
                ascent: 6.0,
                descent: -2.0,
                underline_position: -1.0,
                underline_thickness: 1.0,
            })
            .glyf(glyf.build())
            .cmap(Cmap::from_mappings(mappings).unwrap());
        builder.build()
    }

    #[test]
    fn rows_are_comma_terminated() {
        struct Rows(Vec<u8>);
        impl Display for Rows {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write_rows(f, self.0.iter().map(|b| format!("0x{b:02x}")))
            }
        }
        let text = Rows((0..14).collect()).to_string();
        assert_eq!(
            text,
            "    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b,\n    0x0c, 0x0d,\n"
        );
        assert_eq!(Rows(vec![]).to_string(), "");
    }

    #[test]
    fn bitmap_and_descriptors() {
        let font = font(vec![bitmap(0x20, 0, 0), bitmap(0x41, 2, 1)]);
        let text = CSourceWriter::default().write(&font).unwrap();
        assert!(text.contains("    /* U+0020 \" \" */\n"), "{text}");
        assert!(text.contains("    /* U+0041 \"A\" */\n    0xff,\n"), "{text}");
        assert!(text.contains(
            "    {.bitmap_index = 0, .adv_w = 0, .box_w = 0, .box_h = 0, .ofs_x = 0, .ofs_y = 0} /* id = 0 reserved */,\n"
        ));
        assert!(text.contains(
            "    {.bitmap_index = 0, .adv_w = 16, .box_w = 0, .box_h = 0, .ofs_x = 0, .ofs_y = 0},\n"
        ));
        assert!(text.contains(
            "    {.bitmap_index = 0, .adv_w = 48, .box_w = 2, .box_h = 1, .ofs_x = 0, .ofs_y = 0},\n"
        ));
        assert!(text.contains(".type = LV_FONT_FMT_TXT_CMAP_SPARSE_TINY"));
        assert!(text.contains(".line_height = 8,"));
        assert!(text.contains(".base_line = 2,"));
        assert!(text.contains("    .kern_dsc = NULL,\n    .kern_scale = 0,\n"), "{text}");
        assert!(text.starts_with("/****"));
        assert!(text.ends_with("#endif /*#if TEST_FONT*/\n"));
    }

    #[test]
    fn remapped_glyph_comment() {
        let mut glyph = bitmap(0xF001, 1, 1);
        glyph.source_codepoint = 0x41;
        let text = CSourceWriter::default().write(&font(vec![glyph])).unwrap();
        assert!(text.contains("/* U+F001 \"\u{F001}\" from U+0041 */"), "{text}");
    }

    #[test]
    fn empty_bitmap_buffer() {
        let text = CSourceWriter::default()
            .write(&font(vec![bitmap(0x20, 0, 0)]))
            .unwrap();
        assert!(text.contains("glyph_bitmap[] = {\n    0x00 /* all glyphs are empty */\n"));
    }

    #[rstest]
    #[case(LvglVersion::V7, "lvgl/lvgl.h", false)]
    #[case(LvglVersion::V8, "lvgl/lvgl.h", false)]
    #[case(LvglVersion::V9, "lvgl.h", true)]
    fn version_specifics(
        #[case] version: LvglVersion,
        #[case] include: &str,
        #[case] static_bitmap: bool,
    ) {
        let options = ConvertOptions {
            lvgl_version: version,
            ..Default::default()
        };
        let text = CSourceWriter::new(&options)
            .write(&font(vec![bitmap(0x41, 1, 1)]))
            .unwrap();
        assert!(text.contains(&format!("#else\n    #include \"{include}\"\n#endif")));
        assert_eq!(text.contains(".static_bitmap = 0,"), static_bitmap);
        assert!(text.contains("#if LVGL_VERSION_MAJOR == 8\n    .cache = &cache\n#endif"));
    }

    #[test]
    fn include_override_and_fallback() {
        let options = ConvertOptions {
            lv_include: Some("../lvgl.h".into()),
            fallback: Some("lv_font_montserrat_14".into()),
            ..Default::default()
        };
        let mut font = font(vec![bitmap(0x41, 1, 1)]);
        font.fallback = options.fallback.clone();
        let text = CSourceWriter::new(&options).write(&font).unwrap();
        assert!(text.contains("    #include \"../lvgl.h\"\n"));
        assert!(text.contains("extern const lv_font_t lv_font_montserrat_14;\n"));
        assert!(text.contains("    .fallback = &lv_font_montserrat_14,\n"));
        assert!(text.contains(" * Opts: --bpp 4 --size 16 --no-compress --lvgl-version 9 --lv-include ../lvgl.h --fallback lv_font_montserrat_14\n"));
    }

    #[test]
    fn kerning_pairs() {
        let mut font = font(vec![bitmap(0x41, 1, 1), bitmap(0x56, 1, 1)]);
        let mut kern = KernBuilder::new();
        kern.add(GlyphId::new(1), GlyphId::new(2), -1.0);
        let (kern, scale) = kern.build(2, false).unwrap();
        font.kern = Some(kern);
        font.head.kerning_scale = scale;
        let text = CSourceWriter::default().write(&font).unwrap();
        assert!(text.contains("static const uint8_t kern_pair_glyph_ids[] =\n{\n    1, 2,\n};"));
        assert!(text.contains("static const int8_t kern_pair_values[] =\n{\n    -16,\n};"));
        assert!(text.contains("    .kern_dsc = &kern_pairs,\n"));
        assert!(text.contains("    .kern_scale = 16,\n"));
    }

    #[test]
    fn kerning_classes() {
        let mut font = font(vec![bitmap(0x41, 1, 1), bitmap(0x56, 1, 1)]);
        font.kern = Some(Kern::Classes(KernClasses {
            left_class_mapping: vec![0, 1, 0],
            right_class_mapping: vec![0, 0, 1],
            left_class_count: 1,
            right_class_count: 1,
            class_pair_values: vec![F4Dot4::from_f32(-0.5)],
        }));
        let text = CSourceWriter::default().write(&font).unwrap();
        assert!(text.contains("static const uint8_t kern_left_class_mapping[] =\n{\n    0, 1, 0,\n};"));
        assert!(text.contains("static const int8_t kern_class_values[] =\n{\n    -8,\n};"));
        assert!(text.contains("    .kern_classes = 1,\n"));
    }

    #[test]
    fn sparse_full_lists() {
        let mut glyf = GlyfBuilder::new(Bpp::Four, Compression::None);
        for cp in [0x41, 0x50, 0x60] {
            glyf.add_glyph(bitmap(cp, 1, 1));
        }
        let cmap = Cmap::from_mappings([
            (0x41, GlyphId::new(3)),
            (0x50, GlyphId::new(1)),
            (0x60, GlyphId::new(2)),
        ])
        .unwrap();
        let mut builder = FontBuilder::new("sparse", 8);
        builder.glyf(glyf.build()).cmap(cmap);
        let text = CSourceWriter::default().write(&builder.build()).unwrap();
        assert!(text.contains("static const uint16_t unicode_list_0[] = {\n    0x0, 0xf, 0x1f,\n};"));
        assert!(text.contains("static const uint16_t glyph_id_ofs_list_0[] = {\n    2, 0, 1,\n};"));
        assert!(text.contains(
            ".unicode_list = unicode_list_0, .glyph_id_ofs_list = glyph_id_ofs_list_0, .list_length = 3, .type = LV_FONT_FMT_TXT_CMAP_SPARSE_FULL"
        ));
    }

    #[test]
    fn invalid_font_is_not_written() {
        let mut font = font(vec![bitmap(0x41, 1, 1)]);
        font.glyf.bpp = Bpp::Two;
        let report = CSourceWriter::default().write(&font).unwrap_err();
        assert!(report.contains(|v| matches!(v, crate::validate::Violation::BppMismatch { .. })));
    }

    #[test]
    fn deterministic() {
        let make = || font(vec![bitmap(0x41, 3, 2), bitmap(0x42, 2, 2), bitmap(0x43, 0, 0)]);
        let writer = CSourceWriter::default();
        assert_eq!(writer.write(&make()).unwrap(), writer.write(&make()).unwrap());
    }
}
