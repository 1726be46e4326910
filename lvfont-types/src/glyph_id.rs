//! Glyph Identifiers
//!
//! LVGL indexes its glyph descriptor array with these. Index 0 is always the
//! reserved "missing glyph" entry, so real glyphs start at 1.

/// A glyph identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlyphId(u32);

impl GlyphId {
    /// The identifier reserved for unknown glyphs
    pub const NOTDEF: GlyphId = GlyphId(0);

    /// The first identifier available to real glyphs.
    pub const FIRST: GlyphId = GlyphId(1);

    /// Construct a new `GlyphId`.
    pub const fn new(raw: u32) -> Self {
        GlyphId(raw)
    }

    /// The identifier as a u32.
    pub const fn to_u32(self) -> u32 {
        self.0
    }

    /// The identifier following this one, or `None` on overflow.
    pub const fn next(self) -> Option<GlyphId> {
        match self.0.checked_add(1) {
            Some(raw) => Some(GlyphId(raw)),
            None => None,
        }
    }

    /// Returns `true` if this is the reserved identifier.
    pub const fn is_notdef(self) -> bool {
        self.0 == 0
    }
}

impl Default for GlyphId {
    fn default() -> Self {
        GlyphId::NOTDEF
    }
}

impl From<u16> for GlyphId {
    fn from(value: u16) -> Self {
        GlyphId(value as u32)
    }
}

impl std::fmt::Display for GlyphId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "GID_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notdef_is_default() {
        assert_eq!(GlyphId::default(), GlyphId::NOTDEF);
        assert!(GlyphId::NOTDEF.is_notdef());
        assert!(!GlyphId::FIRST.is_notdef());
    }

    #[test]
    fn next_overflows() {
        assert_eq!(GlyphId::new(4).next(), Some(GlyphId::new(5)));
        assert_eq!(GlyphId::new(u32::MAX).next(), None);
    }
}
