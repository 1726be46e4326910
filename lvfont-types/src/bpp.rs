//! Pixel bit depths

/// The number of bits used to store one glyph sample.
///
/// This is always the real bit depth of the stored bitmap; the rasterizer
/// delivers 8-bit coverage and the quantizer reduces it to this depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
#[repr(u8)]
pub enum Bpp {
    One = 1,
    Two = 2,
    Three = 3,
    #[default]
    Four = 4,
    Eight = 8,
}

/// An unsupported bit depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidBpp(pub u8);

impl Bpp {
    /// All supported depths, in ascending order.
    pub const ALL: [Bpp; 5] = [Bpp::One, Bpp::Two, Bpp::Three, Bpp::Four, Bpp::Eight];

    /// The number of bits per sample.
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// The largest level a sample can hold at this depth.
    pub const fn max_level(self) -> u8 {
        ((1u16 << self.bits()) - 1) as u8
    }

    /// How many samples share one byte, if samples never straddle bytes.
    ///
    /// Returns `None` for 3 bpp, where samples cross byte boundaries.
    pub const fn pixels_per_byte(self) -> Option<u8> {
        match self {
            Bpp::Three => None,
            _ => Some(8 / self.bits()),
        }
    }

    /// The number of bytes needed to store `count` samples, with the final
    /// byte zero padded.
    pub const fn packed_len(self, count: usize) -> usize {
        (count * self.bits() as usize).div_ceil(8)
    }
}

impl TryFrom<u8> for Bpp {
    type Error = InvalidBpp;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Bpp::One),
            2 => Ok(Bpp::Two),
            3 => Ok(Bpp::Three),
            4 => Ok(Bpp::Four),
            8 => Ok(Bpp::Eight),
            other => Err(InvalidBpp(other)),
        }
    }
}

impl From<Bpp> for u8 {
    fn from(value: Bpp) -> Self {
        value.bits()
    }
}

impl std::fmt::Display for Bpp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.bits().fmt(f)
    }
}

impl std::fmt::Display for InvalidBpp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unsupported bits per pixel {} (expected 1, 2, 3, 4 or 8)", self.0)
    }
}

impl std::error::Error for InvalidBpp {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels() {
        assert_eq!(Bpp::One.max_level(), 1);
        assert_eq!(Bpp::Three.max_level(), 7);
        assert_eq!(Bpp::Four.max_level(), 15);
        assert_eq!(Bpp::Eight.max_level(), 255);
    }

    #[test]
    fn packing_geometry() {
        assert_eq!(Bpp::One.pixels_per_byte(), Some(8));
        assert_eq!(Bpp::Four.pixels_per_byte(), Some(2));
        assert_eq!(Bpp::Three.pixels_per_byte(), None);
        assert_eq!(Bpp::Four.packed_len(3), 2);
        assert_eq!(Bpp::Three.packed_len(3), 2);
        assert_eq!(Bpp::One.packed_len(0), 0);
    }

    #[test]
    fn from_raw() {
        for bpp in Bpp::ALL {
            assert_eq!(Bpp::try_from(bpp.bits()), Ok(bpp));
        }
        assert_eq!(Bpp::try_from(5), Err(InvalidBpp(5)));
        assert_eq!(Bpp::try_from(0), Err(InvalidBpp(0)));
    }
}
