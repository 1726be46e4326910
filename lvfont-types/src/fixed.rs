//! fixed-point numerical types

// shared between F12Dot4 and F4Dot4
macro_rules! fixed_impl {
    ($name:ident, $bits:literal, $fract_bits:literal, $ty:ty) => {
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[doc = concat!(stringify!($bits), "-bit signed fixed point number with ", stringify!($fract_bits), " bits of fraction." )]
        pub struct $name($ty);
        impl $name {
            /// Minimum value.
            pub const MIN: Self = Self(<$ty>::MIN);

            /// Maximum value.
            pub const MAX: Self = Self(<$ty>::MAX);

            /// The value 0.
            pub const ZERO: Self = Self(0);

            /// The value 1.
            pub const ONE: Self = Self(1 << $fract_bits);

            const INT_MASK: $ty = !0 << $fract_bits;
            const ROUND: $ty = 1 << ($fract_bits - 1);
            const FRACT_BITS: usize = $fract_bits;

            /// Creates a value from its raw bits, e.g. `16` is `1.0`.
            pub const fn from_bits(bits: $ty) -> Self {
                Self(bits)
            }

            /// The raw bits of this value, as stored in the font.
            pub const fn to_bits(self) -> $ty {
                self.0
            }

            /// Creates a value from an integer, saturating on overflow.
            pub fn from_i32(int: i32) -> Self {
                let shifted = (int as i64) << Self::FRACT_BITS;
                Self(shifted.clamp(<$ty>::MIN as i64, <$ty>::MAX as i64) as $ty)
            }

            /// Returns the nearest integer value.
            pub fn round(self) -> Self {
                Self(self.0.wrapping_add(Self::ROUND) & Self::INT_MASK)
            }

            /// Returns the integer part, rounding towards negative infinity.
            pub fn to_i32(self) -> i32 {
                (self.0 >> Self::FRACT_BITS) as i32
            }

            /// Creates a fixed point value from an f32.
            ///
            /// This operation is lossy; the float will be rounded to the nearest
            /// representable value, saturating at the bounds of the type.
            pub fn from_f32(x: f32) -> Self {
                Self((x * (1 << $fract_bits) as f32).round() as $ty)
            }

            /// Returns the value as an f32.
            ///
            /// This operation is lossless: all representable values can be
            /// round-tripped.
            pub fn to_f32(self) -> f32 {
                self.0 as f32 / (1 << $fract_bits) as f32
            }
        }

        //hack: we can losslessly go to float, so use those fmt impls
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                self.to_f32().fmt(f)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                self.to_f32().fmt(f)
            }
        }
    };
}

fixed_impl!(F12Dot4, 32, 4, i32);
fixed_impl!(F4Dot4, 8, 4, i8);

impl F12Dot4 {
    /// Returns `true` if this value has no fractional part.
    pub fn is_integer(self) -> bool {
        self.0 & !Self::INT_MASK == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f12dot4_floats() {
        assert_eq!(F12Dot4(0x10), F12Dot4::from_f32(1.0));
        assert_eq!(F12Dot4(0x18), F12Dot4::from_f32(1.5));
        assert_eq!(F12Dot4(154), F12Dot4::from_f32(9.625));
        assert_eq!(F12Dot4(-8), F12Dot4::from_f32(-0.5));
        assert_eq!(F12Dot4(1), F12Dot4::from_f32(0.0625));
        // 0.03 * 16 = 0.48, rounds to zero
        assert_eq!(F12Dot4(0), F12Dot4::from_f32(0.03));
    }

    #[test]
    fn f4dot4_saturates() {
        assert_eq!(F4Dot4::MAX, F4Dot4::from_f32(100.0));
        assert_eq!(F4Dot4::MIN, F4Dot4::from_f32(-100.0));
        assert_eq!(F4Dot4(-16), F4Dot4::from_f32(-1.0));
    }

    #[test]
    fn roundtrip_f4dot4() {
        for i in i8::MIN..=i8::MAX {
            let val = F4Dot4(i);
            assert_eq!(val, F4Dot4::from_f32(val.to_f32()));
        }
    }

    #[test]
    fn round_and_integers() {
        assert_eq!(F12Dot4(0x18).round(), F12Dot4::from_i32(2));
        assert_eq!(F12Dot4(0x17).round(), F12Dot4::from_i32(1));
        assert!(F12Dot4::from_i32(12).is_integer());
        assert!(!F12Dot4(0x17).is_integer());
        assert_eq!(F12Dot4(-0x18).to_i32(), -2);
    }

    #[test]
    fn from_i32_saturates() {
        assert_eq!(F4Dot4::from_i32(3), F4Dot4(48));
        assert_eq!(F4Dot4::from_i32(9), F4Dot4::MAX);
        assert_eq!(F12Dot4::from_i32(-2), F12Dot4(-32));
    }
}
