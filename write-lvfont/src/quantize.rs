//! Reducing 8-bit coverage to the font's bit depth

use lvfont_types::Bpp;

/// Map one 8-bit sample to a level in `0..=bpp.max_level()`.
///
/// This is `floor(sample * 2^N / 256)`, i.e. a plain right shift; there is
/// no rounding and no dithering.
#[inline]
pub fn quantize_sample(sample: u8, bpp: Bpp) -> u8 {
    sample >> (8 - bpp.bits())
}

/// Quantize a buffer of 8-bit samples, keeping its dimensions.
pub fn quantize(samples: &[u8], bpp: Bpp) -> Vec<u8> {
    samples.iter().map(|s| quantize_sample(*s, bpp)).collect()
}
