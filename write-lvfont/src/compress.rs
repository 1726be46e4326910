//! Run-length compression of glyph bitmaps
//!
//! This is the "modified I3BN" scheme decoded by `lv_font_fmt_txt`. The
//! output is a bitstream, MSB first, with the final byte zero padded:
//!
//! * a sample that does not repeat is written as a raw `bpp`-bit literal;
//! * a run starts with [`RLE_SKIP_COUNT`] literals plus one more literal of
//!   the same value, which tells the decoder that a run follows;
//! * each further repetition is a single `1` bit, and a `0` bit ends the run;
//! * after eleven `1` bits a [`RLE_COUNTER_BITS`]-bit counter holds the rest
//!   of the run.
//!
//! The thresholds are baked into the decoder and must not change.

use lvfont_types::Bpp;

use crate::{
    bitpack::{self, BitReader, BitWriter},
    tables::head::Compression,
};

/// Literals written before a run is announced.
pub const RLE_SKIP_COUNT: usize = 1;
/// Repetitions encoded as single bits before switching to the counter.
pub const RLE_BIT_COLLAPSED_COUNT: usize = 10;
/// Width of the trailing repetition counter.
pub const RLE_COUNTER_BITS: u8 = 6;
/// The largest counter value.
pub const RLE_COUNTER_MAX: usize = (1 << RLE_COUNTER_BITS) - 1;
/// The most repetitions one run can describe (74).
pub const RLE_MAX_REPEATS: usize = RLE_COUNTER_MAX + RLE_BIT_COLLAPSED_COUNT + 1;

/// The compressed stream ended before all samples were decoded.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("compressed bitmap truncated after {decoded} of {expected} samples")]
pub struct DecodeError {
    pub decoded: usize,
    pub expected: usize,
}

/// XOR every row with the row above it.
///
/// Row 0 is unchanged. `samples` is row-major with rows of `width` samples.
pub fn xor_prefilter(samples: &[u8], width: usize) -> Vec<u8> {
    let mut filtered = samples.to_vec();
    if width == 0 {
        return filtered;
    }
    debug_assert_eq!(samples.len() % width, 0, "partial row");
    for i in width..samples.len() {
        filtered[i] = samples[i] ^ samples[i - width];
    }
    filtered
}

/// Undo [`xor_prefilter`] by accumulating the rows top to bottom.
pub fn xor_unfilter(filtered: &[u8], width: usize) -> Vec<u8> {
    let mut samples = filtered.to_vec();
    if width == 0 {
        return samples;
    }
    for i in width..samples.len() {
        samples[i] ^= samples[i - width];
    }
    samples
}

/// Run-length encode a sequence of quantized samples.
pub fn rle_encode(samples: &[u8], bpp: Bpp) -> Vec<u8> {
    let bits = bpp.bits();
    let mut writer = BitWriter::new();
    let mut offset = 0;

    while offset < samples.len() {
        let value = samples[offset];
        let mut same = samples[offset..]
            .iter()
            .take_while(|sample| **sample == value)
            .count()
            .min(RLE_MAX_REPEATS + RLE_SKIP_COUNT);
        offset += same;

        if same <= RLE_SKIP_COUNT {
            for _ in 0..same {
                writer.write_bits(value as u32, bits);
            }
            continue;
        }

        for _ in 0..RLE_SKIP_COUNT {
            writer.write_bits(value as u32, bits);
        }
        same -= RLE_SKIP_COUNT;

        // repeating the literal announces the run
        writer.write_bits(value as u32, bits);

        if same <= RLE_BIT_COLLAPSED_COUNT {
            for _ in 1..same {
                writer.write_bits(1, 1);
            }
            writer.write_bits(0, 1);
            continue;
        }

        for _ in 0..=RLE_BIT_COLLAPSED_COUNT {
            writer.write_bits(1, 1);
        }
        let counter = same - RLE_BIT_COLLAPSED_COUNT - 1;
        writer.write_bits(counter as u32, RLE_COUNTER_BITS);
    }

    writer.finish()
}

#[derive(Clone, Copy, Debug)]
enum DecodeState {
    Single,
    Repeated { ones: usize },
    Counter { remaining: u32 },
}

/// Decode `count` samples from a stream produced by [`rle_encode`].
///
/// This follows the consumer's decoder step by step: every step yields
/// exactly one sample.
pub fn rle_decode(data: &[u8], bpp: Bpp, count: usize) -> Result<Vec<u8>, DecodeError> {
    let bits = bpp.bits();
    let mut reader = BitReader::new(data);
    let mut out = Vec::with_capacity(count);
    let mut prev: Option<u8> = None;
    let mut state = DecodeState::Single;

    while out.len() < count {
        let truncated = DecodeError {
            decoded: out.len(),
            expected: count,
        };
        let literal = |reader: &mut BitReader| -> Result<u8, DecodeError> {
            reader.read_bits(bits).map(|v| v as u8).ok_or(truncated.clone())
        };

        let sample = match state {
            DecodeState::Single => {
                let value = literal(&mut reader)?;
                if prev == Some(value) {
                    state = DecodeState::Repeated { ones: 0 };
                }
                value
            }
            DecodeState::Repeated { ones } => {
                let bit = reader.read_bits(1).ok_or(truncated.clone())?;
                let ones = ones + 1;
                let repeated = prev.unwrap_or_default();
                match bit {
                    1 if ones == RLE_BIT_COLLAPSED_COUNT + 1 => {
                        let counter = reader
                            .read_bits(RLE_COUNTER_BITS)
                            .ok_or(truncated.clone())?;
                        if counter == 0 {
                            state = DecodeState::Single;
                            literal(&mut reader)?
                        } else {
                            state = DecodeState::Counter { remaining: counter };
                            repeated
                        }
                    }
                    1 => {
                        state = DecodeState::Repeated { ones };
                        repeated
                    }
                    _ => {
                        state = DecodeState::Single;
                        literal(&mut reader)?
                    }
                }
            }
            DecodeState::Counter { remaining } => {
                let remaining = remaining - 1;
                if remaining == 0 {
                    state = DecodeState::Single;
                    literal(&mut reader)?
                } else {
                    state = DecodeState::Counter { remaining };
                    prev.unwrap_or_default()
                }
            }
        };
        prev = Some(sample);
        out.push(sample);
    }
    Ok(out)
}

/// Encode the quantized samples of one glyph for the given compression.
///
/// `width` is the row length, used by the XOR pre-filter.
pub fn encode_bitmap(samples: &[u8], width: usize, bpp: Bpp, compression: Compression) -> Vec<u8> {
    match compression {
        Compression::None => bitpack::pack(samples, bpp),
        Compression::Rle => rle_encode(&xor_prefilter(samples, width), bpp),
        Compression::RleNoPrefilter => rle_encode(samples, bpp),
    }
}

/// Recover `count` quantized samples from an encoded glyph bitmap.
pub fn decode_bitmap(
    data: &[u8],
    width: usize,
    count: usize,
    bpp: Bpp,
    compression: Compression,
) -> Result<Vec<u8>, DecodeError> {
    let truncated = DecodeError {
        decoded: 0,
        expected: count,
    };
    match compression {
        Compression::None => bitpack::unpack(data, bpp, count).ok_or(truncated),
        Compression::Rle => rle_decode(data, bpp, count).map(|s| xor_unfilter(&s, width)),
        Compression::RleNoPrefilter => rle_decode(data, bpp, count),
    }
}
