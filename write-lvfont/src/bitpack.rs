//! Bit-level reading and writing
//!
//! Glyph bitmaps are stored most-significant-bit first: the first sample of a
//! glyph occupies the high bits of its first byte. Only the final byte of a
//! sequence carries padding, which is always zero.

use lvfont_types::Bpp;

/// Writes values of arbitrary bit width into a byte buffer, MSB first.
#[derive(Clone, Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    /// bits accumulated but not yet flushed, right aligned
    pending: u32,
    pending_bits: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the low `num_bits` bits of `value`.
    ///
    /// Higher bits of `value` are ignored.
    pub fn write_bits(&mut self, value: u32, num_bits: u8) {
        debug_assert!(num_bits <= 24, "wide writes should be split");
        let mask = (1u32 << num_bits) - 1;
        self.pending = (self.pending << num_bits) | (value & mask);
        self.pending_bits += num_bits;
        while self.pending_bits >= 8 {
            self.pending_bits -= 8;
            self.bytes.push((self.pending >> self.pending_bits) as u8);
        }
        self.pending &= (1 << self.pending_bits) - 1;
    }

    /// The number of bits written so far.
    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8 + self.pending_bits as usize
    }

    /// Finish writing, zero-padding the final partial byte.
    pub fn finish(mut self) -> Vec<u8> {
        if self.pending_bits > 0 {
            self.bytes
                .push((self.pending << (8 - self.pending_bits)) as u8);
        }
        self.bytes
    }
}

/// Reads values of arbitrary bit width from a byte buffer, MSB first.
#[derive(Clone, Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Read `num_bits` bits, or `None` if the buffer is exhausted.
    pub fn read_bits(&mut self, num_bits: u8) -> Option<u32> {
        if self.bit_pos + num_bits as usize > self.data.len() * 8 {
            return None;
        }
        let mut value = 0u32;
        for _ in 0..num_bits {
            let byte = self.data[self.bit_pos / 8];
            let bit = (byte >> (7 - self.bit_pos % 8)) & 1;
            value = (value << 1) | bit as u32;
            self.bit_pos += 1;
        }
        Some(value)
    }

    /// The number of bits consumed so far.
    pub fn position(&self) -> usize {
        self.bit_pos
    }
}

/// Pack a row-major sequence of quantized samples.
///
/// Samples are written back to back with no padding between rows; only the
/// final byte is padded. For 8 bpp this is a plain copy.
pub fn pack(samples: &[u8], bpp: Bpp) -> Vec<u8> {
    if bpp == Bpp::Eight {
        return samples.to_vec();
    }
    let mut writer = BitWriter::new();
    for sample in samples {
        writer.write_bits(*sample as u32, bpp.bits());
    }
    let packed = writer.finish();
    debug_assert_eq!(packed.len(), bpp.packed_len(samples.len()));
    packed
}

/// Unpack `count` samples previously written by [`pack`].
///
/// Returns `None` if `data` is too short to hold `count` samples.
pub fn unpack(data: &[u8], bpp: Bpp, count: usize) -> Option<Vec<u8>> {
    if bpp == Bpp::Eight {
        return data.get(..count).map(<[u8]>::to_vec);
    }
    let mut reader = BitReader::new(data);
    (0..count)
        .map(|_| reader.read_bits(bpp.bits()).map(|v| v as u8))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn msb_first() {
        assert_eq!(pack(&[0xA, 0x5, 0xF], Bpp::Four), [0xA5, 0xF0]);
        assert_eq!(pack(&[1, 0, 1, 1, 0, 0, 0, 1, 1], Bpp::One), [0xB1, 0x80]);
        assert_eq!(pack(&[3, 2, 1, 0, 3], Bpp::Two), [0xE4, 0xC0]);
    }

    #[test]
    fn three_bpp_straddles_bytes() {
        // 101 110 011 -> 1011 1001 1(000 0000)
        assert_eq!(pack(&[5, 6, 3], Bpp::Three), [0xB9, 0x80]);
        assert_eq!(unpack(&[0xB9, 0x80], Bpp::Three, 3), Some(vec![5, 6, 3]));
    }

    #[test]
    fn eight_bpp_is_identity() {
        let samples: Vec<u8> = (0..=255).collect();
        assert_eq!(pack(&samples, Bpp::Eight), samples);
    }

    #[rstest]
    #[case(Bpp::One)]
    #[case(Bpp::Two)]
    #[case(Bpp::Three)]
    #[case(Bpp::Four)]
    #[case(Bpp::Eight)]
    fn unpack_restores_samples(#[case] bpp: Bpp) {
        let samples: Vec<u8> = (0..61u32)
            .map(|i| ((i * 7 + 3) % (bpp.max_level() as u32 + 1)) as u8)
            .collect();
        let packed = pack(&samples, bpp);
        assert_eq!(packed.len(), bpp.packed_len(samples.len()));
        assert_eq!(unpack(&packed, bpp, samples.len()), Some(samples));
    }

    #[test]
    fn empty_input() {
        assert!(pack(&[], Bpp::Four).is_empty());
        assert_eq!(unpack(&[], Bpp::Four, 0), Some(vec![]));
    }

    #[test]
    fn reader_reports_exhaustion() {
        let mut reader = BitReader::new(&[0xFF]);
        assert_eq!(reader.read_bits(6), Some(0x3F));
        assert_eq!(reader.read_bits(3), None);
        assert_eq!(reader.read_bits(2), Some(0x3));
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn writer_counts_bits() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b101, 3);
        writer.write_bits(0x3F, 6);
        assert_eq!(writer.bit_len(), 9);
        assert_eq!(writer.finish(), [0b1011_1111, 0b1000_0000]);
    }
}
