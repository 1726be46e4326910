//! Kerning, as a sorted pair list or a class matrix

use std::collections::BTreeMap;

use indexmap::IndexMap;
use lvfont_types::{F12Dot4, F4Dot4, GlyphId};

use crate::validate::{Validate, ValidationCtx, Violation};

/// Class 0 means "no kerning", leaving 255 usable classes per side.
const MAX_CLASSES: usize = u8::MAX as usize;

/// The largest magnitude a stored kerning value may have.
const MAX_KERN_VALUE: u32 = i8::MAX as u32;

/// A kerning value between two glyphs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct KernPair {
    pub left: GlyphId,
    pub right: GlyphId,
    /// Scaled by the font's kerning scale.
    pub value: F4Dot4,
}

/// `lv_font_fmt_txt_kern_pair_t`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernPairs {
    /// Sorted by `(left, right)`; the consumer binary searches this list.
    pub pairs: Vec<KernPair>,
    /// 0 if glyph ids are stored as `uint8_t`, 1 for `uint16_t`.
    pub glyph_ids_size: u8,
}

/// `lv_font_fmt_txt_kern_classes_t`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernClasses {
    /// Left class of each glyph id, including the reserved id 0.
    pub left_class_mapping: Vec<u8>,
    pub right_class_mapping: Vec<u8>,
    pub left_class_count: u8,
    pub right_class_count: u8,
    /// `left_class_count * right_class_count` values, row-major by left class.
    pub class_pair_values: Vec<F4Dot4>,
}

/// A kerning table in one of the two forms the consumer understands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Kern {
    Pairs(KernPairs),
    Classes(KernClasses),
}

impl KernClasses {
    /// The value between two glyphs, looked up as the consumer does.
    pub fn value(&self, left: GlyphId, right: GlyphId) -> Option<F4Dot4> {
        let left_class = *self.left_class_mapping.get(left.to_u32() as usize)? as usize;
        let right_class = *self.right_class_mapping.get(right.to_u32() as usize)? as usize;
        if left_class == 0 || right_class == 0 {
            return None;
        }
        let idx = (left_class - 1) * self.right_class_count as usize + (right_class - 1);
        self.class_pair_values
            .get(idx)
            .copied()
            .filter(|value| *value != F4Dot4::ZERO)
    }
}

impl Kern {
    /// The value between two glyphs, if they are kerned.
    pub fn value(&self, left: GlyphId, right: GlyphId) -> Option<F4Dot4> {
        match self {
            Kern::Pairs(pairs) => pairs
                .pairs
                .binary_search_by_key(&(left, right), |pair| (pair.left, pair.right))
                .ok()
                .map(|idx| pairs.pairs[idx].value),
            Kern::Classes(classes) => classes.value(left, right),
        }
    }

    /// The glyph ids this table refers to.
    pub fn referenced_glyphs(&self) -> Vec<GlyphId> {
        match self {
            Kern::Pairs(pairs) => {
                let mut gids: Vec<_> = pairs
                    .pairs
                    .iter()
                    .flat_map(|pair| [pair.left, pair.right])
                    .collect();
                gids.sort();
                gids.dedup();
                gids
            }
            Kern::Classes(classes) => classes
                .left_class_mapping
                .iter()
                .zip(&classes.right_class_mapping)
                .enumerate()
                .filter(|(_, (left, right))| **left != 0 || **right != 0)
                .map(|(gid, _)| GlyphId::new(gid as u32))
                .collect(),
        }
    }
}

/// Collects kerning deltas and chooses the cheapest encoding.
#[derive(Clone, Debug, Default)]
pub struct KernBuilder {
    deltas: BTreeMap<(GlyphId, GlyphId), F12Dot4>,
}

impl KernBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the kerning between two glyphs, in pixels.
    ///
    /// Deltas that round to zero are dropped.
    pub fn add(&mut self, left: GlyphId, right: GlyphId, delta: f32) {
        let delta = F12Dot4::from_f32(delta);
        if delta != F12Dot4::ZERO {
            self.deltas.insert((left, right), delta);
        }
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Build the table and its scale.
    ///
    /// `glyph_count` is the number of real glyphs in the font. Returns `None`
    /// if there is nothing to kern.
    pub fn build(self, glyph_count: usize, force_classes: bool) -> Option<(Kern, F12Dot4)> {
        let max = self
            .deltas
            .values()
            .map(|delta| delta.to_bits().unsigned_abs())
            .max()?;
        let scale = if max <= MAX_KERN_VALUE {
            F12Dot4::ONE
        } else {
            F12Dot4::from_bits((max * 16).div_ceil(MAX_KERN_VALUE) as i32)
        };

        let values: BTreeMap<_, _> = self
            .deltas
            .into_iter()
            .filter_map(|(pair, delta)| {
                let scaled = (delta.to_bits() as f64 * 16.0 / scale.to_bits() as f64).round();
                let scaled = scaled.clamp(-(MAX_KERN_VALUE as f64), MAX_KERN_VALUE as f64) as i8;
                (scaled != 0).then_some((pair, F4Dot4::from_bits(scaled)))
            })
            .collect();
        if values.is_empty() {
            return None;
        }

        let pairs = KernPairs {
            pairs: values
                .iter()
                .map(|((left, right), value)| KernPair {
                    left: *left,
                    right: *right,
                    value: *value,
                })
                .collect(),
            glyph_ids_size: (glyph_count > u8::MAX as usize) as u8,
        };
        let gid_size = pairs.glyph_ids_size as usize + 1;
        let pairs_size = pairs.pairs.len() * (2 * gid_size + 1);

        let kern = match build_classes(&values, glyph_count) {
            Some(classes) => {
                let classes_size = classes.left_class_mapping.len()
                    + classes.right_class_mapping.len()
                    + classes.class_pair_values.len();
                log::debug!(
                    "kerning: {} pairs ({pairs_size} bytes) or {}x{} classes ({classes_size} bytes)",
                    pairs.pairs.len(),
                    classes.left_class_count,
                    classes.right_class_count
                );
                if force_classes || classes_size < pairs_size {
                    Kern::Classes(classes)
                } else {
                    Kern::Pairs(pairs)
                }
            }
            None => {
                if force_classes {
                    log::warn!("too many kerning classes, falling back to a pair list");
                }
                Kern::Pairs(pairs)
            }
        };
        Some((kern, scale))
    }
}

/// Group glyphs with identical kerning into classes.
///
/// Returns `None` if either side needs more than 255 classes.
fn build_classes(
    values: &BTreeMap<(GlyphId, GlyphId), F4Dot4>,
    glyph_count: usize,
) -> Option<KernClasses> {
    let mut rows: BTreeMap<GlyphId, Vec<(GlyphId, F4Dot4)>> = BTreeMap::new();
    for ((left, right), value) in values {
        rows.entry(*left).or_default().push((*right, *value));
    }
    let mut row_classes: IndexMap<Vec<(GlyphId, F4Dot4)>, usize> = IndexMap::new();
    let mut left_class_of = BTreeMap::new();
    for (left, row) in rows {
        let next = row_classes.len() + 1;
        let class = *row_classes.entry(row).or_insert(next);
        left_class_of.insert(left, class);
    }
    if row_classes.len() > MAX_CLASSES {
        return None;
    }

    let mut columns: BTreeMap<GlyphId, Vec<(usize, F4Dot4)>> = BTreeMap::new();
    for ((left, right), value) in values {
        columns
            .entry(*right)
            .or_default()
            .push((left_class_of[left], *value));
    }
    let mut column_classes: IndexMap<Vec<(usize, F4Dot4)>, usize> = IndexMap::new();
    let mut right_class_of = BTreeMap::new();
    for (right, mut column) in columns {
        // glyphs sharing a left class contribute identical entries
        column.sort();
        column.dedup();
        let next = column_classes.len() + 1;
        let class = *column_classes.entry(column).or_insert(next);
        right_class_of.insert(right, class);
    }
    if column_classes.len() > MAX_CLASSES {
        return None;
    }

    let left_count = row_classes.len();
    let right_count = column_classes.len();
    let mut class_pair_values = vec![F4Dot4::ZERO; left_count * right_count];
    for (column, right_class) in &column_classes {
        for (left_class, value) in column {
            class_pair_values[(left_class - 1) * right_count + (right_class - 1)] = *value;
        }
    }

    let max_gid = left_class_of
        .keys()
        .chain(right_class_of.keys())
        .map(|gid| gid.to_u32() as usize)
        .max()
        .unwrap_or_default();
    let mapping_len = glyph_count.max(max_gid) + 1;
    let mut left_class_mapping = vec![0u8; mapping_len];
    for (gid, class) in left_class_of {
        left_class_mapping[gid.to_u32() as usize] = class as u8;
    }
    let mut right_class_mapping = vec![0u8; mapping_len];
    for (gid, class) in right_class_of {
        right_class_mapping[gid.to_u32() as usize] = class as u8;
    }

    Some(KernClasses {
        left_class_mapping,
        right_class_mapping,
        left_class_count: left_count as u8,
        right_class_count: right_count as u8,
        class_pair_values,
    })
}

impl Validate for Kern {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_table("kern", |ctx| match self {
            Kern::Pairs(pairs) => ctx.in_field("pairs", |ctx| {
                for pair in pairs.pairs.windows(2) {
                    let (prev, next) = (
                        (pair[0].left, pair[0].right),
                        (pair[1].left, pair[1].right),
                    );
                    if prev >= next {
                        ctx.report(Violation::UnsortedKernPairs { prev, next });
                    }
                }
                let gid_bits = if pairs.glyph_ids_size == 0 { 8 } else { 16 };
                for gid in self.referenced_glyphs() {
                    ctx.check_unsigned(gid.to_u32() as i64, gid_bits);
                }
            }),
            Kern::Classes(classes) => {
                ctx.in_field("class_pair_values", |ctx| {
                    let expected =
                        classes.left_class_count as usize * classes.right_class_count as usize;
                    if classes.class_pair_values.len() != expected {
                        ctx.report(Violation::LengthMismatch {
                            expected,
                            actual: classes.class_pair_values.len(),
                        });
                    }
                });
                ctx.in_field("left_class_mapping", |ctx| {
                    check_classes(ctx, &classes.left_class_mapping, classes.left_class_count)
                });
                ctx.in_field("right_class_mapping", |ctx| {
                    check_classes(ctx, &classes.right_class_mapping, classes.right_class_count)
                });
            }
        })
    }
}

fn check_classes(ctx: &mut ValidationCtx, mapping: &[u8], count: u8) {
    if let Some(class) = mapping.iter().find(|class| **class > count) {
        ctx.report(Violation::KernClassOutOfRange {
            class: *class,
            count,
        });
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn gid(raw: u32) -> GlyphId {
        GlyphId::new(raw)
    }

    fn fp(px: f32) -> F4Dot4 {
        F4Dot4::from_f32(px)
    }

    // A=1, T=2, V=3, a=4, o=5
    fn latin() -> KernBuilder {
        let mut builder = KernBuilder::new();
        builder.add(gid(1), gid(3), -1.0);
        builder.add(gid(3), gid(1), -1.0);
        builder.add(gid(2), gid(4), -1.5);
        builder.add(gid(2), gid(5), -1.5);
        builder.add(gid(3), gid(4), -0.5);
        builder.add(gid(3), gid(5), -0.5);
        builder.add(gid(1), gid(4), 0.0);
        builder
    }

    #[test]
    fn zero_deltas_are_dropped() {
        let builder = latin();
        assert_eq!(builder.len(), 6);
        assert!(KernBuilder::new().build(10, false).is_none());
    }

    #[test]
    fn small_values_use_unit_scale() {
        let (kern, scale) = latin().build(5, false).unwrap();
        assert_eq!(scale, F12Dot4::ONE);
        assert_eq!(kern.value(gid(2), gid(5)), Some(fp(-1.5)));
        assert_eq!(kern.value(gid(3), gid(1)), Some(fp(-1.0)));
        assert_eq!(kern.value(gid(1), gid(4)), None);
    }

    #[test]
    fn pair_list_is_sorted() {
        let mut builder = KernBuilder::new();
        builder.add(gid(9), gid(2), 1.0);
        builder.add(gid(1), gid(7), 1.0);
        builder.add(gid(1), gid(3), 2.0);
        let (kern, _) = builder.build(300, false).unwrap();
        let Kern::Pairs(pairs) = &kern else {
            panic!("expected pairs, got {kern:?}");
        };
        let order: Vec<_> = pairs.pairs.iter().map(|p| (p.left.to_u32(), p.right.to_u32())).collect();
        assert_eq!(order, [(1, 3), (1, 7), (9, 2)]);
        assert_eq!(pairs.glyph_ids_size, 1);
        assert!(kern.validate().is_ok());
    }

    #[test]
    fn large_values_are_scaled() {
        let mut builder = KernBuilder::new();
        builder.add(gid(1), gid(2), -20.0);
        builder.add(gid(2), gid(1), 5.0);
        let (kern, scale) = builder.build(2, false).unwrap();
        // 320 * 16 / 127 = 40.3
        assert_eq!(scale.to_bits(), 41);
        let value = kern.value(gid(1), gid(2)).unwrap();
        assert_eq!(value.to_bits(), -125);
        // the consumer computes value * scale >> 4 in 1/16 px
        let restored = (value.to_bits() as i32 * scale.to_bits()) >> 4;
        assert!((restored + 320).abs() <= 3, "{restored}");
    }

    #[test]
    fn classes_match_pairs() {
        let (pairs, _) = latin().build(5, false).unwrap();
        let (classes, _) = latin().build(5, true).unwrap();
        let Kern::Classes(table) = &classes else {
            panic!("expected classes, got {classes:?}");
        };
        // A, T and V kern differently; a and o share a column
        assert_eq!(table.left_class_count, 3);
        assert_eq!(table.right_class_count, 3);
        assert_eq!(table.left_class_mapping.len(), 6);
        assert_eq!(table.right_class_mapping[4], table.right_class_mapping[5]);
        assert!(classes.validate().is_ok());
        for left in 0..=5 {
            for right in 0..=5 {
                assert_eq!(
                    classes.value(gid(left), gid(right)),
                    pairs.value(gid(left), gid(right)),
                    "{left} {right}"
                );
            }
        }
    }

    #[test]
    fn classes_win_when_smaller() {
        // ten left glyphs with identical rows against ten right glyphs
        let mut builder = KernBuilder::new();
        for left in 1..=10 {
            for right in 11..=20 {
                builder.add(gid(left), gid(right), -1.0);
            }
        }
        let (kern, _) = builder.build(20, false).unwrap();
        let Kern::Classes(classes) = &kern else {
            panic!("expected classes, got {kern:?}");
        };
        assert_eq!((classes.left_class_count, classes.right_class_count), (1, 1));
        assert_eq!(classes.class_pair_values, [fp(-1.0)]);
        assert_eq!(
            kern.referenced_glyphs(),
            (1..=20).map(gid).collect::<Vec<_>>()
        );
    }

    #[test]
    fn broken_tables_fail_validation() {
        let kern = Kern::Classes(KernClasses {
            left_class_mapping: vec![0, 1, 3],
            right_class_mapping: vec![0, 1, 1],
            left_class_count: 2,
            right_class_count: 1,
            class_pair_values: vec![fp(1.0)],
        });
        let report = kern.validate().unwrap_err();
        assert!(report.contains(|v| *v == Violation::LengthMismatch { expected: 2, actual: 1 }));
        assert!(report.contains(|v| *v == Violation::KernClassOutOfRange { class: 3, count: 2 }));

        let kern = Kern::Pairs(KernPairs {
            pairs: vec![
                KernPair { left: gid(2), right: gid(1), value: fp(1.0) },
                KernPair { left: gid(1), right: gid(300), value: fp(1.0) },
            ],
            glyph_ids_size: 0,
        });
        let report = kern.validate().unwrap_err();
        assert!(report.contains(|v| matches!(v, Violation::UnsortedKernPairs { .. })));
        assert!(report.contains(|v| *v == Violation::FieldOverflow { value: 300, bits: 8 }));
    }
}
