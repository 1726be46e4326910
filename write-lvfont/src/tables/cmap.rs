//! The character map
//!
//! LVGL looks up a codepoint by scanning a list of subtables, each covering a
//! range of codepoints in one of four formats. Contiguous runs use the
//! `FORMAT0` variants; scattered codepoints are gathered into `SPARSE`
//! subtables listing each codepoint as an offset from the range start.

use std::ops::Range;

use lvfont_types::GlyphId;

use crate::validate::{Validate, ValidationCtx, Violation};

/// The size in bytes of one `lv_font_fmt_txt_cmap_t`.
///
/// A run short enough that listing its codepoints costs no more than a
/// separate subtable is merged into a sparse subtable.
const SUBTABLE_OVERHEAD: usize = 16;

/// Bytes per entry of a sparse `unicode_list`.
const SPARSE_ENTRY_SIZE: usize = 2;

const MAX_RANGE_LENGTH: usize = u16::MAX as usize;

/// A character map: codepoint to glyph id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cmap {
    /// Subtables, ordered by `range_start`.
    pub subtables: Vec<CmapSubtable>,
}

/// One `lv_font_fmt_txt_cmap_t`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CmapSubtable {
    pub range_start: u32,
    /// The number of codepoints spanned, including any gaps.
    pub range_length: u32,
    pub glyph_id_start: GlyphId,
    pub kind: CmapSubtableKind,
}

/// The subtable formats, with the lists each one carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CmapSubtableKind {
    /// Contiguous codepoints mapped to contiguous glyph ids.
    Format0Tiny,
    /// Contiguous codepoints; one `glyph_id_start` offset per codepoint.
    Format0Full { glyph_id_ofs: Vec<u8> },
    /// Listed codepoints mapped to contiguous glyph ids.
    SparseTiny { unicode_list: Vec<u16> },
    /// Listed codepoints, each with its own glyph id offset.
    SparseFull {
        unicode_list: Vec<u16>,
        glyph_id_ofs: Vec<u16>,
    },
}

/// An error indicating that a codepoint was mapped to two glyph ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CmapConflict {
    codepoint: u32,
    gid1: GlyphId,
    gid2: GlyphId,
}

impl std::fmt::Display for CmapConflict {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Cannot map U+{:04X} to two different glyph ids: {} and {}",
            self.codepoint, self.gid1, self.gid2
        )
    }
}

impl std::error::Error for CmapConflict {}

impl CmapSubtableKind {
    /// The `lv_font_fmt_txt_cmap_type_t` enumerator.
    pub fn c_name(&self) -> &'static str {
        match self {
            CmapSubtableKind::Format0Tiny => "LV_FONT_FMT_TXT_CMAP_FORMAT0_TINY",
            CmapSubtableKind::Format0Full { .. } => "LV_FONT_FMT_TXT_CMAP_FORMAT0_FULL",
            CmapSubtableKind::SparseTiny { .. } => "LV_FONT_FMT_TXT_CMAP_SPARSE_TINY",
            CmapSubtableKind::SparseFull { .. } => "LV_FONT_FMT_TXT_CMAP_SPARSE_FULL",
        }
    }
}

impl CmapSubtable {
    /// The last codepoint in the range, inclusive.
    pub fn range_end(&self) -> u32 {
        self.range_start + self.range_length.saturating_sub(1)
    }

    /// The `list_length` field: the number of list entries, if any.
    pub fn list_length(&self) -> usize {
        match &self.kind {
            CmapSubtableKind::Format0Tiny => 0,
            CmapSubtableKind::Format0Full { glyph_id_ofs } => glyph_id_ofs.len(),
            CmapSubtableKind::SparseTiny { unicode_list }
            | CmapSubtableKind::SparseFull { unicode_list, .. } => unicode_list.len(),
        }
    }

    /// The sparse codepoint offsets, if this is a sparse subtable.
    pub fn unicode_list(&self) -> Option<&[u16]> {
        match &self.kind {
            CmapSubtableKind::SparseTiny { unicode_list }
            | CmapSubtableKind::SparseFull { unicode_list, .. } => Some(unicode_list),
            _ => None,
        }
    }

    /// Look up the glyph for a codepoint.
    pub fn map_codepoint(&self, codepoint: u32) -> Option<GlyphId> {
        if codepoint < self.range_start || codepoint > self.range_end() {
            return None;
        }
        let offset = codepoint - self.range_start;
        let start = self.glyph_id_start.to_u32();
        let gid_offset = match &self.kind {
            CmapSubtableKind::Format0Tiny => offset,
            CmapSubtableKind::Format0Full { glyph_id_ofs } => {
                *glyph_id_ofs.get(offset as usize)? as u32
            }
            CmapSubtableKind::SparseTiny { unicode_list } => {
                unicode_list.binary_search(&(offset as u16)).ok()? as u32
            }
            CmapSubtableKind::SparseFull {
                unicode_list,
                glyph_id_ofs,
            } => {
                let idx = unicode_list.binary_search(&(offset as u16)).ok()?;
                *glyph_id_ofs.get(idx)? as u32
            }
        };
        Some(GlyphId::new(start + gid_offset))
    }

    /// Every `(codepoint, glyph id)` pair this subtable maps.
    pub fn mappings(&self) -> Vec<(u32, GlyphId)> {
        let start = self.glyph_id_start.to_u32();
        match &self.kind {
            CmapSubtableKind::Format0Tiny => (0..self.range_length)
                .map(|i| (self.range_start + i, GlyphId::new(start + i)))
                .collect(),
            CmapSubtableKind::Format0Full { glyph_id_ofs } => glyph_id_ofs
                .iter()
                .enumerate()
                .map(|(i, ofs)| (self.range_start + i as u32, GlyphId::new(start + *ofs as u32)))
                .collect(),
            CmapSubtableKind::SparseTiny { unicode_list } => unicode_list
                .iter()
                .enumerate()
                .map(|(i, cp)| (self.range_start + *cp as u32, GlyphId::new(start + i as u32)))
                .collect(),
            CmapSubtableKind::SparseFull {
                unicode_list,
                glyph_id_ofs,
            } => unicode_list
                .iter()
                .zip(glyph_id_ofs)
                .map(|(cp, ofs)| {
                    (self.range_start + *cp as u32, GlyphId::new(start + *ofs as u32))
                })
                .collect(),
        }
    }

    /// A contiguous run of codepoints.
    fn dense(mappings: &[(u32, GlyphId)]) -> Self {
        let range_start = mappings[0].0;
        let range_length = mappings.len() as u32;
        if is_consecutive(mappings) {
            return CmapSubtable {
                range_start,
                range_length,
                glyph_id_start: mappings[0].1,
                kind: CmapSubtableKind::Format0Tiny,
            };
        }
        let glyph_id_start = min_gid(mappings);
        let glyph_id_ofs = mappings
            .iter()
            .map(|(_, gid)| (gid.to_u32() - glyph_id_start.to_u32()) as u8)
            .collect();
        CmapSubtable {
            range_start,
            range_length,
            glyph_id_start,
            kind: CmapSubtableKind::Format0Full { glyph_id_ofs },
        }
    }

    /// Scattered codepoints spanning at most `u16::MAX + 1` codepoints.
    fn sparse(mappings: &[(u32, GlyphId)]) -> Self {
        let range_start = mappings[0].0;
        let range_end = mappings[mappings.len() - 1].0;
        let unicode_list = mappings
            .iter()
            .map(|(cp, _)| (cp - range_start) as u16)
            .collect();
        let range_length = range_end - range_start + 1;
        if is_consecutive(mappings) {
            return CmapSubtable {
                range_start,
                range_length,
                glyph_id_start: mappings[0].1,
                kind: CmapSubtableKind::SparseTiny { unicode_list },
            };
        }
        let glyph_id_start = min_gid(mappings);
        let glyph_id_ofs = mappings
            .iter()
            .map(|(_, gid)| (gid.to_u32() - glyph_id_start.to_u32()) as u16)
            .collect();
        CmapSubtable {
            range_start,
            range_length,
            glyph_id_start,
            kind: CmapSubtableKind::SparseFull {
                unicode_list,
                glyph_id_ofs,
            },
        }
    }
}

impl Cmap {
    /// Build a character map from `(codepoint, GlyphId)` pairs.
    ///
    /// The pairs may be in any order; duplicates are ignored. Mapping one
    /// codepoint to two different glyphs is an error.
    pub fn from_mappings(
        mappings: impl IntoIterator<Item = (u32, GlyphId)>,
    ) -> Result<Cmap, CmapConflict> {
        let mut mappings: Vec<_> = mappings.into_iter().collect();
        mappings.sort();
        mappings.dedup();
        if let Some(conflict) = mappings.windows(2).find_map(|pair| {
            (pair[0].0 == pair[1].0).then_some(CmapConflict {
                codepoint: pair[0].0,
                gid1: pair[0].1,
                gid2: pair[1].1,
            })
        }) {
            return Err(conflict);
        }

        let pieces: Vec<_> = contiguous_runs(&mappings)
            .into_iter()
            .flat_map(|run| split_for_format0(&mappings, run))
            .collect();

        let mut subtables = Vec::new();
        let mut i = 0;
        while i < pieces.len() {
            let mut end = i + 1;
            if is_short(&pieces[i]) {
                let first_cp = mappings[pieces[i].start].0;
                let mut count = pieces[i].len();
                while let Some(next) = pieces.get(end).filter(|p| is_short(p)) {
                    let last_cp = mappings[next.end - 1].0;
                    if (last_cp - first_cp) as usize > MAX_RANGE_LENGTH - 1
                        || count + next.len() > MAX_RANGE_LENGTH
                    {
                        break;
                    }
                    count += next.len();
                    end += 1;
                }
            }

            let group = &mappings[pieces[i].start..pieces[end - 1].end];
            let subtable = if end - i == 1 {
                CmapSubtable::dense(group)
            } else {
                CmapSubtable::sparse(group)
            };
            log::debug!(
                "cmap subtable U+{:04X}..=U+{:04X}: {} ({} codepoints)",
                subtable.range_start,
                subtable.range_end(),
                subtable.kind.c_name(),
                group.len()
            );
            subtables.push(subtable);
            i = end;
        }

        Ok(Cmap { subtables })
    }

    /// Look up the glyph for a codepoint, as the consumer would.
    pub fn map_codepoint(&self, codepoint: u32) -> Option<GlyphId> {
        self.subtables
            .iter()
            .find_map(|subtable| subtable.map_codepoint(codepoint))
    }

    /// Every `(codepoint, glyph id)` pair in the map, in subtable order.
    pub fn mappings(&self) -> impl Iterator<Item = (u32, GlyphId)> + '_ {
        self.subtables.iter().flat_map(CmapSubtable::mappings)
    }
}

fn is_consecutive(mappings: &[(u32, GlyphId)]) -> bool {
    mappings
        .windows(2)
        .all(|pair| pair[0].1.next() == Some(pair[1].1))
}

fn min_gid(mappings: &[(u32, GlyphId)]) -> GlyphId {
    mappings
        .iter()
        .map(|(_, gid)| *gid)
        .min()
        .unwrap_or_default()
}

fn is_short(piece: &Range<usize>) -> bool {
    piece.len() * SPARSE_ENTRY_SIZE <= SUBTABLE_OVERHEAD
}

/// Split sorted mappings into runs of consecutive codepoints.
fn contiguous_runs(mappings: &[(u32, GlyphId)]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=mappings.len() {
        let breaks = i == mappings.len()
            || mappings[i].0 != mappings[i - 1].0 + 1
            || i - start == MAX_RANGE_LENGTH;
        if breaks {
            runs.push(start..i);
            start = i;
        }
    }
    runs
}

/// Split a contiguous run so that each piece fits one `FORMAT0` subtable.
///
/// `FORMAT0_FULL` stores offsets as bytes; a run whose glyph ids spread
/// further apart is cut wherever the glyph ids stop being consecutive.
fn split_for_format0(mappings: &[(u32, GlyphId)], run: Range<usize>) -> Vec<Range<usize>> {
    let slice = &mappings[run.clone()];
    if is_consecutive(slice) {
        return vec![run];
    }
    let min = min_gid(slice).to_u32();
    let max = slice.iter().map(|(_, gid)| gid.to_u32()).max().unwrap_or(min);
    if max - min <= u8::MAX as u32 {
        return vec![run];
    }
    let mut pieces = Vec::new();
    let mut start = run.start;
    for i in run.start + 1..=run.end {
        if i == run.end || mappings[i - 1].1.next() != Some(mappings[i].1) {
            pieces.push(start..i);
            start = i;
        }
    }
    pieces
}

impl Validate for Cmap {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_table("cmap", |ctx| {
            ctx.in_field("subtables", |ctx| {
                let mut prev_end: Option<u32> = None;
                ctx.in_array(|ctx| {
                    for subtable in &self.subtables {
                        ctx.array_item(|ctx| {
                            if let Some(prev_end) = prev_end {
                                if subtable.range_start <= prev_end {
                                    ctx.report(Violation::OverlappingSubtables {
                                        prev_end,
                                        start: subtable.range_start,
                                    });
                                }
                            }
                            prev_end = Some(subtable.range_end());
                            subtable.validate_impl(ctx);
                        })
                    }
                })
            })
        })
    }
}

impl Validate for CmapSubtable {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_field("range_length", |ctx| {
            if self.range_length == 0 {
                ctx.report(Violation::LengthMismatch {
                    expected: 1,
                    actual: 0,
                });
            }
            ctx.check_unsigned(self.range_length as i64, 16);
        });
        ctx.in_field("glyph_id_start", |ctx| {
            if self.glyph_id_start.is_notdef() {
                ctx.report(Violation::ReservedGlyphId(self.glyph_id_start));
            }
            ctx.check_unsigned(self.glyph_id_start.to_u32() as i64, 16);
        });
        match &self.kind {
            CmapSubtableKind::Format0Tiny => (),
            CmapSubtableKind::Format0Full { glyph_id_ofs } => {
                ctx.in_field("glyph_id_ofs_list", |ctx| {
                    if glyph_id_ofs.len() != self.range_length as usize {
                        ctx.report(Violation::LengthMismatch {
                            expected: self.range_length as usize,
                            actual: glyph_id_ofs.len(),
                        });
                    }
                })
            }
            CmapSubtableKind::SparseTiny { unicode_list } => self.validate_unicode_list(ctx, unicode_list),
            CmapSubtableKind::SparseFull {
                unicode_list,
                glyph_id_ofs,
            } => {
                self.validate_unicode_list(ctx, unicode_list);
                ctx.in_field("glyph_id_ofs_list", |ctx| {
                    if glyph_id_ofs.len() != unicode_list.len() {
                        ctx.report(Violation::LengthMismatch {
                            expected: unicode_list.len(),
                            actual: glyph_id_ofs.len(),
                        });
                    }
                })
            }
        }
    }
}

impl CmapSubtable {
    fn validate_unicode_list(&self, ctx: &mut ValidationCtx, unicode_list: &[u16]) {
        ctx.in_field("unicode_list", |ctx| {
            if unicode_list.is_empty() {
                ctx.report(Violation::LengthMismatch {
                    expected: 1,
                    actual: 0,
                });
            }
            if unicode_list.windows(2).any(|pair| pair[0] >= pair[1]) {
                ctx.report(Violation::UnsortedCodepoints);
            }
            if let Some(out) = unicode_list
                .iter()
                .find(|ofs| **ofs as u32 >= self.range_length)
            {
                ctx.report(Violation::CodepointOutOfRange(
                    self.range_start + *out as u32,
                ));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

    use super::*;

    fn gid(raw: u32) -> GlyphId {
        GlyphId::new(raw)
    }

    fn sequential(codepoints: &[u32]) -> Vec<(u32, GlyphId)> {
        codepoints
            .iter()
            .enumerate()
            .map(|(i, cp)| (*cp, gid(i as u32 + 1)))
            .collect()
    }

    #[test]
    fn contiguous_run_is_one_tiny_subtable() {
        let cmap = Cmap::from_mappings(sequential(&[0x41, 0x42, 0x43, 0x44, 0x45])).unwrap();
        assert_eq!(
            cmap.subtables,
            [CmapSubtable {
                range_start: 0x41,
                range_length: 5,
                glyph_id_start: gid(1),
                kind: CmapSubtableKind::Format0Tiny,
            }]
        );
    }

    #[test]
    fn scattered_codepoints_become_sparse() {
        let cmap = Cmap::from_mappings(sequential(&[0x41, 0x43, 0x47])).unwrap();
        assert_eq!(cmap.subtables.len(), 1);
        let subtable = &cmap.subtables[0];
        assert_eq!(
            subtable.kind,
            CmapSubtableKind::SparseTiny {
                unicode_list: vec![0, 2, 6]
            }
        );
        let covered: Vec<_> = (0x40..0x50)
            .filter(|cp| cmap.map_codepoint(*cp).is_some())
            .collect();
        assert_eq!(covered, [0x41, 0x43, 0x47]);
        assert_eq!(cmap.map_codepoint(0x47), Some(gid(3)));
    }

    #[test]
    fn long_runs_stay_dense() {
        let mut codepoints: Vec<u32> = (0x20..0x7F).collect();
        codepoints.extend(0x410..0x450);
        let cmap = Cmap::from_mappings(sequential(&codepoints)).unwrap();
        let kinds: Vec<_> = cmap.subtables.iter().map(|s| s.kind.c_name()).collect();
        assert_eq!(
            kinds,
            [
                "LV_FONT_FMT_TXT_CMAP_FORMAT0_TINY",
                "LV_FONT_FMT_TXT_CMAP_FORMAT0_TINY"
            ]
        );
        assert_eq!(cmap.subtables[1].glyph_id_start, gid(0x7F - 0x20 + 1));
    }

    #[test]
    fn short_runs_between_long_ones() {
        let mut codepoints: Vec<u32> = (0x30..0x3A).collect();
        codepoints.extend([0xA9, 0xAE, 0xB0]);
        codepoints.extend(0x400..0x420);
        let cmap = Cmap::from_mappings(sequential(&codepoints)).unwrap();
        assert_eq!(cmap.subtables.len(), 3);
        assert_eq!(cmap.subtables[1].range_start, 0xA9);
        assert_eq!(cmap.subtables[1].range_length, 8);
        assert_eq!(cmap.subtables[1].list_length(), 3);
    }

    #[test]
    fn distant_codepoints_split_sparse_groups() {
        let cmap = Cmap::from_mappings(sequential(&[0x20, 0x21, 0x1F600])).unwrap();
        assert_eq!(cmap.subtables.len(), 2);
        assert_eq!(cmap.subtables[0].kind, CmapSubtableKind::Format0Tiny);
        assert_eq!(cmap.subtables[1].range_start, 0x1F600);
    }

    #[test]
    fn shuffled_glyph_ids_use_full_formats() {
        // contiguous codepoints, glyph ids out of order
        let cmap = Cmap::from_mappings([
            (0x61, gid(12)),
            (0x62, gid(10)),
            (0x63, gid(11)),
            (0x64, gid(13)),
            (0x65, gid(14)),
            (0x66, gid(15)),
            (0x67, gid(16)),
            (0x68, gid(17)),
            (0x69, gid(18)),
        ])
        .unwrap();
        assert_eq!(
            cmap.subtables,
            [CmapSubtable {
                range_start: 0x61,
                range_length: 9,
                glyph_id_start: gid(10),
                kind: CmapSubtableKind::Format0Full {
                    glyph_id_ofs: vec![2, 0, 1, 3, 4, 5, 6, 7, 8]
                },
            }]
        );

        let cmap = Cmap::from_mappings([(0x41, gid(3)), (0x50, gid(1)), (0x60, gid(2))]).unwrap();
        assert_eq!(
            cmap.subtables[0].kind,
            CmapSubtableKind::SparseFull {
                unicode_list: vec![0, 0xF, 0x1F],
                glyph_id_ofs: vec![2, 0, 1],
            }
        );
        assert!(cmap.validate().is_ok());
    }

    #[test]
    fn wide_glyph_spread_splits_format0() {
        let mut mappings = sequential(&(0x100..0x120).collect::<Vec<_>>());
        mappings[0].1 = gid(1000);
        let cmap = Cmap::from_mappings(mappings.clone()).unwrap();
        for (cp, gid) in mappings {
            assert_eq!(cmap.map_codepoint(cp), Some(gid));
        }
    }

    #[test]
    fn conflicting_mappings() {
        let err = Cmap::from_mappings([(0x41, gid(1)), (0x41, gid(2))]).unwrap_err();
        assert_eq!(
            err,
            CmapConflict {
                codepoint: 0x41,
                gid1: gid(1),
                gid2: gid(2)
            }
        );
        assert!(Cmap::from_mappings([(0x41, gid(1)), (0x41, gid(1))]).is_ok());
    }

    #[test]
    fn random_mappings_resolve() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let mut codepoints: Vec<u32> = (0..300).map(|_| rng.gen_range(0x20..0x3000)).collect();
            codepoints.sort();
            codepoints.dedup();
            let mut gids: Vec<u32> = (1..=codepoints.len() as u32).collect();
            if rng.gen_bool(0.5) {
                gids.shuffle(&mut rng);
            }
            let mappings: Vec<_> = codepoints.iter().zip(&gids).map(|(c, g)| (*c, gid(*g))).collect();
            let cmap = Cmap::from_mappings(mappings.clone()).unwrap();
            assert!(cmap.validate().is_ok());
            for (cp, gid) in &mappings {
                assert_eq!(cmap.map_codepoint(*cp), Some(*gid), "U+{cp:04X}");
            }
            let mut roundtrip: Vec<_> = cmap.mappings().collect();
            roundtrip.sort();
            assert_eq!(roundtrip, mappings);
        }
    }

    #[test]
    fn overlapping_subtables_fail_validation() {
        let cmap = Cmap {
            subtables: vec![
                CmapSubtable {
                    range_start: 0x41,
                    range_length: 5,
                    glyph_id_start: gid(1),
                    kind: CmapSubtableKind::Format0Tiny,
                },
                CmapSubtable {
                    range_start: 0x44,
                    range_length: 2,
                    glyph_id_start: gid(6),
                    kind: CmapSubtableKind::SparseTiny {
                        unicode_list: vec![1, 0],
                    },
                },
            ],
        };
        let report = cmap.validate().unwrap_err();
        assert!(report.contains(|v| *v
            == Violation::OverlappingSubtables {
                prev_end: 0x45,
                start: 0x44
            }));
        assert!(report.contains(|v| *v == Violation::UnsortedCodepoints));
        assert_eq!(
            report.errors()[0].path(),
            "cmap.subtables[1]"
        );
    }
}
