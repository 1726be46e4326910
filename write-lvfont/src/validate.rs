//! The pre-emission validation pass

use std::fmt::{Debug, Display};

use lvfont_types::{Bpp, GlyphId};

use crate::tables::head::Compression;

/// Pre-emission validation of a font and its tables.
///
/// The consumer of the generated source imposes requirements that are awkward
/// to encode in the type system, such as every glyph id referenced by the
/// character map existing in the glyph table. These requirements are enforced
/// via a validation pass that collects every violation instead of stopping
/// at the first one.
pub trait Validate {
    /// Ensure that this table is well-formed, reporting any errors.
    ///
    /// This calls [validate_impl][Self::validate_impl] and collects any errors.
    fn validate(&self) -> Result<(), ValidationReport> {
        let mut ctx = ValidationCtx::default();
        self.validate_impl(&mut ctx);
        if ctx.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationReport { errors: ctx.errors })
        }
    }

    /// Validate this table.
    ///
    /// An implementation should look something like:
    ///
    /// ```rust
    /// # use write_lvfont::validate::{Validate, ValidationCtx, Violation};
    /// struct MyTable {
    ///     name: String,
    /// }
    ///
    /// impl Validate for MyTable {
    ///     fn validate_impl(&self, ctx: &mut ValidationCtx) {
    ///         ctx.in_table("MyTable", |ctx| {
    ///             ctx.in_field("name", |ctx| {
    ///                 if self.name.is_empty() {
    ///                     ctx.report(Violation::EmptyName);
    ///                 }
    ///             })
    ///         })
    ///     }
    /// }
    /// ```
    fn validate_impl(&self, ctx: &mut ValidationCtx);
}

/// A single broken invariant.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Violation {
    #[error("font name must not be empty")]
    EmptyName,
    #[error("font name '{0}' is not a valid C identifier")]
    InvalidName(String),
    #[error("font contains no glyphs")]
    NoGlyphs,
    #[error("bpp mismatch: head has {head}, glyph table has {glyf}")]
    BppMismatch { head: Bpp, glyf: Bpp },
    #[error("compression mismatch: head has {head:?}, glyph table has {glyf:?}")]
    CompressionMismatch {
        head: Compression,
        glyf: Compression,
    },
    #[error("glyph id {0} is reserved for the missing glyph")]
    ReservedGlyphId(GlyphId),
    #[error("glyph ids are not strictly ascending: {prev} is followed by {next}")]
    UnsortedGlyphIds { prev: GlyphId, next: GlyphId },
    #[error("reference to glyph {0}, which is not in the glyph table")]
    DanglingGlyphId(GlyphId),
    #[error("bitmap index {actual} does not match the expected offset {expected}")]
    BitmapIndexMismatch { expected: u32, actual: u32 },
    #[error("value {value} does not fit in {bits} bits")]
    FieldOverflow { value: i64, bits: u8 },
    #[error("subtable starting at U+{start:04X} overlaps or precedes the previous subtable ending at U+{prev_end:04X}")]
    OverlappingSubtables { prev_end: u32, start: u32 },
    #[error("list has {actual} entries, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("codepoint list is not strictly ascending")]
    UnsortedCodepoints,
    #[error("codepoint U+{0:04X} is outside the subtable range")]
    CodepointOutOfRange(u32),
    #[error("kerning pairs are not sorted: ({}, {}) is followed by ({}, {})", .prev.0, .prev.1, .next.0, .next.1)]
    UnsortedKernPairs {
        prev: (GlyphId, GlyphId),
        next: (GlyphId, GlyphId),
    },
    #[error("kerning class {class} is out of range (there are {count} classes)")]
    KernClassOutOfRange { class: u8, count: u8 },
}

/// A context for collecting validation errors.
///
/// This is responsible for tracking the position in the tree at which
/// a given error is reported.
///
/// ## paths/locations
///
/// As validation travels down through the font, the path is recorded
/// via appropriate calls to methods like [in_table][Self::in_table] and [in_field][Self::in_field].
#[derive(Clone, Debug, Default)]
pub struct ValidationCtx {
    cur_location: Vec<LocationElem>,
    errors: Vec<ValidationError>,
}

/// A violation together with the location where it was found.
#[derive(Debug, Clone)]
pub struct ValidationError {
    violation: Violation,
    location: Vec<LocationElem>,
}

/// One or more validation errors.
#[derive(Clone)]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

#[derive(Debug, Clone)]
enum LocationElem {
    Table(&'static str),
    Field(&'static str),
    Index(usize),
}

impl ValidationCtx {
    /// Run the provided closure in the context of a new table.
    ///
    /// Errors reported in the closure will include the provided identifer
    /// in their path.
    pub fn in_table(&mut self, name: &'static str, f: impl FnOnce(&mut ValidationCtx)) {
        self.with_elem(LocationElem::Table(name), f);
    }

    /// Run the provided closure in the context of a new field.
    ///
    /// Errors reported in the closure will be associated with the field.
    pub fn in_field(&mut self, name: &'static str, f: impl FnOnce(&mut ValidationCtx)) {
        self.with_elem(LocationElem::Field(name), f);
    }

    /// Run the provided closure in the context of an array.
    pub fn in_array(&mut self, f: impl FnOnce(&mut ValidationCtx)) {
        self.with_elem(LocationElem::Index(0), f);
    }

    /// Run the provided closure in the context of a new array item.
    ///
    /// This must only be called in a closure passed to [in_array][Self::in_array].
    pub fn array_item(&mut self, f: impl FnOnce(&mut ValidationCtx)) {
        assert!(matches!(
            self.cur_location.last(),
            Some(LocationElem::Index(_))
        ));
        f(self);
        if let Some(LocationElem::Index(i)) = self.cur_location.last_mut() {
            *i += 1;
        }
    }

    /// Report a new error, associating it with the current path.
    pub fn report(&mut self, violation: Violation) {
        self.errors.push(ValidationError {
            location: self.cur_location.clone(),
            violation,
        });
    }

    /// Report an error if `value` does not fit in an unsigned field of `bits` bits.
    pub fn check_unsigned(&mut self, value: i64, bits: u8) {
        if value < 0 || value >= 1i64 << bits {
            self.report(Violation::FieldOverflow { value, bits });
        }
    }

    /// Report an error if `value` does not fit in a signed field of `bits` bits.
    pub fn check_signed(&mut self, value: i64, bits: u8) {
        let limit = 1i64 << bits.saturating_sub(1);
        if bits == 0 || value < -limit || value >= limit {
            self.report(Violation::FieldOverflow { value, bits });
        }
    }

    fn with_elem(&mut self, elem: LocationElem, f: impl FnOnce(&mut ValidationCtx)) {
        self.cur_location.push(elem);
        f(self);
        self.cur_location.pop();
    }
}

impl ValidationReport {
    /// Iterate over the violations, in the order they were found.
    pub fn violations(&self) -> impl Iterator<Item = &Violation> + '_ {
        self.errors.iter().map(|error| &error.violation)
    }

    /// Iterate over the errors, including their locations.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// The number of violations; never zero.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always `false`; a report is only created when something failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns `true` if any violation matches the predicate.
    pub fn contains(&self, pred: impl Fn(&Violation) -> bool) -> bool {
        self.violations().any(pred)
    }
}

impl ValidationError {
    /// The broken invariant.
    pub fn violation(&self) -> &Violation {
        &self.violation
    }

    /// The dotted path to the offending value, e.g. `Font.glyf[2].width`.
    pub fn path(&self) -> String {
        let mut path = String::new();
        for elem in &self.location {
            match elem {
                LocationElem::Table(name) if path.is_empty() => path.push_str(name),
                LocationElem::Table(_) => (),
                LocationElem::Field(name) => {
                    path.push('.');
                    path.push_str(name);
                }
                LocationElem::Index(idx) => {
                    path.push('[');
                    path.push_str(&idx.to_string());
                    path.push(']');
                }
            }
        }
        path
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let [error] = self.errors.as_slice() {
            return write!(f, "Validation error: {error}");
        }

        writeln!(f, "{} validation errors:", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            writeln!(f, "#{} {error}", i + 1)?;
        }
        Ok(())
    }
}

impl Debug for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as Display>::fmt(self, f)
    }
}

impl std::error::Error for ValidationReport {}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = self.path();
        if path.is_empty() {
            write!(f, "{}", self.violation)
        } else {
            write!(f, "{} (in {path})", self.violation)
        }
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_array(|ctx| {
            for item in self.iter() {
                ctx.array_item(|ctx| {
                    item.validate_impl(ctx);
                })
            }
        });
    }
}

impl<T: Validate> Validate for Option<T> {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        if let Some(t) = self {
            t.validate_impl(ctx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Leaf(i64);

    impl Validate for Leaf {
        fn validate_impl(&self, ctx: &mut ValidationCtx) {
            ctx.in_field("value", |ctx| ctx.check_unsigned(self.0, 4));
        }
    }

    struct Root(Vec<Leaf>);

    impl Validate for Root {
        fn validate_impl(&self, ctx: &mut ValidationCtx) {
            ctx.in_table("Root", |ctx| ctx.in_field("leaves", |ctx| self.0.validate_impl(ctx)))
        }
    }

    #[test]
    fn paths_track_array_items() {
        let report = Root(vec![Leaf(1), Leaf(16), Leaf(-1)]).validate().unwrap_err();
        assert_eq!(report.len(), 2);
        let paths: Vec<_> = report.errors().iter().map(ValidationError::path).collect();
        assert_eq!(paths, ["Root.leaves[1].value", "Root.leaves[2].value"]);
        assert!(report.contains(|v| *v == Violation::FieldOverflow { value: 16, bits: 4 }));
    }

    #[test]
    fn valid_tree_passes() {
        assert!(Root(vec![Leaf(0), Leaf(15)]).validate().is_ok());
    }

    #[test]
    fn signed_bounds() {
        let mut ctx = ValidationCtx::default();
        ctx.check_signed(-128, 8);
        ctx.check_signed(127, 8);
        assert!(ctx.errors.is_empty());
        ctx.check_signed(128, 8);
        ctx.check_signed(-129, 8);
        assert_eq!(ctx.errors.len(), 2);
    }

    #[test]
    fn report_display() {
        let report = Root(vec![Leaf(20)]).validate().unwrap_err();
        assert_eq!(
            report.to_string(),
            "Validation error: value 20 does not fit in 4 bits (in Root.leaves[0].value)"
        );
    }
}
