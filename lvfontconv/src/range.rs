//! Parsing codepoint selections
//!
//! A range string is a comma separated list of items. Each item is either a
//! preset name or `start[-end][=>mapped_start]`, where the numbers are
//! decimal or `0x` prefixed hex:
//!
//! ```text
//! 0x20-0x7F,0xB0,cyrillic,0x1F450-0x1F452=>0xF005
//! ```

use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use thiserror::Error;
use write_lvfont::{types::MAX_CODEPOINT, CodepointMapping};

/// Named ranges accepted in place of an item.
pub const PRESETS: &[(&str, &str)] = &[
    ("ascii", "0x20-0x7F"),
    ("ascii-printable", "0x21-0x7E"),
    ("digits", "0x30-0x39"),
    ("uppercase", "0x41-0x5A"),
    ("lowercase", "0x61-0x7A"),
    ("latin-ext-a", "0x100-0x17F"),
    ("latin-ext-b", "0x180-0x24F"),
    ("greek", "0x370-0x3FF"),
    ("cyrillic", "0x400-0x4FF"),
    ("cjk", "0x4E00-0x9FFF"),
];

/// Sets above this size are probably a mistake.
const LARGE_SELECTION: usize = 10_000;

static ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<start>[0-9A-Za-z]+)(?:\s*-\s*(?<end>[0-9A-Za-z]+))?(?:\s*=>\s*(?<mapped>[0-9A-Za-z]+))?$")
        .expect("item pattern is valid")
});

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("invalid range item '{0}'")]
    InvalidItem(String),
    #[error("'{0}' is not a decimal or 0x prefixed hex number")]
    InvalidNumber(String),
    #[error("'{0}' is outside the Unicode range 0x0-0x10FFFF")]
    OutOfRange(String),
    #[error("invalid range: start 0x{start:X} is after end 0x{end:X}")]
    Reversed { start: u32, end: u32 },
    #[error("range 0x{start:X}-0x{end:X} mapped to 0x{mapped:X} runs past 0x10FFFF")]
    MappedOutOfRange { start: u32, end: u32, mapped: u32 },
}

/// An inclusive span of source codepoints and where it lands in the output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodepointRange {
    pub start: u32,
    pub end: u32,
    pub mapped_start: u32,
}

impl CodepointRange {
    pub fn single(codepoint: u32) -> Self {
        Self {
            start: codepoint,
            end: codepoint,
            mapped_start: codepoint,
        }
    }

    pub fn mappings(&self) -> impl Iterator<Item = CodepointMapping> + '_ {
        (self.start..=self.end)
            .map(|source| CodepointMapping::new(source, self.mapped_start + (source - self.start)))
    }
}

fn parse_codepoint(s: &str) -> Result<u32, RangeError> {
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    }
    .map_err(|_| RangeError::InvalidNumber(s.to_owned()))?;
    u32::try_from(value)
        .ok()
        .filter(|cp| *cp <= MAX_CODEPOINT)
        .ok_or_else(|| RangeError::OutOfRange(s.to_owned()))
}

/// Parse a range string, expanding preset names.
pub fn parse_ranges(input: &str) -> Result<Vec<CodepointRange>, RangeError> {
    let mut result = Vec::new();
    for item in input.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        if let Some((_, preset)) = PRESETS.iter().find(|(name, _)| name.eq_ignore_ascii_case(item)) {
            result.extend(parse_ranges(preset)?);
            continue;
        }
        let captures = ITEM
            .captures(item)
            .ok_or_else(|| RangeError::InvalidItem(item.to_owned()))?;
        let start = parse_codepoint(&captures["start"])?;
        let end = captures
            .name("end")
            .map(|m| parse_codepoint(m.as_str()))
            .transpose()?
            .unwrap_or(start);
        let mapped_start = captures
            .name("mapped")
            .map(|m| parse_codepoint(m.as_str()))
            .transpose()?
            .unwrap_or(start);
        if start > end {
            return Err(RangeError::Reversed { start, end });
        }
        if mapped_start as u64 + (end - start) as u64 > MAX_CODEPOINT as u64 {
            return Err(RangeError::MappedOutOfRange {
                start,
                end,
                mapped: mapped_start,
            });
        }
        result.push(CodepointRange {
            start,
            end,
            mapped_start,
        });
    }
    log::debug!("parsed '{input}' into {} ranges", result.len());
    Ok(result)
}

/// One unmapped range per character.
pub fn parse_symbols(symbols: &str) -> Vec<CodepointRange> {
    symbols.chars().map(|c| CodepointRange::single(c as u32)).collect()
}

/// Flatten ranges into mappings, in order.
///
/// Overlapping source ranges are allowed but reported.
pub fn expand(ranges: &[CodepointRange]) -> Vec<CodepointMapping> {
    let mut seen = HashSet::new();
    let mut overlapping = 0;
    let mappings: Vec<_> = ranges
        .iter()
        .flat_map(CodepointRange::mappings)
        .inspect(|mapping| {
            if !seen.insert(mapping.source) {
                overlapping += 1;
            }
        })
        .collect();
    if overlapping > 0 {
        log::warn!("{overlapping} codepoints are selected more than once");
    }
    if seen.len() > LARGE_SELECTION {
        log::warn!("large selection of {} codepoints", seen.len());
    }
    mappings
}
