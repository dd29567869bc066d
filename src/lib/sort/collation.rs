//! Collation transforms producing binary-comparable, self-terminating keys.
//!
//! Every [`ComparisonMode`] maps text to a byte string whose lexicographic order
//! is the collation order of the text. Because each key ends with a terminator
//! that no key byte sequence can continue past, a fixed-width suffix (the record
//! id) can be appended without changing the order of distinct texts.
//!
//! # Key layouts
//!
//! **Ordinal** keys are the UTF-8 bytes of the text with `0x00` escaped as
//! `0x00 0xFF`, terminated by `0x00 0x00`. The ignore-case variant first maps
//! each character to its simple uppercase form.
//!
//! **Linguistic** keys (culture and invariant modes) have up to three levels
//! computed over the NFD decomposition of the text:
//!
//! | Level | Per base character                          | Terminator |
//! |-------|---------------------------------------------|------------|
//! | 1     | `[group, cp >> 16, cp >> 8, cp]` (lowercase) | `0x00`     |
//! | 2     | `[0x02, mark cp; 3]` per mark, then `0x01`   | `0x00`     |
//! | 3     | `0x01` lower/uncased, `0x02` upper           | `0x00`     |
//!
//! Groups order punctuation and whitespace (`0x01`) before digits (`0x02`)
//! before letters (`0x03`). Ignore-case modes omit level 3.

use std::fmt;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// String comparison mode used to derive collation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComparisonMode {
    /// Code point order.
    #[default]
    Ordinal,
    /// Code point order after simple uppercase mapping.
    OrdinalIgnoreCase,
    /// Linguistic order for the process locale.
    Culture,
    /// Linguistic order for the process locale, ignoring case.
    CultureIgnoreCase,
    /// Locale-independent linguistic order.
    Invariant,
    /// Locale-independent linguistic order, ignoring case.
    InvariantIgnoreCase,
}

impl ComparisonMode {
    /// All modes, in declaration order.
    pub const ALL: [ComparisonMode; 6] = [
        ComparisonMode::Ordinal,
        ComparisonMode::OrdinalIgnoreCase,
        ComparisonMode::Culture,
        ComparisonMode::CultureIgnoreCase,
        ComparisonMode::Invariant,
        ComparisonMode::InvariantIgnoreCase,
    ];

    /// Whether case differences are ignored.
    #[must_use]
    pub fn ignores_case(self) -> bool {
        matches!(
            self,
            ComparisonMode::OrdinalIgnoreCase
                | ComparisonMode::CultureIgnoreCase
                | ComparisonMode::InvariantIgnoreCase
        )
    }

    /// Whether keys depend on the process locale.
    #[must_use]
    pub fn is_culture_sensitive(self) -> bool {
        matches!(self, ComparisonMode::Culture | ComparisonMode::CultureIgnoreCase)
    }

    /// Resolve the mode to the function that appends its collation key.
    #[must_use]
    pub fn collator(self) -> CollateFn {
        match self {
            ComparisonMode::Ordinal => ordinal_key,
            ComparisonMode::OrdinalIgnoreCase => ordinal_ignore_case_key,
            ComparisonMode::Culture | ComparisonMode::Invariant => linguistic_key,
            ComparisonMode::CultureIgnoreCase | ComparisonMode::InvariantIgnoreCase => {
                linguistic_ignore_case_key
            }
        }
    }
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComparisonMode::Ordinal => "ordinal",
            ComparisonMode::OrdinalIgnoreCase => "ordinal-ignore-case",
            ComparisonMode::Culture => "culture",
            ComparisonMode::CultureIgnoreCase => "culture-ignore-case",
            ComparisonMode::Invariant => "invariant",
            ComparisonMode::InvariantIgnoreCase => "invariant-ignore-case",
        };
        f.write_str(name)
    }
}

/// Appends the collation key of `text` to `out`.
pub type CollateFn = fn(&str, &mut Vec<u8>);

/// Returns the collation locale of the process (`LC_ALL`, `LC_COLLATE`, `LANG`).
///
/// Falls back to `"C"` when none is set.
#[must_use]
pub fn process_locale() -> String {
    ["LC_ALL", "LC_COLLATE", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| "C".to_string())
}

// ============================================================================
// Ordinal
// ============================================================================

const ESCAPE: u8 = 0xFF;

#[inline]
fn push_escaped(bytes: &[u8], out: &mut Vec<u8>) {
    for &b in bytes {
        out.push(b);
        if b == 0 {
            out.push(ESCAPE);
        }
    }
}

fn ordinal_key(text: &str, out: &mut Vec<u8>) {
    push_escaped(text.as_bytes(), out);
    out.extend_from_slice(&[0, 0]);
}

fn ordinal_ignore_case_key(text: &str, out: &mut Vec<u8>) {
    let mut utf8 = [0u8; 4];
    for c in text.chars() {
        let folded = simple_uppercase(c);
        push_escaped(folded.encode_utf8(&mut utf8).as_bytes(), out);
    }
    out.extend_from_slice(&[0, 0]);
}

/// Uppercase mapping that keeps characters whose uppercase form expands (e.g. `ß`).
fn simple_uppercase(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

// ============================================================================
// Linguistic (multi-level)
// ============================================================================

const LEVEL_END: u8 = 0x00;
const GROUP_OTHER: u8 = 0x01;
const GROUP_DIGIT: u8 = 0x02;
const GROUP_LETTER: u8 = 0x03;
const MARK_SEPARATOR: u8 = 0x01;
const MARK_WEIGHT: u8 = 0x02;
const CASE_LOWER: u8 = 0x01;
const CASE_UPPER: u8 = 0x02;

/// A base character with the combining marks that follow it in NFD order.
struct Element {
    base: char,
    marks: Vec<char>,
}

fn elements(text: &str) -> Vec<Element> {
    let mut elements: Vec<Element> = Vec::with_capacity(text.len());
    for c in text.nfd() {
        match elements.last_mut() {
            Some(last) if is_combining_mark(c) => last.marks.push(c),
            // A mark with nothing before it stands on its own.
            _ => elements.push(Element { base: c, marks: Vec::new() }),
        }
    }
    elements
}

#[inline]
fn push_code_point(c: char, out: &mut Vec<u8>) {
    let cp = u32::from(c);
    out.extend_from_slice(&[(cp >> 16) as u8, (cp >> 8) as u8, cp as u8]);
}

fn primary_group(c: char) -> u8 {
    if c.is_numeric() {
        GROUP_DIGIT
    } else if c.is_alphabetic() {
        GROUP_LETTER
    } else {
        GROUP_OTHER
    }
}

fn linguistic_levels(text: &str, with_case: bool, out: &mut Vec<u8>) {
    let elements = elements(text);

    for element in &elements {
        for lower in element.base.to_lowercase() {
            out.push(primary_group(lower));
            push_code_point(lower, out);
        }
    }
    out.push(LEVEL_END);

    for element in &elements {
        for &mark in &element.marks {
            out.push(MARK_WEIGHT);
            push_code_point(mark, out);
        }
        out.push(MARK_SEPARATOR);
    }
    out.push(LEVEL_END);

    if with_case {
        for element in &elements {
            out.push(if element.base.is_uppercase() { CASE_UPPER } else { CASE_LOWER });
        }
        out.push(LEVEL_END);
    }
}

fn linguistic_key(text: &str, out: &mut Vec<u8>) {
    linguistic_levels(text, true, out);
}

fn linguistic_ignore_case_key(text: &str, out: &mut Vec<u8>) {
    linguistic_levels(text, false, out);
}
