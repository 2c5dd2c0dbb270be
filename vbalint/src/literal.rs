//! Uniform ordering and equality over heterogeneous source literals.
//!
//! Value-sensitive inspections (range reasoning over `Select Case` arms,
//! unreachable-branch detection) need to compare literals whose surface
//! spelling differs: `#1/15/2020#` and `#January 15, 2020#` denote the same
//! instant, `True` compares as the numeric -1. [`ComparableLiteral`] wraps a
//! literal plus its declared kind and compares through a normalized numeric
//! equivalent, so compatible kinds order correctly and incompatible kinds
//! fail with an explicit [`Incomparable`] signal instead of an arbitrary
//! default ordering.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

/// The declared kind of a source literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum LiteralKind {
    /// Integer or floating-point numeric literal.
    Number,
    /// Date literal (`#...#`).
    Date,
    /// String literal.
    Text,
    /// `True` / `False`.
    Boolean,
}

impl LiteralKind {
    /// Canonical display form of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LiteralKind::Number => "Number",
            LiteralKind::Date => "Date",
            LiteralKind::Text => "Text",
            LiteralKind::Boolean => "Boolean",
        }
    }
}

/// Comparison failure across kinds with no common normalized representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incomparable {
    /// Kind of the left operand.
    pub left: LiteralKind,
    /// Kind of the right operand.
    pub right: LiteralKind,
}

impl std::fmt::Display for Incomparable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot compare {} literal with {} literal",
            self.left.as_str(),
            self.right.as_str()
        )
    }
}

impl std::error::Error for Incomparable {}

/// Normalized representation used for ordering, equality and hashing.
///
/// Dates reduce to their serial value (days since the 1899-12-30 epoch,
/// time of day as a fraction), booleans to -1/0, so every non-text kind
/// lives on the same numeric axis.
#[derive(Debug, Clone)]
enum Normalized {
    Number(f64),
    Text(String),
}

/// A literal value with a total order over its normalized representation.
#[derive(Debug, Clone)]
pub struct ComparableLiteral {
    kind: LiteralKind,
    normalized: Normalized,
}

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Day zero of the date serial representation, 1899-12-30.
fn serial_epoch() -> NaiveDate {
    static EPOCH: OnceLock<NaiveDate> = OnceLock::new();
    #[allow(clippy::expect_used)]
    *EPOCH.get_or_init(|| {
        NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid serial epoch")
    })
}

fn canonical(value: f64) -> f64 {
    // Collapse -0.0 so equal values hash identically through to_bits().
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

fn date_serial(value: NaiveDateTime) -> f64 {
    let days = value.date().signed_duration_since(serial_epoch()).num_days();
    let seconds = f64::from(value.time().num_seconds_from_midnight());
    days as f64 + seconds / SECONDS_PER_DAY
}

/// Date spellings accepted by [`ComparableLiteral::parse_date`].
const DATETIME_FORMATS: &[&str] = &["%m/%d/%Y %H:%M:%S", "%Y-%m-%d %H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%B %d, %Y", "%d %B %Y", "%Y-%m-%d"];

impl ComparableLiteral {
    /// Wraps a numeric literal.
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self {
            kind: LiteralKind::Number,
            normalized: Normalized::Number(canonical(value)),
        }
    }

    /// Wraps a boolean literal. `True` normalizes to -1, `False` to 0,
    /// matching the language's numeric coercion rules.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self {
            kind: LiteralKind::Boolean,
            normalized: Normalized::Number(if value { -1.0 } else { 0.0 }),
        }
    }

    /// Wraps a date literal, normalized to its serial value.
    #[must_use]
    pub fn date(value: NaiveDateTime) -> Self {
        Self {
            kind: LiteralKind::Date,
            normalized: Normalized::Number(canonical(date_serial(value))),
        }
    }

    /// Wraps a string literal.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: LiteralKind::Text,
            normalized: Normalized::Text(value.into()),
        }
    }

    /// Parses a date literal from its source spelling.
    ///
    /// Accepts the `#...#` delimited form and several conventional
    /// spellings (`#1/15/2020#`, `#January 15, 2020#`, ISO dates, optional
    /// time of day). Returns `None` when no known format matches.
    #[must_use]
    pub fn parse_date(spelling: &str) -> Option<Self> {
        let trimmed = spelling.trim().trim_matches('#').trim();
        for format in DATETIME_FORMATS {
            if let Ok(value) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Some(Self::date(value));
            }
        }
        for format in DATE_FORMATS {
            if let Ok(value) = NaiveDate::parse_from_str(trimmed, format) {
                return Some(Self::date(value.and_hms_opt(0, 0, 0)?));
            }
        }
        None
    }

    /// The declared kind of the wrapped literal.
    #[must_use]
    pub const fn kind(&self) -> LiteralKind {
        self.kind
    }

    /// The normalized numeric equivalent, when the kind has one.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self.normalized {
            Normalized::Number(value) => Some(value),
            Normalized::Text(_) => None,
        }
    }

    /// The wrapped string value, for text literals.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.normalized {
            Normalized::Text(value) => Some(value),
            Normalized::Number(_) => None,
        }
    }

    /// Totally orders two literals over their normalized values.
    ///
    /// Kinds sharing the numeric axis (numbers, dates, booleans) compare
    /// against each other; text compares with text. Any other pairing is
    /// rejected with [`Incomparable`] for the calling rule to handle.
    pub fn try_compare(&self, other: &Self) -> Result<Ordering, Incomparable> {
        match (&self.normalized, &other.normalized) {
            (Normalized::Number(a), Normalized::Number(b)) => Ok(a.total_cmp(b)),
            (Normalized::Text(a), Normalized::Text(b)) => Ok(a.cmp(b)),
            _ => Err(Incomparable {
                left: self.kind,
                right: other.kind,
            }),
        }
    }
}

impl PartialEq for ComparableLiteral {
    fn eq(&self, other: &Self) -> bool {
        matches!(self.try_compare(other), Ok(Ordering::Equal))
    }
}

impl Eq for ComparableLiteral {}

impl Hash for ComparableLiteral {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash the normalized value, not the kind: a date and the number
        // carrying the same serial are equal and must hash equal.
        match &self.normalized {
            Normalized::Number(value) => {
                0u8.hash(state);
                value.to_bits().hash(state);
            }
            Normalized::Text(value) => {
                1u8.hash(state);
                value.hash(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(literal: &ComparableLiteral) -> u64 {
        let mut hasher = DefaultHasher::new();
        literal.hash(&mut hasher);
        hasher.finish()
    }

    fn numeric_samples() -> Vec<ComparableLiteral> {
        vec![
            ComparableLiteral::number(-10.0),
            ComparableLiteral::boolean(true),
            ComparableLiteral::number(0.0),
            ComparableLiteral::boolean(false),
            ComparableLiteral::number(0.5),
            ComparableLiteral::date(
                NaiveDate::from_ymd_opt(1900, 1, 1)
                    .and_then(|d| d.and_hms_opt(12, 0, 0))
                    .unwrap(),
            ),
            ComparableLiteral::number(42.0),
        ]
    }

    #[test]
    fn test_compare_is_antisymmetric_and_transitive() {
        let samples = numeric_samples();
        for a in &samples {
            for b in &samples {
                let forward = a.try_compare(b).unwrap();
                let backward = b.try_compare(a).unwrap();
                assert_eq!(forward.reverse(), backward);
                for c in &samples {
                    let bc = b.try_compare(c).unwrap();
                    if forward == bc {
                        assert_eq!(a.try_compare(c).unwrap(), forward);
                    }
                }
            }
        }
    }

    #[test]
    fn test_equals_is_reflexive_and_hash_consistent() {
        let mut samples = numeric_samples();
        samples.push(ComparableLiteral::text("hello"));
        for a in &samples {
            assert_eq!(a, a);
            for b in &samples {
                if a == b {
                    assert_eq!(hash_of(a), hash_of(b));
                }
            }
        }
    }

    #[test]
    fn test_date_spellings_denoting_same_instant_are_equal() {
        let slash = ComparableLiteral::parse_date("#1/15/2020#").unwrap();
        let written = ComparableLiteral::parse_date("#January 15, 2020#").unwrap();
        let iso = ComparableLiteral::parse_date("2020-01-15").unwrap();
        assert_eq!(slash, written);
        assert_eq!(slash, iso);
        assert_eq!(hash_of(&slash), hash_of(&written));
    }

    #[test]
    fn test_date_orders_against_numbers_through_serial_value() {
        // 1900-01-01 is serial day 2.
        let date = ComparableLiteral::date(
            NaiveDate::from_ymd_opt(1900, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap(),
        );
        assert_eq!(
            date.try_compare(&ComparableLiteral::number(2.0)).unwrap(),
            Ordering::Equal
        );
        assert_eq!(
            date.try_compare(&ComparableLiteral::number(3.0)).unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn test_boolean_true_normalizes_to_minus_one() {
        let yes = ComparableLiteral::boolean(true);
        assert_eq!(
            yes.try_compare(&ComparableLiteral::number(-1.0)).unwrap(),
            Ordering::Equal
        );
        assert_eq!(
            yes.try_compare(&ComparableLiteral::number(0.0)).unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn test_text_and_number_are_incomparable() {
        let text = ComparableLiteral::text("42");
        let number = ComparableLiteral::number(42.0);
        let err = text.try_compare(&number).unwrap_err();
        assert_eq!(err.left, LiteralKind::Text);
        assert_eq!(err.right, LiteralKind::Number);
        assert_ne!(text, number);
    }

    #[test]
    fn test_negative_zero_equals_positive_zero() {
        let neg = ComparableLiteral::number(-0.0);
        let pos = ComparableLiteral::number(0.0);
        assert_eq!(neg, pos);
        assert_eq!(hash_of(&neg), hash_of(&pos));
    }

    #[test]
    fn test_unparseable_date_spelling_is_rejected() {
        assert!(ComparableLiteral::parse_date("#not a date#").is_none());
    }
}
