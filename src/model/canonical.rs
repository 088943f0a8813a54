//! Canonical (normalized) values used for matching and comparison

use std::borrow::Cow;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A value after normalization.
///
/// Floats hash and compare by bit pattern with `-0.0` folded into `0.0` and all
/// NaNs equal, so canonical values can key a hash index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Canonical {
    Absent,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

fn float_bits(f: f64) -> u64 {
    if f.is_nan() {
        f64::NAN.to_bits()
    } else if f == 0.0 {
        0.0f64.to_bits()
    } else {
        f.to_bits()
    }
}

impl PartialEq for Canonical {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Canonical::Absent, Canonical::Absent) => true,
            (Canonical::Bool(a), Canonical::Bool(b)) => a == b,
            (Canonical::Int(a), Canonical::Int(b)) => a == b,
            (Canonical::Float(a), Canonical::Float(b)) => float_bits(*a) == float_bits(*b),
            (Canonical::Text(a), Canonical::Text(b)) => a == b,
            (Canonical::Date(a), Canonical::Date(b)) => a == b,
            (Canonical::DateTime(a), Canonical::DateTime(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Canonical {}

impl Hash for Canonical {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Canonical::Absent => {}
            Canonical::Bool(b) => b.hash(state),
            Canonical::Int(i) => i.hash(state),
            Canonical::Float(f) => float_bits(*f).hash(state),
            Canonical::Text(s) => s.hash(state),
            Canonical::Date(d) => d.hash(state),
            Canonical::DateTime(dt) => dt.hash(state),
        }
    }
}

impl Canonical {
    /// Check for the null sentinel
    pub fn is_absent(&self) -> bool {
        matches!(self, Canonical::Absent)
    }

    /// Numeric view of the value, if it is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Canonical::Int(i) => Some(*i as f64),
            Canonical::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Convert to a display string
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            Canonical::Absent => Cow::Borrowed("NULL"),
            Canonical::Bool(b) => Cow::Owned(b.to_string()),
            Canonical::Int(i) => Cow::Owned(i.to_string()),
            Canonical::Float(f) => Cow::Owned(f.to_string()),
            Canonical::Text(s) => Cow::Borrowed(s.as_str()),
            Canonical::Date(d) => Cow::Owned(d.to_string()),
            Canonical::DateTime(dt) => Cow::Owned(dt.to_string()),
        }
    }
}

impl std::fmt::Display for Canonical {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHasher;

    fn hash_of(v: &Canonical) -> u64 {
        let mut hasher = FxHasher::default();
        v.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_signed_zero_is_one_value() {
        assert_eq!(Canonical::Float(0.0), Canonical::Float(-0.0));
        assert_eq!(hash_of(&Canonical::Float(0.0)), hash_of(&Canonical::Float(-0.0)));
    }

    #[test]
    fn test_nan_hashes_consistently() {
        let a = Canonical::Float(f64::NAN);
        let b = Canonical::Float(-f64::NAN);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }
}
