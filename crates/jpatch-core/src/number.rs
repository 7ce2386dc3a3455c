use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Number as JsonNumber;

use crate::CanonicalizeError;

/// A JSON number normalized to IEEE-754 double precision.
///
/// Every number entering the tree passes through this type, so `1`, `1.0` and
/// `1e0` compare equal, and so do `0` and `-0`.
#[derive(Clone, Copy, Debug, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Number(f64);

impl Number {
    /// Creates a new [`Number`] after validating finiteness.
    ///
    /// ```
    /// # use jpatch_core::Number;
    /// let num = Number::new(42.0)?;
    /// assert_eq!(num.get(), 42.0);
    /// assert!(Number::new(f64::NAN).is_err());
    /// # Ok::<(), jpatch_core::CanonicalizeError>(())
    /// ```
    pub fn new(value: f64) -> Result<Self, CanonicalizeError> {
        if value.is_finite() {
            Ok(Self(value))
        } else {
            Err(CanonicalizeError::NotFinite { value })
        }
    }

    /// Returns the raw floating-point value.
    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }

    /// Stable textual form used when tokenizing array elements.
    ///
    /// Both zeroes map to `"0"`; other values use the shortest round-trip
    /// representation.
    ///
    /// ```
    /// # use jpatch_core::Number;
    /// assert_eq!(Number::new(-0.0)?.canonical(), "0");
    /// assert_eq!(Number::new(2.5)?.canonical(), "2.5");
    /// # Ok::<(), jpatch_core::CanonicalizeError>(())
    /// ```
    #[must_use]
    pub fn canonical(self) -> String {
        if self.0 == 0.0 {
            "0".to_string()
        } else {
            format!("{}", self.0)
        }
    }

    /// Converts the number into a `serde_json::Number`, preferring an integer
    /// representation when the value has no fractional part.
    pub fn to_json_number(self) -> JsonNumber {
        let value = if self.0 == 0.0 { 0.0 } else { self.0 };
        if value.fract() == 0.0 {
            if (i64::MIN as f64) <= value && value < (i64::MAX as f64) {
                return JsonNumber::from(value as i64);
            }
            if value >= 0.0 && value < (u64::MAX as f64) {
                return JsonNumber::from(value as u64);
            }
        }
        // Finite by construction, so `from_f64` always succeeds.
        JsonNumber::from_f64(value).unwrap_or_else(|| JsonNumber::from(0))
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json_number())
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Self(f64::from(value))
    }
}

impl From<u32> for Number {
    fn from(value: u32) -> Self {
        Self(f64::from(value))
    }
}
