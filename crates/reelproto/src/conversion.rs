//! Lenient numeric fields.
//!
//! Clients are Lua programs that sometimes send numbers as strings. Integer
//! fields accept JSON integers, floats (truncated toward zero), and numeric
//! strings; anything else fails the whole message.

use serde::{de, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Int(u64),
    Float(f64),
    Text(String),
}

impl Loose {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Loose::Int(n) => Some(*n as f64),
            Loose::Float(f) => Some(*f),
            Loose::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

/// A strictly positive integer that fits in `u32`.
pub fn positive_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Loose::deserialize(deserializer)?;
    let value = match raw {
        Loose::Int(n) => n,
        other => other
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.trunc() as u64)
            .ok_or_else(|| de::Error::custom("expected a positive integer"))?,
    };

    match u32::try_from(value) {
        Ok(0) => Err(de::Error::custom("expected a positive integer, got 0")),
        Ok(v) => Ok(v),
        Err(_) => Err(de::Error::custom(format!("{} is out of range", value))),
    }
}

/// A finite, non-negative number of seconds.
pub fn seconds<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Loose::deserialize(deserializer)?;
    raw.as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0)
        .ok_or_else(|| de::Error::custom("expected a non-negative number of seconds"))
}
