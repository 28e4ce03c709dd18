//! Plaintext values accepted by `encrypt`

use std::fmt;

use serde_json::Value;

/// A plaintext prior to encryption
///
/// Values arriving over JSON can be non-integral numbers; those are kept
/// as `Fractional` so validation can reject them instead of truncating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlainValue {
    Bool(bool),
    Integer(i128),
    Fractional(f64),
}

impl PlainValue {
    /// Convert a JSON value; strings, arrays, objects and null yield `None`
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(PlainValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Some(PlainValue::Integer(u as i128))
                } else if let Some(i) = n.as_i64() {
                    Some(PlainValue::Integer(i as i128))
                } else {
                    let f = n.as_f64()?;
                    if f.is_finite() && f.fract() == 0.0 && f.abs() < i128::MAX as f64 {
                        Some(PlainValue::Integer(f as i128))
                    } else {
                        Some(PlainValue::Fractional(f))
                    }
                }
            }
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PlainValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i128> {
        match self {
            PlainValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for PlainValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlainValue::Bool(b) => write!(f, "{}", b),
            PlainValue::Integer(i) => write!(f, "{}", i),
            PlainValue::Fractional(x) => write!(f, "{}", x),
        }
    }
}

impl From<bool> for PlainValue {
    fn from(b: bool) -> Self {
        PlainValue::Bool(b)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for PlainValue {
                fn from(v: $t) -> Self {
                    PlainValue::Integer(v as i128)
                }
            }
        )*
    };
}

impl_from_int!(u8, u16, u32, u64, i8, i16, i32, i64, usize);

impl From<f64> for PlainValue {
    fn from(v: f64) -> Self {
        PlainValue::Fractional(v)
    }
}
