//! Values storable in a [`crate::PipelineContext`] parameter bag.

use crate::error::ValueConversionError;
use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;

/// A value held by the context's parameter bag (spec §3: "a cooperative
/// parameters map (string→value)"; §6 well-known keys table).
///
/// Beyond the primitive scalars, two variants exist for the well-known keys
/// spec.md names explicitly: `Error` for `lastRetryExhaustedException` and
/// `Service` for `lineageCollector` and other injected collaborators.
#[derive(Clone)]
#[non_exhaustive]
pub enum Value {
    /// A boolean value.
    Bool(bool),
    /// A u64 value.
    U64(u64),
    /// A i64 value.
    I64(i64),
    /// A f64 value.
    F64(f64),
    /// A string value.
    String(String),
    /// A boxed error, e.g. the retry-exhaustion error stashed by a
    /// `Counting` pipe under `lastRetryExhaustedException`.
    Error(Arc<dyn StdError + Send + Sync>),
    /// An opaque injected service, e.g. a lineage collector.
    Service(Arc<dyn Any + Send + Sync>),
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::U64(v) => f.debug_tuple("U64").field(v).finish(),
            Value::I64(v) => f.debug_tuple("I64").field(v).finish(),
            Value::F64(v) => f.debug_tuple("F64").field(v).finish(),
            Value::String(v) => f.debug_tuple("String").field(v).finish(),
            Value::Error(e) => write!(f, "Error({e})"),
            Value::Service(_) => f.write_str("Service(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Service(a), Value::Service(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl TryFrom<Value> for u8 {
    type Error = ValueConversionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::U64(v) => u8::try_from(v).map_err(|_| ValueConversionError),
            Value::I64(v) => u8::try_from(v).map_err(|_| ValueConversionError),
            _ => Err(ValueConversionError),
        }
    }
}

impl TryFrom<Value> for u16 {
    type Error = ValueConversionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::U64(v) => u16::try_from(v).map_err(|_| ValueConversionError),
            Value::I64(v) => u16::try_from(v).map_err(|_| ValueConversionError),
            _ => Err(ValueConversionError),
        }
    }
}

impl TryFrom<Value> for u32 {
    type Error = ValueConversionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::U64(v) => u32::try_from(v).map_err(|_| ValueConversionError),
            Value::I64(v) => u32::try_from(v).map_err(|_| ValueConversionError),
            _ => Err(ValueConversionError),
        }
    }
}

impl TryFrom<Value> for u64 {
    type Error = ValueConversionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::U64(v) => Ok(v),
            Value::I64(v) => u64::try_from(v).map_err(|_| ValueConversionError),
            _ => Err(ValueConversionError),
        }
    }
}

impl TryFrom<Value> for i8 {
    type Error = ValueConversionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::U64(v) => i8::try_from(v).map_err(|_| ValueConversionError),
            Value::I64(v) => i8::try_from(v).map_err(|_| ValueConversionError),
            _ => Err(ValueConversionError),
        }
    }
}

impl TryFrom<Value> for i16 {
    type Error = ValueConversionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::U64(v) => i16::try_from(v).map_err(|_| ValueConversionError),
            Value::I64(v) => i16::try_from(v).map_err(|_| ValueConversionError),
            _ => Err(ValueConversionError),
        }
    }
}

impl TryFrom<Value> for i32 {
    type Error = ValueConversionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::U64(v) => i32::try_from(v).map_err(|_| ValueConversionError),
            Value::I64(v) => i32::try_from(v).map_err(|_| ValueConversionError),
            _ => Err(ValueConversionError),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = ValueConversionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::U64(v) => i64::try_from(v).map_err(|_| ValueConversionError),
            Value::I64(v) => Ok(v),
            _ => Err(ValueConversionError),
        }
    }
}

impl TryFrom<Value> for f32 {
    type Error = ValueConversionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::U64(v) => Ok(v as f32),
            Value::I64(v) => Ok(v as f32),
            Value::F64(v) => Ok(v as f32),
            _ => Err(ValueConversionError),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = ValueConversionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::U64(v) => Ok(v as f64),
            Value::I64(v) => Ok(v as f64),
            Value::F64(v) => Ok(v),
            _ => Err(ValueConversionError),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = ValueConversionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::String(v) => match v.to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(ValueConversionError),
            },
            _ => Err(ValueConversionError),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = ValueConversionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::U64(v) => Ok(v.to_string()),
            Value::I64(v) => Ok(v.to_string()),
            Value::F64(v) => Ok(v.to_string()),
            Value::Bool(v) => Ok(v.to_string()),
            Value::String(v) => Ok(v),
            _ => Err(ValueConversionError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_widening_conversions_round_trip() {
        assert_eq!(u64::try_from(Value::U64(7)), Ok(7));
        assert_eq!(i64::try_from(Value::I64(-3)), Ok(-3));
        assert_eq!(f64::try_from(Value::F64(1.5)), Ok(1.5));
    }

    #[test]
    fn bool_parses_from_string() {
        assert_eq!(bool::try_from(Value::String("true".into())), Ok(true));
        assert_eq!(bool::try_from(Value::String("FALSE".into())), Ok(false));
        assert_eq!(
            bool::try_from(Value::String("nope".into())),
            Err(ValueConversionError)
        );
    }

    #[test]
    fn service_values_compare_by_identity() {
        let a: Arc<dyn Any + Send + Sync> = Arc::new(42u32);
        let b = a.clone();
        let c: Arc<dyn Any + Send + Sync> = Arc::new(42u32);
        assert_eq!(Value::Service(a), Value::Service(b));
        assert_ne!(Value::Service(Arc::new(42u32)), Value::Service(c));
    }
}
