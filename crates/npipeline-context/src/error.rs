//! Errors for the context crate.

/// Failure converting a stored [`crate::Value`] into the type a caller asked
/// for (spec §3: "readers must tolerate absence", which covers shape
/// mismatch too).
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("stored value cannot be converted to the requested type")]
pub struct ValueConversionError;
