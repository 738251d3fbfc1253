//! Serde helper shared by backoff and jitter configuration DTOs: durations
//! round-trip through the configuration surface (spec §6) as plain
//! milliseconds rather than `serde`'s default `Duration` representation, to
//! match the flat, human-editable config shapes the rest of the ambient
//! stack uses.

pub(crate) mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
