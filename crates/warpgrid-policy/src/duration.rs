//! Human-readable duration strings: `"500ms"`, `"30s"`, `"5m"`, `"1h"`.
//!
//! A bare integer is read as seconds. Used for policy cooldowns and for
//! the autoscaler's interval settings.

use std::time::Duration;

use crate::error::{PolicyError, PolicyResult};

const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Parse a duration string like `"30s"` or `"5m"`.
pub fn parse_duration(s: &str) -> PolicyResult<Duration> {
    let s = s.trim();
    let invalid = || PolicyError::InvalidDuration(s.to_string());

    // Order matters: "ns" and "ms" must be tried before "s".
    let (digits, nanos_per_unit) = if let Some(v) = s.strip_suffix("ns") {
        (v, 1)
    } else if let Some(v) = s.strip_suffix("ms") {
        (v, NANOS_PER_MILLI)
    } else if let Some(v) = s.strip_suffix('s') {
        (v, NANOS_PER_SEC)
    } else if let Some(v) = s.strip_suffix('m') {
        (v, 60 * NANOS_PER_SEC)
    } else if let Some(v) = s.strip_suffix('h') {
        (v, 3600 * NANOS_PER_SEC)
    } else {
        (s, NANOS_PER_SEC)
    };

    let n: u64 = digits.trim().parse().map_err(|_| invalid())?;
    n.checked_mul(nanos_per_unit)
        .map(Duration::from_nanos)
        .ok_or_else(invalid)
}

/// Format a duration in the largest unit that represents it exactly.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if d.subsec_nanos() == 0 {
        let secs = d.as_secs();
        if secs % 3600 == 0 {
            format!("{}h", secs / 3600)
        } else if secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{secs}s")
        }
    } else if nanos % 1_000_000 == 0 {
        format!("{}ms", nanos / 1_000_000)
    } else {
        format!("{nanos}ns")
    }
}

/// Serde adapter: `#[serde(with = "warpgrid_policy::duration::serde_str")]`.
pub mod serde_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Secs(u64),
            Text(String),
        }

        match Raw::deserialize(de)? {
            Raw::Secs(n) => Ok(Duration::from_secs(n)),
            Raw::Text(s) => super::parse_duration(&s).map_err(serde::de::Error::custom),
        }
    }
}
