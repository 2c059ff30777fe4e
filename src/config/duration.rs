//! Compact duration strings such as `"1m"`, `"1m30s"` or `"500ms"`.

use std::time::Duration;

/// Parse a duration like "1h", "30m", "1m30s", "250ms" or a bare number of
/// seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return Err("Empty duration".to_string());
    }

    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s.as_str();
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| format!("Missing unit in duration: {}", s))?;
        if digits == 0 {
            return Err(format!(
                "Invalid duration: {}. Use format like '1h', '30m', '1m30s'",
                s
            ));
        }
        let value: u64 = rest[..digits]
            .parse()
            .map_err(|_| format!("Invalid number in duration: {}", s))?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Some(Duration::from_millis(value)),
            "s" => Some(Duration::from_secs(value)),
            "m" => value.checked_mul(60).map(Duration::from_secs),
            "h" => value.checked_mul(3600).map(Duration::from_secs),
            "d" => value.checked_mul(86400).map(Duration::from_secs),
            unit => return Err(format!("Unknown unit '{}' in duration: {}", unit, s)),
        };
        total = part
            .and_then(|part| total.checked_add(part))
            .ok_or_else(|| format!("Duration too large: {}", s))?;
        rest = &rest[unit_len..];
    }

    Ok(total)
}

/// Format a duration for display, largest units first.
pub fn format_duration(duration: Duration) -> String {
    let mut millis = duration.as_millis();
    if millis == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    let units = [
        ("d", 86_400_000),
        ("h", 3_600_000),
        ("m", 60_000),
        ("s", 1000),
        ("ms", 1),
    ];
    for (unit, size) in units {
        if millis >= size {
            out.push_str(&format!("{}{}", millis / size, unit));
            millis %= size;
        }
    }
    out
}

/// Serde adapter for duration strings in the config file.
pub(crate) mod serde_duration {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_duration(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::super::parse_duration(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
