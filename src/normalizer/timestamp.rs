use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Publication timestamp layouts seen in the wild, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `Mon, 02 Jan 2006 15:04:05 MST`
    Rfc1123,
    /// `Mon, 02 Jan 2006 15:04:05 -0700`
    Rfc1123Z,
    /// `2006-01-02T15:04:05Z07:00`
    Rfc3339,
    /// `02 Jan 06 15:04 MST`
    Rfc822,
    /// `02 Jan 06 15:04 -0700`
    Rfc822Z,
}

pub const ACCEPTED_FORMATS: [TimestampFormat; 5] = [
    TimestampFormat::Rfc1123,
    TimestampFormat::Rfc1123Z,
    TimestampFormat::Rfc3339,
    TimestampFormat::Rfc822,
    TimestampFormat::Rfc822Z,
];

impl TimestampFormat {
    pub fn name(&self) -> &'static str {
        match self {
            TimestampFormat::Rfc1123 => "RFC 1123",
            TimestampFormat::Rfc1123Z => "RFC 1123 (numeric zone)",
            TimestampFormat::Rfc3339 => "RFC 3339",
            TimestampFormat::Rfc822 => "RFC 822",
            TimestampFormat::Rfc822Z => "RFC 822 (numeric zone)",
        }
    }

    pub fn parse(&self, s: &str) -> Option<DateTime<Utc>> {
        match self {
            TimestampFormat::Rfc1123 => parse_named_zone(strip_weekday(s)?, "%d %b %Y %H:%M:%S"),
            TimestampFormat::Rfc1123Z => {
                parse_numeric_zone(strip_weekday(s)?, "%d %b %Y %H:%M:%S %z")
            }
            TimestampFormat::Rfc3339 => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            TimestampFormat::Rfc822 => parse_named_zone(s, "%d %b %y %H:%M"),
            TimestampFormat::Rfc822Z => parse_numeric_zone(s, "%d %b %y %H:%M %z"),
        }
    }
}

/// Try every accepted format in order; the first match wins.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    ACCEPTED_FORMATS.iter().find_map(|format| {
        let parsed = format.parse(raw)?;
        tracing::trace!("Parsed {:?} as {}", raw, format.name());
        Some(parsed)
    })
}

// The weekday is informational only. Feeds get it wrong often enough that
// validating it against the date would reject otherwise good timestamps.
fn strip_weekday(s: &str) -> Option<&str> {
    let (day, rest) = s.split_once(", ")?;
    if day.len() == 3 && day.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(rest.trim_start())
    } else {
        None
    }
}

fn parse_numeric_zone(s: &str, format: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s, format)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_named_zone(s: &str, format: &str) -> Option<DateTime<Utc>> {
    let (local, zone) = s.rsplit_once(' ')?;
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let naive = NaiveDateTime::parse_from_str(local, format).ok()?;
    zone_offset(zone)?
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// North American zone names from RFC 822 section 5. Anything else is read as
/// UTC.
///
/// Named zones carry their real offset, so `MST` is UTC-7 and
/// `15:04:05 MST` lands on 22:04:05Z. Parsers that treat every unknown
/// abbreviation as a zero offset would report 15:04:05Z for the same input.
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    const HOUR: i32 = 3600;
    let hours = match zone.to_ascii_uppercase().as_str() {
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => 0,
    };
    FixedOffset::east_opt(hours * HOUR)
}
