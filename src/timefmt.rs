//! Timestamp formatting for long listings.

use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::Write as _;

use crate::data::Timestamp;

/// Half of an average Gregorian year, in seconds.
const SIX_MONTHS_SECS: i64 = 31_556_952 / 2;

/// How timestamps are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeStyle {
    /// `%b %e %H:%M` for recent files, `%b %e  %Y` otherwise.
    Locale,
    FullIso,
    LongIso,
    Iso,
    /// `+FORMAT`, optionally with a distinct format for recent files.
    Custom { old: String, recent: String },
}

impl TimeStyle {
    /// Parses a `--time-style` / `TIME_STYLE` value.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.strip_prefix("posix-").unwrap_or(value);
        match value {
            "locale" => Some(TimeStyle::Locale),
            "full-iso" => Some(TimeStyle::FullIso),
            "long-iso" => Some(TimeStyle::LongIso),
            "iso" => Some(TimeStyle::Iso),
            _ => {
                let format = value.strip_prefix('+')?;
                let (old, recent) = match format.split_once('\n') {
                    Some((old, recent)) => (old, recent),
                    None => (format, format),
                };
                Some(TimeStyle::Custom {
                    old: translate(old),
                    recent: translate(recent),
                })
            }
        }
    }

    fn formats(&self) -> (&str, &str) {
        match self {
            TimeStyle::Locale => ("%b %e  %Y", "%b %e %H:%M"),
            TimeStyle::FullIso => ("%Y-%m-%d %H:%M:%S.%f %z", "%Y-%m-%d %H:%M:%S.%f %z"),
            TimeStyle::LongIso => ("%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M"),
            TimeStyle::Iso => ("%Y-%m-%d ", "%m-%d %H:%M"),
            TimeStyle::Custom { old, recent } => (old, recent),
        }
    }
}

/// `date`-style `%N` is chrono's `%f`.
fn translate(format: &str) -> String {
    format.replace("%N", "%f")
}

/// Time zone used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Local,
    Utc,
}

impl Zone {
    /// Interprets a `TZ` value. Only names for UTC are special; everything
    /// else is left to the local-time machinery, which reads `TZ` itself.
    pub fn from_tz(tz: Option<&str>) -> Self {
        match tz.map(str::trim) {
            Some("" | "UTC" | "UTC0" | "GMT" | "GMT0" | "Z" | ":UTC" | "Etc/UTC") => Zone::Utc,
            _ => Zone::Local,
        }
    }
}

/// Formats timestamps relative to a fixed "now".
#[derive(Debug, Clone)]
pub struct TimeFormatter {
    style: TimeStyle,
    zone: Zone,
    now: Timestamp,
}

impl TimeFormatter {
    pub fn new(style: TimeStyle, zone: Zone, now: Timestamp) -> Self {
        Self { style, zone, now }
    }

    fn is_recent(&self, t: Timestamp) -> bool {
        self.now.secs - SIX_MONTHS_SECS < t.secs && t <= self.now
    }

    /// Renders `t`, falling back to the raw seconds when the time cannot be
    /// represented or the format is rejected.
    pub fn format(&self, t: Timestamp) -> String {
        let (old, recent) = self.style.formats();
        let fmt = if self.is_recent(t) { recent } else { old };
        let Some(utc) = DateTime::<Utc>::from_timestamp(t.secs, t.nanos) else {
            return t.secs.to_string();
        };
        let mut out = String::new();
        let written = match self.zone {
            Zone::Utc => write!(out, "{}", utc.format(fmt)),
            Zone::Local => write!(out, "{}", Local.from_utc_datetime(&utc.naive_utc()).format(fmt)),
        };
        match written {
            Ok(()) => out,
            Err(_) => t.secs.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc_formatter(style: TimeStyle) -> TimeFormatter {
        // 2024-06-15 12:00:00 UTC
        TimeFormatter::new(style, Zone::Utc, Timestamp::new(1_718_452_800, 0))
    }

    #[test]
    fn test_locale_recent_and_old() {
        let f = utc_formatter(TimeStyle::Locale);
        assert_eq!(f.format(Timestamp::new(1_718_445_600, 0)), "Jun 15 10:00");
        assert_eq!(f.format(Timestamp::new(1_577_836_800, 0)), "Jan  1  2020");
    }

    #[test]
    fn test_future_is_not_recent() {
        let f = utc_formatter(TimeStyle::Locale);
        assert_eq!(f.format(Timestamp::new(1_750_000_000, 0)), "Jun 15  2025");
    }

    #[test]
    fn test_iso_styles() {
        let t = Timestamp::new(1_718_445_600, 5);
        assert_eq!(
            utc_formatter(TimeStyle::FullIso).format(t),
            "2024-06-15 10:00:00.000000005 +0000"
        );
        assert_eq!(utc_formatter(TimeStyle::LongIso).format(t), "2024-06-15 10:00");
        assert_eq!(utc_formatter(TimeStyle::Iso).format(t), "06-15 10:00");
    }

    #[test]
    fn test_custom_style() {
        let style = TimeStyle::parse("+%Y/%m\n%H:%M").unwrap();
        let f = utc_formatter(style);
        assert_eq!(f.format(Timestamp::new(1_718_445_600, 0)), "10:00");
        assert_eq!(f.format(Timestamp::new(1_577_836_800, 0)), "2020/01");
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(TimeStyle::parse("bogus").is_none());
        assert_eq!(TimeStyle::parse("posix-long-iso"), Some(TimeStyle::LongIso));
    }

    #[test]
    fn test_zone_from_tz() {
        assert_eq!(Zone::from_tz(Some("UTC")), Zone::Utc);
        assert_eq!(Zone::from_tz(Some("Europe/Paris")), Zone::Local);
        assert_eq!(Zone::from_tz(None), Zone::Local);
    }
}
