use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Source of the current instant. Production code uses [`SystemClock`];
/// tests inject a [`FixedClock`].
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }

    /// A clock frozen at a wall-clock time in `timezone`. `None` when the
    /// local time does not exist (inside a DST gap).
    pub fn at_local(timezone: Tz, local: NaiveDateTime) -> Option<Self> {
        timezone
            .from_local_datetime(&local)
            .earliest()
            .map(|instant| Self::new(instant.with_timezone(&Utc)))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }
}

/// The current wall-clock time of a teacher in `timezone`.
pub fn now_in_timezone(clock: &dyn Clock, timezone: Tz) -> NaiveDateTime {
    clock.now().with_timezone(&timezone).naive_local()
}

const LOCAL_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

/// Parses an explicitly supplied "now". RFC 3339 input is converted into
/// `timezone`; naive input is taken as already local to it.
pub fn parse_local_instant(raw: &str, timezone: Tz) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&timezone).naive_local());
    }
    LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn fixed_clock_converts_into_teacher_zone() {
        let local = NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(8, 50, 0)
            .unwrap();
        let clock = FixedClock::at_local(chrono_tz::Europe::Berlin, local).unwrap();
        assert_eq!(clock.now().format("%H:%M").to_string(), "07:50");
        assert_eq!(now_in_timezone(&clock, chrono_tz::Europe::Berlin), local);
    }

    #[test]
    fn parses_offset_and_naive_inputs() {
        let tz = chrono_tz::Europe::Berlin;
        let from_utc = parse_local_instant("2025-01-06T07:50:00Z", tz).unwrap();
        let naive = parse_local_instant("2025-01-06T08:50", tz).unwrap();
        assert_eq!(from_utc, naive);
        assert!(parse_local_instant("next tuesday", tz).is_none());
    }
}
