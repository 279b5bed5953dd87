use chrono::{DateTime, FixedOffset, Utc};

pub const TIME_UNAVAILABLE: &str = "Time N/A";

/// Best-effort wall-clock source. The hosted implementation trusts the
/// platform clock (kept by the OS NTP daemon); an embedded target would back
/// this with its own SNTP client.
pub trait TimeSource: Send + Sync {
    fn now_utc(&self) -> Option<DateTime<Utc>>;
}

pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now_utc(&self) -> Option<DateTime<Utc>> {
        Some(Utc::now())
    }
}

pub struct WallClock {
    source: Box<dyn TimeSource>,
    offset: FixedOffset,
}

impl WallClock {
    pub fn new(tz_offset_hours: i32, source: Box<dyn TimeSource>) -> Self {
        let offset = FixedOffset::east_opt(tz_offset_hours * 3_600)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
        Self { source, offset }
    }

    /// `YYYY-MM-DD HH:MM:SS` in the configured offset, or the sentinel when
    /// the time source has nothing trustworthy.
    pub fn timestamp(&self) -> String {
        match self.source.now_utc() {
            Some(now) => now
                .with_timezone(&self.offset)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            None => TIME_UNAVAILABLE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    struct FixedTime(Option<DateTime<Utc>>);

    impl TimeSource for FixedTime {
        fn now_utc(&self) -> Option<DateTime<Utc>> {
            self.0
        }
    }

    #[test]
    fn formats_in_configured_offset() {
        let instant = Utc.with_ymd_and_hms(2026, 2, 1, 3, 4, 5).unwrap();
        let clock = WallClock::new(-5, Box::new(FixedTime(Some(instant))));

        assert_eq!(clock.timestamp(), "2026-01-31 22:04:05");
    }

    #[test]
    fn unsynchronized_source_yields_sentinel() {
        let clock = WallClock::new(-5, Box::new(FixedTime(None)));
        assert_eq!(clock.timestamp(), TIME_UNAVAILABLE);
    }
}
