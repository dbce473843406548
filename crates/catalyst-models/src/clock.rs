use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;
use chrono_tz::Tz;

/// Three time concepts the core must keep distinct: UTC instants for the event
/// log, ET wall-clock for market-session gates, and elapsed durations for
/// hold-time exits (derived from two UTC instants, never a wall clock read).
///
/// Tests substitute `FrozenClock` so market-hours and hold-time logic is
/// deterministic.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;

    fn now_et(&self) -> DateTime<Tz> {
        self.now_utc().with_timezone(&New_York)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FrozenClock(pub DateTime<Utc>);

impl Clock for FrozenClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Convert a UTC instant to its ET wall-clock representation.
pub fn to_et(ts: DateTime<Utc>) -> DateTime<Tz> {
    ts.with_timezone(&New_York)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn frozen_clock_is_stable() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 10, 14, 0, 0).unwrap();
        let clock = FrozenClock(ts);
        assert_eq!(clock.now_utc(), ts);
        assert_eq!(clock.now_utc(), ts);
    }

    #[test]
    fn et_conversion_applies_offset() {
        // 14:00 UTC on 2024-01-10 (EST, UTC-5) is 09:00 ET.
        let ts = Utc.with_ymd_and_hms(2024, 1, 10, 14, 0, 0).unwrap();
        let et = to_et(ts);
        assert_eq!(et.format("%H:%M").to_string(), "09:00");
    }
}
