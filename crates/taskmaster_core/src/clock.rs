use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, UtcOffset};

pub trait Clock {
    fn now(&self) -> OffsetDateTime;

    /// Calendar date in the clock's own offset.
    fn today(&self) -> Date {
        self.now().date()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(local_offset())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// RFC 3339 in UTC, the shape history timestamps are stored in.
pub fn timestamp(at: OffsetDateTime) -> String {
    let utc = at.to_offset(UtcOffset::UTC);
    utc.format(&Rfc3339)
        .unwrap_or_else(|_| utc.unix_timestamp().to_string())
}

pub fn unix_millis(at: OffsetDateTime) -> u64 {
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    u64::try_from(millis).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{Clock, FixedClock, timestamp, unix_millis};
    use time::macros::{date, datetime};

    #[test]
    fn fixed_clock_reports_its_date() {
        let clock = FixedClock(datetime!(2024-03-10 23:30 -2));
        assert_eq!(clock.today(), date!(2024 - 03 - 10));
    }

    #[test]
    fn timestamp_is_utc_rfc3339() {
        let at = datetime!(2024-03-10 23:30 -2);
        assert_eq!(timestamp(at), "2024-03-11T01:30:00Z");
    }

    #[test]
    fn unix_millis_clamps_pre_epoch() {
        assert_eq!(unix_millis(datetime!(1960-01-01 0:00 UTC)), 0);
        assert_eq!(unix_millis(datetime!(1970-01-01 0:00:01 UTC)), 1_000);
    }
}
