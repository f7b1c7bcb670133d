//! Civil (wall-clock) time for the business.
//!
//! Every date-only comparison and every cut-off ("after 11:00", "after 12:30") is made in a single fixed civil
//! timezone, regardless of where the server runs. Instants are stored in UTC; a civil date is represented in storage
//! by the UTC instant of its civil midnight.
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Timelike, Utc};

/// India Standard Time, UTC+05:30
pub const IST_OFFSET_MINUTES: i32 = 330;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilClock {
    offset: FixedOffset,
}

impl Default for CivilClock {
    fn default() -> Self {
        Self::from_offset_minutes(IST_OFFSET_MINUTES).unwrap_or_else(Self::utc)
    }
}

impl CivilClock {
    /// Returns `None` if the offset is a day or more away from UTC.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        let secs = minutes.checked_mul(60)?;
        FixedOffset::east_opt(secs).map(|offset| Self { offset })
    }

    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn civil(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }

    pub fn civil_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.civil(instant).date_naive()
    }

    pub fn civil_hour(&self, instant: DateTime<Utc>) -> u32 {
        self.civil(instant).hour()
    }

    pub fn minutes_since_midnight(&self, instant: DateTime<Utc>) -> u32 {
        let t = self.civil(instant);
        t.hour() * 60 + t.minute()
    }

    /// The UTC instant at which `date` begins in civil time.
    pub fn civil_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let local = date.and_time(NaiveTime::default());
        let utc = local - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&utc)
    }

    /// As [`Self::civil_midnight`], but `None` at the edges of the representable range.
    pub fn checked_civil_midnight(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let local = date.and_time(NaiveTime::default());
        let utc = local.checked_sub_signed(Duration::seconds(i64::from(self.offset.local_minus_utc())))?;
        Some(Utc.from_utc_datetime(&utc))
    }

    pub fn start_of_day(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        self.civil_midnight(self.civil_date(instant))
    }
}
