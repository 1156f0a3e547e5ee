//! Conversions between UTC instants and the provider's calendar-time form.
//!
//! A provider describes instants as separate calendar fields
//! ([`CalendarTime`]) or as 64-bit counts of 100-nanosecond ticks since
//! 1601-01-01T00:00:00Z. Both forms are always UTC here: instants carrying
//! another offset are normalized before conversion, and every instant this
//! module produces is tagged UTC.
//!
//! Calendar form has millisecond resolution. Anything finer is truncated,
//! never rounded up.
//!
//! ```
//! use cspcert::calendar::{from_provider_time, to_provider_time};
//! use time::macros::datetime;
//!
//! let instant = datetime!(2024-01-01 12:30:45.6789 +2);
//! let calendar = to_provider_time(instant).unwrap();
//! assert_eq!((calendar.hour, calendar.milliseconds), (10, 678));
//! assert_eq!(
//!     from_provider_time(&calendar).unwrap(),
//!     datetime!(2024-01-01 10:30:45.678 UTC)
//! );
//! ```

use time::macros::datetime;
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::error::{CspCertError, Result};

/// Start of the provider's tick count.
pub const TICK_EPOCH: OffsetDateTime = datetime!(1601-01-01 0:00 UTC);

/// Number of 100-nanosecond ticks in one second.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

const NANOS_PER_TICK: i64 = 100;
const NANOS_PER_MILLI: u32 = 1_000_000;

/// Earliest year representable in calendar form.
pub const MIN_YEAR: u16 = 1601;
/// Latest year representable in calendar form.
pub const MAX_YEAR: u16 = 9999;

/// Size of the fixed little-endian encoding of a [`CalendarTime`].
pub const CALENDAR_TIME_LEN: usize = 16;

/// A UTC timestamp broken into calendar fields.
///
/// Field order and widths follow the provider's native layout, which is also
/// the order used by [`CalendarTime::to_le_bytes`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CalendarTime {
    pub year: u16,
    /// 1 = January.
    pub month: u16,
    /// 0 = Sunday. Informational only; decoding ignores it.
    pub day_of_week: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    pub milliseconds: u16,
}

impl CalendarTime {
    /// Writes the fields as eight little-endian `u16` values.
    pub fn to_le_bytes(&self) -> [u8; CALENDAR_TIME_LEN] {
        let fields = [
            self.year,
            self.month,
            self.day_of_week,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.milliseconds,
        ];
        let mut out = [0u8; CALENDAR_TIME_LEN];
        for (chunk, field) in out.chunks_exact_mut(2).zip(fields) {
            chunk.copy_from_slice(&field.to_le_bytes());
        }
        out
    }

    /// Reads the layout written by [`CalendarTime::to_le_bytes`].
    ///
    /// No field is validated here; [`from_provider_time`] does that.
    pub fn from_le_bytes(bytes: [u8; CALENDAR_TIME_LEN]) -> Self {
        let field = |index: usize| u16::from_le_bytes([bytes[2 * index], bytes[2 * index + 1]]);
        Self {
            year: field(0),
            month: field(1),
            day_of_week: field(2),
            day: field(3),
            hour: field(4),
            minute: field(5),
            second: field(6),
            milliseconds: field(7),
        }
    }
}

/// Drops everything below whole milliseconds.
pub fn truncate_to_millisecond(instant: OffsetDateTime) -> OffsetDateTime {
    let sub_milli = instant.nanosecond() % NANOS_PER_MILLI;
    instant - Duration::nanoseconds(i64::from(sub_milli))
}

/// Converts an instant to calendar form, normalizing it to UTC first.
pub fn to_provider_time(instant: OffsetDateTime) -> Result<CalendarTime> {
    let utc = instant.checked_to_offset(UtcOffset::UTC).ok_or_else(|| {
        CspCertError::TimeConversion(format!("{instant} has no UTC representation"))
    })?;
    let year = u16::try_from(utc.year())
        .ok()
        .filter(|year| (MIN_YEAR..=MAX_YEAR).contains(year))
        .ok_or_else(|| {
            CspCertError::TimeConversion(format!(
                "year {} is outside {MIN_YEAR}..={MAX_YEAR}",
                utc.year()
            ))
        })?;

    Ok(CalendarTime {
        year,
        month: u16::from(u8::from(utc.month())),
        day_of_week: u16::from(utc.weekday().number_days_from_sunday()),
        day: u16::from(utc.day()),
        hour: u16::from(utc.hour()),
        minute: u16::from(utc.minute()),
        second: u16::from(utc.second()),
        milliseconds: utc.millisecond(),
    })
}

/// Rebuilds a UTC instant from calendar fields.
pub fn from_provider_time(calendar: &CalendarTime) -> Result<OffsetDateTime> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&calendar.year) {
        return Err(CspCertError::TimeConversion(format!(
            "year {} is outside {MIN_YEAR}..={MAX_YEAR}",
            calendar.year
        )));
    }
    let narrow = |value: u16, name: &str| {
        u8::try_from(value)
            .map_err(|_| CspCertError::TimeConversion(format!("{name} {value} is out of range")))
    };

    let month = Month::try_from(narrow(calendar.month, "month")?)?;
    let date = Date::from_calendar_date(
        i32::from(calendar.year),
        month,
        narrow(calendar.day, "day")?,
    )?;
    let time = Time::from_hms_milli(
        narrow(calendar.hour, "hour")?,
        narrow(calendar.minute, "minute")?,
        narrow(calendar.second, "second")?,
        calendar.milliseconds,
    )?;
    Ok(PrimitiveDateTime::new(date, time).assume_utc())
}

/// Converts a native tick count into calendar form.
///
/// Negative counts are rejected, as is any count past the end of year 9999.
pub fn from_native_ticks(ticks: i64) -> Result<CalendarTime> {
    if ticks < 0 {
        return Err(CspCertError::TimeConversion(format!(
            "negative tick count {ticks}"
        )));
    }
    let offset = Duration::new(
        ticks / TICKS_PER_SECOND,
        ((ticks % TICKS_PER_SECOND) * NANOS_PER_TICK) as i32,
    );
    let instant = TICK_EPOCH.checked_add(offset).ok_or_else(|| {
        CspCertError::TimeConversion(format!("tick count {ticks} is out of range"))
    })?;
    to_provider_time(instant)
}

/// Converts an instant into a native tick count, truncating below one tick.
pub fn to_native_ticks(instant: OffsetDateTime) -> Result<i64> {
    let elapsed = instant - TICK_EPOCH;
    if elapsed.is_negative() {
        return Err(CspCertError::TimeConversion(format!(
            "{instant} precedes the tick epoch"
        )));
    }
    elapsed
        .whole_seconds()
        .checked_mul(TICKS_PER_SECOND)
        .and_then(|ticks| {
            ticks.checked_add(i64::from(elapsed.subsec_nanoseconds()) / NANOS_PER_TICK)
        })
        .ok_or_else(|| CspCertError::TimeConversion(format!("{instant} overflows the tick count")))
}
