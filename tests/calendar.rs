use cspcert::calendar::{
    CALENDAR_TIME_LEN, CalendarTime, TICK_EPOCH, from_native_ticks, from_provider_time,
    to_native_ticks, to_provider_time, truncate_to_millisecond,
};
use cspcert::error::CspCertError;
use proptest::prelude::*;
use time::macros::datetime;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Ticks between 1601-01-01 and the Unix epoch.
const UNIX_EPOCH_TICKS: i64 = 116_444_736_000_000_000;

/// -9999-01-01T00:00:00Z and 9999-12-31T23:59:59Z, the `time` crate's default range.
const MIN_UNIX_SECONDS: i64 = -377_705_116_800;
const MAX_UNIX_SECONDS: i64 = 253_402_300_799;
const SECONDS_PER_DAY: i64 = 86_400;

#[test]
fn round_trips_at_millisecond_resolution() {
    for instant in [
        datetime!(1601-01-01 0:00 UTC),
        datetime!(1970-01-01 0:00 UTC),
        datetime!(2024-02-29 23:59:59.999 UTC),
        datetime!(9999-12-31 23:59:59.999 UTC),
    ] {
        let calendar = to_provider_time(instant).unwrap();
        assert_eq!(from_provider_time(&calendar).unwrap(), instant);
    }
}

#[test]
fn sub_millisecond_precision_is_truncated() {
    let instant = datetime!(2024-06-15 8:15:30.999999 UTC);
    let calendar = to_provider_time(instant).unwrap();
    assert_eq!(calendar.milliseconds, 999);
    assert_eq!(calendar.second, 30);
    assert_eq!(
        from_provider_time(&calendar).unwrap(),
        datetime!(2024-06-15 8:15:30.999 UTC)
    );
    assert_eq!(
        truncate_to_millisecond(instant),
        datetime!(2024-06-15 8:15:30.999 UTC)
    );
}

#[test]
fn offsets_are_normalized_to_utc() {
    let calendar = to_provider_time(datetime!(2024-01-01 1:00 +2)).unwrap();
    assert_eq!(
        calendar,
        CalendarTime {
            year: 2023,
            month: 12,
            day_of_week: 0,
            day: 31,
            hour: 23,
            minute: 0,
            second: 0,
            milliseconds: 0,
        }
    );
    assert_eq!(
        from_provider_time(&calendar).unwrap(),
        datetime!(2023-12-31 23:00 UTC)
    );
}

#[test]
fn years_outside_calendar_range_are_rejected() {
    for instant in [
        datetime!(1600-12-31 23:59:59 UTC),
        datetime!(0001-01-01 0:00 UTC),
    ] {
        let err = to_provider_time(instant).unwrap_err();
        assert!(matches!(err, CspCertError::TimeConversion(_)), "{err:?}");
    }
}

#[test]
fn offsets_pushing_past_supported_dates_are_rejected() {
    for instant in [
        datetime!(9999-12-31 23:30 -1),
        datetime!(-9999-01-01 0:00 +1),
    ] {
        let err = to_provider_time(instant).unwrap_err();
        assert!(matches!(err, CspCertError::TimeConversion(_)), "{instant}: {err:?}");
    }
}

/// Local wall-clock fields from a UTC timestamp, reinterpreted at `offset`.
fn local_instant(seconds: i64, nanos: u32, offset_seconds: i32) -> OffsetDateTime {
    let utc = OffsetDateTime::from_unix_timestamp(seconds)
        .unwrap()
        .replace_nanosecond(nanos)
        .unwrap();
    let offset = UtcOffset::from_whole_seconds(offset_seconds).unwrap();
    PrimitiveDateTime::new(utc.date(), utc.time()).assume_offset(offset)
}

fn check_round_trip(instant: OffsetDateTime) -> Result<(), TestCaseError> {
    let in_range = instant
        .checked_to_offset(UtcOffset::UTC)
        .is_some_and(|utc| (1601..=9999).contains(&utc.year()));
    match to_provider_time(instant) {
        Ok(calendar) => {
            prop_assert!(in_range, "{instant} should have been rejected");
            let decoded = from_provider_time(&calendar);
            prop_assert!(decoded.is_ok(), "{calendar:?}: {decoded:?}");
            if let Ok(decoded) = decoded {
                prop_assert_eq!(decoded, truncate_to_millisecond(instant));
                prop_assert_eq!(decoded.offset(), UtcOffset::UTC);
            }
        }
        Err(err) => {
            prop_assert!(!in_range, "{instant}: {err:?}");
            prop_assert!(matches!(err, CspCertError::TimeConversion(_)), "{err:?}");
        }
    }
    Ok(())
}

fn edge_seconds() -> impl Strategy<Value = i64> {
    prop_oneof![
        MIN_UNIX_SECONDS..MIN_UNIX_SECONDS + 2 * SECONDS_PER_DAY,
        MAX_UNIX_SECONDS - 2 * SECONDS_PER_DAY..=MAX_UNIX_SECONDS,
    ]
}

proptest! {
    /// Any instant either round-trips at millisecond resolution or is
    /// rejected as outside 1601..=9999.
    #[test]
    fn provider_time_round_trips_or_rejects(
        seconds in MIN_UNIX_SECONDS..=MAX_UNIX_SECONDS,
        nanos in 0u32..1_000_000_000,
        offset_seconds in -86_399i32..=86_399,
    ) {
        check_round_trip(local_instant(seconds, nanos, offset_seconds))?;
    }

    #[test]
    fn provider_time_handles_range_edges(
        seconds in edge_seconds(),
        nanos in 0u32..1_000_000_000,
        offset_seconds in -86_399i32..=86_399,
    ) {
        check_round_trip(local_instant(seconds, nanos, offset_seconds))?;
    }
}

#[test]
fn native_tick_epoch_is_a_monday() {
    let calendar = from_native_ticks(0).unwrap();
    assert_eq!((calendar.year, calendar.month, calendar.day), (1601, 1, 1));
    assert_eq!(calendar.day_of_week, 1);
    assert_eq!(to_native_ticks(TICK_EPOCH).unwrap(), 0);
}

#[test]
fn unix_epoch_in_native_ticks() {
    let calendar = from_native_ticks(UNIX_EPOCH_TICKS).unwrap();
    assert_eq!(
        from_provider_time(&calendar).unwrap(),
        datetime!(1970-01-01 0:00 UTC)
    );
    assert_eq!(calendar.day_of_week, 4);
    assert_eq!(
        to_native_ticks(datetime!(1970-01-01 0:00 UTC)).unwrap(),
        UNIX_EPOCH_TICKS
    );
}

#[test]
fn native_ticks_keep_milliseconds() {
    // one tick is 100ns; 12_345_678 ticks is 1.2345678s
    let calendar = from_native_ticks(12_345_678).unwrap();
    assert_eq!((calendar.second, calendar.milliseconds), (1, 234));
    assert_eq!(
        to_native_ticks(datetime!(1601-01-01 0:00:01.2345678 UTC)).unwrap(),
        12_345_678
    );
}

#[test]
fn negative_ticks_are_rejected() {
    assert!(matches!(
        from_native_ticks(-1),
        Err(CspCertError::TimeConversion(_))
    ));
    assert!(matches!(
        to_native_ticks(datetime!(1600-12-31 23:59:59 UTC)),
        Err(CspCertError::TimeConversion(_))
    ));
}

#[test]
fn invalid_calendar_fields_are_rejected() {
    let valid = to_provider_time(datetime!(2023-02-28 12:00 UTC)).unwrap();
    let broken = [
        CalendarTime { month: 0, ..valid },
        CalendarTime { month: 13, ..valid },
        CalendarTime { day: 29, ..valid },
        CalendarTime { day: 0, ..valid },
        CalendarTime { hour: 24, ..valid },
        CalendarTime { minute: 60, ..valid },
        CalendarTime { second: 60, ..valid },
        CalendarTime { milliseconds: 1000, ..valid },
        CalendarTime { year: 1600, ..valid },
        CalendarTime { year: 10000, ..valid },
    ];
    for calendar in broken {
        let err = from_provider_time(&calendar).unwrap_err();
        assert!(matches!(err, CspCertError::TimeConversion(_)), "{calendar:?}: {err:?}");
    }
}

#[test]
fn day_of_week_is_ignored_when_decoding() {
    let calendar = to_provider_time(datetime!(2024-01-01 0:00 UTC)).unwrap();
    let wrong_weekday = CalendarTime {
        day_of_week: 5,
        ..calendar
    };
    assert_eq!(
        from_provider_time(&wrong_weekday).unwrap(),
        datetime!(2024-01-01 0:00 UTC)
    );
}

#[test]
fn little_endian_layout() {
    let calendar = to_provider_time(datetime!(2024-01-01 0:00 UTC)).unwrap();
    let bytes = calendar.to_le_bytes();
    assert_eq!(bytes.len(), CALENDAR_TIME_LEN);
    assert_eq!(
        bytes,
        [0xE8, 0x07, 1, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0]
    );
    assert_eq!(CalendarTime::from_le_bytes(bytes), calendar);
}
