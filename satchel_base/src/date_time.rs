use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

/// The beginning of time for a `WorldTime` that was never set (January 1st of year 1).
pub fn default_world() -> DateTime<Utc> {
    utc(1, 1, 1).unwrap_or_default()
}

/// Representative `WorldTime` used when synthesising example values.
pub fn fake_world() -> DateTime<Utc> {
    utc(1963, 3, 26).unwrap_or_default()
}

/// Seconds since the epoch of [`fake_world`], the synthetic `ClockTime`.
pub fn fake_clock() -> f64 {
    fake_world().timestamp() as f64
}

fn utc(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_opt(0, 0, 0)?;
    Some(DateTime::from_naive_utc_and_offset(NaiveDateTime::new(date, time), Utc))
}

/// RFC 3339 text with microsecond precision and a `Z` suffix.
pub fn world_to_text(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn world_from_text(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `TimeDelta` values travel as whole microseconds. `None` on overflow.
pub fn delta_to_micros(d: &Duration) -> Option<i64> {
    d.num_microseconds()
}

pub fn delta_from_micros(micros: i64) -> Duration {
    Duration::microseconds(micros)
}
