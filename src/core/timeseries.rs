use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};

/// First day of the month containing `date`.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Shift a month-start date by `delta` months (negative goes back).
pub fn shift_months(date: NaiveDate, delta: i32) -> Option<NaiveDate> {
    let months = Months::new(delta.unsigned_abs());
    if delta >= 0 {
        date.checked_add_months(months)
    } else {
        date.checked_sub_months(months)
    }
}

/// Whole months between two dates, counting years as 12 months each.
/// Returns 0 when `end` is not after `start`.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let diff = (end.year() - start.year()) * 12 + (end.month() as i32 - start.month() as i32);
    diff.max(0) as u32
}

/// Month starts from `start` up to, but excluding, the month of `end`.
pub fn month_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let first = first_of_month(start);
    (0..months_between(start, end))
        .filter_map(|k| first.checked_add_months(Months::new(k)))
        .collect()
}

/// Parse the raw `YYYYMM` period code used in the archive files.
pub fn parse_period(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = raw[..4].parse().ok()?;
    let month: u32 = raw[4..].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Parse a month label read back from the store.
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM`.
pub fn parse_month_label(label: &str) -> Option<NaiveDate> {
    let label = label.trim();
    if let Ok(date) = NaiveDate::parse_from_str(label, "%Y-%m-%d") {
        return Some(first_of_month(date));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(label, "%Y-%m-%d %H:%M:%S") {
        return Some(first_of_month(ts.date()));
    }
    NaiveDate::parse_from_str(&format!("{}-01", label), "%Y-%m-%d").ok()
}

/// Parse a date given on the command line (`YYYY-MM-DD` or `YYYY-MM`).
pub fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_month_label(raw))
        .ok_or_else(|| format!("invalid date '{}', expected YYYY-MM-DD or YYYY-MM", raw))
}
