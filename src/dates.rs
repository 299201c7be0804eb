use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};

/// Largest serial Excel accepts (31 Dec 9999).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d %B %Y", "%d %b %Y", "%B %d, %Y", "%b %d, %Y"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Resolves a date cell to epoch milliseconds. Slash dates are read as
/// day/month/year; anything unresolvable is `0`.
pub fn resolve_timestamp(text: &str) -> i64 {
    let text = text.trim();
    if text.is_empty() {
        return 0;
    }

    let resolved = if text.contains('/') {
        parse_day_month_year(text).map(midnight_millis)
    } else {
        parse_generic(text)
    };

    resolved.unwrap_or(0)
}

fn parse_day_month_year(text: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = text.split('/').collect();
    if parts.len() != 3 {
        return None;
    }

    let day: u32 = parts[0].trim().parse().ok()?;
    let month: u32 = parts[1].trim().parse().ok()?;
    // "2025 10:15" -> "2025"
    let year: i32 = parts[2].split_whitespace().next()?.parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_generic(text: &str) -> Option<i64> {
    if let Ok(value) = text.parse::<f64>() {
        return excel_serial_to_datetime(value).map(|dt| dt.and_utc().timestamp_millis());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.timestamp_millis());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .map(midnight_millis)
}

/// Converts a 1900-system Excel serial (days since 30 Dec 1899, fraction is
/// time of day).
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }

    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let millis = (serial.fract() * 86_400_000.0).round() as i64;

    base.checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::milliseconds(millis))
}

fn midnight_millis(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}

pub fn millis_to_date(timestamp: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(timestamp).map(|dt| dt.date_naive())
}

/// Full English weekday name, e.g. "Monday".
pub fn weekday_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Bucket label for a week, e.g. "01 Sep".
pub fn week_label(week_start: NaiveDate) -> String {
    week_start.format("%d %b").to_string()
}

pub fn date_to_millis(date: NaiveDate) -> i64 {
    midnight_millis(date)
}
