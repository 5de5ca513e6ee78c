#[cfg(test)]
#[path = "timestamp_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;
use chrono::DateTime;
use chrono::FixedOffset;
use chrono::NaiveDate;
use chrono::Utc;

/// Parses offsets written as `+09:00`, `-05:30` or `+0900`.
pub fn parse_utc_offset(text: &str) -> Result<FixedOffset> {
    let trimmed = text.trim();
    let sign = match trimmed.chars().next() {
        Some('+') => 1,
        Some('-') => -1,
        _ => bail!(format!("UTC offset must start with + or -: {text}")),
    };

    let digits = trimmed[1..].replace(':', "");
    if digits.len() != 4 || !digits.chars().all(|e| return e.is_ascii_digit()) {
        bail!(format!("UTC offset must look like +09:00: {text}"));
    }

    let hours = digits[..2].parse::<i32>()?;
    let minutes = digits[2..].parse::<i32>()?;
    if let Some(offset) = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)) {
        return Ok(offset);
    }

    bail!(format!("UTC offset out of range: {text}"))
}

pub fn now_in(offset: &FixedOffset) -> DateTime<FixedOffset> {
    return Utc::now().with_timezone(offset);
}

/// Formats `now` as a `YYYYMMDDhhmmss` token.
pub fn create_timestamp_token(now: &DateTime<FixedOffset>) -> String {
    return now.format("%Y%m%d%H%M%S").to_string();
}

/// Date part of a token, or `None` when the first eight characters are not a
/// valid calendar date.
pub fn token_date(token: &str) -> Option<NaiveDate> {
    let date = token.get(..8)?;
    if !date.chars().all(|e| return e.is_ascii_digit()) {
        return None;
    }

    let year = date[..4].parse::<i32>().ok()?;
    let month = date[4..6].parse::<u32>().ok()?;
    let day = date[6..8].parse::<u32>().ok()?;

    return NaiveDate::from_ymd_opt(year, month, day);
}

/// Time-of-day part of a token (`hhmmss`), empty when absent.
pub fn token_time(token: &str) -> &str {
    return token.get(8..).unwrap_or("");
}
