//! Randomised values for request payloads

use chrono::{DateTime, Duration, Local, SecondsFormat, Timelike, Utc};
use fake::faker::lorem::en::{Paragraph, Sentence, Word};
use fake::Fake;
use rand::Rng;

/// Stateless fake-data helpers
#[derive(Debug, Clone, Copy, Default)]
pub struct DataGenerator;

impl DataGenerator {
    /// Replace `#` with a digit, `?` with a letter and `*` with either
    pub fn replace_symbols(pattern: &str) -> String {
        const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        const DIGITS: &[u8] = b"0123456789";

        let mut rng = rand::thread_rng();
        pattern
            .chars()
            .map(|c| match c {
                '#' => DIGITS[rng.gen_range(0..DIGITS.len())] as char,
                '?' => LETTERS[rng.gen_range(0..LETTERS.len())] as char,
                '*' => {
                    if rng.gen_bool(0.5) {
                        DIGITS[rng.gen_range(0..DIGITS.len())] as char
                    } else {
                        LETTERS[rng.gen_range(0..LETTERS.len())] as char
                    }
                }
                other => other,
            })
            .collect()
    }

    pub fn paragraph() -> String {
        Paragraph(3..6).fake()
    }

    pub fn sentence() -> String {
        Sentence(3..10).fake()
    }

    pub fn word() -> String {
        Word().fake()
    }

    /// Random integer between `min` and `max` inclusive; reversed bounds are swapped
    pub fn integer(min: i64, max: i64) -> i64 {
        let (low, high) = if min <= max { (min, max) } else { (max, min) };
        rand::thread_rng().gen_range(low..=high)
    }

    /// Random float between `min` and `max` rounded to `precision` decimals;
    /// reversed bounds are swapped
    pub fn float(min: f64, max: f64, precision: u32) -> f64 {
        let (low, high) = if min <= max { (min, max) } else { (max, min) };
        let value: f64 = rand::thread_rng().gen_range(low..=high);
        let factor = 10f64.powi(precision as i32);
        (value * factor).round() / factor
    }

    pub fn uuid() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// UTC time `minutes` from now, truncated to the minute, as ISO-8601
    pub fn utc_in_minutes(minutes: i64) -> String {
        to_iso(truncate_to_minute(Utc::now() + Duration::minutes(minutes)))
    }

    /// UTC time `hours` from now, truncated to the minute, as ISO-8601
    pub fn utc_in_hours(hours: i64) -> String {
        to_iso(truncate_to_minute(Utc::now() + Duration::hours(hours)))
    }

    /// Local time `minutes` from now, truncated to the minute
    pub fn local_in_minutes(minutes: i64) -> String {
        to_local_string(truncate_to_minute(Local::now() + Duration::minutes(minutes)))
    }

    /// Local time `hours` from now, truncated to the minute
    pub fn local_in_hours(hours: i64) -> String {
        to_local_string(truncate_to_minute(Local::now() + Duration::hours(hours)))
    }
}

fn truncate_to_minute<Tz: chrono::TimeZone>(at: DateTime<Tz>) -> DateTime<Tz> {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

fn to_iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn to_local_string(at: DateTime<Local>) -> String {
    at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}
