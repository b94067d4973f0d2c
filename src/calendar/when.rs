//! Day and time-range phrases ("tomorrow", "friday", "nov 2", "3pm to 5pm").

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Weekday};
use regex::Regex;

/// A half-open local time interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl TimeWindow {
    /// Midnight to midnight on `date`.
    pub fn day(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN);
        Self {
            start: to_local(start),
            end: to_local(start + Duration::days(1)),
        }
    }

    /// `start..end` on `date`; an end before the start is read as the
    /// following half day ("11 to 1" means 11am to 1pm).
    pub fn between(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Self {
        let start = date.and_time(start);
        let mut end = date.and_time(end);
        if end <= start {
            end += Duration::hours(12);
        }
        Self {
            start: to_local(start),
            end: to_local(end),
        }
    }
}

fn to_local(naive: NaiveDateTime) -> DateTime<Local> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Resolve the first day phrase in `text` relative to `today`.
pub fn parse_day(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let low = text.to_lowercase();
    let words: Vec<&str> = low
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.contains(&"today") || words.contains(&"tonight") {
        return Some(today);
    }
    if words.contains(&"tomorrow") {
        return today.succ_opt();
    }
    for (name, weekday) in WEEKDAYS {
        if words.contains(&name) {
            let ahead = (7 + weekday.num_days_from_monday() - today.weekday().num_days_from_monday()) % 7;
            return today.checked_add_signed(Duration::days(ahead as i64));
        }
    }
    month_day(&low, today)
}

/// "nov 2", "November 2nd", "sept. 14": this year, or next year if already past.
fn month_day(low: &str, today: NaiveDate) -> Option<NaiveDate> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"\b([a-z]{3,9})\.?[\s,]+(\d{1,2})(?:st|nd|rd|th)?\b").ok())
        .as_ref()?;

    pattern.captures_iter(low).find_map(|captures| {
        let word = captures.get(1)?.as_str();
        let month = MONTHS.iter().position(|m| word.starts_with(m) && m.len() <= word.len())? as u32 + 1;
        let day: u32 = captures.get(2)?.as_str().parse().ok()?;
        let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
        if this_year < today {
            NaiveDate::from_ymd_opt(today.year() + 1, month, day)
        } else {
            Some(this_year)
        }
    })
}

/// "3pm to 5pm", "9:30 - 11", "14:00 until 15:30".
pub fn parse_time_range(text: &str) -> Option<(NaiveTime, NaiveTime)> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\s*(?:to|-|until|till|and)\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b",
            )
            .ok()
        })
        .as_ref()?;

    let c = pattern.captures(text)?;
    let number = |i: usize| c.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let meridiem = |i: usize| c.get(i).map(|m| m.as_str().to_lowercase());

    let end_meridiem = meridiem(6);
    // "3 to 5pm": the start inherits the end's am/pm
    let start_meridiem = meridiem(3).or_else(|| end_meridiem.clone());

    let start = clock(number(1)?, number(2).unwrap_or(0), start_meridiem.as_deref())?;
    let end = clock(number(4)?, number(5).unwrap_or(0), end_meridiem.as_deref())?;
    Some((start, end))
}

fn clock(hour: u32, minute: u32, meridiem: Option<&str>) -> Option<NaiveTime> {
    let hour = match meridiem {
        Some("pm") if hour < 12 => hour + 12,
        Some("am") if hour == 12 => 0,
        Some(_) if hour > 12 => return None,
        _ => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}
