//! Natural-language intents recognized before a line reaches the model.
//!
//! Only two are recognized: "take me to <place>" style navigation and
//! calendar questions ("what's on tomorrow", "am I free 3pm to 5pm").

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;

use crate::calendar::when::{parse_day, parse_time_range};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Directions to a saved place key (lowercased)
    Navigate { place: String },
    /// List the events on one day
    Agenda { day: NaiveDate },
    /// Check a time range for conflicts
    FreeBusy {
        day: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    },
}

/// Phrases that mark a calendar question.
const CALENDAR_TRIGGERS: &[&str] = &[
    "what do i have",
    "what's on",
    "whats on",
    "what's happening",
    "whats happening",
    "anything on",
    "busy on",
    "am i busy",
    "am i free",
    "am i available",
    "agenda",
    "calendar",
    "schedule",
    "events",
];

const FREE_BUSY_WORDS: &[&str] = &["free", "busy", "available"];

fn nav_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)\b(?:navigate|directions|route|drive|take me|go to|lead me)\s+(?:to\s+)?(?P<place>[A-Za-z0-9 _\-.,]+?)[.!?]*$",
            )
            .ok()
        })
        .as_ref()
}

/// Detect an intent in a free-text utterance.
pub fn detect(text: &str, today: NaiveDate) -> Option<Intent> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(place) = navigation_target(text) {
        return Some(Intent::Navigate { place });
    }

    if !mentions_calendar(text) {
        return None;
    }
    let day = parse_day(text, today).unwrap_or(today);
    let low = text.to_lowercase();
    if FREE_BUSY_WORDS.iter().any(|w| low.contains(w)) {
        if let Some((start, end)) = parse_time_range(text) {
            return Some(Intent::FreeBusy { day, start, end });
        }
    }
    Some(Intent::Agenda { day })
}

/// The place named in a navigation request, normalized as a place key.
pub fn navigation_target(text: &str) -> Option<String> {
    let captures = nav_pattern()?.captures(text.trim())?;
    let place = captures.name("place")?.as_str().trim();
    let place = place.strip_prefix("to ").unwrap_or(place).trim();
    (!place.is_empty()).then(|| place.to_lowercase())
}

/// Whether the text asks about the calendar at all.
pub fn mentions_calendar(text: &str) -> bool {
    let low = text.to_lowercase();
    CALENDAR_TRIGGERS.iter().any(|t| low.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 11).unwrap()
    }

    #[test]
    fn test_navigation_phrases() {
        for (text, place) in [
            ("take me to work", "work"),
            ("Navigate to Home", "home"),
            ("give me directions to the gym!", "the gym"),
            ("drive to 1 Main St.", "1 main st"),
        ] {
            assert_eq!(
                detect(text, today()),
                Some(Intent::Navigate {
                    place: place.to_string()
                }),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_place_stops_at_apostrophe() {
        assert_eq!(navigation_target("go to mom's"), None);
    }

    #[test]
    fn test_calendar_questions() {
        assert_eq!(
            detect("what's on tomorrow?", today()),
            Some(Intent::Agenda {
                day: NaiveDate::from_ymd_opt(2025, 6, 12).unwrap()
            })
        );
        assert_eq!(
            detect("show my calendar", today()),
            Some(Intent::Agenda { day: today() })
        );

        let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        assert_eq!(
            detect("am I free friday 3pm to 5pm", today()),
            Some(Intent::FreeBusy {
                day: NaiveDate::from_ymd_opt(2025, 6, 13).unwrap(),
                start: t(15),
                end: t(17),
            })
        );
    }

    #[test]
    fn test_ordinary_chat_has_no_intent() {
        for text in [
            "hello there",
            "tell me a joke about robots",
            "feel free to be brief",
            "",
        ] {
            assert_eq!(detect(text, today()), None, "{}", text);
        }
    }

    #[test]
    fn test_mentions_calendar() {
        assert!(mentions_calendar("What's on my Calendar"));
        assert!(!mentions_calendar("what is a calendrical system"));
    }
}
