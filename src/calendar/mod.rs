//! Calendar lookups
//!
//! Providers return the events in a local time window. Formatting for the
//! terminal and for speech lives here so every provider renders the same.

pub mod google;
pub mod when;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::error::{Error, Result};

pub use google::GoogleCalendar;
pub use when::TimeWindow;

/// Start or end of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTime {
    At(DateTime<FixedOffset>),
    /// All-day events carry a date only (end dates are exclusive)
    AllDay(NaiveDate),
}

impl EventTime {
    fn to_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::At(at) => at.with_timezone(&Utc),
            EventTime::AllDay(date) => TimeWindow::day(*date).start.with_timezone(&Utc),
        }
    }

    fn label(&self) -> String {
        match self {
            EventTime::At(at) => at.format("%a %b %d, %I:%M %p").to_string(),
            EventTime::AllDay(date) => date.format("%a %b %d (all day)").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub title: String,
    pub start: EventTime,
    pub end: EventTime,
    pub location: Option<String>,
}

impl CalendarEvent {
    /// `- Title | start → end | location`
    pub fn format_line(&self) -> String {
        let title = if self.title.trim().is_empty() {
            "(no title)"
        } else {
            self.title.as_str()
        };
        let mut line = format!("- {} | {} → {}", title, self.start.label(), self.end.label());
        if let Some(location) = self.location.as_deref().filter(|l| !l.trim().is_empty()) {
            line.push_str(" | ");
            line.push_str(location);
        }
        line
    }

    /// Whether the event intersects `window`.
    pub fn overlaps(&self, window: &TimeWindow) -> bool {
        self.start.to_utc() < window.end.with_timezone(&Utc)
            && self.end.to_utc() > window.start.with_timezone(&Utc)
    }
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Events in `window` for `identity`, earliest first, at most `max`.
    async fn list_events(
        &self,
        identity: &str,
        window: &TimeWindow,
        max: u32,
    ) -> Result<Vec<CalendarEvent>>;
}

/// Stands in when `calendar.enabled` is false.
pub struct DisabledCalendar;

#[async_trait]
impl CalendarProvider for DisabledCalendar {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn list_events(&self, _: &str, _: &TimeWindow, _: u32) -> Result<Vec<CalendarEvent>> {
        Err(Error::calendar("Calendar integration is disabled"))
    }
}

/// Terminal listing of one day's events.
pub fn format_agenda(day: NaiveDate, events: &[CalendarEvent]) -> String {
    if events.is_empty() {
        return format!("(No events on {}.)", day.format("%A %b %d, %Y"));
    }
    let mut out = format!("Events on {}:", day.format("%A %b %d, %Y"));
    for event in events {
        out.push('\n');
        out.push_str(&event.format_line());
    }
    out
}

/// Short spoken form of an agenda.
pub fn agenda_summary(day: NaiveDate, count: usize) -> String {
    let date = day.format("%A %B %d");
    match count {
        0 => format!("You have no events on {}.", date),
        1 => format!("You have 1 event on {}.", date),
        n => format!("You have {} events on {}.", n, date),
    }
}

/// Answer to "am I free ...": the conflicting events, if any.
pub fn format_free_busy(window: &TimeWindow, events: &[CalendarEvent]) -> (String, String) {
    let range = format!(
        "{} to {}",
        window.start.format("%I:%M %p"),
        window.end.format("%I:%M %p")
    );
    let conflicts: Vec<&CalendarEvent> = events.iter().filter(|e| e.overlaps(window)).collect();

    if conflicts.is_empty() {
        let text = format!("You're free on {} from {}.", window.start.format("%a %b %d"), range);
        return (text.clone(), text);
    }

    let mut text = format!("Busy from {}:", range);
    for event in &conflicts {
        text.push('\n');
        text.push_str(&event.format_line());
    }
    let spoken = match conflicts.len() {
        1 => "You have 1 conflict in that time.".to_string(),
        n => format!("You have {} conflicts in that time.", n),
    };
    (text, spoken)
}
