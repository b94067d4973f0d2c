//! Google Calendar v3 provider
//!
//! Reads the primary calendar with a per-identity OAuth access token stored
//! at `<data_dir>/calendar/<identity>.token.json`. Obtaining and refreshing
//! the token is left to an external helper.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::CalendarSettings;
use crate::error::{Error, Result};
use crate::store::identity_key;

use super::{CalendarEvent, CalendarProvider, EventTime, TimeWindow};

// ─────────────────────────────────────────────────────────────────
// API types
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StoredToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    location: Option<String>,
    start: ApiEventTime,
    end: ApiEventTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    #[serde(default)]
    date_time: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

impl ApiEventTime {
    fn parse(&self) -> Option<EventTime> {
        if let Some(ref at) = self.date_time {
            return DateTime::parse_from_rfc3339(at).ok().map(EventTime::At);
        }
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(EventTime::AllDay)
    }
}

impl ApiEvent {
    fn into_event(self) -> Option<CalendarEvent> {
        Some(CalendarEvent {
            start: self.start.parse()?,
            end: self.end.parse()?,
            title: self.summary.unwrap_or_default(),
            location: self.location,
        })
    }
}

// ─────────────────────────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────────────────────────

pub struct GoogleCalendar {
    client: Client,
    base_url: String,
    token_dir: PathBuf,
}

impl GoogleCalendar {
    pub fn new(settings: &CalendarSettings, token_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(crate::version::build_info().user_agent())
            .build()
            .map_err(|e| Error::calendar(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token_dir: token_dir.into(),
        })
    }

    pub fn token_path(&self, identity: &str) -> PathBuf {
        self.token_dir
            .join(format!("{}.token.json", identity_key(identity)))
    }

    fn access_token(&self, identity: &str) -> Result<String> {
        let path = self.token_path(identity);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MissingCredential {
                    capability: "calendar".to_string(),
                    path,
                })
            }
            Err(e) => return Err(Error::IoRead { path, source: e }),
        };

        let token: StoredToken = serde_json::from_str(&content)
            .map_err(|e| Error::store_corrupt(&path, e.to_string()))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendar {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn list_events(
        &self,
        identity: &str,
        window: &TimeWindow,
        max: u32,
    ) -> Result<Vec<CalendarEvent>> {
        let token = self.access_token(identity)?;
        let url = format!("{}/calendars/primary/events", self.base_url);
        let time_min = window.start.to_rfc3339_opts(SecondsFormat::Secs, false);
        let time_max = window.end.to_rfc3339_opts(SecondsFormat::Secs, false);
        let max_results = max.to_string();

        debug!(identity, %time_min, %time_max, "Querying calendar");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", max_results.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::calendar(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::CalendarAuthExpired {
                identity: identity.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::calendar(format!("API error {}: {}", status, body)));
        }

        let parsed: EventsResponse = response
            .json()
            .await
            .map_err(|e| Error::calendar(format!("Failed to parse events: {}", e)))?;

        let total = parsed.items.len();
        let events: Vec<CalendarEvent> = parsed
            .items
            .into_iter()
            .filter_map(ApiEvent::into_event)
            .collect();
        if events.len() < total {
            warn!(skipped = total - events.len(), "Dropped events with unreadable times");
        }
        Ok(events)
    }
}
