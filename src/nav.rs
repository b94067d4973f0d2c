//! Directions links for saved places.

use std::fmt;

use url::Url;

use crate::error::{Error, Result};
use crate::process;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapProvider {
    Google,
    Apple,
}

impl MapProvider {
    /// "auto" picks Apple Maps on macOS and Google Maps elsewhere.
    pub fn from_setting(setting: &str) -> Self {
        match setting {
            "apple" => MapProvider::Apple,
            "google" => MapProvider::Google,
            _ if cfg!(target_os = "macos") => MapProvider::Apple,
            _ => MapProvider::Google,
        }
    }
}

impl fmt::Display for MapProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapProvider::Google => write!(f, "Google Maps"),
            MapProvider::Apple => write!(f, "Apple Maps"),
        }
    }
}

/// `(lat, lon)` when `text` is a "lat,lon" pair in range.
pub fn parse_coordinates(text: &str) -> Option<(f64, f64)> {
    let (lat, lon) = text.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then_some((lat, lon))
}

/// Directions URL from the current location to `destination`.
pub fn directions_url(destination: &str, provider: MapProvider) -> Result<Url> {
    let destination = match parse_coordinates(destination) {
        Some((lat, lon)) => format!("{},{}", lat, lon),
        None => destination.trim().to_string(),
    };

    let (base, params): (&str, Vec<(&str, &str)>) = match provider {
        MapProvider::Apple => ("http://maps.apple.com/", vec![("daddr", destination.as_str())]),
        MapProvider::Google => (
            "https://www.google.com/maps/dir/",
            vec![("api", "1"), ("destination", destination.as_str())],
        ),
    };

    Url::parse_with_params(base, params)
        .map_err(|e| Error::Internal(format!("invalid directions URL: {}", e)))
}

/// Hand the URL to the desktop's default opener.
pub fn open_in_browser(url: &Url) -> Result<()> {
    let url = url.as_str();
    if cfg!(target_os = "macos") {
        process::spawn_detached("open", &[url])
    } else if cfg!(target_os = "windows") {
        process::spawn_detached("cmd", &["/C", "start", "", url])
    } else {
        process::spawn_detached("xdg-open", &[url])
    }
}
