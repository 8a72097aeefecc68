//! Best-effort geocoding.
//!
//! Resolves a free-text location to coordinates via a Nominatim-compatible
//! endpoint. Geocoding is never a hard dependency: any failure returns None
//! and the submission proceeds without coordinates.

use crate::config::GeocodeSettings;
use std::time::Duration;
use tracing::warn;

pub trait Geocoder: Send + Sync {
    fn geocode(&self, free_text: &str) -> Option<(f64, f64)>;
}

pub struct NominatimGeocoder {
    settings: GeocodeSettings,
    client: reqwest::blocking::Client,
}

impl NominatimGeocoder {
    pub fn new(settings: GeocodeSettings) -> Option<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent("shikayat-service")
            .build();
        match client {
            Ok(client) => Some(Self { settings, client }),
            Err(e) => {
                warn!("Could not build geocoding client: {}", e);
                None
            }
        }
    }

    fn lookup(&self, free_text: &str) -> Option<(f64, f64)> {
        let url = format!("{}/search", self.settings.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[("format", "json"), ("limit", "1"), ("q", free_text)])
            .send()
            .ok()?;

        if !response.status().is_success() {
            warn!("Geocoding returned HTTP {}", response.status());
            return None;
        }

        let results: serde_json::Value = response.json().ok()?;
        let first = results.get(0)?;
        let lat = first["lat"].as_str()?.parse::<f64>().ok()?;
        let lon = first["lon"].as_str()?.parse::<f64>().ok()?;
        Some((lat, lon))
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, free_text: &str) -> Option<(f64, f64)> {
        if free_text.trim().is_empty() {
            return None;
        }
        match self.lookup(free_text) {
            Some(coords) => Some(coords),
            None => {
                warn!("Geocoding failed for '{}', continuing without coordinates", free_text);
                None
            }
        }
    }
}
