//! Reverse timezone lookup against the Maps Time Zone API.

use async_trait::async_trait;
use chrono::Duration;
use serde::Deserialize;

use megamovie_core::repair::TimezoneLookup;
use megamovie_core::types::Timestamp;
use megamovie_core::CoreError;

const API_URL: &str = "https://maps.googleapis.com/maps/api/timezone/json";

/// Time Zone API client. Sums the raw and DST offsets in effect at the
/// queried instant, which is what camera wall clocks observe.
pub struct MapsTimezoneClient {
    http: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TimezoneResponse {
    status: String,
    #[serde(rename = "rawOffset")]
    raw_offset: Option<i64>,
    #[serde(rename = "dstOffset")]
    dst_offset: Option<i64>,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

impl MapsTimezoneClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl TimezoneLookup for MapsTimezoneClient {
    async fn utc_offset(&self, lat: f64, lon: f64, at: Timestamp) -> Result<Duration, CoreError> {
        let response = self
            .http
            .get(API_URL)
            .query(&[
                ("location", format!("{lat},{lon}")),
                ("timestamp", at.timestamp().to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| CoreError::Timezone(e.to_string()))?;

        let body: TimezoneResponse = response
            .error_for_status()
            .map_err(|e| CoreError::Timezone(e.to_string()))?
            .json()
            .await
            .map_err(|e| CoreError::Timezone(e.to_string()))?;

        if body.status != "OK" {
            let detail = body.error_message.unwrap_or(body.status);
            return Err(CoreError::Timezone(detail));
        }
        match (body.raw_offset, body.dst_offset) {
            (Some(raw), Some(dst)) => Ok(Duration::seconds(raw + dst)),
            _ => Err(CoreError::Timezone("response missing offsets".into())),
        }
    }
}
