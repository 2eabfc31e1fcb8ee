//! Broadcast API client (Radio France open API, GraphQL over POST).
//!
//! Two queries: the station's live-stream descriptor, and the program grid
//! for an epoch-second window.  A missing token is a configuration error the
//! caller must surface and never retry.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, TimeZone};
use r4y_proto::config::BroadcastConfig;
use r4y_proto::error::{PlaybackError, Result};
use r4y_proto::model::{LiveStream, ProgramSlot};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

const DEFAULT_ENDPOINT: &str = "https://openapi.radiofrance.fr/v1/graphql";
const DEFAULT_STATION: &str = "FRANCEINTER";
const TOKEN_HEADER: &str = "x-token";

/// Hours of the day the published grid covers.
pub const DAY_START_HOUR: u32 = 6;

/// Provider of the live descriptor and the day's slots.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn live_stream(&self) -> Result<LiveStream>;
    async fn grid(&self, start: i64, end: i64) -> Result<Vec<ProgramSlot>>;
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BrandData {
    brand: Brand,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Brand {
    title: String,
    live_stream: String,
}

#[derive(Debug, Deserialize)]
struct GridData {
    #[serde(default)]
    grid: Vec<GridRow>,
}

/// Non-diffusion steps come back as empty objects, hence all optional.
#[derive(Debug, Deserialize)]
struct GridRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    start: Option<i64>,
    #[serde(default)]
    end: Option<i64>,
    #[serde(default)]
    diffusion: Option<Diffusion>,
}

#[derive(Debug, Deserialize)]
struct Diffusion {
    #[serde(default)]
    title: Option<String>,
}

fn map_grid(rows: Vec<GridRow>) -> Vec<ProgramSlot> {
    let mut slots: Vec<ProgramSlot> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let (start, end) = (row.start?, row.end?);
            let id = row
                .id
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("slot-{}-{}-{}", start, end, i));
            let title = row
                .diffusion
                .and_then(|d| d.title)
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| format!("Program {}", i + 1));
            Some(ProgramSlot {
                id,
                start,
                end,
                title,
            })
        })
        .collect();
    slots.sort_by_key(|s| s.start);
    slots
}

/// Epoch-second bounds of the published day: 06:00:00 to 23:59:59 in `tz`.
pub fn day_window_in<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> (i64, i64) {
    let at = |h: u32, m: u32, s: u32| -> i64 {
        let naive = date
            .and_hms_opt(h, m, s)
            .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
        tz.from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.timestamp())
            // Nonexistent local time (DST gap): treat the wall clock as UTC.
            .unwrap_or_else(|| naive.and_utc().timestamp())
    };
    (at(DAY_START_HOUR, 0, 0), at(23, 59, 59))
}

/// Day window for today in the local timezone.
pub fn day_window(date: NaiveDate) -> (i64, i64) {
    day_window_in(date, &Local)
}

#[derive(Debug, Clone)]
pub struct BroadcastClient {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    station: String,
}

impl BroadcastClient {
    pub fn builder() -> BroadcastClientBuilder {
        BroadcastClientBuilder::new()
    }

    pub fn from_config(config: &BroadcastConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .endpoint(config.endpoint.clone())
            .station(config.station.clone())
            .timeout(Duration::from_secs(config.timeout_secs));
        if let Some(token) = &config.token {
            builder = builder.token(token.clone());
        }
        builder.build()
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    async fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let token = self
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| PlaybackError::config("broadcast API token is not configured"))?;

        let response = self
            .http
            .post(&self.endpoint)
            .header(TOKEN_HEADER, token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("broadcast: HTTP {}", status);
            return Err(PlaybackError::Http {
                status: status.as_u16(),
            });
        }

        let body: GraphQlResponse<T> = response.json().await?;
        if let Some(first) = body.errors.into_iter().next() {
            let msg = first
                .message
                .unwrap_or_else(|| "broadcast API error".to_string());
            warn!("broadcast: query error: {}", msg);
            return Err(PlaybackError::Api(msg));
        }
        body.data
            .ok_or_else(|| PlaybackError::Decode("response has no data".to_string()))
    }
}

#[async_trait]
impl ScheduleSource for BroadcastClient {
    async fn live_stream(&self) -> Result<LiveStream> {
        let query = format!(
            "query {{ brand(id: {}) {{ id title liveStream }} }}",
            self.station
        );
        let data: BrandData = self.query(&query, Value::Null).await?;
        debug!("broadcast: live stream for {}", data.brand.title);
        Ok(LiveStream {
            station_title: data.brand.title,
            stream_url: data.brand.live_stream,
        })
    }

    async fn grid(&self, start: i64, end: i64) -> Result<Vec<ProgramSlot>> {
        let query = format!(
            "query($start: Int!, $end: Int!) {{ grid(station: {}, start: $start, end: $end) {{ ... on DiffusionStep {{ id start end diffusion {{ id title url }} }} }} }}",
            self.station
        );
        let data: GridData = self
            .query(&query, json!({ "start": start, "end": end }))
            .await?;
        let slots = map_grid(data.grid);
        debug!("broadcast: {} slots in [{}, {}]", slots.len(), start, end);
        Ok(slots)
    }
}

pub struct BroadcastClientBuilder {
    client: Option<reqwest::Client>,
    endpoint: String,
    token: Option<String>,
    station: String,
    timeout: Duration,
}

impl Default for BroadcastClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastClientBuilder {
    pub fn new() -> Self {
        Self {
            client: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: None,
            station: DEFAULT_STATION.to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn station(mut self, station: impl Into<String>) -> Self {
        self.station = station.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<BroadcastClient> {
        let http = match self.client {
            Some(c) => c,
            None => reqwest::Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| PlaybackError::Network(e.to_string()))?,
        };
        Ok(BroadcastClient {
            http,
            endpoint: self.endpoint,
            token: self.token,
            station: self.station,
        })
    }
}
