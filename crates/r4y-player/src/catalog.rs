//! Music catalog client (Jamendo v3 `tracks` endpoint).
//!
//! Stateless: `fetch_tracks` turns parameters into a track list and returns
//! it.  Cancellation and stale-result filtering belong to the caller
//! ([`crate::playlist::PlaylistMachine`] + the engine).

use std::time::Duration;

use async_trait::async_trait;
use r4y_proto::config::CatalogConfig;
use r4y_proto::error::{PlaybackError, Result};
use r4y_proto::model::Track;
use r4y_proto::params::{AudioFormat, FetchParameters, DEFAULT_AUDIO_FORMAT, DEFAULT_LIMIT};
use serde::Deserialize;
use tracing::{debug, warn};

const DEFAULT_API_BASE: &str = "https://api.jamendo.com/v3.0";
const DEFAULT_USER_AGENT: &str = concat!("r4y/", env!("CARGO_PKG_VERSION"));
const ORDER: &str = "popularity_total";

/// Anything that can turn fetch parameters into a playlist.
#[async_trait]
pub trait TrackSource: Send + Sync {
    async fn fetch_tracks(&self, params: &FetchParameters) -> Result<Vec<Track>>;
}

#[derive(Debug, Deserialize)]
struct TracksResponse {
    #[serde(default)]
    headers: Option<ResponseHeaders>,
    #[serde(default)]
    results: Vec<RawTrack>,
}

#[derive(Debug, Deserialize)]
struct ResponseHeaders {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error_message: String,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    id: serde_json::Value,
    #[serde(default)]
    name: String,
    #[serde(default)]
    artist_name: String,
    #[serde(default)]
    audio: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    album_image: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

impl From<RawTrack> for Track {
    fn from(raw: RawTrack) -> Self {
        let id = match raw.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        Track {
            id,
            name: raw.name,
            artist_name: raw.artist_name,
            audio: raw.audio,
            image: raw.image.filter(|s| !s.is_empty()),
            album_image: raw.album_image.filter(|s| !s.is_empty()),
            duration: raw
                .duration
                .filter(|d| d.is_finite() && *d > 0.0)
                .map(|d| d.round() as u32)
                .unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    api_base: String,
    client_id: Option<String>,
    default_limit: u32,
    default_audio_format: AudioFormat,
}

impl CatalogClient {
    pub fn builder() -> CatalogClientBuilder {
        CatalogClientBuilder::new()
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .api_base(config.api_base.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_limit(config.default_limit)
            .default_audio_format(config.default_audio_format);
        if let Some(id) = &config.client_id {
            builder = builder.client_id(id.clone());
        }
        builder.build()
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Query string for `params`.  Fails when no client id is configured.
    pub fn query(&self, params: &FetchParameters) -> Result<Vec<(&'static str, String)>> {
        let client_id = self
            .client_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| PlaybackError::config("catalog client id is not configured"))?;
        let params = params.canonical();

        let mut query = vec![
            ("client_id", client_id.to_string()),
            ("format", "json".to_string()),
            (
                "limit",
                params.limit.unwrap_or(self.default_limit).to_string(),
            ),
            (
                "audioformat",
                params
                    .audio_format
                    .unwrap_or(self.default_audio_format)
                    .as_str()
                    .to_string(),
            ),
            ("order", ORDER.to_string()),
        ];
        if let Some(search) = params.search_text() {
            query.push(("search", search.to_string()));
        }
        if !params.tags.is_empty() {
            query.push(("fuzzytags", params.tags.join(",")));
        }
        Ok(query)
    }
}

#[async_trait]
impl TrackSource for CatalogClient {
    async fn fetch_tracks(&self, params: &FetchParameters) -> Result<Vec<Track>> {
        let query = self.query(params)?;
        let url = format!("{}/tracks/", self.api_base);
        debug!("catalog: GET {} {:?}", url, params);

        let response = self.http.get(&url).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("catalog: HTTP {}", status);
            return Err(PlaybackError::Http {
                status: status.as_u16(),
            });
        }

        let body: TracksResponse = response.json().await?;
        if let Some(headers) = &body.headers {
            if headers.status == "failed" {
                return Err(PlaybackError::Api(headers.error_message.clone()));
            }
        }

        let tracks: Vec<Track> = body.results.into_iter().map(Track::from).collect();
        debug!("catalog: {} tracks", tracks.len());
        Ok(tracks)
    }
}

pub struct CatalogClientBuilder {
    client: Option<reqwest::Client>,
    api_base: String,
    client_id: Option<String>,
    timeout: Duration,
    user_agent: String,
    default_limit: u32,
    default_audio_format: AudioFormat,
}

impl Default for CatalogClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogClientBuilder {
    pub fn new() -> Self {
        Self {
            client: None,
            api_base: DEFAULT_API_BASE.to_string(),
            client_id: None,
            timeout: Duration::from_secs(15),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_limit: DEFAULT_LIMIT,
            default_audio_format: DEFAULT_AUDIO_FORMAT,
        }
    }

    /// Reuse an existing HTTP client (timeout and user agent are ignored).
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn default_limit(mut self, limit: u32) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn default_audio_format(mut self, format: AudioFormat) -> Self {
        self.default_audio_format = format;
        self
    }

    pub fn build(self) -> Result<CatalogClient> {
        let http = match self.client {
            Some(c) => c,
            None => reqwest::Client::builder()
                .timeout(self.timeout)
                .user_agent(self.user_agent)
                .build()
                .map_err(|e| PlaybackError::Network(e.to_string()))?,
        };
        Ok(CatalogClient {
            http,
            api_base: self.api_base,
            client_id: self.client_id,
            default_limit: self.default_limit,
            default_audio_format: self.default_audio_format,
        })
    }
}
