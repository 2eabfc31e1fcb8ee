use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// One playable catalog track.  Identity is the catalog id.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artist_name: String,
    /// Streamable source URL.
    pub audio: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub album_image: Option<String>,
    /// Seconds; 0 when the catalog does not know.
    #[serde(default)]
    pub duration: u32,
}

impl Track {
    /// Artwork to show for the track: album art first, then track art.
    pub fn cover(&self) -> Option<&str> {
        self.album_image
            .as_deref()
            .or(self.image.as_deref())
            .filter(|s| !s.is_empty())
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

/// One scheduled broadcast segment, bounds in epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSlot {
    pub id: String,
    pub start: i64,
    pub end: i64,
    pub title: String,
}

impl ProgramSlot {
    /// `HH:MM–HH:MM` in local time.
    pub fn time_range(&self) -> String {
        format!("{}–{}", hhmm(self.start), hhmm(self.end))
    }
}

fn hhmm(ts: i64) -> String {
    Local
        .timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

/// Live-stream descriptor returned by the broadcast API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStream {
    pub station_title: String,
    pub stream_url: String,
}

/// Where the playlist state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PlaylistPhase {
    #[default]
    Idle, // no playlist requested yet
    Loading,
    Ready,
    Error,
}

/// Snapshot of the catalog playback context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSession {
    pub tracks: Vec<Track>,
    pub current_index: usize,
    pub phase: PlaylistPhase,
    /// Mirrors the shared playback intent.
    pub playing: bool,
    pub volume: f32,
    pub elapsed: f64,
    pub duration: f64,
    pub loading: bool,
    /// Last catalog fetch failure, if the latest fetch failed.
    pub error: Option<String>,
    /// Last source failure on the output; traversal continues past it.
    pub track_error: Option<String>,
}

impl Default for CatalogSession {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            current_index: 0,
            phase: PlaylistPhase::Idle,
            playing: false,
            volume: 0.3,
            elapsed: 0.0,
            duration: 0.0,
            loading: false,
            error: None,
            track_error: None,
        }
    }
}

impl CatalogSession {
    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.current_index)
    }
}

/// Live controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LiveStatus {
    #[default]
    Idle, // stream URL not known yet
    Loading,
    Playing,
    Paused,
    Error,
}

/// Snapshot of the live playback context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveSession {
    pub stream_url: Option<String>,
    pub station_title: String,
    pub slots: Vec<ProgramSlot>,
    pub status: LiveStatus,
    pub playing: bool,
    pub buffering: bool,
    pub muted: bool,
    pub volume: f32,
    pub error: Option<String>,
    /// Epoch seconds the schedule highlight was last computed for.
    pub now: i64,
    pub now_airing: Option<usize>,
    /// Percent 0..=100 through the airing slot; 0 when nothing airs.
    pub now_progress: f64,
}

impl Default for LiveSession {
    fn default() -> Self {
        Self {
            stream_url: None,
            station_title: "France Inter".to_string(),
            slots: Vec::new(),
            status: LiveStatus::Idle,
            playing: false,
            buffering: false,
            muted: false,
            volume: 0.8,
            error: None,
            now: 0,
            now_airing: None,
            now_progress: 0.0,
        }
    }
}

impl LiveSession {
    /// Volume actually sent to the output.
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    pub fn status_label(&self) -> String {
        if let Some(err) = &self.error {
            return err.clone();
        }
        if self.buffering {
            "Buffering…".to_string()
        } else if self.playing {
            "Playing".to_string()
        } else {
            "Paused".to_string()
        }
    }
}

/// Render seconds as `m:ss`.
pub fn format_clock(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "0:00".to_string();
    }
    let total = secs.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
