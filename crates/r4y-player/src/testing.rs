//! Test doubles for the output and data-source seams.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use r4y_proto::error::{PlaybackError, Result};
use r4y_proto::model::{LiveStream, ProgramSlot, Track};
use r4y_proto::params::FetchParameters;
use tokio::sync::{mpsc, oneshot};

use crate::broadcast::ScheduleSource;
use crate::catalog::TrackSource;
use crate::output::AudioOutput;

pub fn tracks(prefix: &str, n: usize) -> Vec<Track> {
    (0..n)
        .map(|i| Track {
            id: format!("{}{}", prefix, i),
            name: format!("{} song {}", prefix, i),
            artist_name: "Test Artist".to_string(),
            audio: format!("https://cdn.test/{}{}.mp3", prefix, i),
            duration: 180,
            ..Track::default()
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputCall {
    SetSource(String),
    Load,
    Play,
    Pause,
    Seek(f64),
    Volume(f32),
    Release,
}

#[derive(Default)]
struct MockState {
    calls: Vec<OutputCall>,
    play_failures: VecDeque<PlaybackError>,
    source: Option<String>,
    playing: bool,
    volume: Option<f32>,
}

/// Records every call; shared handle so tests can inspect after moving a
/// clone into a controller.
#[derive(Clone, Default)]
pub struct MockOutput {
    inner: Arc<Mutex<MockState>>,
}

impl MockOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_next_play(&self, err: PlaybackError) {
        self.inner.lock().unwrap().play_failures.push_back(err);
    }

    pub fn calls(&self) -> Vec<OutputCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    pub fn source(&self) -> Option<String> {
        self.inner.lock().unwrap().source.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().unwrap().playing
    }

    pub fn volume(&self) -> Option<f32> {
        self.inner.lock().unwrap().volume
    }

    fn record(&self, call: OutputCall) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl AudioOutput for MockOutput {
    async fn set_source(&mut self, url: &str) -> Result<()> {
        self.record(OutputCall::SetSource(url.to_string()));
        let mut s = self.inner.lock().unwrap();
        s.source = Some(url.to_string());
        s.playing = false;
        Ok(())
    }

    async fn load(&mut self) -> Result<()> {
        self.record(OutputCall::Load);
        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        self.record(OutputCall::Play);
        let mut s = self.inner.lock().unwrap();
        if let Some(err) = s.play_failures.pop_front() {
            return Err(err);
        }
        s.playing = true;
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.record(OutputCall::Pause);
        self.inner.lock().unwrap().playing = false;
        Ok(())
    }

    async fn seek(&mut self, seconds: f64) -> Result<()> {
        self.record(OutputCall::Seek(seconds));
        Ok(())
    }

    async fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.record(OutputCall::Volume(volume));
        self.inner.lock().unwrap().volume = Some(volume);
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        self.record(OutputCall::Release);
        let mut s = self.inner.lock().unwrap();
        s.source = None;
        s.playing = false;
        Ok(())
    }
}

/// One outstanding fetch; the test decides when and how it resolves.
pub struct FetchRequest {
    pub params: FetchParameters,
    pub respond: oneshot::Sender<Result<Vec<Track>>>,
}

/// Track source whose fetches block until the test answers them.
pub struct GatedSource {
    tx: mpsc::UnboundedSender<FetchRequest>,
}

impl GatedSource {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FetchRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl TrackSource for GatedSource {
    async fn fetch_tracks(&self, params: &FetchParameters) -> Result<Vec<Track>> {
        let (respond, answer) = oneshot::channel();
        self.tx
            .send(FetchRequest {
                params: params.clone(),
                respond,
            })
            .map_err(|_| PlaybackError::Network("test harness gone".into()))?;
        answer
            .await
            .unwrap_or_else(|_| Err(PlaybackError::Network("request dropped".into())))
    }
}

/// Schedule source answering with fixed results.
pub struct StaticSchedule {
    pub live: Result<LiveStream>,
    pub grid: Result<Vec<ProgramSlot>>,
}

impl StaticSchedule {
    pub fn ok(slots: Vec<ProgramSlot>) -> Arc<Self> {
        Arc::new(Self {
            live: Ok(LiveStream {
                station_title: "France Inter".to_string(),
                stream_url: "https://icecast.test/franceinter-midfi.mp3".to_string(),
            }),
            grid: Ok(slots),
        })
    }
}

#[async_trait]
impl ScheduleSource for StaticSchedule {
    async fn live_stream(&self) -> Result<LiveStream> {
        self.live.clone()
    }

    async fn grid(&self, _start: i64, _end: i64) -> Result<Vec<ProgramSlot>> {
        self.grid.clone()
    }
}
