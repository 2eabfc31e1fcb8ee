/// LiveController: single-owner event loop for the live-radio page.
///
/// Owns the live output, the day's schedule and the `LiveSession`.  On mount
/// one task fetches the live-stream descriptor and the day grid and posts
/// both results back; a `ScheduleTicker` keeps the now-airing highlight
/// moving.  Playback only ever starts from an explicit `Play` command.
///
/// ```text
///  Idle ──StreamResolved──▶ Loading ──play ok──▶ Playing
///                              │                   │
///                              └──play rejected──▶ Paused ◀──pause──┘
///  any ──Output(Error)──▶ Error
/// ```
use std::sync::Arc;
use std::time::Duration;

use r4y_proto::config::LiveConfig;
use r4y_proto::error::{PlaybackError, Result};
use r4y_proto::model::{LiveSession, LiveStatus, LiveStream, ProgramSlot};
use r4y_proto::state::PreferenceStore;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::broadcast::{day_window, ScheduleSource};
use crate::focus::{AudioFocus, FocusOwner};
use crate::output::{AudioOutput, OutputEvent};
use crate::schedule::{Schedule, ScheduleTicker};

const STREAM_ERROR: &str = "Stream playback error.";
const PLAY_BLOCKED: &str = "Playback was blocked. Press play to try again.";
const FETCH_FAILED: &str = "Could not load the live station data.";

// ── LiveEvent ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum LiveCommand {
    Play,
    Pause,
    ToggleMute,
    SetVolume(f32),
}

/// All inputs into the LiveController loop.
#[derive(Debug)]
pub enum LiveEvent {
    Command(LiveCommand),
    /// Signal from the live output, posted by the host.
    Output(OutputEvent),
    StreamResolved(Result<LiveStream>),
    ScheduleLoaded(Result<Vec<ProgramSlot>>),
    /// Periodic clock from the schedule ticker.
    Tick { now: i64 },
    Shutdown,
}

// ── LiveController ────────────────────────────────────────────────────────────

pub struct LiveController<O: AudioOutput> {
    source: Arc<dyn ScheduleSource>,
    output: O,
    focus: AudioFocus,
    focus_rx: watch::Receiver<Option<FocusOwner>>,
    prefs: PreferenceStore,
    event_tx: mpsc::Sender<LiveEvent>,
    session_tx: watch::Sender<LiveSession>,
    session: LiveSession,
    schedule: Schedule,
    tick_interval: Duration,
    ticker: Option<ScheduleTicker>,
    fetch_task: Option<JoinHandle<()>>,
    /// Set when a credential is missing; playback stays refused.
    config_blocked: Option<String>,
    /// Clock of the last tick, `None` before the first one.
    last_now: Option<i64>,
}

impl<O: AudioOutput> LiveController<O> {
    /// Build the controller, reading the stored volume preference.
    pub async fn new(
        source: Arc<dyn ScheduleSource>,
        output: O,
        focus: AudioFocus,
        prefs: PreferenceStore,
        event_tx: mpsc::Sender<LiveEvent>,
        config: &LiveConfig,
    ) -> Self {
        let volume = prefs.live_volume().await;
        let session = LiveSession {
            volume,
            ..LiveSession::default()
        };
        let (session_tx, _) = watch::channel(session.clone());
        let focus_rx = focus.subscribe();
        Self {
            source,
            output,
            focus,
            focus_rx,
            prefs,
            event_tx,
            session_tx,
            session,
            schedule: Schedule::default(),
            tick_interval: Duration::from_secs(config.schedule_tick_secs.max(1)),
            ticker: None,
            fetch_task: None,
            config_blocked: None,
            last_now: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LiveSession> {
        self.session_tx.subscribe()
    }

    pub fn session(&self) -> &LiveSession {
        &self.session
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Fire the live and grid requests and start the schedule clock.
    pub async fn mount(&mut self) {
        info!("LiveController: mounting");
        if let Err(e) = self.output.set_volume(self.session.effective_volume()).await {
            warn!("LiveController: initial volume rejected: {}", e);
        }

        let source = Arc::clone(&self.source);
        let tx = self.event_tx.clone();
        let (start, end) = day_window(chrono::Local::now().date_naive());
        self.fetch_task = Some(tokio::spawn(async move {
            let (live, grid) =
                futures_util::future::join(source.live_stream(), source.grid(start, end)).await;
            if tx.send(LiveEvent::StreamResolved(live)).await.is_err() {
                return;
            }
            let _ = tx.send(LiveEvent::ScheduleLoaded(grid)).await;
        }));

        let tx = self.event_tx.clone();
        self.ticker = Some(ScheduleTicker::spawn(self.tick_interval, tx, |now| {
            LiveEvent::Tick { now }
        }));
        self.publish();
    }

    pub async fn run(mut self, mut event_rx: mpsc::Receiver<LiveEvent>) {
        self.mount().await;

        loop {
            tokio::select! {
                evt = event_rx.recv() => match evt {
                    None | Some(LiveEvent::Shutdown) => {
                        info!("LiveController: shutting down");
                        break;
                    }
                    Some(evt) => self.handle_event(evt).await,
                },
                Ok(()) = self.focus_rx.changed() => {
                    self.on_focus_change().await;
                }
            }
        }

        self.shutdown().await;
    }

    /// Unmount: stop the clock and the pending requests, release the output.
    pub async fn shutdown(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
        if let Err(e) = self.output.release().await {
            warn!("LiveController: release failed: {}", e);
        }
        self.focus.release(FocusOwner::Live);
        self.session.playing = false;
        self.session.buffering = false;
        self.publish();
    }

    pub async fn handle_event(&mut self, evt: LiveEvent) {
        match evt {
            LiveEvent::Command(cmd) => {
                info!("LiveController: command {:?}", cmd);
                match cmd {
                    LiveCommand::Play => self.play().await,
                    LiveCommand::Pause => self.pause().await,
                    LiveCommand::ToggleMute => self.toggle_mute().await,
                    LiveCommand::SetVolume(v) => self.set_volume(v).await,
                }
            }
            LiveEvent::Output(evt) => self.handle_output_event(evt),
            LiveEvent::StreamResolved(result) => self.on_stream_resolved(result).await,
            LiveEvent::ScheduleLoaded(result) => self.on_schedule_loaded(result),
            LiveEvent::Tick { now } => {
                self.last_now = Some(now);
                self.refresh_now(now);
            }
            LiveEvent::Shutdown => self.shutdown().await,
        }
        self.publish();
    }

    // ── fetch results ─────────────────────────────────────────────────────────

    async fn on_stream_resolved(&mut self, result: Result<LiveStream>) {
        let stream = match result {
            Ok(stream) => stream,
            Err(e) => {
                self.fail_fetch("live stream", e);
                return;
            }
        };

        info!(
            "LiveController: {} live at {}",
            stream.station_title, stream.stream_url
        );
        self.session.station_title = stream.station_title;
        self.session.error = None;
        self.session.buffering = true;
        self.session.status = LiveStatus::Loading;

        if let Err(e) = self.output.set_source(&stream.stream_url).await {
            warn!("LiveController: could not bind stream: {}", e);
            self.session.error = Some(STREAM_ERROR.to_string());
            self.session.status = LiveStatus::Error;
            self.session.buffering = false;
            return;
        }
        self.session.stream_url = Some(stream.stream_url);
        if let Err(e) = self.output.load().await {
            warn!("LiveController: load failed: {}", e);
        }
    }

    fn on_schedule_loaded(&mut self, result: Result<Vec<ProgramSlot>>) {
        match result {
            Ok(slots) => {
                info!("LiveController: {} program slots today", slots.len());
                self.schedule = Schedule::new(slots);
                self.session.slots = self.schedule.slots().to_vec();
                let now = self
                    .last_now
                    .unwrap_or_else(|| chrono::Utc::now().timestamp());
                self.refresh_now(now);
            }
            Err(e) => self.fail_fetch("schedule", e),
        }
    }

    fn fail_fetch(&mut self, what: &str, e: PlaybackError) {
        if e.is_fatal() {
            error!("LiveController: {} unavailable: {}", what, e);
            let msg = e.to_string();
            self.config_blocked = Some(msg.clone());
            self.session.error = Some(msg);
        } else {
            warn!("LiveController: {} fetch failed: {}", what, e);
            // A config error already on screen is the more useful message.
            if self.config_blocked.is_none() {
                self.session.error = Some(match e {
                    PlaybackError::Api(msg) => msg,
                    _ => FETCH_FAILED.to_string(),
                });
            }
        }
        if self.session.stream_url.is_none() {
            self.session.status = LiveStatus::Error;
            self.session.buffering = false;
        }
    }

    fn refresh_now(&mut self, now: i64) {
        self.session.now = now;
        self.session.now_airing = self.schedule.now_airing(now);
        self.session.now_progress = self.schedule.now_progress(now);
    }

    // ── user gestures ─────────────────────────────────────────────────────────

    pub async fn play(&mut self) {
        if let Some(msg) = &self.config_blocked {
            debug!("LiveController: play refused, {}", msg);
            return;
        }
        if self.session.stream_url.is_none() {
            debug!("LiveController: play before the stream is known, ignored");
            return;
        }

        self.focus.request(FocusOwner::Live);
        // Coming back from a stream error: start the source over.
        if self.session.status == LiveStatus::Error {
            if let Err(e) = self.output.load().await {
                warn!("LiveController: reload failed: {}", e);
            }
        }
        self.session.error = None;
        self.session.buffering = true;
        self.publish();

        match self.output.play().await {
            Ok(()) => {
                self.session.playing = true;
                self.session.status = LiveStatus::Playing;
            }
            Err(e) => {
                warn!("LiveController: play rejected: {}", e);
                self.session.playing = false;
                self.session.error = Some(PLAY_BLOCKED.to_string());
                self.session.status = LiveStatus::Paused;
            }
        }
        self.session.buffering = false;
    }

    pub async fn pause(&mut self) {
        if let Err(e) = self.output.pause().await {
            warn!("LiveController: pause failed: {}", e);
        }
        self.session.playing = false;
        self.session.buffering = false;
        if self.session.stream_url.is_some() && self.session.status != LiveStatus::Error {
            self.session.status = LiveStatus::Paused;
        }
    }

    pub async fn toggle_mute(&mut self) {
        self.session.muted = !self.session.muted;
        self.apply_volume().await;
    }

    /// Clamp, apply unless muted, and persist right away.
    pub async fn set_volume(&mut self, volume: f32) {
        let volume = if volume.is_finite() { volume } else { 0.0 };
        self.session.volume = volume.clamp(0.0, 1.0);
        self.apply_volume().await;
        if let Err(e) = self.prefs.set_live_volume(self.session.volume).await {
            warn!("LiveController: could not persist volume: {}", e);
        }
    }

    async fn apply_volume(&mut self) {
        let effective = self.session.effective_volume();
        if let Err(e) = self.output.set_volume(effective).await {
            warn!("LiveController: set_volume failed: {}", e);
        }
    }

    // ── output / focus ────────────────────────────────────────────────────────

    fn handle_output_event(&mut self, evt: OutputEvent) {
        match evt {
            OutputEvent::Waiting => self.session.buffering = true,
            OutputEvent::CanPlay => {
                self.session.buffering = false;
                // Buffered but never started: ready and waiting for a gesture.
                if self.session.status == LiveStatus::Loading && !self.session.playing {
                    self.session.status = LiveStatus::Paused;
                }
            }
            OutputEvent::Playing => {
                self.session.buffering = false;
                self.session.playing = true;
                self.session.status = LiveStatus::Playing;
            }
            OutputEvent::Error { message, .. } => {
                warn!("LiveController: stream error: {}", message);
                self.session.error = Some(STREAM_ERROR.to_string());
                self.session.status = LiveStatus::Error;
                self.session.playing = false;
                self.session.buffering = false;
            }
            OutputEvent::TimeUpdate { .. } | OutputEvent::Ended => {
                debug!("LiveController: output {:?}", evt);
            }
        }
    }

    async fn on_focus_change(&mut self) {
        let holder = *self.focus_rx.borrow_and_update();
        if let Some(other) = holder.filter(|h| *h != FocusOwner::Live) {
            if self.session.playing {
                info!("LiveController: focus taken by {:?}, pausing", other);
                self.pause().await;
                self.publish();
            }
        }
    }

    fn publish(&self) {
        self.session_tx.send_replace(self.session.clone());
    }
}
