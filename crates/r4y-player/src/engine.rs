/// CatalogEngine: single-owner event loop for the catalog player.
///
/// Owns the playlist state machine and the catalog output exclusively; every
/// mutation arrives as a `CatalogEvent` (user commands, output signals, fetch
/// completions) or as a change on the intent / focus watch channels.  After
/// each event the engine publishes a fresh `CatalogSession` snapshot.
///
/// Fetches run in spawned tasks tagged with the playlist generation.  The
/// task is abandoned when its cancellation token fires, and even a
/// completion that slips through is dropped by `PlaylistMachine::complete`
/// unless it is the latest generation.
///
/// Output failures never stop traversal: a rejected `play()` is swallowed
/// (autoplay policy wants a gesture), a broken source is skipped.
use std::sync::Arc;

use r4y_proto::config::PlayerConfig;
use r4y_proto::error::{PlaybackError, Result};
use r4y_proto::model::{CatalogSession, Track};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::catalog::TrackSource;
use crate::focus::{AudioFocus, FocusOwner};
use crate::intent::{IntentSnapshot, PlaybackIntent};
use crate::output::{AudioOutput, OutputEvent};
use crate::playlist::{FetchTicket, PlaylistMachine};

// ── CatalogEvent ──────────────────────────────────────────────────────────────

/// User-facing controls of the catalog player.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogCommand {
    Next,
    Previous,
    Select(usize),
    /// Flip the shared intent (header / dock play button).
    TogglePlay,
    SetVolume(f32),
    SeekTo(f64),
    /// Ask for the current selection again after a failed fetch.
    Retry,
}

/// All inputs into the CatalogEngine loop.
#[derive(Debug)]
pub enum CatalogEvent {
    Command(CatalogCommand),
    /// Signal from the catalog output, posted by the host.
    Output(OutputEvent),
    /// A spawned fetch finished.
    FetchFinished {
        generation: u64,
        result: Result<Vec<Track>>,
    },
    Shutdown,
}

// ── CatalogEngine ─────────────────────────────────────────────────────────────

pub struct CatalogEngine<O: AudioOutput> {
    source: Arc<dyn TrackSource>,
    output: O,
    intent: PlaybackIntent,
    intent_rx: watch::Receiver<IntentSnapshot>,
    focus: AudioFocus,
    focus_rx: watch::Receiver<Option<FocusOwner>>,
    /// Fetch tasks post their completions here.
    event_tx: mpsc::Sender<CatalogEvent>,
    session_tx: watch::Sender<CatalogSession>,
    playlist: PlaylistMachine,
    /// Id of the track bound to the output, if any.
    bound: Option<String>,
    /// Local mirror of the intent flag.
    playing: bool,
    volume: f32,
    elapsed: f64,
    duration: f64,
    track_error: Option<String>,
    /// Consecutive source failures; bounds the skip-ahead on errors.
    failed_in_row: usize,
}

impl<O: AudioOutput> CatalogEngine<O> {
    pub fn new(
        source: Arc<dyn TrackSource>,
        output: O,
        intent: PlaybackIntent,
        focus: AudioFocus,
        event_tx: mpsc::Sender<CatalogEvent>,
        config: &PlayerConfig,
    ) -> Self {
        let intent_rx = intent.subscribe();
        let focus_rx = focus.subscribe();
        let volume = config.default_volume.clamp(0.0, 1.0);
        let (session_tx, _) = watch::channel(CatalogSession {
            volume,
            ..CatalogSession::default()
        });
        Self {
            source,
            output,
            intent,
            intent_rx,
            focus,
            focus_rx,
            event_tx,
            session_tx,
            playlist: PlaylistMachine::new(),
            bound: None,
            playing: false,
            volume,
            elapsed: 0.0,
            duration: 0.0,
            track_error: None,
            failed_in_row: 0,
        }
    }

    /// Observe session snapshots.
    pub fn subscribe(&self) -> watch::Receiver<CatalogSession> {
        self.session_tx.subscribe()
    }

    pub fn session(&self) -> CatalogSession {
        self.snapshot()
    }

    pub fn playlist(&self) -> &PlaylistMachine {
        &self.playlist
    }

    /// Mount: apply the volume and pick up the current intent, which issues
    /// the first fetch.
    pub async fn start(&mut self) {
        info!("CatalogEngine: mounting");
        if let Err(e) = self.output.set_volume(self.volume).await {
            warn!("CatalogEngine: initial volume rejected: {}", e);
        }
        self.sync_intent().await;
    }

    /// Run the engine loop until `Shutdown` or the event channel closes.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<CatalogEvent>) {
        self.start().await;

        loop {
            tokio::select! {
                evt = event_rx.recv() => match evt {
                    None | Some(CatalogEvent::Shutdown) => {
                        info!("CatalogEngine: shutting down");
                        break;
                    }
                    Some(evt) => self.handle_event(evt).await,
                },
                Ok(()) = self.intent_rx.changed() => {
                    self.sync_intent().await;
                }
                Ok(()) = self.focus_rx.changed() => {
                    self.on_focus_change().await;
                }
            }
        }

        self.shutdown().await;
    }

    /// Unmount: cancel the pending fetch and release the output and focus.
    pub async fn shutdown(&mut self) {
        self.playlist.cancel_pending();
        if let Err(e) = self.output.release().await {
            warn!("CatalogEngine: release failed: {}", e);
        }
        self.bound = None;
        self.focus.release(FocusOwner::Catalog);
        self.publish();
    }

    // ── intent / focus ────────────────────────────────────────────────────────

    /// Apply the latest intent: re-fetch on a new selection, then reflect
    /// the playing flag into the output.
    pub async fn sync_intent(&mut self) {
        let snap = self.intent_rx.borrow_and_update().clone();

        if let Some(ticket) = self.playlist.set_parameters(snap.params) {
            self.spawn_fetch(ticket);
        }

        if snap.playing != self.playing {
            self.playing = snap.playing;
            if self.playing {
                self.play_output().await;
            } else {
                self.pause_output().await;
            }
        }
        self.publish();
    }

    async fn on_focus_change(&mut self) {
        let holder = *self.focus_rx.borrow_and_update();
        if let Some(other) = holder.filter(|h| *h != FocusOwner::Catalog) {
            if self.playing {
                info!("CatalogEngine: focus taken by {:?}, pausing", other);
                self.pause_output().await;
                self.playing = false;
                // Keep the shared button honest; the resulting intent change
                // is a no-op here since `playing` already matches.
                self.intent.stop();
                self.publish();
            }
        }
    }

    // ── events ────────────────────────────────────────────────────────────────

    pub async fn handle_event(&mut self, evt: CatalogEvent) {
        match evt {
            CatalogEvent::Command(cmd) => {
                info!("CatalogEngine: command {:?}", cmd);
                self.handle_command(cmd).await;
            }
            CatalogEvent::Output(evt) => self.handle_output_event(evt).await,
            CatalogEvent::FetchFinished { generation, result } => {
                if self.playlist.complete(generation, result) {
                    self.failed_in_row = 0;
                    self.track_error = None;
                    self.bind_current(false).await;
                }
            }
            CatalogEvent::Shutdown => self.shutdown().await,
        }
        self.publish();
    }

    async fn handle_command(&mut self, cmd: CatalogCommand) {
        match cmd {
            CatalogCommand::Next => {
                if self.playlist.next() {
                    self.bind_current(true).await;
                }
            }
            CatalogCommand::Previous => {
                if self.playlist.previous() {
                    self.bind_current(true).await;
                }
            }
            CatalogCommand::Select(idx) => {
                let before = self.playlist.index();
                if self.playlist.select_index(idx) && self.playlist.index() != before {
                    self.bind_current(true).await;
                }
            }
            CatalogCommand::TogglePlay => {
                self.intent.toggle();
                self.sync_intent().await;
            }
            CatalogCommand::Retry => self.sync_intent().await,
            CatalogCommand::SetVolume(v) => {
                let v = if v.is_finite() { v } else { 0.0 };
                self.volume = v.clamp(0.0, 1.0);
                if let Err(e) = self.output.set_volume(self.volume).await {
                    warn!("CatalogEngine: set_volume failed: {}", e);
                }
            }
            CatalogCommand::SeekTo(secs) => {
                if self.bound.is_none() {
                    return;
                }
                let target = if self.duration > 0.0 {
                    secs.clamp(0.0, self.duration)
                } else {
                    secs.max(0.0)
                };
                match self.output.seek(target).await {
                    Ok(()) => self.elapsed = target,
                    Err(e) => warn!("CatalogEngine: seek failed: {}", e),
                }
            }
        }
    }

    async fn handle_output_event(&mut self, evt: OutputEvent) {
        match evt {
            OutputEvent::TimeUpdate { elapsed, duration } => {
                self.elapsed = if elapsed.is_finite() { elapsed } else { 0.0 };
                if duration.is_finite() && duration > 0.0 {
                    self.duration = duration;
                }
                self.source_healthy();
            }
            OutputEvent::Playing => {
                debug!("CatalogEngine: output playing");
                self.source_healthy();
            }
            OutputEvent::CanPlay | OutputEvent::Waiting => {
                debug!("CatalogEngine: output {:?}", evt);
            }
            OutputEvent::Ended => {
                info!("CatalogEngine: track ended, advancing");
                if self.playlist.next() {
                    self.bind_current(true).await;
                }
            }
            OutputEvent::Error { source, message } => {
                if let Some(url) = source.as_deref() {
                    let bound_url = self
                        .bound
                        .as_ref()
                        .and(self.playlist.current())
                        .map(|t| t.audio.as_str());
                    if bound_url != Some(url) {
                        debug!("CatalogEngine: dropping error for unbound source {}", url);
                        return;
                    }
                }
                warn!("CatalogEngine: source error: {}", message);
                self.track_error = Some(message);
                self.failed_in_row += 1;
                if self.failed_in_row < self.playlist.len() {
                    if self.playlist.next() {
                        self.bind_current(true).await;
                    }
                } else {
                    warn!("CatalogEngine: every track in the playlist failed, stopping skip-ahead");
                }
            }
        }
    }

    fn source_healthy(&mut self) {
        self.failed_in_row = 0;
        self.track_error = None;
    }

    // ── output ────────────────────────────────────────────────────────────────

    /// Bind the playlist's current track to the output, replacing whatever
    /// was bound.  Without `force`, re-binding the same track is skipped.
    async fn bind_current(&mut self, force: bool) {
        let Some(track) = self.playlist.current().cloned() else {
            // Empty playlist: silence whatever the previous one left bound.
            if self.bound.take().is_some() {
                self.pause_output().await;
            }
            self.elapsed = 0.0;
            self.duration = 0.0;
            return;
        };
        if !force && self.bound.as_deref() == Some(track.id.as_str()) {
            return;
        }

        info!(
            "CatalogEngine: binding [{}] {} - {}",
            self.playlist.index(),
            track.artist_name,
            track.name
        );
        self.elapsed = 0.0;
        self.duration = f64::from(track.duration);

        if let Err(e) = self.output.set_source(&track.audio).await {
            warn!("CatalogEngine: could not bind {}: {}", track.id, e);
            self.bound = None;
            self.track_error = Some(e.to_string());
            return;
        }
        self.bound = Some(track.id);

        if self.playing {
            self.play_output().await;
        }
    }

    async fn play_output(&mut self) {
        if self.bound.is_none() {
            return;
        }
        self.focus.request(FocusOwner::Catalog);
        match self.output.play().await {
            Ok(()) => {}
            Err(PlaybackError::AutoplayBlocked) => {
                debug!("CatalogEngine: autoplay blocked, waiting for a gesture");
            }
            Err(e) => {
                debug!("CatalogEngine: play rejected: {}", e);
            }
        }
    }

    async fn pause_output(&mut self) {
        if let Err(e) = self.output.pause().await {
            warn!("CatalogEngine: pause failed: {}", e);
        }
    }

    // ── fetch ─────────────────────────────────────────────────────────────────

    fn spawn_fetch(&self, ticket: FetchTicket) {
        let source = Arc::clone(&self.source);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let FetchTicket {
                generation,
                params,
                cancel,
            } = ticket;
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("CatalogEngine: fetch gen={} cancelled", generation);
                }
                result = source.fetch_tracks(&params) => {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let _ = tx.send(CatalogEvent::FetchFinished { generation, result }).await;
                }
            }
        });
    }

    // ── snapshot ──────────────────────────────────────────────────────────────

    fn snapshot(&self) -> CatalogSession {
        CatalogSession {
            tracks: self.playlist.tracks().to_vec(),
            current_index: self.playlist.index(),
            phase: self.playlist.phase(),
            playing: self.playing,
            volume: self.volume,
            elapsed: self.elapsed,
            duration: self.duration,
            loading: self.playlist.is_loading(),
            error: self.playlist.error().map(str::to_string),
            track_error: self.track_error.clone(),
        }
    }

    fn publish(&self) {
        self.session_tx.send_replace(self.snapshot());
    }
}
