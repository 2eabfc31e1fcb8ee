//! Process-wide playback intent.
//!
//! One "should audio be playing" flag plus the active catalog parameters.
//! The host builds a single `PlaybackIntent` at startup and hands clones to
//! every surface that can start or stop the catalog player (header control,
//! preset picker, mobile menu).  The mounted engine observes it through
//! `subscribe()`.
//!
//! Writers all mean the same thing (set true, or flip), so last write wins.
//! Nothing here is persisted: a new process always starts paused.

use std::sync::Arc;

use r4y_proto::params::FetchParameters;
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntentSnapshot {
    pub playing: bool,
    pub params: FetchParameters,
}

#[derive(Clone)]
pub struct PlaybackIntent {
    tx: Arc<watch::Sender<IntentSnapshot>>,
}

impl PlaybackIntent {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(IntentSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> IntentSnapshot {
        self.tx.borrow().clone()
    }

    pub fn is_playing(&self) -> bool {
        self.tx.borrow().playing
    }

    pub fn toggle(&self) {
        self.tx.send_modify(|s| s.playing = !s.playing);
        info!("intent: toggled → playing={}", self.is_playing());
    }

    /// Force playing.  Idempotent.
    pub fn start(&self) {
        let changed = self.tx.send_if_modified(|s| !std::mem::replace(&mut s.playing, true));
        if changed {
            info!("intent: start");
        }
    }

    pub fn stop(&self) {
        let changed = self.tx.send_if_modified(|s| std::mem::replace(&mut s.playing, false));
        if changed {
            info!("intent: stop");
        }
    }

    /// Change which playlist the catalog player requests.  Observers are
    /// only woken when the selection actually differs.
    pub fn set_parameters(&self, params: FetchParameters) {
        let changed = self.tx.send_if_modified(|s| {
            let differs = !s.params.same_selection(&params);
            s.params = params;
            differs
        });
        if changed {
            info!("intent: parameters → {:?}", self.tx.borrow().params);
        }
    }

    /// Pick a playlist and start it, as a preset click does.
    pub fn select(&self, params: FetchParameters) {
        self.set_parameters(params);
        self.start();
    }

    pub fn is_selected(&self, params: &FetchParameters) -> bool {
        self.tx.borrow().params.same_selection(params)
    }

    pub fn subscribe(&self) -> watch::Receiver<IntentSnapshot> {
        self.tx.subscribe()
    }
}

impl Default for PlaybackIntent {
    fn default() -> Self {
        Self::new()
    }
}
