//! Playlist state machine.
//!
//! ```text
//!  Idle ──set_parameters──▶ Loading ──complete(Ok)──▶ Ready
//!                              │  ▲                     │
//!                   complete(Err)│  └──set_parameters───┘
//!                              ▼  │
//!                             Error
//! ```
//!
//! Only `set_parameters` and fetch completions move the phase.  Every fetch
//! gets a generation number; a completion is applied only when it carries
//! the latest generation, so a slow superseded fetch can never overwrite a
//! newer playlist regardless of which one resolves first.

use r4y_proto::error::PlaybackError;
use r4y_proto::model::{PlaylistPhase, Track};
use r4y_proto::params::FetchParameters;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Handed out by `set_parameters`; whoever runs the fetch must report back
/// with `generation` and stop early when `cancel` fires.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub generation: u64,
    pub params: FetchParameters,
    pub cancel: CancellationToken,
}

#[derive(Debug, Default)]
pub struct PlaylistMachine {
    tracks: Vec<Track>,
    index: usize,
    phase: PlaylistPhase,
    active: Option<FetchParameters>,
    generation: u64,
    pending: Option<CancellationToken>,
    error: Option<String>,
}

impl PlaylistMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.index)
    }

    pub fn phase(&self) -> PlaylistPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == PlaylistPhase::Loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn active_parameters(&self) -> Option<&FetchParameters> {
        self.active.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a fetch for `params` unless they select the active playlist.
    pub fn set_parameters(&mut self, params: FetchParameters) -> Option<FetchTicket> {
        if let Some(active) = &self.active {
            // A failed selection may be asked for again.
            if active.same_selection(&params) && self.phase != PlaylistPhase::Error {
                debug!("playlist: parameters unchanged, no fetch");
                return None;
            }
        }

        if let Some(prev) = self.pending.take() {
            debug!("playlist: cancelling fetch gen={}", self.generation);
            prev.cancel();
        }

        self.generation += 1;
        let cancel = CancellationToken::new();
        self.pending = Some(cancel.clone());
        self.active = Some(params.clone());
        self.phase = PlaylistPhase::Loading;
        self.error = None;
        info!("playlist: fetching gen={} {:?}", self.generation, params);

        Some(FetchTicket {
            generation: self.generation,
            params,
            cancel,
        })
    }

    /// Apply a fetch outcome.  Returns `false` when the outcome is stale and
    /// was dropped.
    pub fn complete(
        &mut self,
        generation: u64,
        result: Result<Vec<Track>, PlaybackError>,
    ) -> bool {
        if generation != self.generation || self.phase != PlaylistPhase::Loading {
            debug!(
                "playlist: dropping stale completion gen={} (latest={})",
                generation, self.generation
            );
            return false;
        }
        self.pending = None;

        match result {
            Ok(tracks) => {
                info!("playlist: gen={} ready, {} tracks", generation, tracks.len());
                self.replace(tracks);
                self.phase = PlaylistPhase::Ready;
            }
            Err(e) => {
                warn!("playlist: gen={} failed: {}", generation, e);
                self.replace(Vec::new());
                self.error = Some(e.to_string());
                self.phase = PlaylistPhase::Error;
            }
        }
        true
    }

    /// Cancel whatever is in flight (unmount).
    pub fn cancel_pending(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    fn replace(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
        self.index = 0;
    }

    pub fn next(&mut self) -> bool {
        if self.tracks.is_empty() {
            return false;
        }
        self.index = (self.index + 1) % self.tracks.len();
        true
    }

    pub fn previous(&mut self) -> bool {
        if self.tracks.is_empty() {
            return false;
        }
        let len = self.tracks.len();
        self.index = (self.index + len - 1) % len;
        true
    }

    /// Jump to `index`, clamped into range.
    pub fn select_index(&mut self, index: usize) -> bool {
        if self.tracks.is_empty() {
            return false;
        }
        self.index = index.min(self.tracks.len() - 1);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::tracks;

    fn ready(n: usize) -> PlaylistMachine {
        let mut pl = PlaylistMachine::new();
        let ticket = pl.set_parameters(FetchParameters::search("pop")).unwrap();
        assert!(pl.complete(ticket.generation, Ok(tracks("t", n))));
        pl
    }

    #[test]
    fn test_idle_until_first_parameters() {
        let pl = PlaylistMachine::new();
        assert_eq!(pl.phase(), PlaylistPhase::Idle);
        assert!(pl.current().is_none());
    }

    #[test]
    fn test_fetch_success_resets_index() {
        let mut pl = ready(5);
        pl.select_index(3);
        assert_eq!(pl.index(), 3);

        let ticket = pl.set_parameters(FetchParameters::search("rock")).unwrap();
        assert!(pl.is_loading());
        assert!(pl.complete(ticket.generation, Ok(tracks("r", 4))));
        assert_eq!(pl.phase(), PlaylistPhase::Ready);
        assert_eq!(pl.index(), 0);
        assert_eq!(pl.current().unwrap().id, "r0");
    }

    #[test]
    fn test_same_parameters_do_not_refetch() {
        let mut pl = ready(2);
        assert!(pl.set_parameters(FetchParameters::search(" pop")).is_none());
        assert_eq!(pl.phase(), PlaylistPhase::Ready);
    }

    #[test]
    fn test_later_request_wins_even_if_earlier_resolves_last() {
        let mut pl = PlaylistMachine::new();
        let a = pl.set_parameters(FetchParameters::search("a")).unwrap();
        let b = pl.set_parameters(FetchParameters::search("b")).unwrap();
        assert!(a.cancel.is_cancelled());
        assert!(!b.cancel.is_cancelled());

        assert!(pl.complete(b.generation, Ok(tracks("b", 3))));
        assert!(!pl.complete(a.generation, Ok(tracks("a", 7))));

        assert_eq!(pl.len(), 3);
        assert_eq!(pl.current().unwrap().id, "b0");
    }

    #[test]
    fn test_superseded_failure_sets_no_error() {
        let mut pl = PlaylistMachine::new();
        let a = pl.set_parameters(FetchParameters::search("a")).unwrap();
        let b = pl.set_parameters(FetchParameters::search("b")).unwrap();
        assert!(!pl.complete(a.generation, Err(PlaybackError::Http { status: 500 })));
        assert!(pl.error().is_none());
        assert!(pl.is_loading());
        assert!(pl.complete(b.generation, Ok(tracks("b", 1))));
    }

    #[test]
    fn test_failure_empties_playlist() {
        let mut pl = ready(3);
        let t = pl.set_parameters(FetchParameters::search("x")).unwrap();
        assert!(pl.complete(t.generation, Err(PlaybackError::Network("reset".into()))));
        assert_eq!(pl.phase(), PlaylistPhase::Error);
        assert!(pl.is_empty());
        assert!(pl.error().unwrap().contains("reset"));
    }

    #[test]
    fn test_same_parameters_refetch_after_failure() {
        let mut pl = PlaylistMachine::new();
        let t = pl.set_parameters(FetchParameters::search("pop")).unwrap();
        assert!(pl.complete(t.generation, Err(PlaybackError::Http { status: 502 })));

        let retry = pl.set_parameters(FetchParameters::search("pop")).unwrap();
        assert!(retry.generation > t.generation);
        assert!(pl.is_loading());
        assert!(pl.error().is_none());
        assert!(pl.complete(retry.generation, Ok(tracks("p", 2))));
        assert!(pl.set_parameters(FetchParameters::search("pop")).is_none());
    }

    #[test]
    fn test_next_wraps_back_to_start() {
        let mut pl = ready(4);
        pl.select_index(2);
        for _ in 0..4 {
            assert!(pl.next());
            assert!(pl.index() < 4);
        }
        assert_eq!(pl.index(), 2);
    }

    #[test]
    fn test_previous_wraps_to_end() {
        let mut pl = ready(3);
        assert!(pl.previous());
        assert_eq!(pl.index(), 2);
        assert!(pl.previous());
        assert_eq!(pl.index(), 1);
    }

    #[test]
    fn test_traversal_noop_when_empty() {
        let mut pl = PlaylistMachine::new();
        assert!(!pl.next());
        assert!(!pl.previous());
        assert!(!pl.select_index(4));
        assert_eq!(pl.index(), 0);
    }

    #[test]
    fn test_select_index_clamps() {
        let mut pl = ready(3);
        assert!(pl.select_index(10));
        assert_eq!(pl.index(), 2);
    }

    #[test]
    fn test_duplicate_completion_is_ignored() {
        let mut pl = PlaylistMachine::new();
        let t = pl.set_parameters(FetchParameters::search("a")).unwrap();
        assert!(pl.complete(t.generation, Ok(tracks("a", 2))));
        pl.next();
        assert!(!pl.complete(t.generation, Ok(tracks("z", 5))));
        assert_eq!(pl.index(), 1);
        assert_eq!(pl.len(), 2);
    }
}
