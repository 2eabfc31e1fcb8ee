//! Now-airing computation over the day's program slots.
//!
//! Slots are trusted to be sorted and non-overlapping; the lookup is a plain
//! scan for `start <= now < end`.  Outside every slot (before opening, in a
//! gap, after close) nothing is airing and progress is 0.

use std::time::Duration;

use r4y_proto::model::ProgramSlot;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Schedule {
    slots: Vec<ProgramSlot>,
}

impl Schedule {
    pub fn new(slots: Vec<ProgramSlot>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[ProgramSlot] {
        &self.slots
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Index of the slot airing at `now` (epoch seconds).
    pub fn now_airing(&self, now: i64) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.start <= now && now < s.end)
    }

    pub fn current(&self, now: i64) -> Option<&ProgramSlot> {
        self.now_airing(now).map(|i| &self.slots[i])
    }

    /// Percent (0..=100) of slot `idx` elapsed at `now`.
    pub fn progress(&self, idx: usize, now: i64) -> f64 {
        match self.slots.get(idx) {
            Some(slot) => slot_progress(slot, now),
            None => 0.0,
        }
    }

    /// Progress of whatever is airing at `now`, 0 when nothing is.
    pub fn now_progress(&self, now: i64) -> f64 {
        self.now_airing(now)
            .map(|i| self.progress(i, now))
            .unwrap_or(0.0)
    }
}

pub fn slot_progress(slot: &ProgramSlot, now: i64) -> f64 {
    let span = slot.end - slot.start;
    if span <= 0 {
        return 0.0;
    }
    let pct = (now - slot.start) as f64 / span as f64 * 100.0;
    pct.clamp(0.0, 100.0)
}

/// Periodic clock for the now-airing highlight.
///
/// Posts `make_event(now)` every `interval` until dropped, aborted, or the
/// receiving side goes away.  The first tick fires immediately.
pub struct ScheduleTicker {
    handle: JoinHandle<()>,
}

impl ScheduleTicker {
    pub fn spawn<E, F>(interval: Duration, tx: mpsc::Sender<E>, make_event: F) -> Self
    where
        E: Send + 'static,
        F: Fn(i64) -> E + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let now = chrono::Utc::now().timestamp();
                if tx.send(make_event(now)).await.is_err() {
                    debug!("schedule ticker: receiver gone, stopping");
                    break;
                }
            }
        });
        Self { handle }
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduleTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
