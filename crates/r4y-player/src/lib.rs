//! Playback orchestration for the radio site.
//!
//! Two independent contexts live here:
//!
//! ```text
//!  PlaybackIntent ──watch──▶ CatalogEngine ──▶ AudioOutput (catalog)
//!                                 │
//!                           PlaylistMachine ◀── CatalogClient
//!
//!  LiveController ──▶ AudioOutput (live)
//!        ▲
//!        ├── BroadcastClient (stream + day grid)
//!        └── ScheduleTicker (periodic now-airing refresh)
//! ```
//!
//! Both contexts ask [`focus::AudioFocus`] before playing, so at most one
//! output is ever audible.

pub mod broadcast;
pub mod catalog;
pub mod engine;
pub mod focus;
pub mod intent;
pub mod live;
pub mod logging;
pub mod output;
pub mod playlist;
pub mod presets;
pub mod schedule;

#[cfg(test)]
pub(crate) mod testing;

pub use r4y_proto as proto;
