//! Shared types for the r4y playback core: the track/schedule data model,
//! fetch parameters, the error taxonomy, configuration, platform paths and
//! the persisted listener preferences.

pub mod config;
pub mod error;
pub mod model;
pub mod params;
pub mod platform;
pub mod state;
