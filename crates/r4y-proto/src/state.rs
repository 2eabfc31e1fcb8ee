//! Durable listener preferences.
//!
//! The only persisted value is the live-stream volume.  Playback intent is
//! deliberately absent: a fresh process never resumes audio on its own.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistentState {
    pub live_volume: f32,
}

/// Cloneable handle to the preference file.  Every write goes straight to
/// disk; the file is read once, at construction.
#[derive(Clone)]
pub struct PreferenceStore {
    state: Arc<RwLock<PersistentState>>,
    state_file: PathBuf,
}

impl PreferenceStore {
    pub fn new(state_file: PathBuf, default_live_volume: f32) -> Self {
        let persistent = Self::load_persistent(&state_file, default_live_volume);
        Self {
            state: Arc::new(RwLock::new(persistent)),
            state_file,
        }
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    pub async fn live_volume(&self) -> f32 {
        self.state.read().await.live_volume
    }

    pub async fn set_live_volume(&self, volume: f32) -> anyhow::Result<()> {
        {
            let mut state = self.state.write().await;
            state.live_volume = volume.clamp(0.0, 1.0);
        }
        self.save().await
    }

    async fn save(&self) -> anyhow::Result<()> {
        let persistent = self.state.read().await.clone();

        if let Some(parent) = self.state_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&persistent)?;
        tokio::fs::write(&self.state_file, json).await?;
        debug!("preferences saved to {}", self.state_file.display());
        Ok(())
    }

    fn load_persistent(state_file: &Path, default_live_volume: f32) -> PersistentState {
        let fallback = PersistentState {
            live_volume: default_live_volume.clamp(0.0, 1.0),
        };
        let content = match std::fs::read_to_string(state_file) {
            Ok(c) => c,
            Err(_) => return fallback,
        };
        match serde_json::from_str::<PersistentState>(&content) {
            Ok(p) if p.live_volume.is_finite() => PersistentState {
                live_volume: p.live_volume.clamp(0.0, 1.0),
            },
            Ok(_) => fallback,
            Err(e) => {
                warn!(
                    "ignoring unreadable preferences {}: {}",
                    state_file.display(),
                    e
                );
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_volume_survives_reconstruction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = PreferenceStore::new(path.clone(), 0.8);
        assert_eq!(store.live_volume().await, 0.8);
        store.set_live_volume(0.42).await.unwrap();

        let reopened = PreferenceStore::new(path, 0.8);
        assert_eq!(reopened.live_volume().await, 0.42);
    }

    #[tokio::test]
    async fn test_volume_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("state.json"), 0.8);
        store.set_live_volume(1.7).await.unwrap();
        assert_eq!(store.live_volume().await, 1.0);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = PreferenceStore::new(path, 0.8);
        let volume = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(store.live_volume());
        assert_eq!(volume, 0.8);
    }
}
