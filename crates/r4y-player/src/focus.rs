//! AudioFocus: arbitrates which playback context may drive its output.
//!
//! The catalog player and the live page each own an output.  Before calling
//! `play()` a context must `request` focus; doing so revokes it from the
//! other holder, which observes the change through `subscribe()` and pauses.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOwner {
    Catalog,
    Live,
}

#[derive(Clone)]
pub struct AudioFocus {
    tx: Arc<watch::Sender<Option<FocusOwner>>>,
}

impl AudioFocus {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn holder(&self) -> Option<FocusOwner> {
        *self.tx.borrow()
    }

    pub fn is_held_by(&self, who: FocusOwner) -> bool {
        self.holder() == Some(who)
    }

    /// Grant focus to `who`.  Returns the context it was taken from, if any.
    pub fn request(&self, who: FocusOwner) -> Option<FocusOwner> {
        let previous = self.tx.send_replace(Some(who));
        match previous {
            Some(prev) if prev != who => {
                info!("audio focus {:?} → {:?}", prev, who);
                Some(prev)
            }
            None => {
                info!("audio focus → {:?}", who);
                None
            }
            _ => None,
        }
    }

    /// Give focus up.  No-op unless `who` holds it.
    pub fn release(&self, who: FocusOwner) -> bool {
        self.tx.send_if_modified(|holder| {
            if *holder == Some(who) {
                *holder = None;
                true
            } else {
                false
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<FocusOwner>> {
        self.tx.subscribe()
    }
}

impl Default for AudioFocus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_revokes_previous_holder() {
        let focus = AudioFocus::new();
        assert_eq!(focus.request(FocusOwner::Catalog), None);
        assert!(focus.is_held_by(FocusOwner::Catalog));
        assert_eq!(focus.request(FocusOwner::Live), Some(FocusOwner::Catalog));
        assert!(focus.is_held_by(FocusOwner::Live));
        assert!(!focus.is_held_by(FocusOwner::Catalog));
    }

    #[test]
    fn test_rerequest_is_idempotent() {
        let focus = AudioFocus::new();
        focus.request(FocusOwner::Live);
        assert_eq!(focus.request(FocusOwner::Live), None);
        assert_eq!(focus.holder(), Some(FocusOwner::Live));
    }

    #[test]
    fn test_release_only_by_holder() {
        let focus = AudioFocus::new();
        focus.request(FocusOwner::Live);
        assert!(!focus.release(FocusOwner::Catalog));
        assert_eq!(focus.holder(), Some(FocusOwner::Live));
        assert!(focus.release(FocusOwner::Live));
        assert_eq!(focus.holder(), None);
    }

    #[tokio::test]
    async fn test_subscribers_see_revocation() {
        let focus = AudioFocus::new();
        let mut rx = focus.subscribe();
        focus.request(FocusOwner::Catalog);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(FocusOwner::Catalog));
        focus.request(FocusOwner::Live);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(FocusOwner::Live));
    }
}
