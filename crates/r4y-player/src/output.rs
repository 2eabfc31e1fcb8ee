/// Audio output seam.
///
/// Each playback context exclusively owns one `AudioOutput`.  Commands go in
/// through the trait; unsolicited signals (buffering, progress, end, decode
/// failure) come back as [`OutputEvent`]s that the host posts into the owning
/// context's event channel.
use async_trait::async_trait;
use r4y_proto::error::Result;

#[async_trait]
pub trait AudioOutput: Send {
    /// Bind a new source, fully replacing the previous one.  Whatever was
    /// playing stops.
    async fn set_source(&mut self, url: &str) -> Result<()>;

    /// Start fetching the bound source without playing it.
    async fn load(&mut self) -> Result<()>;

    /// Start or resume playback.  May fail with `AutoplayBlocked` when the
    /// platform wants a user gesture, or `Device` when the source is bad.
    async fn play(&mut self) -> Result<()>;

    async fn pause(&mut self) -> Result<()>;

    async fn seek(&mut self, seconds: f64) -> Result<()>;

    /// Linear gain 0..=1.
    async fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// Unbind the source and free the device.  Called on unmount.
    async fn release(&mut self) -> Result<()>;
}

/// Signals raised by an output.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    /// Enough data is buffered to start.
    CanPlay,
    /// Playback stalled waiting for data.
    Waiting,
    /// Audio is flowing.
    Playing,
    /// Periodic timeline update.
    TimeUpdate { elapsed: f64, duration: f64 },
    /// The source reached its natural end.
    Ended,
    /// The source could not be fetched or decoded.  `source` is the URL the
    /// failure belongs to, when the host knows it.
    Error {
        source: Option<String>,
        message: String,
    },
}

impl OutputEvent {
    /// Failure not attributed to a particular source.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            source: None,
            message: message.into(),
        }
    }

    /// Failure of the source bound at `url`.
    pub fn source_error(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            source: Some(url.into()),
            message: message.into(),
        }
    }
}
