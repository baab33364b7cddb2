//! Capability surface of the external audio engine that plays a clip.

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum PlaybackError {
    #[error("failed to load audio from {url}: {reason}")]
    Load { url: String, reason: String },
    #[error("audio backend error: {0}")]
    Backend(String),
}

/// Notifications raised by the audio backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackEvent {
    /// Media decoded. The callback receives its duration.
    Ready,
    /// Playhead advanced. The callback receives the current time.
    TimeUpdate,
    Play,
    Pause,
    Finish,
}

/// Receives the time value attached to a [`PlaybackEvent`].
pub type PlaybackCallback = Box<dyn FnMut(f64)>;

pub trait AudioPlaybackAdapter {
    fn load(&mut self, url: &str) -> Result<(), PlaybackError>;
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    /// Seeks to a position given as a fraction of the media duration.
    fn seek_to(&mut self, ratio: f64);
    fn current_time(&self) -> f64;
    /// `None` until the media has been decoded.
    fn duration(&self) -> Option<f64>;
    fn on(&mut self, event: PlaybackEvent, callback: PlaybackCallback);
}

/// Guards an adapter so play and seek are no-ops while no audio is loaded.
pub struct ClipPlayback<A: AudioPlaybackAdapter> {
    adapter: A,
    source: Option<String>,
}

impl<A: AudioPlaybackAdapter> ClipPlayback<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            source: None,
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Loads `url` unless it is already the current source. `None` unloads.
    pub fn set_source(&mut self, url: Option<&str>) -> Result<(), PlaybackError> {
        match url {
            None => {
                if self.source.take().is_some() {
                    self.adapter.pause();
                }
                Ok(())
            }
            Some(url) if self.source.as_deref() == Some(url) => Ok(()),
            Some(url) => {
                self.source = None;
                self.adapter.load(url)?;
                debug!(url, "clip audio loaded");
                self.source = Some(url.to_owned());
                Ok(())
            }
        }
    }

    /// Starts playback. Returns `false` when there is nothing to play.
    pub fn play(&mut self) -> Result<bool, PlaybackError> {
        if self.source.is_none() {
            debug!("play ignored: clip has no audio");
            return Ok(false);
        }
        self.adapter.play()?;
        Ok(true)
    }

    pub fn pause(&mut self) {
        if self.source.is_some() {
            self.adapter.pause();
        }
    }

    pub fn seek_to_ratio(&mut self, ratio: f64) -> bool {
        if self.source.is_none() || !ratio.is_finite() {
            return false;
        }
        self.adapter.seek_to(ratio.clamp(0.0, 1.0));
        true
    }

    /// Seeks to `seconds` into the media. Needs a known duration.
    pub fn seek_to_time(&mut self, seconds: f64) -> bool {
        match self.duration() {
            Some(duration) => self.seek_to_ratio(seconds / duration),
            None => false,
        }
    }

    pub fn current_time(&self) -> f64 {
        if self.source.is_some() {
            self.adapter.current_time()
        } else {
            0.0
        }
    }

    pub fn duration(&self) -> Option<f64> {
        self.source.as_ref()?;
        self.adapter
            .duration()
            .filter(|duration| duration.is_finite() && *duration > 0.0)
    }

    pub fn on(&mut self, event: PlaybackEvent, callback: PlaybackCallback) {
        self.adapter.on(event, callback);
    }
}
