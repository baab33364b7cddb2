//! Lazy, deduplicated waveform previews keyed by audio URL.
//!
//! The host resolves fetches however it likes (a worker thread, an HTTP
//! client, a test stub) and answers through a [`WaveformResponder`]. The
//! cache only ever polls, so pending fetches never stall the UI thread.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{Clip, ClipId};

/// Half-height of the silhouette inside the 0..100 box.
const WAVE_AMPLITUDE: f32 = 42.0;
const WAVE_CENTER: f32 = 50.0;
const WAVE_GAIN: f32 = 1.5;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WaveformError {
    #[error("waveform fetch failed: {0}")]
    Fetch(String),
    #[error("waveform request dropped before resolving")]
    Dropped,
}

type WaveformResult = Result<Vec<f32>, WaveformError>;

/// Host side of a pending fetch.
#[derive(Debug)]
pub struct WaveformResponder {
    sender: Sender<WaveformResult>,
}

impl WaveformResponder {
    pub fn resolve(self, samples: Vec<f32>) {
        let _ = self.sender.send(Ok(samples));
    }

    pub fn fail(self, reason: impl Into<String>) {
        let _ = self.sender.send(Err(WaveformError::Fetch(reason.into())));
    }
}

/// Pending result of [`WaveformSource::request`].
#[derive(Debug)]
pub struct WaveformRequest {
    receiver: Receiver<WaveformResult>,
}

impl WaveformRequest {
    pub fn pending() -> (WaveformResponder, WaveformRequest) {
        let (sender, receiver) = bounded(1);
        (WaveformResponder { sender }, WaveformRequest { receiver })
    }

    pub fn ready(samples: Vec<f32>) -> Self {
        let (responder, request) = Self::pending();
        responder.resolve(samples);
        request
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        let (responder, request) = Self::pending();
        responder.fail(reason);
        request
    }

    fn try_take(&self) -> Option<WaveformResult> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(WaveformError::Dropped)),
        }
    }
}

/// Fetches downsampled amplitude arrays for an audio URL.
pub trait WaveformSource {
    fn request(&mut self, url: &str) -> WaveformRequest;
}

impl<F> WaveformSource for F
where
    F: FnMut(&str) -> WaveformRequest,
{
    fn request(&mut self, url: &str) -> WaveformRequest {
        self(url)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WaveformEntry {
    Loading,
    Ready(Arc<[f32]>),
    Failed,
}

#[derive(Debug, Default)]
pub struct WaveformCache {
    entries: HashMap<String, WaveformEntry>,
    /// URLs with a fetch in flight or a memoised result.
    loaded: HashSet<String>,
    pending: HashMap<String, WaveformRequest>,
    fetches: u64,
}

impl WaveformCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fetch for `url` unless one is in flight or already succeeded.
    /// Returns whether a request was issued.
    pub fn ensure<S: WaveformSource + ?Sized>(&mut self, url: &str, source: &mut S) -> bool {
        if self.loaded.contains(url) {
            return false;
        }
        self.loaded.insert(url.to_owned());
        self.fetches += 1;
        debug!(url, "requesting waveform");
        let request = source.request(url);
        // A retry keeps showing the failure placeholder until it succeeds.
        self.entries
            .entry(url.to_owned())
            .or_insert(WaveformEntry::Loading);
        self.pending.insert(url.to_owned(), request);
        true
    }

    /// Collects finished fetches without blocking. Returns how many resolved.
    pub fn poll(&mut self) -> usize {
        let finished: Vec<(String, WaveformResult)> = self
            .pending
            .iter()
            .filter_map(|(url, request)| request.try_take().map(|result| (url.clone(), result)))
            .collect();

        for (url, result) in &finished {
            self.pending.remove(url);
            match result {
                Ok(samples) => {
                    let samples: Arc<[f32]> = samples.iter().map(|s| normalize(*s)).collect();
                    debug!(url = %url, len = samples.len(), "waveform ready");
                    self.entries.insert(url.clone(), WaveformEntry::Ready(samples));
                }
                Err(err) => {
                    warn!(url = %url, %err, "waveform fetch failed; will retry");
                    self.loaded.remove(url);
                    self.entries.insert(url.clone(), WaveformEntry::Failed);
                }
            }
        }
        finished.len()
    }

    pub fn entry(&self, url: &str) -> Option<&WaveformEntry> {
        self.entries.get(url)
    }

    pub fn samples(&self, url: &str) -> Option<Arc<[f32]>> {
        match self.entries.get(url) {
            Some(WaveformEntry::Ready(samples)) => Some(Arc::clone(samples)),
            _ => None,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Total fetches issued over the cache's lifetime, retries included.
    pub fn fetch_count(&self) -> u64 {
        self.fetches
    }

    /// What to draw for `clip`. Live takes read `live` and never touch the cache.
    pub fn shape_for(&self, clip: &Clip, live: &HashMap<ClipId, Vec<f32>>) -> WaveformShape {
        match &clip.audio_url {
            None => match live.get(&clip.id) {
                Some(samples) => WaveformShape::Polygon(waveform_polygon(samples)),
                None => WaveformShape::NoSource,
            },
            Some(url) => match self.entries.get(url) {
                Some(WaveformEntry::Ready(samples)) => {
                    WaveformShape::Polygon(waveform_polygon(samples))
                }
                Some(WaveformEntry::Failed) => WaveformShape::Gradient,
                Some(WaveformEntry::Loading) | None => WaveformShape::Loading,
            },
        }
    }
}

fn normalize(sample: f32) -> f32 {
    if sample.is_finite() {
        sample.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WavePoint {
    pub x: f32,
    pub y: f32,
}

/// Render-ready waveform for one clip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", content = "points", rename_all = "snake_case")]
pub enum WaveformShape {
    /// Closed silhouette in a 0..100 box, independent of clip width.
    Polygon(Vec<WavePoint>),
    Loading,
    /// Fetch failed; a gradient block stands in until the retry lands.
    Gradient,
    /// Neither a URL nor live data: neutral block.
    NoSource,
}

/// Mirrored silhouette: the top envelope left to right, then the bottom
/// envelope right to left.
pub fn waveform_polygon(samples: &[f32]) -> Vec<WavePoint> {
    let count = samples.len();
    if count == 0 {
        return Vec::new();
    }
    let span = (count.saturating_sub(1)).max(1) as f32;
    let offset = |sample: f32| (normalize(sample) * WAVE_GAIN).min(1.0) * WAVE_AMPLITUDE;

    let top = samples.iter().enumerate().map(|(index, &sample)| WavePoint {
        x: index as f32 / span * 100.0,
        y: WAVE_CENTER - offset(sample),
    });
    let bottom = samples.iter().enumerate().rev().map(|(index, &sample)| WavePoint {
        x: index as f32 / span * 100.0,
        y: WAVE_CENTER + offset(sample),
    });
    top.chain(bottom).collect()
}

/// Absolute-peak downsampling to `buckets` values normalised to `[0, 1]`.
pub fn downsample_peaks(samples: &[f32], buckets: usize) -> Vec<f32> {
    if samples.is_empty() || buckets == 0 {
        return Vec::new();
    }
    let per_bucket = samples.len().div_ceil(buckets);
    let peaks: Vec<f32> = samples
        .chunks(per_bucket)
        .map(|chunk| {
            chunk
                .iter()
                .filter(|sample| sample.is_finite())
                .fold(0.0f32, |peak, sample| peak.max(sample.abs()))
        })
        .collect();
    let loudest = peaks.iter().copied().fold(0.0f32, f32::max);
    if loudest <= 0.0 {
        return peaks;
    }
    peaks.into_iter().map(|peak| peak / loudest).collect()
}
