use serde::{Deserialize, Serialize};

/// Optional playback loop window.
///
/// A region whose end is not after its start is ignored for rendering and
/// playback, whatever `enabled` says.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoopRegion {
    pub enabled: bool,
    pub start_sec: f64,
    pub end_sec: f64,
}

impl LoopRegion {
    pub fn new(start_sec: f64, end_sec: f64, enabled: bool) -> Self {
        Self {
            enabled,
            start_sec,
            end_sec,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.end_sec > self.start_sec
    }

    pub fn is_active(&self) -> bool {
        self.enabled && self.is_valid()
    }

    /// `(start, end)` when the loop takes part in playback.
    pub fn active_range(&self) -> Option<(f64, f64)> {
        self.is_active().then_some((self.start_sec, self.end_sec))
    }

    pub fn length(&self) -> f64 {
        (self.end_sec - self.start_sec).max(0.0)
    }

    /// Folds a playhead advance from `previous` to `next` back into the loop
    /// when it crosses the loop end.
    pub fn wrap(&self, previous: f64, next: f64) -> f64 {
        let Some((start, end)) = self.active_range() else {
            return next;
        };
        if previous < end && end <= next {
            let overshoot = (next - end) % (end - start);
            start + overshoot
        } else {
            next
        }
    }
}

/// Owner-side editing operations on a [`LoopRegion`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoopRegionManager {
    region: LoopRegion,
}

impl LoopRegionManager {
    pub fn new(region: LoopRegion) -> Self {
        Self { region }
    }

    pub fn region(&self) -> LoopRegion {
        self.region
    }

    /// Flips `enabled`; bounds stay untouched.
    pub fn toggle(&mut self) -> bool {
        self.region.enabled = !self.region.enabled;
        tracing::debug!(enabled = self.region.enabled, "loop toggled");
        self.region.enabled
    }

    pub fn set_from_clip(&mut self, start_sec: f64, duration_sec: f64) {
        self.region = LoopRegion {
            enabled: true,
            start_sec,
            end_sec: start_sec + duration_sec,
        };
    }

    pub fn set_start(&mut self, start_sec: f64) {
        self.region.start_sec = start_sec.max(0.0);
    }

    pub fn set_end(&mut self, end_sec: f64) {
        self.region.end_sec = end_sec.max(0.0);
    }
}
