use serde::{Deserialize, Serialize};

/// Grid resolution used when snapping is on, in seconds.
pub const GRID_STEP_SEC: f64 = 0.25;

/// Quantizes edit positions onto a fixed time grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapEngine {
    pub enabled: bool,
    pub step_sec: f64,
}

impl Default for SnapEngine {
    fn default() -> Self {
        Self {
            enabled: true,
            step_sec: GRID_STEP_SEC,
        }
    }
}

impl SnapEngine {
    pub fn new(enabled: bool, step_sec: f64) -> Self {
        Self { enabled, step_sec }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn snap(&self, time: f64) -> f64 {
        snap_to_grid(time, self.step_sec, self.enabled)
    }
}

pub fn snap_to_grid(time: f64, step: f64, enabled: bool) -> f64 {
    if !enabled || step <= 0.0 {
        return time;
    }
    (time / step).round() * step
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snaps_to_quarter_seconds() {
        let snap = SnapEngine::default();
        assert_eq!(snap.snap(1.1), 1.0);
        assert_eq!(snap.snap(1.13), 1.25);
        assert_eq!(snap.snap(-0.2), -0.25);
    }

    #[test]
    fn disabled_snap_is_identity() {
        let snap = SnapEngine::default().with_enabled(false);
        assert_eq!(snap.snap(1.13), 1.13);
    }
}
