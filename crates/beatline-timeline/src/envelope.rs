use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::ClipId;

/// Widest `[start, end]` a clip has reached while being edited.
///
/// Resizes may not extend a clip past its envelope, so an edge dragged back
/// out can only reveal material that was exposed at some earlier point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipEnvelope {
    pub start: f64,
    pub end: f64,
}

impl ClipEnvelope {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start: start.min(end),
            end: end.max(start),
        }
    }

    pub fn contains(&self, start: f64, end: f64) -> bool {
        self.start <= start && end <= self.end
    }
}

/// Union of `envelope` and `[start, end]`. Never shrinks.
pub fn widen_envelope(envelope: ClipEnvelope, start: f64, end: f64) -> ClipEnvelope {
    ClipEnvelope {
        start: envelope.start.min(start),
        end: envelope.end.max(end),
    }
}

#[derive(Debug, Default, Clone)]
pub struct ClipBoundsTracker {
    envelopes: HashMap<ClipId, ClipEnvelope>,
}

impl ClipBoundsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records bounds seen for `clip`, creating its envelope on first sight.
    pub fn observe(&mut self, clip: ClipId, start: f64, end: f64) -> ClipEnvelope {
        let envelope = match self.envelopes.get(&clip) {
            Some(existing) => widen_envelope(*existing, start, end),
            None => ClipEnvelope::new(start, end),
        };
        self.envelopes.insert(clip, envelope);
        envelope
    }

    pub fn envelope(&self, clip: ClipId) -> Option<ClipEnvelope> {
        self.envelopes.get(&clip).copied()
    }

    pub fn forget(&mut self, clip: ClipId) {
        self.envelopes.remove(&clip);
    }

    /// Drops envelopes of clips that no longer exist.
    pub fn retain(&mut self, mut keep: impl FnMut(ClipId) -> bool) {
        self.envelopes.retain(|id, _| keep(*id));
    }

    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn widen_never_shrinks() {
        let envelope = ClipEnvelope::new(1.0, 5.0);
        assert_eq!(widen_envelope(envelope, 2.0, 3.0), envelope);
        assert_eq!(
            widen_envelope(envelope, 0.5, 6.0),
            ClipEnvelope::new(0.5, 6.0)
        );
    }

    #[test]
    fn observe_accumulates_history() {
        let mut tracker = ClipBoundsTracker::new();
        tracker.observe(ClipId(1), 2.0, 4.0);
        tracker.observe(ClipId(1), 3.0, 6.0);
        tracker.observe(ClipId(1), 2.5, 3.0);
        assert_eq!(tracker.envelope(ClipId(1)), Some(ClipEnvelope::new(2.0, 6.0)));

        tracker.forget(ClipId(1));
        assert!(tracker.envelope(ClipId(1)).is_none());
    }
}
