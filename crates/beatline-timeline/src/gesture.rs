//! Pointer drag state machine for clip moves, edge resizes and lane scrubbing.
//!
//! A gesture starts on pointer-down, receives every pointer-move, and ends on
//! pointer-up wherever the pointer is released. Entering a gesture attaches
//! the host's global pointer listeners through [`PointerCapture`]; leaving it
//! detaches them on every exit path (release, cancel, drop).

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::action::{ResizeEdge, TimelineAction};
use crate::envelope::{ClipBoundsTracker, ClipEnvelope};
use crate::model::{ClipId, ClipRef};
use crate::snap::SnapEngine;
use crate::time_scale::{TimeScale, Viewport};

/// Attaches and detaches the host's window-wide move/up listeners.
pub trait PointerCapture {
    fn attach(&mut self);
    fn detach(&mut self);
}

impl<T: PointerCapture + ?Sized> PointerCapture for Box<T> {
    fn attach(&mut self) {
        (**self).attach();
    }

    fn detach(&mut self) {
        (**self).detach();
    }
}

/// Capture for hosts that route every pointer event to the timeline anyway.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCapture;

impl PointerCapture for NoCapture {
    fn attach(&mut self) {}

    fn detach(&mut self) {}
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GestureError {
    #[error("a pointer gesture is already in progress")]
    Busy,
}

/// Pointer position in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

impl PointerPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// On-screen horizontal extent of a clip when the gesture started.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClipBox {
    pub left: f64,
    pub width: f64,
}

impl ClipBox {
    /// Relative position of `x` inside the box, clamped to `[0, 1]`.
    pub fn ratio_at(&self, x: f64) -> f64 {
        if self.width <= 0.0 {
            return 0.0;
        }
        ((x - self.left) / self.width).clamp(0.0, 1.0)
    }
}

/// Clip state captured on pointer-down.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipGrab {
    pub target: ClipRef,
    pub clip_id: ClipId,
    pub start_sec: f64,
    pub duration_sec: f64,
    /// False for clips with neither an audio URL nor live waveform data.
    pub has_source: bool,
    pub clip_box: ClipBox,
}

impl ClipGrab {
    pub fn end_sec(&self) -> f64 {
        self.start_sec + self.duration_sec
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GestureKind {
    Move(ClipGrab),
    Resize { grab: ClipGrab, edge: ResizeEdge },
    Scrub,
}

/// Observable phase of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Moving,
    Resizing(ResizeEdge),
    Scrubbing,
}

/// Everything a gesture needs to turn pointer deltas into times.
#[derive(Debug, Clone, Copy)]
pub struct GestureContext<'a> {
    pub scale: &'a TimeScale,
    pub viewport: &'a Viewport,
    pub snap: SnapEngine,
    pub min_clip_sec: f64,
    pub click_threshold_px: f64,
}

impl GestureContext<'_> {
    fn delta_sec(&self, from: PointerPosition, to: PointerPosition) -> f64 {
        (to.x - from.x) / self.scale.pixels_per_second()
    }

    fn seek_target(&self, pointer: PointerPosition) -> f64 {
        self.snap
            .snap(self.viewport.time_at(self.scale, pointer.x))
            .max(0.0)
    }
}

#[derive(Debug, Clone)]
struct ActiveGesture {
    kind: GestureKind,
    origin: PointerPosition,
}

pub struct GestureController<C: PointerCapture = NoCapture> {
    capture: C,
    active: Option<ActiveGesture>,
}

impl Default for GestureController<NoCapture> {
    fn default() -> Self {
        Self::new(NoCapture)
    }
}

impl<C: PointerCapture> GestureController<C> {
    pub fn new(capture: C) -> Self {
        Self {
            capture,
            active: None,
        }
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn phase(&self) -> GesturePhase {
        match self.active.as_ref().map(|gesture| &gesture.kind) {
            None => GesturePhase::Idle,
            Some(GestureKind::Move(_)) => GesturePhase::Moving,
            Some(GestureKind::Resize { edge, .. }) => GesturePhase::Resizing(*edge),
            Some(GestureKind::Scrub) => GesturePhase::Scrubbing,
        }
    }

    /// Starts a gesture. Scrubs seek immediately to the pressed position.
    pub fn begin(
        &mut self,
        kind: GestureKind,
        pointer: PointerPosition,
        ctx: &GestureContext<'_>,
        bounds: &mut ClipBoundsTracker,
    ) -> Result<Option<TimelineAction>, GestureError> {
        if self.active.is_some() {
            return Err(GestureError::Busy);
        }

        let action = match &kind {
            GestureKind::Scrub => Some(TimelineAction::Seek {
                time_sec: ctx.seek_target(pointer),
            }),
            GestureKind::Resize { grab, .. } => {
                bounds.observe(grab.clip_id, grab.start_sec, grab.end_sec());
                None
            }
            GestureKind::Move(_) => None,
        };

        debug!(kind = ?kind, x = pointer.x, "gesture started");
        self.capture.attach();
        self.active = Some(ActiveGesture {
            kind,
            origin: pointer,
        });
        Ok(action)
    }

    /// Feeds a pointer move. Returns the live update for the host, if any.
    pub fn update(
        &mut self,
        pointer: PointerPosition,
        ctx: &GestureContext<'_>,
        bounds: &mut ClipBoundsTracker,
    ) -> Option<TimelineAction> {
        let gesture = self.active.as_ref()?;
        let delta = ctx.delta_sec(gesture.origin, pointer);
        trace!(delta, "gesture moved");

        match &gesture.kind {
            GestureKind::Move(grab) => {
                let start_sec = ctx.snap.snap(grab.start_sec + delta).max(0.0);
                Some(move_action(grab.target, start_sec))
            }
            GestureKind::Resize { grab, edge } => {
                let envelope = bounds.envelope(grab.clip_id);
                let (start_sec, duration_sec) = resize_bounds(
                    *edge,
                    grab.start_sec,
                    grab.duration_sec,
                    delta,
                    &ctx.snap,
                    envelope,
                    ctx.min_clip_sec,
                );
                bounds.observe(grab.clip_id, start_sec, start_sec + duration_sec);
                Some(resize_action(grab.target, *edge, start_sec, duration_sec))
            }
            GestureKind::Scrub => Some(TimelineAction::Seek {
                time_sec: ctx.seek_target(pointer),
            }),
        }
    }

    /// Ends the gesture. A clip move that barely moved becomes a click-to-seek.
    pub fn end(
        &mut self,
        pointer: PointerPosition,
        ctx: &GestureContext<'_>,
    ) -> Option<TimelineAction> {
        let gesture = self.active.take()?;
        self.capture.detach();
        debug!(x = pointer.x, "gesture ended");

        match gesture.kind {
            GestureKind::Move(grab) => {
                let dx = (pointer.x - gesture.origin.x).abs();
                let dy = (pointer.y - gesture.origin.y).abs();
                if dx >= ctx.click_threshold_px || dy >= ctx.click_threshold_px {
                    return None;
                }
                if !grab.has_source {
                    debug!(clip = ?grab.clip_id, "click on clip without audio ignored");
                    return None;
                }
                let ratio = grab.clip_box.ratio_at(pointer.x);
                Some(TimelineAction::Seek {
                    time_sec: grab.start_sec + ratio * grab.duration_sec,
                })
            }
            GestureKind::Resize { .. } | GestureKind::Scrub => None,
        }
    }

    /// Abandons the active gesture without a final action.
    pub fn cancel(&mut self) {
        if self.active.take().is_some() {
            debug!("gesture cancelled");
            self.capture.detach();
        }
    }
}

impl<C: PointerCapture> Drop for GestureController<C> {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn move_action(target: ClipRef, start_sec: f64) -> TimelineAction {
    match target {
        ClipRef::Beat => TimelineAction::BeatClipMoved { start_sec },
        ClipRef::Vocal { clip, .. } => TimelineAction::VocalClipMoved { clip, start_sec },
    }
}

fn resize_action(
    target: ClipRef,
    edge: ResizeEdge,
    start_sec: f64,
    duration_sec: f64,
) -> TimelineAction {
    match target {
        ClipRef::Beat => TimelineAction::BeatClipResized {
            edge,
            start_sec,
            duration_sec,
        },
        ClipRef::Vocal { track, clip } => TimelineAction::VocalClipResized {
            track,
            edge,
            start_sec,
            duration_sec,
            clip,
        },
    }
}

/// New `(start, duration)` for dragging one edge of a clip by `delta_sec`.
///
/// The dragged edge is snapped, the clip keeps at least `min_clip_sec`, and
/// neither edge may leave `envelope`. If the envelope clamp breaks the
/// minimum length, the minimum is restored from the clamped fixed edge.
pub fn resize_bounds(
    edge: ResizeEdge,
    initial_start: f64,
    initial_duration: f64,
    delta_sec: f64,
    snap: &SnapEngine,
    envelope: Option<ClipEnvelope>,
    min_clip_sec: f64,
) -> (f64, f64) {
    let initial_end = initial_start + initial_duration;

    let (new_start, new_end) = match edge {
        ResizeEdge::Start => {
            let mut new_start = snap.snap(initial_start + delta_sec);
            let mut new_end = initial_end;
            if new_end - new_start < min_clip_sec {
                new_start = new_end - min_clip_sec;
            }
            if let Some(envelope) = envelope {
                new_start = new_start.max(envelope.start);
                new_end = new_end.min(envelope.end);
                if new_end - new_start < min_clip_sec {
                    new_start = new_end - min_clip_sec;
                }
            }
            (new_start, new_end)
        }
        ResizeEdge::End => {
            let mut new_start = initial_start;
            let mut new_end = snap.snap(initial_end + delta_sec);
            if new_end - new_start < min_clip_sec {
                new_end = new_start + min_clip_sec;
            }
            if let Some(envelope) = envelope {
                new_start = new_start.max(envelope.start);
                new_end = new_end.min(envelope.end);
                if new_end - new_start < min_clip_sec {
                    new_end = new_start + min_clip_sec;
                }
            }
            (new_start, new_end)
        }
    };

    let start = new_start.max(0.0);
    let mut duration = (new_end - start).max(min_clip_sec);
    // Absorb rounding noise from `end - min` so a clamped clip is exactly minimal.
    if (duration - min_clip_sec).abs() < 1e-9 {
        duration = min_clip_sec;
    }
    (start, duration)
}
