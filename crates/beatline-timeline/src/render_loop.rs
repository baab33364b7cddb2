//! Per-clip playhead/selection overlay and the frame loop that redraws it.
//!
//! The loop only keeps a frame requested while the clip is playing or
//! selected. Idle clips are drawn once per relevant change and otherwise
//! cost nothing per frame.

use serde::Serialize;
use tracing::trace;

pub type Rgba = [f32; 4];

pub const BORDER_COLOR: Rgba = [1.0, 1.0, 1.0, 0.18];
pub const SELECTED_BORDER_COLOR: Rgba = [0.94, 0.27, 0.27, 0.9];
pub const SELECTION_TINT: Rgba = [0.94, 0.27, 0.27, 0.2];
pub const PLAYHEAD_COLOR: Rgba = [1.0, 1.0, 1.0, 0.95];

/// Handle for a scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

/// Platform frame callbacks. The host calls [`RenderLoop::on_frame`] when a
/// requested frame fires.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameToken;
    fn cancel_frame(&mut self, token: FrameToken);
}

pub trait OverlaySurface {
    fn draw(&mut self, scene: &OverlayScene);
}

/// Inputs of one clip overlay.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayState {
    pub selected: bool,
    pub playing: bool,
    pub current_time: f64,
    /// Media duration once the audio backend reports it.
    pub duration: Option<f64>,
    /// Clip duration used until the media duration is known.
    pub fallback_duration: f64,
    /// Selected time range inside the clip, in clip-local seconds.
    pub selection: Option<(f64, f64)>,
    pub width: f64,
}

impl OverlayState {
    pub fn should_animate(&self) -> bool {
        self.playing || self.selected
    }

    pub fn effective_duration(&self) -> f64 {
        match self.duration {
            Some(duration) if duration.is_finite() && duration > 0.0 => duration,
            _ => self.fallback_duration.max(0.0),
        }
    }

    fn x_at(&self, time: f64) -> Option<f64> {
        let duration = self.effective_duration();
        if duration <= 0.0 || !time.is_finite() {
            return None;
        }
        Some((time / duration).clamp(0.0, 1.0) * self.width)
    }

    pub fn scene(&self) -> OverlayScene {
        let selection = self.selection.and_then(|(start, end)| {
            let left = self.x_at(start.min(end))?;
            let right = self.x_at(start.max(end))?;
            (right > left).then_some(SelectionTint {
                x: left,
                width: right - left,
                color: SELECTION_TINT,
            })
        });
        OverlayScene {
            width: self.width,
            border: if self.selected {
                SELECTED_BORDER_COLOR
            } else {
                BORDER_COLOR
            },
            selection,
            playhead_x: self.x_at(self.current_time),
            playhead_color: PLAYHEAD_COLOR,
        }
    }

    fn redraw_key(&self) -> RedrawKey {
        RedrawKey {
            selected: self.selected,
            animating: self.should_animate(),
            duration_known: self.duration.is_some(),
            width_bits: self.width.to_bits(),
        }
    }
}

/// Fields whose change warrants a one-off redraw of an idle overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RedrawKey {
    selected: bool,
    animating: bool,
    duration_known: bool,
    width_bits: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelectionTint {
    pub x: f64,
    pub width: f64,
    pub color: Rgba,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayScene {
    pub width: f64,
    pub border: Rgba,
    pub selection: Option<SelectionTint>,
    /// `None` while no duration is known.
    pub playhead_x: Option<f64>,
    pub playhead_color: Rgba,
}

pub struct RenderLoop<S: FrameScheduler, O: OverlaySurface> {
    scheduler: S,
    surface: O,
    state: OverlayState,
    pending: Option<FrameToken>,
    last_drawn: Option<RedrawKey>,
    frames_drawn: u64,
    disposed: bool,
}

impl<S: FrameScheduler, O: OverlaySurface> RenderLoop<S, O> {
    pub fn new(scheduler: S, surface: O) -> Self {
        Self {
            scheduler,
            surface,
            state: OverlayState::default(),
            pending: None,
            last_drawn: None,
            frames_drawn: 0,
            disposed: false,
        }
    }

    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn surface(&self) -> &O {
        &self.surface
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending.is_some()
    }

    /// Installs new overlay inputs and starts or stops the frame loop.
    pub fn update(&mut self, state: OverlayState) {
        if self.disposed {
            return;
        }
        self.state = state;
        if self.state.should_animate() {
            if self.pending.is_none() {
                self.pending = Some(self.scheduler.request_frame());
                trace!("overlay animation started");
            }
            return;
        }

        if let Some(token) = self.pending.take() {
            self.scheduler.cancel_frame(token);
            trace!("overlay animation stopped");
        }
        if self.last_drawn != Some(self.state.redraw_key()) {
            self.draw();
        }
    }

    /// Frame callback: draws and, while animating, keeps exactly one frame queued.
    pub fn on_frame(&mut self, token: FrameToken) {
        if self.disposed || self.pending != Some(token) {
            return;
        }
        self.pending = None;
        self.draw();
        if self.state.should_animate() {
            self.pending = Some(self.scheduler.request_frame());
        }
    }

    /// Cancels any queued frame. Later updates and frames are ignored.
    pub fn dispose(&mut self) {
        if let Some(token) = self.pending.take() {
            self.scheduler.cancel_frame(token);
        }
        self.disposed = true;
    }

    fn draw(&mut self) {
        let scene = self.state.scene();
        self.surface.draw(&scene);
        self.last_drawn = Some(self.state.redraw_key());
        self.frames_drawn += 1;
    }
}

impl<S: FrameScheduler, O: OverlaySurface> Drop for RenderLoop<S, O> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default)]
    struct ManualScheduler {
        next: u64,
        requested: Vec<FrameToken>,
        cancelled: Vec<FrameToken>,
    }

    impl FrameScheduler for ManualScheduler {
        fn request_frame(&mut self) -> FrameToken {
            self.next += 1;
            let token = FrameToken(self.next);
            self.requested.push(token);
            token
        }

        fn cancel_frame(&mut self, token: FrameToken) {
            self.cancelled.push(token);
        }
    }

    #[derive(Default)]
    struct Recorder {
        scenes: Vec<OverlayScene>,
    }

    impl OverlaySurface for Recorder {
        fn draw(&mut self, scene: &OverlayScene) {
            self.scenes.push(scene.clone());
        }
    }

    fn idle(width: f64) -> OverlayState {
        OverlayState {
            fallback_duration: 4.0,
            width,
            ..OverlayState::default()
        }
    }

    #[test]
    fn idle_overlay_draws_once_per_change() {
        let mut overlay = RenderLoop::new(ManualScheduler::default(), Recorder::default());
        overlay.update(idle(200.0));
        overlay.update(OverlayState {
            current_time: 1.0,
            ..idle(200.0)
        });
        assert_eq!(overlay.frames_drawn(), 1);
        assert!(overlay.scheduler().requested.is_empty());

        overlay.update(idle(300.0));
        assert_eq!(overlay.frames_drawn(), 2);
    }

    #[test]
    fn playing_keeps_one_frame_queued() {
        let mut overlay = RenderLoop::new(ManualScheduler::default(), Recorder::default());
        let playing = OverlayState {
            playing: true,
            current_time: 1.0,
            ..idle(200.0)
        };
        overlay.update(playing.clone());
        overlay.update(playing);
        assert_eq!(overlay.scheduler().requested, vec![FrameToken(1)]);

        overlay.on_frame(FrameToken(1));
        assert_eq!(overlay.scheduler().requested.len(), 2);
        assert_eq!(overlay.surface().scenes[0].playhead_x, Some(50.0));

        overlay.update(idle(200.0));
        assert_eq!(overlay.scheduler().cancelled, vec![FrameToken(2)]);
        assert!(!overlay.has_pending_frame());
    }

    #[test]
    fn dispose_cancels_pending_frame() {
        let mut overlay = RenderLoop::new(ManualScheduler::default(), Recorder::default());
        overlay.update(OverlayState {
            selected: true,
            ..idle(100.0)
        });
        overlay.dispose();
        assert_eq!(overlay.scheduler().cancelled, vec![FrameToken(1)]);
        overlay.on_frame(FrameToken(1));
        assert_eq!(overlay.frames_drawn(), 0);
    }

    #[test]
    fn scene_uses_known_duration_and_selection_tint() {
        let state = OverlayState {
            selected: true,
            current_time: 2.0,
            duration: Some(8.0),
            selection: Some((4.0, 2.0)),
            ..idle(400.0)
        };
        let scene = state.scene();
        assert_eq!(scene.border, SELECTED_BORDER_COLOR);
        assert_eq!(scene.playhead_x, Some(100.0));
        assert_eq!(
            scene.selection,
            Some(SelectionTint {
                x: 100.0,
                width: 100.0,
                color: SELECTION_TINT
            })
        );
    }
}
