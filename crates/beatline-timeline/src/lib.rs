//! Multi-track arrangement timeline: a beat lane plus vocal takes, with
//! drag/resize/scrub gestures, grid snapping, anchored zoom, loop regions
//! and lazily fetched waveform previews.

pub mod action;
pub mod config;
pub mod context_menu;
pub mod engine;
pub mod envelope;
pub mod gesture;
pub mod loop_region;
pub mod model;
pub mod playback;
pub mod render_loop;
pub mod ruler;
pub mod session;
pub mod snap;
pub mod time_scale;
pub mod waveform;

pub use action::{ResizeEdge, TimelineAction};
pub use config::{ConfigError, TimelineConfig};
pub use context_menu::{ContextMenuController, MenuAnchor, MenuItem, MenuTarget};
pub use engine::{PointerTarget, TimelineEngine, TimelineLayout, TimelineProps};
pub use envelope::{widen_envelope, ClipBoundsTracker, ClipEnvelope};
pub use gesture::{GestureController, GestureError, PointerCapture, PointerPosition};
pub use loop_region::{LoopRegion, LoopRegionManager};
pub use model::{Clip, ClipId, ClipRef, LaneRef, Track, TrackId, TrackKind, MIN_CLIP_SEC};
pub use playback::{AudioPlaybackAdapter, ClipPlayback, PlaybackError, PlaybackEvent};
pub use render_loop::{
    FrameScheduler, FrameToken, OverlayScene, OverlayState, OverlaySurface, RenderLoop,
};
pub use session::{ArrangementSession, SessionError};
pub use snap::{snap_to_grid, SnapEngine, GRID_STEP_SEC};
pub use time_scale::{TimeScale, Viewport, ZoomChange};
pub use waveform::{
    downsample_peaks, waveform_polygon, WaveformCache, WaveformError, WaveformRequest,
    WaveformResponder, WaveformShape, WaveformSource,
};
