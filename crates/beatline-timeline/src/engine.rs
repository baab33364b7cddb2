//! The timeline component: owns the ephemeral view state and turns pointer,
//! wheel and menu input into [`TimelineAction`]s for the host.
//!
//! Track and clip state stays with the host and comes in through
//! [`TimelineProps`] on every call. The engine keeps only zoom, scroll,
//! clip envelopes, the waveform cache, the open menu and the active gesture.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::action::{ResizeEdge, TimelineAction};
use crate::config::TimelineConfig;
use crate::context_menu::{ContextMenuController, MenuAnchor, MenuItem, OpenMenu};
use crate::envelope::ClipBoundsTracker;
use crate::gesture::{
    ClipBox, ClipGrab, GestureContext, GestureController, GestureError, GestureKind,
    GesturePhase, NoCapture, PointerCapture, PointerPosition,
};
use crate::loop_region::LoopRegion;
use crate::model::{clamp_volume, Clip, ClipId, ClipRef, LaneRef, Track, TrackId};
use crate::ruler::{ruler_ticks, RulerTick};
use crate::snap::SnapEngine;
use crate::time_scale::{zoom_anchored, TimeScale, Viewport, ZoomChange};
use crate::waveform::{WaveformCache, WaveformShape, WaveformSource};

pub const RULER_HEIGHT_PX: f64 = 28.0;
pub const LANE_HEIGHT_PX: f64 = 72.0;
/// Width of the grab zone at each clip edge.
pub const HANDLE_WIDTH_PX: f64 = 6.0;

/// Host state the timeline renders and edits.
#[derive(Debug, Clone, Copy)]
pub struct TimelineProps<'a> {
    pub beat: Option<&'a Track>,
    pub beat_label: &'a str,
    pub vocals: &'a [Track],
    pub selected_vocal: Option<TrackId>,
    pub beat_selected: bool,
    pub snap_enabled: bool,
    pub current_time: f64,
    pub playing: bool,
    pub loop_region: LoopRegion,
    pub live_waveforms: &'a HashMap<ClipId, Vec<f32>>,
    pub bpm: Option<f64>,
}

impl<'a> TimelineProps<'a> {
    /// Lanes top to bottom: the beat lane first, then vocals in order.
    pub fn lanes(&self) -> impl Iterator<Item = (LaneRef, &'a Track)> + 'a {
        let beat = self.beat.map(|track| (LaneRef::Beat, track));
        let vocals = self.vocals.iter().map(|track| (LaneRef::Vocal(track.id), track));
        beat.into_iter().chain(vocals)
    }

    pub fn any_solo(&self) -> bool {
        self.lanes().any(|(_, track)| track.solo)
    }

    pub fn clip(&self, target: ClipRef) -> Option<&'a Clip> {
        match target {
            ClipRef::Beat => self.beat?.clip.as_ref(),
            ClipRef::Vocal { track, clip } => self
                .vocals
                .iter()
                .find(|lane| lane.id == track)?
                .clip
                .as_ref()
                .filter(|candidate| candidate.id == clip),
        }
    }

    fn has_source(&self, clip: &Clip) -> bool {
        clip.audio_url.is_some() || self.live_waveforms.contains_key(&clip.id)
    }

    fn is_selected(&self, lane: LaneRef) -> bool {
        match lane {
            LaneRef::Beat => self.beat_selected,
            LaneRef::Vocal(track) => self.selected_vocal == Some(track),
        }
    }
}

fn clip_ref(lane: LaneRef, clip: &Clip) -> ClipRef {
    match lane {
        LaneRef::Beat => ClipRef::Beat,
        LaneRef::Vocal(track) => ClipRef::Vocal {
            track,
            clip: clip.id,
        },
    }
}

/// What sits under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "target", content = "ref", rename_all = "snake_case")]
pub enum PointerTarget {
    ClipBody(ClipRef),
    ClipStartHandle(ClipRef),
    ClipEndHandle(ClipRef),
    Lane(LaneRef),
    LaneHeader(LaneRef),
    Ruler,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipLayout {
    pub clip: ClipRef,
    pub id: ClipId,
    pub start_sec: f64,
    pub duration_sec: f64,
    /// Screen x of the clip's left edge.
    pub left: f64,
    pub width: f64,
    pub has_source: bool,
    pub waveform: WaveformShape,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaneLayout {
    pub lane: LaneRef,
    pub name: String,
    pub top: f64,
    pub height: f64,
    pub muted: bool,
    pub solo: bool,
    pub volume: f32,
    pub selected: bool,
    pub audible: bool,
    pub clip: Option<ClipLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineLayout {
    pub zoom: f64,
    pub pixels_per_second: f64,
    pub lanes: Vec<LaneLayout>,
    pub ruler: Vec<RulerTick>,
    pub playhead_x: f64,
    /// Screen span of the active loop region.
    pub loop_band: Option<(f64, f64)>,
}

pub struct TimelineEngine {
    config: TimelineConfig,
    scale: TimeScale,
    viewport: Viewport,
    bounds: ClipBoundsTracker,
    gestures: GestureController<Box<dyn PointerCapture>>,
    waveforms: WaveformCache,
    source: Box<dyn WaveformSource>,
    menu: ContextMenuController,
    pending_scroll: Option<f64>,
    disposed: bool,
}

impl TimelineEngine {
    pub fn new(config: TimelineConfig, source: impl WaveformSource + 'static) -> Self {
        let scale = TimeScale::from_config(&config);
        let viewport = Viewport::new(config.label_width, 0.0);
        Self {
            config,
            scale,
            viewport,
            bounds: ClipBoundsTracker::new(),
            gestures: GestureController::new(Box::new(NoCapture)),
            waveforms: WaveformCache::new(),
            source: Box::new(source),
            menu: ContextMenuController::new(),
            pending_scroll: None,
            disposed: false,
        }
    }

    /// Routes gesture enter/exit to the host's global pointer listeners.
    pub fn with_pointer_capture(mut self, capture: impl PointerCapture + 'static) -> Self {
        self.gestures = GestureController::new(Box::new(capture));
        self
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn scale(&self) -> &TimeScale {
        &self.scale
    }

    pub fn zoom(&self) -> f64 {
        self.scale.zoom()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn bounds(&self) -> &ClipBoundsTracker {
        &self.bounds
    }

    pub fn waveforms(&self) -> &WaveformCache {
        &self.waveforms
    }

    pub fn gesture_phase(&self) -> GesturePhase {
        self.gestures.phase()
    }

    pub fn is_scrubbing(&self) -> bool {
        self.gestures.phase() == GesturePhase::Scrubbing
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn set_viewport_width(&mut self, width: f64) {
        self.viewport.width = width.max(0.0);
    }

    /// Host-driven scroll (scrollbar, trackpad).
    pub fn set_scroll_left(&mut self, scroll_left: f64) {
        self.viewport.apply_scroll(scroll_left);
    }

    fn snap(&self, enabled: bool) -> SnapEngine {
        SnapEngine::new(enabled, self.config.grid_step_sec)
    }

    /// Computes lane and clip geometry for the current props.
    ///
    /// Also records every clip's bounds in its envelope, requests missing
    /// waveforms and collects finished ones.
    pub fn layout(&mut self, props: &TimelineProps<'_>) -> TimelineLayout {
        self.waveforms.poll();
        let any_solo = props.any_solo();
        let mut lanes = Vec::new();

        for (index, (lane, track)) in props.lanes().enumerate() {
            let clip = track.clip.as_ref().map(|clip| {
                self.bounds.observe(clip.id, clip.start_sec, clip.end_sec());
                if let Some(url) = &clip.audio_url {
                    self.waveforms.ensure(url, &mut *self.source);
                }
                ClipLayout {
                    clip: clip_ref(lane, clip),
                    id: clip.id,
                    start_sec: clip.start_sec,
                    duration_sec: clip.duration_sec,
                    left: self.viewport.screen_x(&self.scale, clip.start_sec),
                    width: self.scale.to_pixels(clip.duration_sec),
                    has_source: props.has_source(clip),
                    waveform: self.waveforms.shape_for(clip, props.live_waveforms),
                }
            });
            lanes.push(LaneLayout {
                lane,
                name: match lane {
                    LaneRef::Beat => props.beat_label.to_owned(),
                    LaneRef::Vocal(_) => track.name.clone(),
                },
                top: lane_top(index),
                height: LANE_HEIGHT_PX,
                muted: track.muted,
                solo: track.solo,
                volume: track.volume,
                selected: props.is_selected(lane),
                audible: track.is_audible(any_solo),
                clip,
            });
        }

        let live: Vec<ClipId> = lanes
            .iter()
            .filter_map(|lane| lane.clip.as_ref().map(|clip| clip.id))
            .collect();
        self.bounds.retain(|id| live.contains(&id));

        let ruler = ruler_ticks(
            self.viewport.visible_start(&self.scale),
            self.viewport.visible_end(&self.scale),
            props.bpm,
        );
        let loop_band = props.loop_region.active_range().map(|(start, end)| {
            (
                self.viewport.screen_x(&self.scale, start),
                self.viewport.screen_x(&self.scale, end),
            )
        });

        TimelineLayout {
            zoom: self.scale.zoom(),
            pixels_per_second: self.scale.pixels_per_second(),
            lanes,
            ruler,
            playhead_x: self.viewport.screen_x(&self.scale, props.current_time),
            loop_band,
        }
    }

    /// Resolves what lies under `pointer` without touching any state.
    pub fn hit_test(
        &self,
        props: &TimelineProps<'_>,
        pointer: PointerPosition,
    ) -> Option<PointerTarget> {
        if pointer.y < 0.0 {
            return None;
        }
        if pointer.y < RULER_HEIGHT_PX {
            return (pointer.x >= self.viewport.label_width).then_some(PointerTarget::Ruler);
        }
        let index = ((pointer.y - RULER_HEIGHT_PX) / LANE_HEIGHT_PX).floor() as usize;
        let (lane, track) = props.lanes().nth(index)?;
        if pointer.x < self.viewport.label_width {
            return Some(PointerTarget::LaneHeader(lane));
        }

        let Some(clip) = track.clip.as_ref() else {
            return Some(PointerTarget::Lane(lane));
        };
        let left = self.viewport.screen_x(&self.scale, clip.start_sec);
        let width = self.scale.to_pixels(clip.duration_sec);
        let right = left + width;
        if pointer.x < left || pointer.x > right {
            return Some(PointerTarget::Lane(lane));
        }
        let handle = HANDLE_WIDTH_PX.min(width / 3.0);
        let target = clip_ref(lane, clip);
        Some(if pointer.x - left <= handle {
            PointerTarget::ClipStartHandle(target)
        } else if right - pointer.x <= handle {
            PointerTarget::ClipEndHandle(target)
        } else {
            PointerTarget::ClipBody(target)
        })
    }

    /// Pointer pressed on `target`. Starts a gesture where one applies.
    pub fn pointer_down(
        &mut self,
        target: PointerTarget,
        pointer: PointerPosition,
        props: &TimelineProps<'_>,
    ) -> Result<Vec<TimelineAction>, GestureError> {
        if self.disposed {
            return Ok(Vec::new());
        }
        self.menu.dismiss();

        let kind = match target {
            PointerTarget::LaneHeader(lane) => return Ok(vec![self.select_lane(lane)]),
            PointerTarget::Lane(_) | PointerTarget::Ruler => GestureKind::Scrub,
            PointerTarget::ClipBody(clip) => match self.grab(clip, props) {
                Some(grab) => GestureKind::Move(grab),
                None => return Ok(Vec::new()),
            },
            PointerTarget::ClipStartHandle(clip) | PointerTarget::ClipEndHandle(clip) => {
                let edge = if matches!(target, PointerTarget::ClipStartHandle(_)) {
                    ResizeEdge::Start
                } else {
                    ResizeEdge::End
                };
                match self.grab(clip, props) {
                    Some(grab) => GestureKind::Resize { grab, edge },
                    None => return Ok(Vec::new()),
                }
            }
        };

        let ctx = GestureContext {
            scale: &self.scale,
            viewport: &self.viewport,
            snap: self.snap(props.snap_enabled),
            min_clip_sec: self.config.min_clip_sec,
            click_threshold_px: self.config.click_threshold_px,
        };
        let action = self.gestures.begin(kind, pointer, &ctx, &mut self.bounds)?;
        Ok(action.into_iter().collect())
    }

    pub fn pointer_move(
        &mut self,
        pointer: PointerPosition,
        props: &TimelineProps<'_>,
    ) -> Option<TimelineAction> {
        let ctx = GestureContext {
            scale: &self.scale,
            viewport: &self.viewport,
            snap: self.snap(props.snap_enabled),
            min_clip_sec: self.config.min_clip_sec,
            click_threshold_px: self.config.click_threshold_px,
        };
        self.gestures.update(pointer, &ctx, &mut self.bounds)
    }

    pub fn pointer_up(
        &mut self,
        pointer: PointerPosition,
        props: &TimelineProps<'_>,
    ) -> Option<TimelineAction> {
        let ctx = GestureContext {
            scale: &self.scale,
            viewport: &self.viewport,
            snap: self.snap(props.snap_enabled),
            min_clip_sec: self.config.min_clip_sec,
            click_threshold_px: self.config.click_threshold_px,
        };
        self.gestures.end(pointer, &ctx)
    }

    pub fn cancel_gesture(&mut self) {
        self.gestures.cancel();
    }

    fn grab(&self, target: ClipRef, props: &TimelineProps<'_>) -> Option<ClipGrab> {
        let clip = props.clip(target)?;
        Some(ClipGrab {
            target,
            clip_id: clip.id,
            start_sec: clip.start_sec,
            duration_sec: clip.duration_sec,
            has_source: props.has_source(clip),
            clip_box: ClipBox {
                left: self.viewport.screen_x(&self.scale, clip.start_sec),
                width: self.scale.to_pixels(clip.duration_sec),
            },
        })
    }

    /// Ctrl/Cmd + wheel zoom anchored at the time under the pointer.
    /// Plain wheel input is left to the host's scrolling.
    pub fn wheel(
        &mut self,
        delta_y: f64,
        pointer_x: f64,
        zoom_modifier: bool,
    ) -> Option<ZoomChange> {
        if !zoom_modifier || delta_y == 0.0 || self.disposed {
            return None;
        }
        let factor = self.config.wheel_zoom_factor;
        let requested = if delta_y < 0.0 {
            self.scale.zoom() * factor
        } else {
            self.scale.zoom() / factor
        };
        let anchor_time = self.settled_viewport().time_at(&self.scale, pointer_x);
        Some(self.apply_zoom(requested, anchor_time, pointer_x))
    }

    /// Toolbar zoom in, anchored at the playhead. A disposed engine reports
    /// the current zoom and changes nothing.
    pub fn zoom_in(&mut self, current_time: f64) -> ZoomChange {
        let requested = self.scale.zoom() * self.config.button_zoom_factor;
        self.zoom_at_playhead(requested, current_time)
    }

    pub fn zoom_out(&mut self, current_time: f64) -> ZoomChange {
        let requested = self.scale.zoom() / self.config.button_zoom_factor;
        self.zoom_at_playhead(requested, current_time)
    }

    fn zoom_at_playhead(&mut self, requested: f64, current_time: f64) -> ZoomChange {
        let anchor_x = self.settled_viewport().screen_x(&self.scale, current_time);
        self.apply_zoom(requested, current_time, anchor_x)
    }

    /// The viewport as it will be once the pending scroll correction lands.
    /// Zooms arriving before the next frame anchor against this.
    fn settled_viewport(&self) -> Viewport {
        let mut viewport = self.viewport;
        if let Some(scroll_left) = self.pending_scroll {
            viewport.apply_scroll(scroll_left);
        }
        viewport
    }

    fn apply_zoom(&mut self, requested: f64, anchor_time: f64, anchor_x: f64) -> ZoomChange {
        if self.disposed {
            let zoom = self.scale.zoom();
            return ZoomChange {
                previous_zoom: zoom,
                zoom,
                anchor_time,
                anchor_screen_x: anchor_x,
                scroll_left: self.viewport.scroll_left,
            };
        }
        let change = zoom_anchored(&mut self.scale, &self.viewport, requested, anchor_time, anchor_x);
        if change.changed() {
            debug!(zoom = change.zoom, anchor_time, "zoom changed");
        }
        self.pending_scroll = Some(change.scroll_left);
        change
    }

    /// Applies the scroll offset deferred by the last zoom. Call once per frame.
    pub fn take_scroll_correction(&mut self) -> Option<f64> {
        let scroll_left = self.pending_scroll.take()?;
        self.viewport.apply_scroll(scroll_left);
        Some(self.viewport.scroll_left)
    }

    /// Right-click. Clips and lane headers open a menu; anything else closes it.
    pub fn open_context_menu(
        &mut self,
        target: PointerTarget,
        anchor: MenuAnchor,
        props: &TimelineProps<'_>,
    ) -> bool {
        match target {
            PointerTarget::ClipBody(clip)
            | PointerTarget::ClipStartHandle(clip)
            | PointerTarget::ClipEndHandle(clip) => match props.clip(clip) {
                Some(found) => {
                    self.menu
                        .open_for_clip(clip, found.start_sec, found.duration_sec, anchor);
                    true
                }
                None => {
                    self.menu.dismiss();
                    false
                }
            },
            PointerTarget::LaneHeader(lane) => {
                self.menu.open_for_lane(lane, anchor);
                true
            }
            PointerTarget::Lane(_) | PointerTarget::Ruler => {
                self.menu.dismiss();
                false
            }
        }
    }

    pub fn context_menu(&self) -> Option<&OpenMenu> {
        self.menu.current()
    }

    pub fn dismiss_context_menu(&mut self) {
        self.menu.dismiss();
    }

    pub fn menu_action(&mut self, item: MenuItem) -> Vec<TimelineAction> {
        self.menu.dispatch(item)
    }

    pub fn toggle_mute(&self, lane: LaneRef) -> TimelineAction {
        match lane {
            LaneRef::Beat => TimelineAction::ToggleBeatMute,
            LaneRef::Vocal(track) => TimelineAction::ToggleVocalMute { track },
        }
    }

    pub fn toggle_solo(&self, lane: LaneRef) -> TimelineAction {
        match lane {
            LaneRef::Beat => TimelineAction::ToggleBeatSolo,
            LaneRef::Vocal(track) => TimelineAction::ToggleVocalSolo { track },
        }
    }

    /// Volume slider. The value is clamped before it reaches the host.
    pub fn set_volume(&self, lane: LaneRef, volume: f32) -> TimelineAction {
        let volume = clamp_volume(volume).min(self.config.max_volume);
        match lane {
            LaneRef::Beat => TimelineAction::BeatVolumeChanged { volume },
            LaneRef::Vocal(track) => TimelineAction::VocalVolumeChanged { track, volume },
        }
    }

    pub fn select_lane(&self, lane: LaneRef) -> TimelineAction {
        match lane {
            LaneRef::Beat => TimelineAction::SelectBeatTrack,
            LaneRef::Vocal(track) => TimelineAction::SelectVocalTrack { track },
        }
    }

    pub fn add_vocal_lane(&self) -> TimelineAction {
        TimelineAction::AddVocalTrack
    }

    /// Transport toggle: stop while playing, otherwise play from the cursor.
    pub fn toggle_playback(&self, playing: bool) -> TimelineAction {
        if playing {
            TimelineAction::StopPlayback
        } else {
            TimelineAction::PlayFromCursor
        }
    }

    pub fn toggle_loop(&self) -> TimelineAction {
        TimelineAction::ToggleLoopRegion
    }

    /// Ruler click setting the loop start at screen `x`.
    pub fn loop_start_at(&self, x: f64, snap_enabled: bool) -> TimelineAction {
        TimelineAction::LoopSetStart {
            time_sec: self.snap(snap_enabled).snap(self.viewport.time_at(&self.scale, x)),
        }
    }

    pub fn loop_end_at(&self, x: f64, snap_enabled: bool) -> TimelineAction {
        TimelineAction::LoopSetEnd {
            time_sec: self.snap(snap_enabled).snap(self.viewport.time_at(&self.scale, x)),
        }
    }

    /// Tears the component down: ends any gesture, closes the menu and drops
    /// the pending scroll correction. Later input is ignored.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.gestures.cancel();
        self.menu.dismiss();
        self.pending_scroll = None;
        self.disposed = true;
        debug!("timeline disposed");
    }
}

fn lane_top(index: usize) -> f64 {
    RULER_HEIGHT_PX + index as f64 * LANE_HEIGHT_PX
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::TrackKind;
    use crate::waveform::WaveformRequest;

    struct Fixture {
        beat: Track,
        vocals: Vec<Track>,
        live: HashMap<ClipId, Vec<f32>>,
    }

    impl Fixture {
        fn new() -> Self {
            let beat = Track::new(TrackId(0), TrackKind::Beat, "Beat").with_clip(
                Clip::new(ClipId(1), TrackId(0), TrackKind::Beat, 0.0, 4.0)
                    .with_audio_url("beat.wav"),
            );
            let vocal = Track::new(TrackId(1), TrackKind::Vocal, "Vocal 1").with_clip(Clip::new(
                ClipId(2),
                TrackId(1),
                TrackKind::Vocal,
                2.0,
                2.0,
            ));
            Self {
                beat,
                vocals: vec![vocal],
                live: HashMap::new(),
            }
        }

        fn props(&self) -> TimelineProps<'_> {
            TimelineProps {
                beat: Some(&self.beat),
                beat_label: "Night Drive",
                vocals: &self.vocals,
                selected_vocal: None,
                beat_selected: false,
                snap_enabled: true,
                current_time: 0.0,
                playing: false,
                loop_region: LoopRegion::default(),
                live_waveforms: &self.live,
                bpm: None,
            }
        }
    }

    fn engine() -> TimelineEngine {
        let config = TimelineConfig {
            label_width: 100.0,
            ..TimelineConfig::default()
        };
        let mut engine = TimelineEngine::new(config, |_: &str| WaveformRequest::ready(vec![0.5]));
        engine.set_viewport_width(900.0);
        engine
    }

    struct SharedCapture(Rc<RefCell<(usize, usize)>>);

    impl PointerCapture for SharedCapture {
        fn attach(&mut self) {
            self.0.borrow_mut().0 += 1;
        }

        fn detach(&mut self) {
            self.0.borrow_mut().1 += 1;
        }
    }

    #[test]
    fn hit_test_finds_handles_body_and_headers() {
        let fixture = Fixture::new();
        let props = fixture.props();
        let engine = engine();
        // Beat lane: y in 28..100, clip spans x 100..260.
        assert_eq!(
            engine.hit_test(&props, PointerPosition::new(102.0, 50.0)),
            Some(PointerTarget::ClipStartHandle(ClipRef::Beat))
        );
        assert_eq!(
            engine.hit_test(&props, PointerPosition::new(180.0, 50.0)),
            Some(PointerTarget::ClipBody(ClipRef::Beat))
        );
        assert_eq!(
            engine.hit_test(&props, PointerPosition::new(258.0, 50.0)),
            Some(PointerTarget::ClipEndHandle(ClipRef::Beat))
        );
        assert_eq!(
            engine.hit_test(&props, PointerPosition::new(400.0, 50.0)),
            Some(PointerTarget::Lane(LaneRef::Beat))
        );
        assert_eq!(
            engine.hit_test(&props, PointerPosition::new(20.0, 120.0)),
            Some(PointerTarget::LaneHeader(LaneRef::Vocal(TrackId(1))))
        );
        assert_eq!(
            engine.hit_test(&props, PointerPosition::new(300.0, 10.0)),
            Some(PointerTarget::Ruler)
        );
        assert_eq!(engine.hit_test(&props, PointerPosition::new(300.0, 400.0)), None);
    }

    #[test]
    fn layout_requests_waveforms_and_tracks_envelopes() {
        let fixture = Fixture::new();
        let props = fixture.props();
        let mut engine = engine();

        let first = engine.layout(&props);
        assert_eq!(first.lanes.len(), 2);
        assert_eq!(first.lanes[0].name, "Night Drive");
        assert_eq!(
            first.lanes[0].clip.as_ref().map(|clip| clip.waveform.clone()),
            Some(WaveformShape::Loading)
        );
        assert_eq!(
            first.lanes[1].clip.as_ref().map(|clip| clip.waveform.clone()),
            Some(WaveformShape::NoSource)
        );
        assert_eq!(engine.bounds().len(), 2);

        let second = engine.layout(&props);
        assert!(matches!(
            second.lanes[0].clip.as_ref().map(|clip| &clip.waveform),
            Some(WaveformShape::Polygon(_))
        ));
        assert_eq!(engine.waveforms().fetch_count(), 1);
    }

    #[test]
    fn resize_handle_drag_emits_beat_resize() {
        let fixture = Fixture::new();
        let props = fixture.props();
        let mut engine = engine();
        engine.layout(&props);

        let start = PointerPosition::new(258.0, 50.0);
        let target = engine.hit_test(&props, start).expect("target");
        engine.pointer_down(target, start, &props).expect("down");
        // Shrink by two seconds.
        let action = engine.pointer_move(PointerPosition::new(178.0, 50.0), &props);
        assert_eq!(
            action,
            Some(TimelineAction::BeatClipResized {
                edge: ResizeEdge::End,
                start_sec: 0.0,
                duration_sec: 2.0,
            })
        );
        // Growing past the envelope end is capped at the original 4s.
        let action = engine.pointer_move(PointerPosition::new(400.0, 50.0), &props);
        assert_eq!(
            action,
            Some(TimelineAction::BeatClipResized {
                edge: ResizeEdge::End,
                start_sec: 0.0,
                duration_sec: 4.0,
            })
        );
        assert_eq!(engine.pointer_up(PointerPosition::new(400.0, 50.0), &props), None);
    }

    #[test]
    fn lane_press_scrubs_and_header_press_selects() {
        let fixture = Fixture::new();
        let props = fixture.props();
        let mut engine = engine();

        let actions = engine
            .pointer_down(
                PointerTarget::Lane(LaneRef::Beat),
                PointerPosition::new(500.0, 50.0),
                &props,
            )
            .expect("down");
        assert_eq!(actions, vec![TimelineAction::Seek { time_sec: 10.0 }]);
        assert!(engine.is_scrubbing());
        engine.pointer_up(PointerPosition::new(500.0, 50.0), &props);
        assert!(!engine.is_scrubbing());

        let actions = engine
            .pointer_down(
                PointerTarget::LaneHeader(LaneRef::Vocal(TrackId(1))),
                PointerPosition::new(10.0, 120.0),
                &props,
            )
            .expect("down");
        assert_eq!(
            actions,
            vec![TimelineAction::SelectVocalTrack { track: TrackId(1) }]
        );
    }

    #[test]
    fn wheel_without_modifier_does_not_zoom() {
        let mut engine = engine();
        assert!(engine.wheel(-1.0, 300.0, false).is_none());
        let change = engine.wheel(-1.0, 300.0, true).expect("zoom");
        assert!((change.zoom - 1.1).abs() < 1e-12);
        let change = engine.wheel(1.0, 300.0, true).expect("zoom");
        assert!((change.zoom - 1.0).abs() < 1e-12);
    }

    #[test]
    fn context_menu_on_lane_background_closes_menu() {
        let fixture = Fixture::new();
        let props = fixture.props();
        let mut engine = engine();
        assert!(engine.open_context_menu(
            PointerTarget::ClipBody(ClipRef::Beat),
            MenuAnchor::default(),
            &props
        ));
        assert!(engine.context_menu().is_some());
        assert!(!engine.open_context_menu(
            PointerTarget::Lane(LaneRef::Beat),
            MenuAnchor::default(),
            &props
        ));
        assert!(engine.context_menu().is_none());
        assert!(engine.menu_action(MenuItem::PlayFrom).is_empty());
    }

    #[test]
    fn dispose_mid_gesture_detaches_capture() {
        let counts = Rc::new(RefCell::new((0, 0)));
        let fixture = Fixture::new();
        let props = fixture.props();
        let mut engine = engine().with_pointer_capture(SharedCapture(Rc::clone(&counts)));

        engine
            .pointer_down(
                PointerTarget::ClipBody(ClipRef::Beat),
                PointerPosition::new(180.0, 50.0),
                &props,
            )
            .expect("down");
        engine.zoom_in(0.0);
        engine.dispose();
        assert_eq!(*counts.borrow(), (1, 1));
        assert_eq!(engine.take_scroll_correction(), None);
        let change = engine.zoom_in(3.0);
        assert!(!change.changed());
        assert_eq!(engine.zoom(), 1.25);
        engine.zoom_out(3.0);
        assert_eq!(engine.zoom(), 1.25);
        assert_eq!(engine.take_scroll_correction(), None);
        assert!(engine
            .pointer_down(PointerTarget::Ruler, PointerPosition::new(300.0, 5.0), &props)
            .expect("ignored")
            .is_empty());
        drop(engine);
        assert_eq!(*counts.borrow(), (1, 1));
    }

    #[test]
    fn volume_is_clamped_before_reaching_host() {
        let engine = engine();
        assert_eq!(
            engine.set_volume(LaneRef::Vocal(TrackId(3)), 9.0),
            TimelineAction::VocalVolumeChanged {
                track: TrackId(3),
                volume: 1.5
            }
        );
    }
}
