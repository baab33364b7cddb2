use beatline_timeline::gesture::{resize_bounds, PointerPosition};
use beatline_timeline::time_scale::{MAX_ZOOM, MIN_ZOOM};
use beatline_timeline::{
    ArrangementSession, ClipEnvelope, ClipRef, PointerTarget, ResizeEdge, SnapEngine,
    TimelineAction, TimelineConfig, TimelineEngine, WaveformRequest, GRID_STEP_SEC, MIN_CLIP_SEC,
};
use proptest::prelude::*;

const EPSILON: f64 = 1e-9;

#[derive(Clone, Debug)]
enum ZoomOp {
    Wheel { delta: i16, x: u16 },
    ZoomIn,
    ZoomOut,
    Scroll(u16),
}

fn zoom_op() -> impl Strategy<Value = ZoomOp> {
    prop_oneof![
        (any::<i16>(), 0u16..1600).prop_map(|(delta, x)| ZoomOp::Wheel { delta, x }),
        Just(ZoomOp::ZoomIn),
        Just(ZoomOp::ZoomOut),
        any::<u16>().prop_map(ZoomOp::Scroll),
    ]
}

/// Zoom input that can arrive several times between two frames.
#[derive(Clone, Debug)]
enum FrameZoom {
    Wheel { zoom_in: bool, x: u16 },
    Button { zoom_in: bool },
}

fn frame_zoom() -> impl Strategy<Value = FrameZoom> {
    prop_oneof![
        (any::<bool>(), 200u16..1600).prop_map(|(zoom_in, x)| FrameZoom::Wheel { zoom_in, x }),
        any::<bool>().prop_map(|zoom_in| FrameZoom::Button { zoom_in }),
    ]
}

#[derive(Clone, Debug)]
enum EditOp {
    ResizeStart(i16),
    ResizeEnd(i16),
    Move(i16),
}

fn edit_op() -> impl Strategy<Value = EditOp> {
    prop_oneof![
        (-400i16..400).prop_map(EditOp::ResizeStart),
        (-400i16..400).prop_map(EditOp::ResizeEnd),
        (-400i16..400).prop_map(EditOp::Move),
    ]
}

fn engine() -> TimelineEngine {
    let mut engine = TimelineEngine::new(TimelineConfig::default(), |_: &str| {
        WaveformRequest::ready(vec![0.5])
    });
    engine.set_viewport_width(1600.0);
    engine
}

fn is_grid_multiple(value: f64) -> bool {
    let steps = value / GRID_STEP_SEC;
    (steps - steps.round()).abs() < EPSILON
}

proptest! {
    #[test]
    fn zoom_stays_in_bounds(ops in prop::collection::vec(zoom_op(), 1..64), playhead in 0.0f64..600.0) {
        let mut engine = engine();
        for op in ops {
            match op {
                ZoomOp::Wheel { delta, x } => {
                    engine.wheel(delta as f64, x as f64, true);
                }
                ZoomOp::ZoomIn => {
                    engine.zoom_in(playhead);
                }
                ZoomOp::ZoomOut => {
                    engine.zoom_out(playhead);
                }
                ZoomOp::Scroll(scroll) => engine.set_scroll_left(scroll as f64),
            }
            engine.take_scroll_correction();
            prop_assert!(engine.zoom() >= MIN_ZOOM && engine.zoom() <= MAX_ZOOM);
            prop_assert!(engine.viewport().scroll_left >= 0.0);
        }
    }

    #[test]
    fn anchored_zoom_preserves_anchor_time(
        scroll in 0.0f64..4000.0,
        anchor_x in 200.0f64..1600.0,
        ticks in 1usize..12,
        zoom_in in any::<bool>(),
    ) {
        let mut engine = engine();
        engine.set_scroll_left(scroll);
        let before = engine.viewport().time_at(engine.scale(), anchor_x);
        for _ in 0..ticks {
            let delta = if zoom_in { -1.0 } else { 1.0 };
            engine.wheel(delta, anchor_x, true);
            let corrected = engine.take_scroll_correction();
            prop_assert!(corrected.is_some());
        }
        let after = engine.viewport().time_at(engine.scale(), anchor_x);
        // The correction is clamped at zero, which can only happen near the origin.
        if engine.viewport().scroll_left > 0.0 {
            prop_assert!((after - before).abs() < 1e-6, "{} vs {}", before, after);
        }
    }

    #[test]
    fn wheel_burst_before_one_frame_preserves_anchor_time(
        scroll in 0.0f64..4000.0,
        anchor_x in 200.0f64..1600.0,
        ticks in 2usize..12,
        zoom_in in any::<bool>(),
    ) {
        let mut engine = engine();
        engine.set_scroll_left(scroll);
        let before = engine.viewport().time_at(engine.scale(), anchor_x);
        for _ in 0..ticks {
            let delta = if zoom_in { -1.0 } else { 1.0 };
            prop_assert!(engine.wheel(delta, anchor_x, true).is_some());
        }
        prop_assert!(engine.take_scroll_correction().is_some());
        let after = engine.viewport().time_at(engine.scale(), anchor_x);
        if engine.viewport().scroll_left > 0.0 {
            prop_assert!((after - before).abs() < 1e-6, "{} vs {}", before, after);
        }
    }

    #[test]
    fn mixed_zooms_before_one_frame_keep_last_anchor(
        scroll in 0.0f64..4000.0,
        playhead in 0.0f64..120.0,
        frame in prop::collection::vec(frame_zoom(), 2..10),
    ) {
        let mut engine = engine();
        engine.set_scroll_left(scroll);
        let mut last = None;
        for op in frame {
            last = match op {
                FrameZoom::Wheel { zoom_in, x } => {
                    let delta = if zoom_in { -1.0 } else { 1.0 };
                    engine.wheel(delta, x as f64, true)
                }
                FrameZoom::Button { zoom_in: true } => Some(engine.zoom_in(playhead)),
                FrameZoom::Button { zoom_in: false } => Some(engine.zoom_out(playhead)),
            };
        }
        let change = last.expect("every zoom in the frame applies");
        prop_assert!(engine.take_scroll_correction().is_some());
        prop_assert!(engine.zoom() >= MIN_ZOOM && engine.zoom() <= MAX_ZOOM);
        if engine.viewport().scroll_left > 0.0 {
            let x = engine.viewport().screen_x(engine.scale(), change.anchor_time);
            prop_assert!(
                (x - change.anchor_screen_x).abs() < 1e-6,
                "{} drawn at {} instead of {}", change.anchor_time, x, change.anchor_screen_x
            );
        }
    }

    #[test]
    fn resize_respects_minimum_start_and_envelope(
        start in 0.0f64..50.0,
        duration in MIN_CLIP_SEC..20.0,
        slack_before in 0.0f64..10.0,
        slack_after in 0.0f64..10.0,
        delta in -80.0f64..80.0,
        snap in any::<bool>(),
        end_edge in any::<bool>(),
    ) {
        let edge = if end_edge { ResizeEdge::End } else { ResizeEdge::Start };
        let envelope = ClipEnvelope::new((start - slack_before).max(0.0), start + duration + slack_after);
        let snap = SnapEngine::default().with_enabled(snap);
        let (new_start, new_duration) =
            resize_bounds(edge, start, duration, delta, &snap, Some(envelope), MIN_CLIP_SEC);

        prop_assert!(new_start >= 0.0);
        prop_assert!(new_duration >= MIN_CLIP_SEC);
        prop_assert!(new_start + EPSILON >= envelope.start);
        prop_assert!(new_start + new_duration <= envelope.end + EPSILON);
        match edge {
            ResizeEdge::Start => {
                prop_assert!((new_start + new_duration - (start + duration)).abs() < EPSILON)
            }
            ResizeEdge::End => prop_assert!((new_start - start).abs() < EPSILON),
        }
    }

    #[test]
    fn edits_keep_clips_inside_growing_envelopes(
        ops in prop::collection::vec(edit_op(), 1..40),
        snap in any::<bool>(),
    ) {
        let mut session = ArrangementSession::new();
        let clip_id = session.load_beat("Beat", "beat.wav", 8.0);
        session.snap_enabled = snap;
        // Keep the clip away from the left edge so moves have room both ways.
        session.apply(&TimelineAction::BeatClipMoved { start_sec: 20.0 }).expect("move");
        let mut engine = engine();
        engine.layout(&session.props());
        let mut previous = engine.bounds().envelope(clip_id).expect("envelope");

        for op in ops {
            let (target, delta) = match op {
                EditOp::ResizeStart(delta) => (PointerTarget::ClipStartHandle(ClipRef::Beat), delta),
                EditOp::ResizeEnd(delta) => (PointerTarget::ClipEndHandle(ClipRef::Beat), delta),
                EditOp::Move(delta) => (PointerTarget::ClipBody(ClipRef::Beat), delta),
            };
            let action = {
                let props = session.props();
                let from = PointerPosition::new(800.0, 50.0);
                let to = PointerPosition::new(800.0 + delta as f64, 50.0);
                engine.pointer_down(target, from, &props).expect("down");
                let update = engine.pointer_move(to, &props);
                engine.pointer_up(to, &props);
                update
            };
            if let Some(action) = action {
                if snap {
                    match action {
                        TimelineAction::BeatClipMoved { start_sec } => {
                            prop_assert!(is_grid_multiple(start_sec));
                        }
                        TimelineAction::BeatClipResized { edge: ResizeEdge::End, start_sec, duration_sec } => {
                            let end = start_sec + duration_sec;
                            prop_assert!(is_grid_multiple(end) || (duration_sec - MIN_CLIP_SEC).abs() < EPSILON
                                || (end - previous.end).abs() < EPSILON);
                        }
                        _ => {}
                    }
                }
                session.apply(&action).expect("apply");
            }
            engine.layout(&session.props());

            let clip = session.beat.as_ref().and_then(|beat| beat.clip.as_ref()).expect("clip");
            let envelope = engine.bounds().envelope(clip_id).expect("envelope");
            prop_assert!(clip.start_sec >= 0.0);
            prop_assert!(clip.duration_sec >= MIN_CLIP_SEC);
            prop_assert!(envelope.start <= clip.start_sec);
            prop_assert!(envelope.end >= clip.end_sec());
            prop_assert!(envelope.start <= previous.start && envelope.end >= previous.end);
            previous = envelope;
        }
    }
}
