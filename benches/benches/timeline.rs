use std::hint::black_box;
use std::time::Duration;

use beatline_timeline::gesture::PointerPosition;
use beatline_timeline::{
    downsample_peaks, waveform_polygon, ArrangementSession, ClipRef, PointerTarget,
    TimelineConfig, TimelineEngine, WaveformRequest,
};
use criterion::{criterion_group, criterion_main, Criterion};

fn arrangement(vocal_lanes: usize) -> ArrangementSession {
    let mut session = ArrangementSession::new();
    session.load_beat("Beat", "beat.wav", 180.0);
    for lane in 0..vocal_lanes {
        let track = session.add_vocal_track();
        session
            .place_take(track, lane as f64 * 4.0, 12.0, Some(format!("take-{lane}.wav")))
            .expect("take");
    }
    session
}

fn engine() -> TimelineEngine {
    let mut engine = TimelineEngine::new(TimelineConfig::default(), |_: &str| {
        WaveformRequest::ready((0..2048).map(|i| (i as f32 * 0.01).sin()).collect())
    });
    engine.set_viewport_width(1920.0);
    engine
}

fn gestures(c: &mut Criterion) {
    let mut group = c.benchmark_group("gestures");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(50);

    group.bench_function("resize_drag_240_moves", |b| {
        let session = arrangement(16);
        let mut engine = engine();
        engine.layout(&session.props());

        b.iter(|| {
            let props = session.props();
            engine
                .pointer_down(
                    PointerTarget::ClipEndHandle(ClipRef::Beat),
                    PointerPosition::new(800.0, 50.0),
                    &props,
                )
                .expect("down");
            let mut last = None;
            for step in 0..240 {
                let x = 800.0 + (step as f64 * 0.37).sin() * 300.0;
                last = engine.pointer_move(PointerPosition::new(x, 50.0), &props);
            }
            engine.pointer_up(PointerPosition::new(800.0, 50.0), &props);
            black_box(last)
        });
    });

    group.bench_function("layout_16_lanes", |b| {
        let session = arrangement(16);
        let mut engine = engine();
        b.iter(|| black_box(engine.layout(&session.props())));
    });

    group.finish();
}

fn waveforms(c: &mut Criterion) {
    let samples: Vec<f32> = (0..44_100 * 30).map(|i| (i as f32 * 0.003).sin()).collect();
    let mut group = c.benchmark_group("waveform");
    group.sample_size(30);

    group.bench_function("downsample_30s_to_512", |b| {
        b.iter(|| black_box(downsample_peaks(&samples, 512)));
    });

    let peaks = downsample_peaks(&samples, 512);
    group.bench_function("polygon_512_peaks", |b| {
        b.iter(|| black_box(waveform_polygon(&peaks)));
    });

    group.finish();
}

criterion_group!(benches, gestures, waveforms);
criterion_main!(benches);
