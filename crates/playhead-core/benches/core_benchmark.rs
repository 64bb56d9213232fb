//! Benchmark tests for playhead-core operations
//!
//! Run with: cargo bench -p playhead-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use playhead_core::classifier::ClassifyContext;
use playhead_core::playlist::Playlist;
use playhead_core::state::SessionState;
use playhead_core::*;

// ============================================================================
// Helpers
// ============================================================================

fn vod() -> VideoDescriptor {
    VideoDescriptor::new("https://cdn.example.com/vod.m3u8", 600_000_000)
}

fn engine_signals() -> Vec<(&'static str, RawSignal)> {
    vec![
        (
            "play_started",
            RawSignal::Engine(EngineSignal::PlayStarted { position_micros: 0 }),
        ),
        (
            "paused",
            RawSignal::Engine(EngineSignal::Paused {
                position_micros: 120_000_000,
            }),
        ),
        (
            "percent_watched",
            RawSignal::Engine(EngineSignal::PercentWatched { percent: 50 }),
        ),
        (
            "ad_started",
            RawSignal::Engine(EngineSignal::AdStarted { percent: 42 }),
        ),
        (
            "behind_live_window",
            RawSignal::Engine(EngineSignal::Fault(PlayerFault::BehindLiveWindow)),
        ),
        (
            "sdk_ad_completed",
            RawSignal::AdSdk(AdSdkSignal::AdCompleted {
                ad_type: -1,
                ad: AdMetadata::new("ad-1"),
            }),
        ),
    ]
}

// ============================================================================
// Classification
// ============================================================================

fn bench_classify(c: &mut Criterion) {
    let state = SessionState::new();
    let video = vod();
    let ctx = ClassifyContext {
        state: &state,
        video: &video,
        has_tracking_url: true,
    };

    let mut group = c.benchmark_group("Classify");
    for (name, signal) in engine_signals() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &signal, |b, signal| {
            b.iter(|| classify(black_box(signal), black_box(&ctx)))
        });
    }
    group.finish();
}

fn bench_signal_decoding(c: &mut Criterion) {
    let json = r#"{"source":"engine","signal":{"type":"seeked","from_micros":1000000,"to_micros":90000000}}"#;

    c.bench_function("decode_raw_signal", |b| {
        b.iter(|| serde_json::from_str::<RawSignal>(black_box(json)))
    });
}

// ============================================================================
// Positions and playlist
// ============================================================================

fn bench_position_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("Position Store");

    for size in [10usize, 1_000, 10_000] {
        let mut store = PositionStore::new();
        for i in 0..size {
            store.record(&format!("video-{i}"), i as i64 * 1_000_000);
        }

        group.bench_with_input(BenchmarkId::new("read_hit", size), &store, |b, store| {
            b.iter(|| store.read(black_box("video-5")))
        });
        group.bench_with_input(BenchmarkId::new("read_miss", size), &store, |b, store| {
            b.iter(|| store.read(black_box("missing")))
        });
    }
    group.finish();
}

fn bench_playlist_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("Playlist Advance");

    for size in [3usize, 100] {
        let videos: Vec<_> = (0..size)
            .map(|i| VideoDescriptor::new(format!("video-{i}"), 60_000_000))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &videos, |b, videos| {
            b.iter(|| {
                let mut playlist = Playlist::new(videos.clone()).unwrap();
                let mut positions = PositionStore::new();
                while playlist.state() != PlaylistState::EndedTerminal {
                    black_box(playlist.advance(&mut positions));
                }
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_classify,
    bench_signal_decoding,
    bench_position_store,
    bench_playlist_advance,
);
criterion_main!(benches);
