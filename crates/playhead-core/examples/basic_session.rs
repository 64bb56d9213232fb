//! Basic session example
//!
//! Plays a two-video playlist against a stub engine and prints the
//! tracking events the session emits.
//!
//! Run with: cargo run -p playhead-core --example basic_session

use playhead_core::collaborators::{NoAvailProvider, NoManifestResolver};
use playhead_core::*;
use std::sync::Arc;

struct PrintingEngine {
    backend: PlaybackBackend,
}

impl PlaybackEngine for PrintingEngine {
    fn load(&mut self, video: &VideoDescriptor, start_position_micros: i64) {
        println!("  [{}] load {} @ {}us", self.backend, video.id(), start_position_micros);
    }

    fn play(&mut self) {
        println!("  [{}] play", self.backend);
    }

    fn pause(&mut self) {
        println!("  [{}] pause", self.backend);
    }

    fn stop(&mut self) {}

    fn seek_to(&mut self, _position_micros: i64) {}

    fn seek_to_default_position(&mut self) {}

    fn prepare(&mut self) {}

    fn release(&mut self) {
        println!("  [{}] release", self.backend);
    }

    fn position_micros(&self) -> i64 {
        0
    }
}

struct PrintingFactory;

impl EngineFactory for PrintingFactory {
    fn create(&self, backend: PlaybackBackend) -> Result<Box<dyn PlaybackEngine>> {
        Ok(Box::new(PrintingEngine { backend }))
    }
}

struct Quiet;

impl ChromeController for Quiet {
    fn toggle_chrome(&self, _visible: bool) {}

    fn show_error_overlay(&self, message: &str) {
        println!("  overlay: {message}");
    }
}

impl ErrorListener for Quiet {
    fn on_error(&self, error: &PlaybackError) {
        println!("  error: {error}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("Playhead Core - Basic Session Example");
    println!("=====================================\n");

    let (emitter, mut records) = TrackingEmitter::new(SessionId::new());
    let collaborators = Collaborators {
        engines: Arc::new(PrintingFactory),
        manifests: Arc::new(NoManifestResolver),
        avails: Arc::new(NoAvailProvider),
        tracking: Arc::new(emitter),
        chrome: Arc::new(Quiet),
        errors: Arc::new(Quiet),
    };

    let mut session = SessionController::with_config(collaborators, SessionConfig::default())?;
    session
        .init_playlist(vec![
            VideoDescriptor::new("https://cdn.example.com/intro.m3u8", 30_000_000),
            VideoDescriptor::new("https://cdn.example.com/feature.m3u8", 5_400_000_000),
        ])
        .await?;

    let signals = [
        EngineSignal::PlayStarted { position_micros: 0 },
        EngineSignal::PercentWatched { percent: 25 },
        EngineSignal::PercentWatched { percent: 50 },
        EngineSignal::ContentEnded,
        EngineSignal::Paused {
            position_micros: 600_000_000,
        },
        EngineSignal::Fault(PlayerFault::Source("HTTP 503".to_string())),
    ];
    for signal in signals {
        session.handle_signal(RawSignal::Engine(signal)).await;
    }
    session.release();

    println!("\nTracking events:");
    while let Ok(record) = records.try_recv() {
        println!("  #{:<2} {:<24} {}", record.sequence, record.event.kind.to_string(), record.event.video_id);
    }

    println!(
        "\nSaved position of feature: {}us",
        session.read_position("https://cdn.example.com/feature.m3u8")
    );

    Ok(())
}
