//! CLI command implementations

use crate::output::{self, OutputFormat};
use crate::simulator::{self, CollectedErrors, Scenario, Step};
use anyhow::Context;
use playhead_core::classifier::ClassifyContext;
use playhead_core::{
    classify as classify_signal, PlaybackError, RawSignal, SessionConfig, SessionController,
    SessionHandle, SessionId, SessionState, TrackingEmitter, TrackingRecord, VideoDescriptor,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Everything a simulated session produced
#[derive(Debug, Serialize)]
struct SimulationReport {
    session_id: SessionId,
    events: Vec<TrackingRecord>,
    errors: Vec<PlaybackError>,
}

/// Replay a scenario and print its tracking events
pub async fn simulate(scenario_path: &Path, config_path: Option<&Path>, format: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let scenario = Scenario::from_file(scenario_path)
        .with_context(|| format!("reading scenario {}", scenario_path.display()))?;

    info!(
        videos = scenario.videos.len(),
        steps = scenario.steps.len(),
        "Starting simulation"
    );

    let session_id = SessionId::new();
    let (emitter, mut records) = TrackingEmitter::new(session_id);
    let errors = Arc::new(CollectedErrors::default());
    let collaborators = simulator::collaborators(&scenario, Arc::new(emitter), errors.clone());

    let (handle, task) = SessionHandle::spawn(SessionController::new(collaborators));
    handle.configure(config).await?;
    match scenario.ad_urls.clone() {
        Some(ad_urls) => handle.init_playlist_with_ads(scenario.videos.clone(), ad_urls).await?,
        None => handle.init_playlist(scenario.videos.clone()).await?,
    }

    for (index, step) in scenario.steps.iter().enumerate() {
        debug!(index, ?step, "Step");
        run_step(&handle, step.clone())
            .await
            .with_context(|| format!("step {index} failed"))?;
    }

    handle.release().await?;
    drop(handle);
    task.await?;

    let mut events = Vec::new();
    while let Ok(record) = records.try_recv() {
        events.push(record);
    }
    let report = SimulationReport {
        session_id,
        events,
        errors: errors.take(),
    };

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", output::to_json(&report)),
        OutputFormat::Text => {
            println!("Session {}", report.session_id);
            println!("\nTracking events ({}):", report.events.len());
            for record in &report.events {
                println!("  {}", output::record_line(record));
            }
            if !report.errors.is_empty() {
                println!("\nPlayback errors ({}):", report.errors.len());
                for error in &report.errors {
                    println!("  {}", output::error_line(error));
                }
            }
        }
    }

    Ok(())
}

async fn run_step(handle: &SessionHandle, step: Step) -> playhead_core::Result<()> {
    match step {
        Step::Signal { signal } => handle.signal(signal).await,
        Step::Play => handle.play().await,
        Step::Pause => handle.pause().await,
        Step::AddVideo { video } => handle.add_video(video).await,
        Step::SwitchBackend { backend } => handle.switch_backend(backend).await,
        Step::EnterPictureInPicture => handle.enter_picture_in_picture().await,
        Step::ExitPictureInPicture => handle.exit_picture_in_picture().await,
        Step::Wait { millis } => {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok(())
        }
        Step::Release => handle.release().await,
    }
}

/// Classify a single signal and print the event and state change
pub fn classify(signal_json: &str, live: bool, duration_micros: i64, tracked: bool, format: &str) -> anyhow::Result<()> {
    let signal: RawSignal = serde_json::from_str(signal_json).context("parsing signal")?;
    let video = if live {
        VideoDescriptor::live("cli://video")
    } else {
        VideoDescriptor::new("cli://video", duration_micros)
    };
    let state = SessionState::new();

    let classification = classify_signal(
        &signal,
        &ClassifyContext {
            state: &state,
            video: &video,
            has_tracking_url: tracked,
        },
    );

    match OutputFormat::from(format) {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "event": classification.event,
                "delta": format!("{:?}", classification.delta),
            });
            println!("{}", output::to_json(&value));
        }
        OutputFormat::Text => {
            match &classification.event {
                Some(event) => println!("Event: {} {}", event.kind, output::to_json(&event.payload)),
                None => println!("Event: (none)"),
            }
            if classification.delta.is_empty() {
                println!("State: unchanged");
            } else {
                println!("State: {:?}", classification.delta);
            }
        }
    }

    Ok(())
}

/// Print the effective configuration, validating a file when given
pub fn config(path: Option<&Path>, format: &str) -> anyhow::Result<()> {
    let config = load_config(path)?;

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", output::to_json(&config)),
        OutputFormat::Text => {
            println!("Session configuration:");
            println!("  Ads enabled:          {}", config.ads_enabled);
            println!("  Cast enabled:         {}", config.cast_enabled);
            println!("  Avail poll period:    {}ms", config.avail_poll_period_ms);
            println!("  Resume positions:     {}", config.resume_saved_positions);
            println!("  Hide chrome in PiP:   {}", config.hide_chrome_in_pip);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(SessionConfig::default()),
    }
}
