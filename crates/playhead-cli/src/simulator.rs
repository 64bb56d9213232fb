//! Scripted session scenarios and the stub collaborators they run against

use async_trait::async_trait;
use playhead_core::{
    AdSessionData, Avail, AvailProvider, ChromeController, Collaborators, EngineFactory,
    ErrorListener, ManifestResolver, PlaybackBackend, PlaybackEngine, PlaybackError, RawSignal,
    Result, TrackingSink, VideoDescriptor,
};
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use url::Url;

/// A scripted session: what to load, what the ad backend answers, and the
/// steps to replay
#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub videos: Vec<VideoDescriptor>,
    /// One ad tag per video; initializes through the ad-aware path when set
    #[serde(default)]
    pub ad_urls: Option<Vec<String>>,
    /// Answer of the manifest resolver for live ad-enabled videos
    #[serde(default)]
    pub ad_session: Option<AdSessionData>,
    /// Answer of every avail poll
    #[serde(default)]
    pub avails: Vec<Avail>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// A single scripted action
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Signal { signal: RawSignal },
    Play,
    Pause,
    AddVideo { video: VideoDescriptor },
    SwitchBackend { backend: PlaybackBackend },
    EnterPictureInPicture,
    ExitPictureInPicture,
    /// Let background timers run for a while
    Wait { millis: u64 },
    Release,
}

/// Engine whose playhead only moves on load and seek
pub struct SimEngine {
    backend: PlaybackBackend,
    position: Arc<AtomicI64>,
}

impl PlaybackEngine for SimEngine {
    fn load(&mut self, video: &VideoDescriptor, start_position_micros: i64) {
        self.position.store(start_position_micros.max(0), Ordering::SeqCst);
        info!(backend = %self.backend, video_id = video.id(), start_position_micros, "Engine load");
    }

    fn play(&mut self) {
        info!(backend = %self.backend, "Engine play");
    }

    fn pause(&mut self) {
        info!(backend = %self.backend, "Engine pause");
    }

    fn stop(&mut self) {
        info!(backend = %self.backend, "Engine stop");
    }

    fn seek_to(&mut self, position_micros: i64) {
        self.position.store(position_micros, Ordering::SeqCst);
    }

    fn seek_to_default_position(&mut self) {
        info!(backend = %self.backend, "Engine jumped to live edge");
    }

    fn prepare(&mut self) {
        info!(backend = %self.backend, "Engine prepare");
    }

    fn release(&mut self) {
        info!(backend = %self.backend, "Engine released");
    }

    fn position_micros(&self) -> i64 {
        self.position.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct SimEngineFactory {
    position: Arc<AtomicI64>,
}

impl EngineFactory for SimEngineFactory {
    fn create(&self, backend: PlaybackBackend) -> Result<Box<dyn PlaybackEngine>> {
        Ok(Box::new(SimEngine {
            backend,
            position: self.position.clone(),
        }))
    }
}

pub struct ScriptedResolver {
    ad_session: Option<AdSessionData>,
}

#[async_trait]
impl ManifestResolver for ScriptedResolver {
    async fn resolve_manifest(&self, video: &VideoDescriptor) -> Option<AdSessionData> {
        info!(video_id = video.id(), resolved = self.ad_session.is_some(), "Manifest resolution");
        self.ad_session.clone()
    }
}

pub struct ScriptedAvails {
    avails: Vec<Avail>,
}

#[async_trait]
impl AvailProvider for ScriptedAvails {
    async fn fetch_avails(&self, tracking_url: &Url) -> Result<Vec<Avail>> {
        info!(url = %tracking_url, count = self.avails.len(), "Avail poll");
        Ok(self.avails.clone())
    }
}

pub struct LoggingChrome;

impl ChromeController for LoggingChrome {
    fn toggle_chrome(&self, visible: bool) {
        info!(visible, "Chrome toggled");
    }

    fn show_error_overlay(&self, message: &str) {
        warn!(message, "Error overlay shown");
    }
}

/// Keeps every reported playback error for the final report
#[derive(Default)]
pub struct CollectedErrors {
    errors: Mutex<Vec<PlaybackError>>,
}

impl CollectedErrors {
    pub fn take(&self) -> Vec<PlaybackError> {
        self.errors
            .lock()
            .map(|mut errors| std::mem::take(&mut *errors))
            .unwrap_or_default()
    }
}

impl ErrorListener for CollectedErrors {
    fn on_error(&self, error: &PlaybackError) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push(error.clone());
        }
    }
}

/// Wire a scenario's scripted answers into a collaborator set
pub fn collaborators(
    scenario: &Scenario,
    tracking: Arc<dyn TrackingSink>,
    errors: Arc<CollectedErrors>,
) -> Collaborators {
    Collaborators {
        engines: Arc::new(SimEngineFactory::default()),
        manifests: Arc::new(ScriptedResolver {
            ad_session: scenario.ad_session.clone(),
        }),
        avails: Arc::new(ScriptedAvails {
            avails: scenario.avails.clone(),
        }),
        tracking,
        chrome: Arc::new(LoggingChrome),
        errors,
    }
}
