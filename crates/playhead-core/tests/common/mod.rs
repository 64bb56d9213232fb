//! Recording fakes for the session collaborators

#![allow(dead_code)]

use async_trait::async_trait;
use playhead_core::{
    AdSessionData, Avail, AvailProvider, ChromeController, Collaborators, EngineFactory, Error,
    ErrorListener, ManifestResolver, PlaybackBackend, PlaybackEngine, PlaybackError, Result,
    SessionConfig, SessionController, TrackingEvent, TrackingEventKind, TrackingSink,
    VideoDescriptor,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Created(PlaybackBackend),
    Load { id: String, start: i64 },
    Play,
    Pause,
    Stop,
    Seek(i64),
    SeekToDefault,
    Prepare,
    Release(PlaybackBackend),
}

#[derive(Default)]
pub struct EngineLog {
    pub calls: Mutex<Vec<EngineCall>>,
    pub position: AtomicI64,
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
}

impl EngineLog {
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    pub fn last_load(&self) -> Option<(String, i64)> {
        self.calls.lock().unwrap().iter().rev().find_map(|c| match c {
            EngineCall::Load { id, start } => Some((id.clone(), *start)),
            _ => None,
        })
    }

    pub fn set_position(&self, position: i64) {
        self.position.store(position, Ordering::SeqCst);
    }

    fn push(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

pub struct FakeEngine {
    backend: PlaybackBackend,
    log: Arc<EngineLog>,
}

impl PlaybackEngine for FakeEngine {
    fn load(&mut self, video: &VideoDescriptor, start_position_micros: i64) {
        self.log.push(EngineCall::Load {
            id: video.id().to_string(),
            start: start_position_micros,
        });
    }

    fn play(&mut self) {
        self.log.push(EngineCall::Play);
    }

    fn pause(&mut self) {
        self.log.push(EngineCall::Pause);
    }

    fn stop(&mut self) {
        self.log.push(EngineCall::Stop);
    }

    fn seek_to(&mut self, position_micros: i64) {
        self.log.push(EngineCall::Seek(position_micros));
    }

    fn seek_to_default_position(&mut self) {
        self.log.push(EngineCall::SeekToDefault);
    }

    fn prepare(&mut self) {
        self.log.push(EngineCall::Prepare);
    }

    fn release(&mut self) {
        self.log.live.fetch_sub(1, Ordering::SeqCst);
        self.log.push(EngineCall::Release(self.backend));
    }

    fn position_micros(&self) -> i64 {
        self.log.position.load(Ordering::SeqCst)
    }
}

pub struct FakeEngineFactory {
    pub log: Arc<EngineLog>,
}

impl EngineFactory for FakeEngineFactory {
    fn create(&self, backend: PlaybackBackend) -> Result<Box<dyn PlaybackEngine>> {
        let live = self.log.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.max_live.fetch_max(live, Ordering::SeqCst);
        self.log.push(EngineCall::Created(backend));
        Ok(Box::new(FakeEngine {
            backend,
            log: self.log.clone(),
        }))
    }
}

#[derive(Default)]
pub struct FakeResolver {
    pub data: Mutex<Option<AdSessionData>>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl ManifestResolver for FakeResolver {
    async fn resolve_manifest(&self, _video: &VideoDescriptor) -> Option<AdSessionData> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.data.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct FakeAvails {
    pub responses: Mutex<VecDeque<Result<Vec<Avail>>>>,
    pub calls: AtomicUsize,
}

impl FakeAvails {
    pub fn push_ok(&self, avails: Vec<Avail>) {
        self.responses.lock().unwrap().push_back(Ok(avails));
    }

    pub fn push_err(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(Error::SourceUnavailable(message.to_string())));
    }
}

#[async_trait]
impl AvailProvider for FakeAvails {
    async fn fetch_avails(&self, _tracking_url: &Url) -> Result<Vec<Avail>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<TrackingEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<TrackingEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<(String, TrackingEventKind)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| (e.video_id.clone(), e.kind))
            .collect()
    }

    pub fn count(&self, kind: TrackingEventKind) -> usize {
        self.events.lock().unwrap().iter().filter(|e| e.kind == kind).count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl TrackingSink for RecordingSink {
    fn emit(&self, event: TrackingEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChromeCall {
    Toggle(bool),
    ErrorOverlay(String),
}

#[derive(Default)]
pub struct RecordingChrome {
    pub calls: Mutex<Vec<ChromeCall>>,
}

impl RecordingChrome {
    pub fn calls(&self) -> Vec<ChromeCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl ChromeController for RecordingChrome {
    fn toggle_chrome(&self, visible: bool) {
        self.calls.lock().unwrap().push(ChromeCall::Toggle(visible));
    }

    fn show_error_overlay(&self, message: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(ChromeCall::ErrorOverlay(message.to_string()));
    }
}

#[derive(Default)]
pub struct RecordingErrors {
    pub errors: Mutex<Vec<PlaybackError>>,
}

impl RecordingErrors {
    pub fn errors(&self) -> Vec<PlaybackError> {
        self.errors.lock().unwrap().clone()
    }
}

impl ErrorListener for RecordingErrors {
    fn on_error(&self, error: &PlaybackError) {
        self.errors.lock().unwrap().push(error.clone());
    }
}

/// All fakes, shared with the controller under test
#[derive(Default)]
pub struct Harness {
    pub engine: Arc<EngineLog>,
    pub resolver: Arc<FakeResolver>,
    pub avails: Arc<FakeAvails>,
    pub sink: Arc<RecordingSink>,
    pub chrome: Arc<RecordingChrome>,
    pub errors: Arc<RecordingErrors>,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            engines: Arc::new(FakeEngineFactory {
                log: self.engine.clone(),
            }),
            manifests: self.resolver.clone(),
            avails: self.avails.clone(),
            tracking: self.sink.clone(),
            chrome: self.chrome.clone(),
            errors: self.errors.clone(),
        }
    }

    pub fn controller(&self) -> SessionController {
        SessionController::with_config(self.collaborators(), SessionConfig::default())
            .expect("default config is valid")
    }

    pub fn controller_with(&self, config: SessionConfig) -> SessionController {
        SessionController::with_config(self.collaborators(), config).expect("config is valid")
    }

    pub fn resolve_to(&self, manifest_url: &str, tracking_url: Option<&str>) {
        *self.resolver.data.lock().unwrap() = Some(AdSessionData {
            manifest_url: Some(Url::parse(manifest_url).unwrap()),
            tracking_url: tracking_url.map(|url| Url::parse(url).unwrap()),
            session_id: "ad-session-1".to_string(),
        });
    }
}

pub fn vod(id: &str) -> VideoDescriptor {
    VideoDescriptor::new(id, 100_000_000)
}

pub fn live_with_ads(id: &str) -> VideoDescriptor {
    VideoDescriptor::live(id).with_ads(None)
}

pub fn avail(id: &str) -> Avail {
    Avail {
        avail_id: id.to_string(),
        start_time_micros: 30_000_000,
        duration_micros: 15_000_000,
        ads: Vec::new(),
    }
}
