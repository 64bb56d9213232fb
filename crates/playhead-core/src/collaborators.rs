//! Contracts of the components the session drives but does not own:
//! engines, ad services, tracking and UI.

use crate::error::PlaybackError;
use crate::tracking::TrackingSink;
use crate::types::{AdSessionData, Avail, PlaybackBackend, VideoDescriptor};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// A playback engine instance (local decoder or cast receiver)
pub trait PlaybackEngine: Send {
    /// Load a video, ready to start at the given position
    fn load(&mut self, video: &VideoDescriptor, start_position_micros: i64);

    fn play(&mut self);

    fn pause(&mut self);

    fn stop(&mut self);

    fn seek_to(&mut self, position_micros: i64);

    /// Jump to the default position of a live window
    fn seek_to_default_position(&mut self);

    /// Re-prepare the current source after a recoverable failure
    fn prepare(&mut self);

    /// Free all engine resources. The instance is dropped afterwards.
    fn release(&mut self);

    /// Current playback timeline position
    fn position_micros(&self) -> i64;
}

/// Creates engines for a backend
pub trait EngineFactory: Send + Sync {
    fn create(&self, backend: PlaybackBackend) -> Result<Box<dyn PlaybackEngine>>;
}

/// Resolves stitched manifests for live ad-enabled streams
#[async_trait]
pub trait ManifestResolver: Send + Sync {
    async fn resolve_manifest(&self, video: &VideoDescriptor) -> Option<AdSessionData>;
}

/// Lists the avails scheduled for an ad tracking endpoint
#[async_trait]
pub trait AvailProvider: Send + Sync {
    async fn fetch_avails(&self, tracking_url: &Url) -> Result<Vec<Avail>>;
}

/// Player chrome (controls, overlays)
pub trait ChromeController: Send + Sync {
    fn toggle_chrome(&self, visible: bool);

    fn show_error_overlay(&self, message: &str);
}

/// Receives classified playback failures
pub trait ErrorListener: Send + Sync {
    fn on_error(&self, error: &PlaybackError);
}

/// Resolver for deployments without server-side ad insertion
pub struct NoManifestResolver;

#[async_trait]
impl ManifestResolver for NoManifestResolver {
    async fn resolve_manifest(&self, _video: &VideoDescriptor) -> Option<AdSessionData> {
        None
    }
}

/// Provider that never reports avails
pub struct NoAvailProvider;

#[async_trait]
impl AvailProvider for NoAvailProvider {
    async fn fetch_avails(&self, _tracking_url: &Url) -> Result<Vec<Avail>> {
        Ok(Vec::new())
    }
}

/// Everything a session controller talks to
#[derive(Clone)]
pub struct Collaborators {
    pub engines: Arc<dyn EngineFactory>,
    pub manifests: Arc<dyn ManifestResolver>,
    pub avails: Arc<dyn AvailProvider>,
    pub tracking: Arc<dyn TrackingSink>,
    pub chrome: Arc<dyn ChromeController>,
    pub errors: Arc<dyn ErrorListener>,
}
