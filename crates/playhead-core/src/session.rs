//! Session Controller - owner of a single logical playback session
//!
//! Coordinates:
//! - Playlist and current video
//! - Backend engine selection (local or cast), one live engine at most
//! - Saved resume positions
//! - Classification of raw engine / ad-SDK signals
//! - Avail polling for live ad-enabled streams
//!
//! All methods take `&mut self` and are meant to run on a single task; the
//! avail timer and fetches reach the controller only through [`Handoff`]
//! messages drained by [`SessionController::next_handoff`].

use crate::{
    classifier::{classify, ClassifyContext, PositionUpdate, RawSignal, StateDelta, TimerAction},
    collaborators::{Collaborators, PlaybackEngine},
    error::{ErrorKind, PlaybackError},
    playlist::{Playlist, PlaylistState},
    positions::PositionStore,
    scheduler::{AvailScheduler, Handoff},
    state::{PlaybackPhase, SessionState},
    tracking::{TrackingEvent, TrackingEventKind, TrackingPayload},
    types::*,
    Error, Result,
};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Controller for one playback session
pub struct SessionController {
    /// Unique session ID
    id: SessionId,
    /// Session configuration; required before initialization
    config: Option<SessionConfig>,
    /// External components
    collaborators: Collaborators,
    /// Lifecycle state
    state: SessionState,
    /// Loaded videos
    playlist: Option<Playlist>,
    /// Saved resume positions
    positions: PositionStore,
    /// Ad session of the current video
    ad_session: Option<AdSessionData>,
    /// The single live engine instance
    engine: Option<Box<dyn PlaybackEngine>>,
    /// Release requested while in Picture-in-Picture
    release_pending: bool,
    /// Avail polling timer
    scheduler: AvailScheduler,
    /// Messages from background tasks
    handoff_rx: mpsc::UnboundedReceiver<Handoff>,
}

impl SessionController {
    /// Create an unconfigured session
    pub fn new(collaborators: Collaborators) -> Self {
        let (handoff_tx, handoff_rx) = mpsc::unbounded_channel();
        Self {
            id: SessionId::new(),
            config: None,
            collaborators,
            state: SessionState::new(),
            playlist: None,
            positions: PositionStore::new(),
            ad_session: None,
            engine: None,
            release_pending: false,
            scheduler: AvailScheduler::new(handoff_tx, DEFAULT_AVAIL_POLL_PERIOD),
            handoff_rx,
        }
    }

    /// Create a session and apply a configuration
    pub fn with_config(collaborators: Collaborators, config: SessionConfig) -> Result<Self> {
        let mut session = Self::new(collaborators);
        session.configure(config)?;
        Ok(session)
    }

    /// Get session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Apply engine capabilities and ad policy
    pub fn configure(&mut self, config: SessionConfig) -> Result<()> {
        config.validate()?;
        // A running timer keeps polling, now on the new period
        self.scheduler.set_standard_period(config.avail_poll_period());
        info!(session_id = %self.id, ads = config.ads_enabled, cast = config.cast_enabled, "Session configured");
        self.config = Some(config);
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn backend(&self) -> PlaybackBackend {
        self.state.backend()
    }

    pub fn playlist(&self) -> Option<&Playlist> {
        self.playlist.as_ref()
    }

    pub fn current_video(&self) -> Option<&VideoDescriptor> {
        self.playlist.as_ref().map(Playlist::current)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.playlist.as_ref().map(Playlist::current_index)
    }

    pub fn ad_session(&self) -> Option<&AdSessionData> {
        self.ad_session.as_ref()
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// An engine is loaded and no release is pending
    pub fn is_active(&self) -> bool {
        self.engine.is_some() && !self.release_pending
    }

    pub fn is_polling_avails(&self) -> bool {
        self.scheduler.is_running()
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Replace the session with a single video
    pub async fn init_single(&mut self, video: VideoDescriptor) -> Result<()> {
        self.init_playlist(vec![video]).await
    }

    /// Replace the session with a playlist
    #[instrument(skip(self, videos), fields(session_id = %self.id, count = videos.len()))]
    pub async fn init_playlist(&mut self, videos: Vec<VideoDescriptor>) -> Result<()> {
        let config = self.config.clone().ok_or(Error::NotConfigured)?;
        let playlist = Playlist::new(videos)?;

        self.teardown_current();
        self.playlist = Some(playlist);
        self.load_current(&config).await?;

        info!(
            video_id = self.current_video().map(VideoDescriptor::id).unwrap_or_default(),
            backend = %self.state.backend(),
            "Session initialized"
        );
        Ok(())
    }

    /// Replace the session with a playlist, assigning one ad tag per video
    pub async fn init_playlist_with_ads(
        &mut self,
        videos: Vec<VideoDescriptor>,
        ad_urls: Vec<String>,
    ) -> Result<()> {
        if ad_urls.len() < videos.len() {
            return Err(Error::AdCountMismatch {
                videos: videos.len(),
                ads: ad_urls.len(),
            });
        }
        let videos = videos
            .into_iter()
            .zip(ad_urls)
            .map(|(video, ad_url)| video.with_ads(Some(ad_url)))
            .collect();
        self.init_playlist(videos).await
    }

    /// Append a video to the live playlist
    pub fn add_video(&mut self, video: VideoDescriptor) -> Result<()> {
        if !self.is_active() {
            return Err(Error::SessionNotInitialized);
        }
        let playlist = self.playlist.as_mut().ok_or(Error::SessionNotInitialized)?;
        playlist.push(video);
        Ok(())
    }

    /// Stop polling, reset playback state and drop the previous engine
    /// unless it is on screen in Picture-in-Picture.
    fn teardown_current(&mut self) {
        self.scheduler.stop();
        if self.state.is_in_picture_in_picture() {
            if self.engine.is_some() {
                debug!("In Picture-in-Picture, reusing the live engine");
            }
            self.release_pending = false;
        } else {
            self.release_engine();
        }
        self.state.reset_playback();
        self.ad_session = None;
    }

    /// Resolve ads for the current video and load it into the engine
    async fn load_current(&mut self, config: &SessionConfig) -> Result<()> {
        let index = self.current_index().ok_or(Error::SessionNotInitialized)?;
        self.resolve_ad_session(config, index).await;

        let video = self
            .current_video()
            .cloned()
            .ok_or(Error::SessionNotInitialized)?;
        let start = self.start_position_for(config, &video);

        if self.engine.is_none() {
            self.engine = Some(self.collaborators.engines.create(self.state.backend())?);
        }
        if let Some(engine) = self.engine.as_mut() {
            engine.load(&video, start);
        }
        self.state.transition(PlaybackPhase::Ready);

        debug!(video_id = video.id(), start_position_micros = start, "Video loaded");
        Ok(())
    }

    /// Fetch the ad session of a live ad-enabled video and adopt its
    /// stitched manifest URL as the video id.
    async fn resolve_ad_session(&mut self, config: &SessionConfig, index: usize) {
        let Some(video) = self.playlist.as_ref().and_then(|p| p.get(index)).cloned() else {
            return;
        };

        self.ad_session = None;
        if !(video.is_live() && video.should_play_ads() && config.ads_enabled) {
            return;
        }

        let Some(data) = self.collaborators.manifests.resolve_manifest(&video).await else {
            debug!(video_id = video.id(), "No ad session resolved");
            return;
        };

        if let Some(manifest_url) = data.manifest_url.as_ref() {
            if let Some(video) = self.playlist.as_mut().and_then(|p| p.get_mut(index)) {
                info!(from = video.id(), to = %manifest_url, "Using stitched manifest");
                video.rewrite_id(manifest_url.as_str());
            }
        }
        info!(
            ad_session_id = %data.session_id,
            tracked = data.tracking_url.is_some(),
            "Ad session resolved"
        );
        self.ad_session = Some(data);
    }

    /// Saved position wins over the video's own start position
    fn start_position_for(&self, config: &SessionConfig, video: &VideoDescriptor) -> i64 {
        if config.resume_saved_positions {
            if let Some(saved) = self.positions.get(video.id()) {
                return saved;
            }
        }
        video.start_position_micros()
    }

    // =========================================================================
    // Playback control
    // =========================================================================

    fn engine_mut(&mut self) -> Result<&mut Box<dyn PlaybackEngine>> {
        if self.release_pending {
            return Err(Error::SessionNotInitialized);
        }
        self.engine.as_mut().ok_or(Error::SessionNotInitialized)
    }

    /// Start or resume playback
    pub fn play(&mut self) -> Result<()> {
        self.engine_mut()?.play();
        Ok(())
    }

    /// Pause playback, saving the current position
    pub fn pause(&mut self) -> Result<()> {
        self.save_engine_position()?;
        self.engine_mut()?.pause();
        Ok(())
    }

    pub fn seek_to(&mut self, position_micros: i64) -> Result<()> {
        self.engine_mut()?.seek_to(position_micros);
        Ok(())
    }

    /// Host went to the background: save the position and pause
    pub fn on_background(&mut self) -> Result<()> {
        self.pause()
    }

    pub fn set_sticky(&mut self, sticky: bool) -> Result<()> {
        if !self.is_active() {
            return Err(Error::SessionNotInitialized);
        }
        self.state.set_sticky(sticky);
        Ok(())
    }

    fn save_engine_position(&mut self) -> Result<()> {
        let position = self
            .engine
            .as_ref()
            .ok_or(Error::SessionNotInitialized)?
            .position_micros();
        if let Some(id) = self.current_video().map(|v| v.id().to_string()) {
            self.positions.record(&id, position);
        }
        Ok(())
    }

    /// Move playback to another backend, resuming at the current position
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn switch_backend(&mut self, target: PlaybackBackend) -> Result<()> {
        let config = self.config.as_ref().ok_or(Error::NotConfigured)?;
        if target == PlaybackBackend::Cast && !config.cast_enabled {
            return Err(Error::BackendUnavailable(target));
        }
        if target == self.state.backend() {
            return Ok(());
        }
        if !self.is_active() {
            return Err(Error::SessionNotInitialized);
        }

        let position = self
            .engine
            .as_ref()
            .ok_or(Error::SessionNotInitialized)?
            .position_micros();
        let video = self
            .current_video()
            .cloned()
            .ok_or(Error::SessionNotInitialized)?;
        let was_playing = self.state.is_playing();

        self.positions.record(video.id(), position);
        // Release first so two engines never coexist
        self.release_engine();
        let mut engine = self.collaborators.engines.create(target)?;
        engine.load(&video, position);
        if was_playing {
            engine.play();
        }
        self.engine = Some(engine);

        info!(from = %self.state.backend(), to = %target, position_micros = position, "Backend switched");
        self.state.set_backend(target);
        Ok(())
    }

    pub fn switch_to_cast(&mut self) -> Result<()> {
        self.switch_backend(PlaybackBackend::Cast)
    }

    pub fn switch_to_local(&mut self) -> Result<()> {
        self.switch_backend(PlaybackBackend::Local)
    }

    /// Tear the session down. Repeated calls are no-ops.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn release(&mut self) {
        self.scheduler.stop();
        self.state.reset_playback();
        self.ad_session = None;

        if self.engine.is_none() {
            return;
        }
        if self.state.is_in_picture_in_picture() {
            if !self.release_pending {
                info!("In Picture-in-Picture, deferring engine release");
            }
            self.release_pending = true;
        } else {
            self.release_engine();
        }
    }

    fn release_engine(&mut self) {
        self.release_pending = false;
        if let Some(mut engine) = self.engine.take() {
            engine.release();
            info!(backend = %self.state.backend(), "Engine released");
        }
    }

    // =========================================================================
    // Picture-in-Picture
    // =========================================================================

    pub fn enter_picture_in_picture(&mut self) {
        self.state.set_picture_in_picture(true);
        let hide_chrome = self.config.as_ref().map_or(true, |c| c.hide_chrome_in_pip);
        if hide_chrome {
            self.collaborators.chrome.toggle_chrome(false);
        }
        debug!("Entered Picture-in-Picture");
    }

    pub fn exit_picture_in_picture(&mut self) {
        self.state.set_picture_in_picture(false);
        self.collaborators.chrome.toggle_chrome(true);
        if self.release_pending {
            self.release_engine();
        }
        debug!("Exited Picture-in-Picture");
    }

    // =========================================================================
    // Saved positions
    // =========================================================================

    pub fn record_position(&mut self, id: &str, position_micros: i64) {
        self.positions.record(id, position_micros);
    }

    pub fn clear_position(&mut self, id: &str) {
        self.positions.clear(id);
    }

    pub fn read_position(&self, id: &str) -> i64 {
        self.positions.read(id)
    }

    // =========================================================================
    // Signals
    // =========================================================================

    /// Classify a raw signal and apply the result
    pub async fn handle_signal(&mut self, signal: RawSignal) {
        if !self.is_active() {
            debug!(?signal, "Signal for a released session ignored");
            return;
        }
        let Some(video) = self.current_video() else {
            debug!(?signal, "Signal without a loaded video ignored");
            return;
        };

        let has_tracking_url = self
            .ad_session
            .as_ref()
            .is_some_and(|data| data.tracking_url.is_some());
        let classification = classify(
            &signal,
            &ClassifyContext {
                state: &self.state,
                video,
                has_tracking_url,
            },
        );

        if let Some(event) = classification.event {
            self.emit(event);
        }
        self.apply_delta(classification.delta).await;
    }

    async fn apply_delta(&mut self, delta: StateDelta) {
        if let Some(phase) = delta.phase {
            self.state.transition(phase);
        }
        if let Some(started) = delta.play_started {
            self.state.set_play_started(started);
        }
        if let Some(completed) = delta.first_ad_completed {
            self.state.set_first_ad_completed(completed);
        }
        if let Some(update) = delta.position {
            if let Some(id) = self.current_video().map(|v| v.id().to_string()) {
                match update {
                    PositionUpdate::Record(position) => self.positions.record(&id, position),
                    PositionUpdate::Clear => self.positions.clear(&id),
                }
            }
        }
        match delta.timer {
            Some(TimerAction::Start) => self.scheduler.start_standard(),
            Some(TimerAction::Stop) => self.scheduler.stop(),
            None => {}
        }
        if let Some(error) = delta.fault {
            self.handle_fault(error);
        }
        if delta.advance_playlist {
            self.advance_playlist().await;
        }
    }

    fn handle_fault(&mut self, error: PlaybackError) {
        match error.kind {
            ErrorKind::BehindLiveWindow => {
                info!(message = %error.message, "Recovering from stream discontinuity");
                if let Some(engine) = self.engine.as_mut() {
                    engine.seek_to_default_position();
                    engine.prepare();
                }
            }
            ErrorKind::SourceUnavailable | ErrorKind::EngineFatal => {
                warn!(code = error.code(), message = %error.message, "Playback error");
                self.collaborators.chrome.show_error_overlay(&error.message);
                self.collaborators.errors.on_error(&error);
            }
        }
    }

    /// Move past the video that just ended
    async fn advance_playlist(&mut self) {
        let Some(config) = self.config.clone() else {
            return;
        };
        let Some(next) = self.playlist.as_ref().and_then(Playlist::peek_next) else {
            self.finish_playlist();
            return;
        };

        // The next video's ad session replaces the finished one's
        self.resolve_ad_session(&config, next).await;

        let Some(playlist) = self.playlist.as_mut() else {
            return;
        };
        let advancement = playlist.advance(&mut self.positions);
        let video = playlist.current().clone();
        for event in advancement.events {
            self.emit(event);
        }

        if let Some(engine) = self.engine.as_mut() {
            engine.load(&video, 0);
            engine.play();
        }
        self.state.transition(PlaybackPhase::Ready);
        self.state.transition(PlaybackPhase::Playing);
        self.state.set_play_started(true);
        if self
            .ad_session
            .as_ref()
            .is_some_and(|data| data.tracking_url.is_some())
        {
            self.scheduler.start_standard();
        }
    }

    fn finish_playlist(&mut self) {
        let Some(playlist) = self.playlist.as_mut() else {
            return;
        };
        if playlist.state() == PlaylistState::EndedTerminal {
            debug!("Playlist already finished");
            return;
        }
        let advancement = playlist.advance(&mut self.positions);
        for event in advancement.events {
            self.emit(event);
        }
    }

    fn emit(&self, event: TrackingEvent) {
        self.collaborators.tracking.emit(event);
    }

    // =========================================================================
    // Background handoffs
    // =========================================================================

    /// Wait for the next message from the avail timer or a fetch task
    pub async fn next_handoff(&mut self) -> Option<Handoff> {
        self.handoff_rx.recv().await
    }

    /// Process every handoff already queued, returning how many were handled
    pub fn drain_handoffs(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(handoff) = self.handoff_rx.try_recv() {
            self.handle_handoff(handoff);
            handled += 1;
        }
        handled
    }

    /// Apply a background message on the session task
    pub fn handle_handoff(&mut self, handoff: Handoff) {
        match handoff {
            Handoff::Tick { generation } => {
                if !self.scheduler.accepts(generation) {
                    debug!(generation, "Stale avail tick dropped");
                    return;
                }
                let Some(tracking_url) = self
                    .ad_session
                    .as_ref()
                    .and_then(|data| data.tracking_url.clone())
                else {
                    debug!("No ad tracking metadata, skipping avail poll");
                    return;
                };
                self.scheduler.fetch_in_background(
                    self.collaborators.avails.clone(),
                    tracking_url,
                    generation,
                );
            }
            Handoff::AvailsFetched { generation, avails } => {
                if !self.scheduler.accepts(generation) {
                    debug!(generation, "Avails from a stopped timer dropped");
                    return;
                }
                if avails.is_empty() {
                    return;
                }
                let Some(video_id) = self.current_video().map(|v| v.id().to_string()) else {
                    return;
                };
                let timeline_position_micros = self
                    .engine
                    .as_ref()
                    .map_or(NO_POSITION, |engine| engine.position_micros());

                info!(count = avails.len(), timeline_position_micros, "Avails received");
                self.emit(TrackingEvent::new(
                    video_id,
                    TrackingEventKind::AvailsReceived,
                    TrackingPayload::Avails {
                        avails,
                        timeline_position_micros,
                    },
                ));
                self.scheduler.start_standard();
            }
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.scheduler.stop();
        // PiP deferral does not outlive the controller
        self.release_engine();
    }
}
