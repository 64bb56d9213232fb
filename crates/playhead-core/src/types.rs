//! Core types for Playhead

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Sentinel position meaning "unknown / reset"
pub const NO_POSITION: i64 = i64::MIN;

/// Fallback avail polling period used when a caller passes a non-positive value
pub const DEFAULT_AVAIL_POLL_PERIOD: Duration = Duration::from_millis(18_000);

/// Unique identifier for a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed caption preference for a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CcMode {
    #[default]
    Default,
    On,
    Off,
}

/// Engine family that renders the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackBackend {
    /// On-device playback engine
    #[default]
    Local,
    /// Remote cast receiver
    Cast,
}

impl std::fmt::Display for PlaybackBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackBackend::Local => write!(f, "local"),
            PlaybackBackend::Cast => write!(f, "cast"),
        }
    }
}

/// Immutable description of a single playable video.
///
/// Only the id can change after construction: it is rewritten to the
/// stitched manifest URL when server-side ad insertion is in use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    id: String,
    #[serde(default)]
    duration_micros: i64,
    #[serde(default)]
    is_live: bool,
    #[serde(default)]
    start_position_micros: i64,
    #[serde(default)]
    ad_tag_url: Option<String>,
    #[serde(default)]
    should_play_ads: bool,
    #[serde(default)]
    cc_mode: CcMode,
}

impl VideoDescriptor {
    /// Create an on-demand video with the given playable URL and duration
    pub fn new(id: impl Into<String>, duration_micros: i64) -> Self {
        Self {
            id: id.into(),
            duration_micros,
            is_live: false,
            start_position_micros: 0,
            ad_tag_url: None,
            should_play_ads: false,
            cc_mode: CcMode::Default,
        }
    }

    /// Create a live stream descriptor
    pub fn live(id: impl Into<String>) -> Self {
        Self {
            is_live: true,
            ..Self::new(id, 0)
        }
    }

    pub fn with_start_position(mut self, position_micros: i64) -> Self {
        self.start_position_micros = position_micros;
        self
    }

    /// Enable ads, optionally with a client-side ad tag
    pub fn with_ads(mut self, ad_tag_url: Option<String>) -> Self {
        self.should_play_ads = true;
        self.ad_tag_url = ad_tag_url;
        self
    }

    pub fn with_cc_mode(mut self, cc_mode: CcMode) -> Self {
        self.cc_mode = cc_mode;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn duration_micros(&self) -> i64 {
        self.duration_micros
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub fn start_position_micros(&self) -> i64 {
        self.start_position_micros
    }

    pub fn ad_tag_url(&self) -> Option<&str> {
        self.ad_tag_url.as_deref()
    }

    pub fn should_play_ads(&self) -> bool {
        self.should_play_ads
    }

    pub fn cc_mode(&self) -> CcMode {
        self.cc_mode
    }

    /// Percentage of the video covered by `position_micros`, clamped to 0..=100
    pub fn percent_at(&self, position_micros: i64) -> u8 {
        if self.is_live || self.duration_micros <= 0 || position_micros <= 0 {
            return 0;
        }
        let percent = position_micros.saturating_mul(100) / self.duration_micros;
        percent.clamp(0, 100) as u8
    }

    pub(crate) fn rewrite_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }
}

/// Per-ad-break data resolved for a live ad-enabled stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdSessionData {
    /// Stitched manifest URL replacing the original stream URL
    pub manifest_url: Option<Url>,
    /// Endpoint polled for scheduled avails
    pub tracking_url: Option<Url>,
    /// Ad-decisioning session identifier
    pub session_id: String,
}

/// A scheduled ad-break opportunity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avail {
    pub avail_id: String,
    pub start_time_micros: i64,
    pub duration_micros: i64,
    #[serde(default)]
    pub ads: Vec<AdMetadata>,
}

/// Metadata describing a single ad
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdMetadata {
    pub ad_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub duration_micros: i64,
    #[serde(default)]
    pub creative_id: Option<String>,
}

impl AdMetadata {
    pub fn new(ad_id: impl Into<String>) -> Self {
        Self {
            ad_id: ad_id.into(),
            ..Default::default()
        }
    }
}

/// Session configuration: engine capabilities and ad policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Play ads for videos that request them
    pub ads_enabled: bool,
    /// A cast receiver may be selected as backend
    pub cast_enabled: bool,
    /// Standard avail polling period in milliseconds
    pub avail_poll_period_ms: u64,
    /// Resume videos from their saved positions
    pub resume_saved_positions: bool,
    /// Hide player chrome while in Picture-in-Picture
    pub hide_chrome_in_pip: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ads_enabled: true,
            cast_enabled: false,
            avail_poll_period_ms: DEFAULT_AVAIL_POLL_PERIOD.as_millis() as u64,
            resume_saved_positions: true,
            hide_chrome_in_pip: true,
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.avail_poll_period_ms == 0 {
            return Err(Error::InvalidConfig(
                "avail_poll_period_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn avail_poll_period(&self) -> Duration {
        Duration::from_millis(self.avail_poll_period_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_at() {
        let video = VideoDescriptor::new("https://cdn.example.com/vod.m3u8", 200_000_000);
        assert_eq!(video.percent_at(0), 0);
        assert_eq!(video.percent_at(50_000_000), 25);
        assert_eq!(video.percent_at(200_000_000), 100);
        assert_eq!(video.percent_at(400_000_000), 100);
        assert_eq!(video.percent_at(NO_POSITION), 0);

        let live = VideoDescriptor::live("https://cdn.example.com/live.m3u8");
        assert_eq!(live.percent_at(50_000_000), 0);
    }

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config = SessionConfig::from_json_str(r#"{ "cast_enabled": true }"#).unwrap();
        assert!(config.cast_enabled);
        assert!(config.ads_enabled);
        assert_eq!(config.avail_poll_period(), DEFAULT_AVAIL_POLL_PERIOD);
    }

    #[test]
    fn test_config_rejects_zero_poll_period() {
        let err = SessionConfig::from_json_str(r#"{ "avail_poll_period_ms": 0 }"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_video_descriptor_deserialize() {
        let video: VideoDescriptor = serde_json::from_str(
            r#"{ "id": "https://cdn.example.com/live.m3u8", "is_live": true, "should_play_ads": true, "cc_mode": "on" }"#,
        )
        .unwrap();
        assert!(video.is_live());
        assert!(video.should_play_ads());
        assert_eq!(video.cc_mode(), CcMode::On);
        assert_eq!(video.ad_tag_url(), None);
    }
}
