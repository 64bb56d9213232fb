//! Canonical tracking events
//!
//! Every raw engine or ad-SDK signal the session understands is reduced to
//! one of the events below before it leaves the core:
//! - Ad lifecycle (pre/mid/post-roll start and completion, pause, skip...)
//! - Content lifecycle (start, pause, resume, completion, seeks)
//! - Watched milestones for on-demand content
//! - Avails discovered while polling live streams

use crate::types::{AdMetadata, Avail, SessionId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Position of an ad relative to the content it interrupts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdPosition {
    Preroll,
    Midroll,
    Postroll,
}

impl std::fmt::Display for AdPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdPosition::Preroll => write!(f, "PREROLL"),
            AdPosition::Midroll => write!(f, "MIDROLL"),
            AdPosition::Postroll => write!(f, "POSTROLL"),
        }
    }
}

/// Watched-percentage milestones for on-demand content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WatchedMilestone {
    Quarter,
    Half,
    ThreeQuarters,
}

impl WatchedMilestone {
    pub fn percent(&self) -> u8 {
        match self {
            WatchedMilestone::Quarter => 25,
            WatchedMilestone::Half => 50,
            WatchedMilestone::ThreeQuarters => 75,
        }
    }
}

/// The closed vocabulary of events handed to the tracking sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum TrackingEventKind {
    AdStarted(AdPosition),
    AdCompleted(AdPosition),
    AdPaused,
    AdResumed,
    AdSkipped,
    AdClicked,
    AdBreakEnded,
    PlayStarted,
    PlayPaused,
    PlayResumed,
    PlayCompleted,
    Seeked,
    Watched(WatchedMilestone),
    StreamRecovered,
    AvailsReceived,
}

impl std::fmt::Display for TrackingEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingEventKind::AdStarted(position) => write!(f, "{}_AD_STARTED", position),
            TrackingEventKind::AdCompleted(position) => write!(f, "{}_AD_COMPLETED", position),
            TrackingEventKind::AdPaused => write!(f, "AD_PAUSED"),
            TrackingEventKind::AdResumed => write!(f, "AD_RESUMED"),
            TrackingEventKind::AdSkipped => write!(f, "AD_SKIPPED"),
            TrackingEventKind::AdClicked => write!(f, "AD_CLICKED"),
            TrackingEventKind::AdBreakEnded => write!(f, "AD_BREAK_ENDED"),
            TrackingEventKind::PlayStarted => write!(f, "PLAY_STARTED"),
            TrackingEventKind::PlayPaused => write!(f, "PLAY_PAUSED"),
            TrackingEventKind::PlayResumed => write!(f, "PLAY_RESUMED"),
            TrackingEventKind::PlayCompleted => write!(f, "PLAY_COMPLETED"),
            TrackingEventKind::Seeked => write!(f, "SEEKED"),
            TrackingEventKind::Watched(milestone) => {
                write!(f, "VIDEO_{}_WATCHED", milestone.percent())
            }
            TrackingEventKind::StreamRecovered => write!(f, "STREAM_RECOVERED"),
            TrackingEventKind::AvailsReceived => write!(f, "AVAILS_RECEIVED"),
        }
    }
}

impl From<TrackingEventKind> for String {
    fn from(kind: TrackingEventKind) -> Self {
        kind.to_string()
    }
}

/// Data carried with a tracking event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "payload", rename_all = "snake_case")]
pub enum TrackingPayload {
    None,
    Playback {
        position_micros: i64,
        percent: u8,
    },
    Percent {
        percent: u8,
    },
    Seek {
        from_micros: i64,
        to_micros: i64,
    },
    Ad {
        ad: AdMetadata,
    },
    Avails {
        avails: Vec<Avail>,
        timeline_position_micros: i64,
    },
    Info {
        message: String,
    },
}

/// A canonical tracking event for one video
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingEvent {
    pub video_id: String,
    pub kind: TrackingEventKind,
    #[serde(flatten)]
    pub payload: TrackingPayload,
}

impl TrackingEvent {
    pub fn new(video_id: impl Into<String>, kind: TrackingEventKind, payload: TrackingPayload) -> Self {
        Self {
            video_id: video_id.into(),
            kind,
            payload,
        }
    }

    pub fn playback(video_id: impl Into<String>, kind: TrackingEventKind, position_micros: i64, percent: u8) -> Self {
        Self::new(
            video_id,
            kind,
            TrackingPayload::Playback {
                position_micros,
                percent,
            },
        )
    }
}

/// Consumer of canonical tracking events.
///
/// Called on the session task; implementations must return quickly.
pub trait TrackingSink: Send + Sync {
    fn emit(&self, event: TrackingEvent);
}

/// Tracking event with delivery metadata
#[derive(Debug, Clone, Serialize)]
pub struct TrackingRecord {
    /// Unique event ID
    pub id: Uuid,
    /// Session ID
    pub session_id: SessionId,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Sequence number
    pub sequence: u64,
    /// The event
    #[serde(flatten)]
    pub event: TrackingEvent,
}

/// Sink that stamps events and forwards them to a channel
pub struct TrackingEmitter {
    session_id: SessionId,
    sequence: AtomicU64,
    event_tx: mpsc::UnboundedSender<TrackingRecord>,
}

impl TrackingEmitter {
    /// Create an emitter and the receiving end of its record channel
    pub fn new(session_id: SessionId) -> (Self, mpsc::UnboundedReceiver<TrackingRecord>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let emitter = Self {
            session_id,
            sequence: AtomicU64::new(0),
            event_tx,
        };
        (emitter, event_rx)
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }
}

impl TrackingSink for TrackingEmitter {
    fn emit(&self, event: TrackingEvent) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let record = TrackingRecord {
            id: Uuid::new_v4(),
            session_id: self.session_id,
            timestamp: Utc::now(),
            sequence,
            event,
        };

        debug!(
            event_id = %record.id,
            sequence,
            kind = %record.event.kind,
            video_id = %record.event.video_id,
            "Tracking event"
        );

        // A dropped receiver only means nobody is listening any more
        let _ = self.event_tx.send(record);
    }
}
