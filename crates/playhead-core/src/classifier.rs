//! Ad & tracking classification
//!
//! Pure translation from raw engine / ad-SDK signals into canonical
//! [`TrackingEvent`]s plus the [`StateDelta`] the session controller must
//! apply. Nothing in here performs I/O or touches shared state.
//!
//! Two ad-position rules coexist and are deliberately kept apart:
//! - engine-native signals carry a playback percentage
//!   ([`AdPosition::from_start_percent`], [`AdPosition::from_completion_percent`])
//! - the ad-rendering SDK supplies an ordinal ad type
//!   ([`AdPosition::from_ordinal`])

use crate::error::{ErrorKind, PlaybackError};
use crate::state::{PlaybackPhase, SessionState};
use crate::tracking::{AdPosition, TrackingEvent, TrackingEventKind, TrackingPayload, WatchedMilestone};
use crate::types::{AdMetadata, VideoDescriptor};
use serde::{Deserialize, Serialize};

/// Start percentage at and above which an engine-native ad counts as post-roll
pub const POSTROLL_START_PERCENT: u8 = 90;

/// Completion percentage of an engine-native post-roll
pub const POSTROLL_COMPLETE_PERCENT: u8 = 100;

impl AdPosition {
    /// Engine-native rule for ad starts
    pub fn from_start_percent(percent: u8) -> Self {
        match percent {
            0 => AdPosition::Preroll,
            p if p < POSTROLL_START_PERCENT => AdPosition::Midroll,
            _ => AdPosition::Postroll,
        }
    }

    /// Engine-native rule for ad completions
    pub fn from_completion_percent(percent: u8) -> Self {
        match percent {
            0 => AdPosition::Preroll,
            POSTROLL_COMPLETE_PERCENT => AdPosition::Postroll,
            _ => AdPosition::Midroll,
        }
    }

    /// Ad-SDK ordinal rule
    pub fn from_ordinal(ad_type: i32) -> Self {
        match ad_type {
            0 => AdPosition::Preroll,
            t if t > 0 => AdPosition::Midroll,
            _ => AdPosition::Postroll,
        }
    }
}

impl WatchedMilestone {
    /// Bucket a raw watched percentage
    pub fn from_percent(percent: u8) -> Option<Self> {
        match percent {
            25 => Some(WatchedMilestone::Quarter),
            50 => Some(WatchedMilestone::Half),
            75 => Some(WatchedMilestone::ThreeQuarters),
            _ => None,
        }
    }
}

/// Failure reported by a playback engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fault", content = "message", rename_all = "snake_case")]
pub enum PlayerFault {
    BehindLiveWindow,
    Source(String),
    Renderer(String),
    Unexpected(String),
}

/// Map an engine fault onto the stable error classification
pub fn classify_fault(fault: &PlayerFault) -> PlaybackError {
    match fault {
        PlayerFault::BehindLiveWindow => {
            PlaybackError::new(ErrorKind::BehindLiveWindow, "playback fell behind the live window")
        }
        PlayerFault::Source(message) => PlaybackError::new(ErrorKind::SourceUnavailable, message.clone()),
        PlayerFault::Renderer(message) | PlayerFault::Unexpected(message) => {
            PlaybackError::new(ErrorKind::EngineFatal, message.clone())
        }
    }
}

/// Signals emitted by the playback engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineSignal {
    PlayStarted { position_micros: i64 },
    Paused { position_micros: i64 },
    Resumed { position_micros: i64 },
    Seeked { from_micros: i64, to_micros: i64 },
    PercentWatched { percent: u8 },
    AdStarted { percent: u8 },
    AdCompleted { percent: u8 },
    /// Playback of the current video finished or was stopped
    PlayCompleted {
        #[serde(default)]
        position_micros: Option<i64>,
    },
    /// Terminal end-of-content for the current video
    ContentEnded,
    Fault(PlayerFault),
}

/// Signals emitted by the ad-rendering SDK
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdSdkSignal {
    AdStarted {
        ad_type: i32,
        #[serde(default)]
        ad: AdMetadata,
    },
    AdCompleted {
        ad_type: i32,
        #[serde(default)]
        ad: AdMetadata,
    },
    AdPaused {
        #[serde(default)]
        ad: AdMetadata,
    },
    AdResumed {
        #[serde(default)]
        ad: AdMetadata,
    },
    AdSkipped {
        #[serde(default)]
        ad: AdMetadata,
    },
    AdClicked {
        #[serde(default)]
        ad: AdMetadata,
    },
    BreakEnded,
}

/// Any raw signal delivered to the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "signal", rename_all = "snake_case")]
pub enum RawSignal {
    Engine(EngineSignal),
    AdSdk(AdSdkSignal),
}

/// Position table change requested by a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionUpdate {
    Record(i64),
    Clear,
}

/// Avail timer change requested by a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Start,
    Stop,
}

/// Changes the session controller applies after classifying a signal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDelta {
    pub phase: Option<PlaybackPhase>,
    pub play_started: Option<bool>,
    pub first_ad_completed: Option<bool>,
    pub position: Option<PositionUpdate>,
    pub timer: Option<TimerAction>,
    /// Hand control to the playlist state machine
    pub advance_playlist: bool,
    /// Surface a classified engine failure
    pub fault: Option<PlaybackError>,
}

impl StateDelta {
    fn phase(phase: PlaybackPhase) -> Self {
        Self {
            phase: Some(phase),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == StateDelta::default()
    }
}

/// Outcome of classifying a single raw signal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub event: Option<TrackingEvent>,
    pub delta: StateDelta,
}

impl Classification {
    fn new(event: Option<TrackingEvent>, delta: StateDelta) -> Self {
        Self { event, delta }
    }

    fn ignored() -> Self {
        Self::default()
    }
}

/// Snapshot of everything classification depends on
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext<'a> {
    pub state: &'a SessionState,
    pub video: &'a VideoDescriptor,
    /// Ad tracking metadata (a tracking URL) is known for the current video
    pub has_tracking_url: bool,
}

/// Classify a raw signal against the current session snapshot
pub fn classify(signal: &RawSignal, ctx: &ClassifyContext<'_>) -> Classification {
    match signal {
        RawSignal::Engine(signal) => classify_engine(signal, ctx),
        RawSignal::AdSdk(signal) => classify_ad_sdk(signal, ctx),
    }
}

fn classify_engine(signal: &EngineSignal, ctx: &ClassifyContext<'_>) -> Classification {
    let video = ctx.video;
    let id = video.id();

    match *signal {
        // Only the first start after an initial or completed state counts
        EngineSignal::PlayStarted { .. } if ctx.state.play_started() => Classification::ignored(),
        EngineSignal::PlayStarted { position_micros } => Classification::new(
            Some(TrackingEvent::playback(
                id,
                TrackingEventKind::PlayStarted,
                position_micros,
                video.percent_at(position_micros),
            )),
            StateDelta {
                phase: Some(PlaybackPhase::Playing),
                play_started: Some(true),
                timer: ctx.has_tracking_url.then_some(TimerAction::Start),
                ..Default::default()
            },
        ),
        EngineSignal::Paused { position_micros } => Classification::new(
            Some(TrackingEvent::playback(
                id,
                TrackingEventKind::PlayPaused,
                position_micros,
                video.percent_at(position_micros),
            )),
            StateDelta {
                phase: Some(PlaybackPhase::Paused),
                position: Some(PositionUpdate::Record(position_micros)),
                ..Default::default()
            },
        ),
        EngineSignal::Resumed { position_micros } => Classification::new(
            Some(TrackingEvent::playback(
                id,
                TrackingEventKind::PlayResumed,
                position_micros,
                video.percent_at(position_micros),
            )),
            StateDelta::phase(PlaybackPhase::Playing),
        ),
        EngineSignal::Seeked { from_micros, to_micros } => Classification::new(
            Some(TrackingEvent::new(
                id,
                TrackingEventKind::Seeked,
                TrackingPayload::Seek { from_micros, to_micros },
            )),
            StateDelta::default(),
        ),
        EngineSignal::PercentWatched { percent } => {
            match (video.is_live(), WatchedMilestone::from_percent(percent)) {
                (false, Some(milestone)) => Classification::new(
                    Some(TrackingEvent::new(
                        id,
                        TrackingEventKind::Watched(milestone),
                        TrackingPayload::Percent { percent },
                    )),
                    StateDelta::default(),
                ),
                _ => Classification::ignored(),
            }
        }
        EngineSignal::AdStarted { percent } => Classification::new(
            Some(TrackingEvent::new(
                id,
                TrackingEventKind::AdStarted(AdPosition::from_start_percent(percent)),
                TrackingPayload::Percent { percent },
            )),
            StateDelta::phase(PlaybackPhase::AdBreak { paused: false }),
        ),
        EngineSignal::AdCompleted { percent } => {
            let position = AdPosition::from_completion_percent(percent);
            let phase = match position {
                AdPosition::Postroll => PlaybackPhase::Ended,
                _ => PlaybackPhase::Playing,
            };
            Classification::new(
                Some(TrackingEvent::new(
                    id,
                    TrackingEventKind::AdCompleted(position),
                    TrackingPayload::Percent { percent },
                )),
                StateDelta {
                    phase: Some(phase),
                    first_ad_completed: Some(true),
                    ..Default::default()
                },
            )
        }
        EngineSignal::PlayCompleted { position_micros } => {
            let reported = position_micros.unwrap_or(0);
            Classification::new(
                Some(TrackingEvent::playback(
                    id,
                    TrackingEventKind::PlayCompleted,
                    reported,
                    video.percent_at(reported),
                )),
                StateDelta {
                    phase: Some(PlaybackPhase::Ended),
                    play_started: Some(false),
                    position: position_micros.map(PositionUpdate::Record),
                    timer: Some(TimerAction::Stop),
                    ..Default::default()
                },
            )
        }
        EngineSignal::ContentEnded => Classification::new(
            None,
            StateDelta {
                phase: Some(PlaybackPhase::Ended),
                play_started: Some(false),
                timer: Some(TimerAction::Stop),
                advance_playlist: true,
                ..Default::default()
            },
        ),
        EngineSignal::Fault(ref fault) => {
            let error = classify_fault(fault);
            // Recoverable discontinuities are informational only
            let event = error.kind.is_recoverable().then(|| {
                TrackingEvent::new(
                    id,
                    TrackingEventKind::StreamRecovered,
                    TrackingPayload::Info {
                        message: error.message.clone(),
                    },
                )
            });
            Classification::new(
                event,
                StateDelta {
                    fault: Some(error),
                    ..Default::default()
                },
            )
        }
    }
}

fn classify_ad_sdk(signal: &AdSdkSignal, ctx: &ClassifyContext<'_>) -> Classification {
    let id = ctx.video.id();
    let ad_event = |kind: TrackingEventKind, ad: &AdMetadata| {
        Some(TrackingEvent::new(id, kind, TrackingPayload::Ad { ad: ad.clone() }))
    };

    match signal {
        AdSdkSignal::AdStarted { ad_type, ad } => Classification::new(
            ad_event(TrackingEventKind::AdStarted(AdPosition::from_ordinal(*ad_type)), ad),
            StateDelta::phase(PlaybackPhase::AdBreak { paused: false }),
        ),
        AdSdkSignal::AdCompleted { ad_type, ad } => Classification::new(
            ad_event(TrackingEventKind::AdCompleted(AdPosition::from_ordinal(*ad_type)), ad),
            StateDelta {
                first_ad_completed: (!ctx.state.first_ad_completed()).then_some(true),
                ..Default::default()
            },
        ),
        AdSdkSignal::AdPaused { ad } if ctx.state.ad_playing() && !ctx.state.ad_paused() => {
            Classification::new(
                ad_event(TrackingEventKind::AdPaused, ad),
                StateDelta::phase(PlaybackPhase::AdBreak { paused: true }),
            )
        }
        AdSdkSignal::AdResumed { ad } if ctx.state.ad_paused() => Classification::new(
            ad_event(TrackingEventKind::AdResumed, ad),
            StateDelta::phase(PlaybackPhase::AdBreak { paused: false }),
        ),
        AdSdkSignal::AdPaused { .. } | AdSdkSignal::AdResumed { .. } => Classification::ignored(),
        AdSdkSignal::AdSkipped { ad } => {
            Classification::new(ad_event(TrackingEventKind::AdSkipped, ad), StateDelta::default())
        }
        AdSdkSignal::AdClicked { ad } => {
            Classification::new(ad_event(TrackingEventKind::AdClicked, ad), StateDelta::default())
        }
        AdSdkSignal::BreakEnded => Classification::new(
            Some(TrackingEvent::new(id, TrackingEventKind::AdBreakEnded, TrackingPayload::None)),
            StateDelta::phase(PlaybackPhase::Playing),
        ),
    }
}
