//! Playhead Core - playback session library
//!
//! This crate owns the event and state logic of a single video playback
//! session:
//! - Backend selection (local engine or cast receiver)
//! - Classification of raw engine and ad-SDK signals into canonical
//!   tracking events
//! - Per-video resume positions
//! - Avail polling for live streams with server-side ad insertion
//! - Playlist advancement
//!
//! Rendering, cast transport, ad-SDK internals and storage are collaborators
//! behind the traits in [`collaborators`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Playhead Core                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  engine / ad-SDK signals          background timer task         │
//! │           │                                │                    │
//! │           ▼                                ▼                    │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │  Classifier  │──▶│   Session    │◀──│    Avail     │         │
//! │  │  (pure)      │   │  Controller  │   │  Scheduler   │         │
//! │  └──────────────┘   └──────┬───────┘   └──────────────┘         │
//! │                            │                                    │
//! │          ┌─────────────────┼─────────────────┐                  │
//! │          ▼                 ▼                 ▼                  │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Playlist   │  │   Position   │  │   Tracking   │           │
//! │  │   Advance    │  │    Store     │  │     Sink     │           │
//! │  └──────────────┘  └──────────────┘  └──────────────┘           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod actor;
pub mod classifier;
pub mod collaborators;
pub mod error;
pub mod playlist;
pub mod positions;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod tracking;
pub mod types;

pub use actor::{SessionCommand, SessionHandle};
pub use classifier::{classify, AdSdkSignal, Classification, EngineSignal, PlayerFault, RawSignal};
pub use collaborators::{
    AvailProvider, ChromeController, Collaborators, EngineFactory, ErrorListener, ManifestResolver,
    PlaybackEngine,
};
pub use error::{Error, ErrorKind, PlaybackError, Result};
pub use playlist::{Playlist, PlaylistState};
pub use positions::PositionStore;
pub use scheduler::{AvailScheduler, Handoff};
pub use session::SessionController;
pub use state::{PlaybackPhase, SessionState};
pub use tracking::{
    AdPosition, TrackingEmitter, TrackingEvent, TrackingEventKind, TrackingPayload, TrackingRecord,
    TrackingSink, WatchedMilestone,
};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version once at startup
pub fn init() {
    tracing::info!(version = VERSION, "Playhead Core initialized");
}
