//! Session state
//!
//! The playback lifecycle is a single tagged enum so that combinations such
//! as "ad paused while nothing plays" cannot be expressed. Picture-in-Picture
//! and the sticky flag are orthogonal to it and stored alongside.

use crate::types::PlaybackBackend;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Playback lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PlaybackPhase {
    /// No video loaded
    #[default]
    Idle,
    /// Video loaded into the engine, playback not started
    Ready,
    /// Content is playing
    Playing,
    /// Content paused
    Paused,
    /// An ad break is on screen
    AdBreak { paused: bool },
    /// Current video reached its end
    Ended,
}

impl PlaybackPhase {
    /// Check if transition to target phase is valid
    pub fn can_transition_to(&self, target: PlaybackPhase) -> bool {
        use PlaybackPhase::*;
        matches!(
            (self, target),
            // Release is always allowed
            (_, Idle) |
            // Loading a video
            (Idle, Ready) | (Ready, Ready) | (Playing, Ready) | (Paused, Ready) | (Ended, Ready) |
            // From Ready
            (Ready, Playing) | (Ready, Paused) | (Ready, AdBreak { .. }) |
            // From Playing
            (Playing, Paused) | (Playing, AdBreak { .. }) | (Playing, Ended) |
            // From Paused
            (Paused, Playing) | (Paused, AdBreak { .. }) | (Paused, Ended) |
            // From AdBreak
            (AdBreak { .. }, AdBreak { .. }) | (AdBreak { .. }, Playing) |
            (AdBreak { .. }, Paused) | (AdBreak { .. }, Ended) |
            // From Ended
            (Ended, Playing) | (Ended, AdBreak { .. })
        )
    }
}

impl std::fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackPhase::Idle => write!(f, "idle"),
            PlaybackPhase::Ready => write!(f, "ready"),
            PlaybackPhase::Playing => write!(f, "playing"),
            PlaybackPhase::Paused => write!(f, "paused"),
            PlaybackPhase::AdBreak { paused: false } => write!(f, "ad_playing"),
            PlaybackPhase::AdBreak { paused: true } => write!(f, "ad_paused"),
            PlaybackPhase::Ended => write!(f, "ended"),
        }
    }
}

/// Mutable state of the session, owned by the session controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    phase: PlaybackPhase,
    backend: PlaybackBackend,
    play_started: bool,
    first_ad_completed: bool,
    sticky: bool,
    in_picture_in_picture: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn backend(&self) -> PlaybackBackend {
        self.backend
    }

    /// Content or an ad is actively rendering
    pub fn is_playing(&self) -> bool {
        matches!(
            self.phase,
            PlaybackPhase::Playing | PlaybackPhase::AdBreak { paused: false }
        )
    }

    pub fn ad_playing(&self) -> bool {
        matches!(self.phase, PlaybackPhase::AdBreak { .. })
    }

    pub fn ad_paused(&self) -> bool {
        self.phase == PlaybackPhase::AdBreak { paused: true }
    }

    /// True between a verified play start and a terminal event
    pub fn play_started(&self) -> bool {
        self.play_started
    }

    pub fn first_ad_completed(&self) -> bool {
        self.first_ad_completed
    }

    pub fn is_sticky(&self) -> bool {
        self.sticky
    }

    pub fn is_in_picture_in_picture(&self) -> bool {
        self.in_picture_in_picture
    }

    /// Move to a new phase. Out-of-order signals are ignored rather than
    /// failing, since they come from collaborators outside our control.
    pub fn transition(&mut self, target: PlaybackPhase) -> bool {
        if self.phase == target {
            return true;
        }
        if !self.phase.can_transition_to(target) {
            warn!(from = %self.phase, to = %target, "Ignoring invalid phase transition");
            return false;
        }
        debug!(from = %self.phase, to = %target, "Phase transition");
        self.phase = target;
        true
    }

    pub(crate) fn set_backend(&mut self, backend: PlaybackBackend) {
        self.backend = backend;
    }

    pub(crate) fn set_play_started(&mut self, started: bool) {
        self.play_started = started;
    }

    pub(crate) fn set_first_ad_completed(&mut self, completed: bool) {
        self.first_ad_completed = completed;
    }

    pub(crate) fn set_sticky(&mut self, sticky: bool) {
        self.sticky = sticky;
    }

    pub(crate) fn set_picture_in_picture(&mut self, in_pip: bool) {
        self.in_picture_in_picture = in_pip;
    }

    /// Reset everything except backend and PiP, which outlive a video
    pub(crate) fn reset_playback(&mut self) {
        self.phase = PlaybackPhase::Idle;
        self.play_started = false;
        self.first_ad_completed = false;
        self.sticky = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        use PlaybackPhase::*;

        assert!(Idle.can_transition_to(Ready));
        assert!(Ready.can_transition_to(AdBreak { paused: false }));
        assert!(AdBreak { paused: false }.can_transition_to(AdBreak { paused: true }));
        assert!(AdBreak { paused: true }.can_transition_to(Playing));
        assert!(Playing.can_transition_to(Ended));
        assert!(Ended.can_transition_to(Ready));
        assert!(Playing.can_transition_to(Idle));

        assert!(!Idle.can_transition_to(Playing));
        assert!(!Idle.can_transition_to(AdBreak { paused: false }));
        assert!(!Ended.can_transition_to(Paused));
    }

    #[test]
    fn test_derived_flags() {
        let mut state = SessionState::new();
        assert!(!state.is_playing());

        assert!(state.transition(PlaybackPhase::Ready));
        assert!(state.transition(PlaybackPhase::AdBreak { paused: false }));
        assert!(state.is_playing());
        assert!(state.ad_playing());
        assert!(!state.ad_paused());

        assert!(state.transition(PlaybackPhase::AdBreak { paused: true }));
        assert!(!state.is_playing());
        assert!(state.ad_paused());
    }

    #[test]
    fn test_invalid_transition_is_ignored() {
        let mut state = SessionState::new();
        assert!(!state.transition(PlaybackPhase::Playing));
        assert_eq!(state.phase(), PlaybackPhase::Idle);
    }

    #[test]
    fn test_reset_keeps_backend_and_pip() {
        let mut state = SessionState::new();
        state.set_backend(PlaybackBackend::Cast);
        state.set_picture_in_picture(true);
        state.set_sticky(true);
        state.set_play_started(true);
        state.transition(PlaybackPhase::Ready);

        state.reset_playback();

        assert_eq!(state.phase(), PlaybackPhase::Idle);
        assert_eq!(state.backend(), PlaybackBackend::Cast);
        assert!(state.is_in_picture_in_picture());
        assert!(!state.is_sticky());
        assert!(!state.play_started());
    }
}
