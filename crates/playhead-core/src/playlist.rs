//! Playlist advancement
//!
//! State machine over the videos of a session:
//!
//! ```text
//!   Playing(i) --content ended--> EndedAdvancing(i) --i+1 exists--> Playing(i+1)
//!                                                   \--last video--> EndedTerminal
//! ```
//!
//! Advancing clears the finished video's saved position and yields a
//! `PLAY_COMPLETED` event for it, followed by a `PLAY_STARTED` event for the
//! next video when there is one.

use crate::positions::PositionStore;
use crate::tracking::{TrackingEvent, TrackingEventKind};
use crate::types::VideoDescriptor;
use crate::{Error, Result};
use tracing::{debug, info};

/// Advancement state of a playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaylistState {
    Playing(usize),
    EndedAdvancing(usize),
    EndedTerminal,
}

impl std::fmt::Display for PlaylistState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaylistState::Playing(index) => write!(f, "playing({})", index),
            PlaylistState::EndedAdvancing(index) => write!(f, "ended_advancing({})", index),
            PlaylistState::EndedTerminal => write!(f, "ended_terminal"),
        }
    }
}

/// Result of a single advancement step
#[derive(Debug, Clone, PartialEq)]
pub struct Advancement {
    /// Index of the video that just finished
    pub finished: usize,
    /// Index of the newly current video, if any
    pub next: Option<usize>,
    /// Events to forward, in emission order
    pub events: Vec<TrackingEvent>,
}

/// Ordered, non-empty list of videos with a current index
#[derive(Debug, Clone)]
pub struct Playlist {
    videos: Vec<VideoDescriptor>,
    current: usize,
    state: PlaylistState,
}

impl Playlist {
    pub fn new(videos: Vec<VideoDescriptor>) -> Result<Self> {
        if videos.is_empty() {
            return Err(Error::EmptyPlaylist);
        }
        Ok(Self {
            videos,
            current: 0,
            state: PlaylistState::Playing(0),
        })
    }

    pub fn single(video: VideoDescriptor) -> Self {
        Self {
            videos: vec![video],
            current: 0,
            state: PlaylistState::Playing(0),
        }
    }

    pub fn state(&self) -> PlaylistState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The current video. After the terminal state this stays on the last one.
    pub fn current(&self) -> &VideoDescriptor {
        &self.videos[self.current]
    }

    pub fn get(&self, index: usize) -> Option<&VideoDescriptor> {
        self.videos.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut VideoDescriptor> {
        self.videos.get_mut(index)
    }

    pub fn videos(&self) -> &[VideoDescriptor] {
        &self.videos
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    /// Append a video to the end of the playlist
    pub fn push(&mut self, video: VideoDescriptor) {
        debug!(video_id = video.id(), index = self.videos.len(), "Video appended to playlist");
        self.videos.push(video);
    }

    /// Index the next advancement would move to, if any
    pub fn peek_next(&self) -> Option<usize> {
        match self.state {
            PlaylistState::EndedTerminal => None,
            _ => self.peek_next_from(self.current),
        }
    }

    /// Handle a terminal content-ended signal for the current video.
    ///
    /// Once the playlist is terminal, further calls change nothing and
    /// return no events.
    pub fn advance(&mut self, positions: &mut PositionStore) -> Advancement {
        let finished = self.current;
        if self.state == PlaylistState::EndedTerminal {
            debug!(finished, "Playlist already finished, ignoring advance");
            return Advancement {
                finished,
                next: None,
                events: Vec::new(),
            };
        }
        self.state = PlaylistState::EndedAdvancing(finished);

        let finished_video = &self.videos[finished];
        positions.clear(finished_video.id());
        let mut events = vec![TrackingEvent::playback(
            finished_video.id(),
            TrackingEventKind::PlayCompleted,
            finished_video.duration_micros(),
            100,
        )];

        let next = self.peek_next_from(finished);
        match next {
            Some(index) => {
                self.current = index;
                self.state = PlaylistState::Playing(index);
                events.push(TrackingEvent::playback(
                    self.videos[index].id(),
                    TrackingEventKind::PlayStarted,
                    0,
                    0,
                ));
                info!(finished, next = index, "Playlist advanced");
            }
            None => {
                self.state = PlaylistState::EndedTerminal;
                info!(finished, "Playlist finished");
            }
        }

        Advancement {
            finished,
            next,
            events,
        }
    }

    fn peek_next_from(&self, index: usize) -> Option<usize> {
        let next = self.clamp(index + 1);
        (next != index).then_some(next)
    }

    fn clamp(&self, index: usize) -> usize {
        index.min(self.videos.len().saturating_sub(1))
    }
}
