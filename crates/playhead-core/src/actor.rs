//! Session task
//!
//! Runs a [`SessionController`] on its own tokio task. Callers talk to it
//! through a cloneable [`SessionHandle`]; raw signals, API calls, avail
//! ticks and fetch results are all processed on that one task, in the order
//! they arrive.

use crate::{
    classifier::RawSignal,
    session::SessionController,
    types::{PlaybackBackend, SessionConfig, SessionId, VideoDescriptor},
    Error, Result,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const COMMAND_BUFFER: usize = 256;

type Reply<T> = oneshot::Sender<T>;

/// Requests processed by the session task
pub enum SessionCommand {
    Configure { config: SessionConfig, reply: Reply<Result<()>> },
    InitPlaylist { videos: Vec<VideoDescriptor>, reply: Reply<Result<()>> },
    InitPlaylistWithAds { videos: Vec<VideoDescriptor>, ad_urls: Vec<String>, reply: Reply<Result<()>> },
    AddVideo { video: VideoDescriptor, reply: Reply<Result<()>> },
    Play { reply: Reply<Result<()>> },
    Pause { reply: Reply<Result<()>> },
    SwitchBackend { backend: PlaybackBackend, reply: Reply<Result<()>> },
    EnterPictureInPicture,
    ExitPictureInPicture,
    ReadPosition { id: String, reply: Reply<i64> },
    Signal(RawSignal),
    Release { reply: Reply<()> },
}

/// Cloneable handle to a running session task
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Move the controller onto its own task
    pub fn spawn(controller: SessionController) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let session_id = controller.id();
        let task = tokio::spawn(run(controller, rx));
        (Self { session_id, tx }, task)
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> SessionCommand) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| Error::SessionClosed)?;
        rx.await.map_err(|_| Error::SessionClosed)
    }

    pub async fn configure(&self, config: SessionConfig) -> Result<()> {
        self.request(|reply| SessionCommand::Configure { config, reply }).await?
    }

    pub async fn init_single(&self, video: VideoDescriptor) -> Result<()> {
        self.init_playlist(vec![video]).await
    }

    pub async fn init_playlist(&self, videos: Vec<VideoDescriptor>) -> Result<()> {
        self.request(|reply| SessionCommand::InitPlaylist { videos, reply })
            .await?
    }

    pub async fn init_playlist_with_ads(&self, videos: Vec<VideoDescriptor>, ad_urls: Vec<String>) -> Result<()> {
        self.request(|reply| SessionCommand::InitPlaylistWithAds { videos, ad_urls, reply })
            .await?
    }

    pub async fn add_video(&self, video: VideoDescriptor) -> Result<()> {
        self.request(|reply| SessionCommand::AddVideo { video, reply }).await?
    }

    pub async fn play(&self) -> Result<()> {
        self.request(|reply| SessionCommand::Play { reply }).await?
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(|reply| SessionCommand::Pause { reply }).await?
    }

    pub async fn switch_backend(&self, backend: PlaybackBackend) -> Result<()> {
        self.request(|reply| SessionCommand::SwitchBackend { backend, reply })
            .await?
    }

    pub async fn enter_picture_in_picture(&self) -> Result<()> {
        self.send(SessionCommand::EnterPictureInPicture).await
    }

    pub async fn exit_picture_in_picture(&self) -> Result<()> {
        self.send(SessionCommand::ExitPictureInPicture).await
    }

    pub async fn read_position(&self, id: impl Into<String>) -> Result<i64> {
        let id = id.into();
        self.request(|reply| SessionCommand::ReadPosition { id, reply }).await
    }

    /// Deliver a raw engine or ad-SDK signal
    pub async fn signal(&self, signal: RawSignal) -> Result<()> {
        self.send(SessionCommand::Signal(signal)).await
    }

    /// Release the session and wait until it is quiescent
    pub async fn release(&self) -> Result<()> {
        self.request(|reply| SessionCommand::Release { reply }).await
    }

    async fn send(&self, command: SessionCommand) -> Result<()> {
        self.tx.send(command).await.map_err(|_| Error::SessionClosed)
    }
}

async fn run(mut controller: SessionController, mut commands: mpsc::Receiver<SessionCommand>) {
    info!(session_id = %controller.id(), "Session task started");

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                dispatch(&mut controller, command).await;
            }
            Some(handoff) = controller.next_handoff() => {
                controller.handle_handoff(handoff);
            }
        }
    }

    controller.release();
    info!(session_id = %controller.id(), "Session task stopped");
}

async fn dispatch(controller: &mut SessionController, command: SessionCommand) {
    match command {
        SessionCommand::Configure { config, reply } => {
            let _ = reply.send(controller.configure(config));
        }
        SessionCommand::InitPlaylist { videos, reply } => {
            let _ = reply.send(controller.init_playlist(videos).await);
        }
        SessionCommand::InitPlaylistWithAds { videos, ad_urls, reply } => {
            let _ = reply.send(controller.init_playlist_with_ads(videos, ad_urls).await);
        }
        SessionCommand::AddVideo { video, reply } => {
            let _ = reply.send(controller.add_video(video));
        }
        SessionCommand::Play { reply } => {
            let _ = reply.send(controller.play());
        }
        SessionCommand::Pause { reply } => {
            let _ = reply.send(controller.pause());
        }
        SessionCommand::SwitchBackend { backend, reply } => {
            let _ = reply.send(controller.switch_backend(backend));
        }
        SessionCommand::EnterPictureInPicture => controller.enter_picture_in_picture(),
        SessionCommand::ExitPictureInPicture => controller.exit_picture_in_picture(),
        SessionCommand::ReadPosition { id, reply } => {
            let _ = reply.send(controller.read_position(&id));
        }
        SessionCommand::Signal(signal) => {
            debug!(?signal, "Signal received");
            controller.handle_signal(signal).await;
        }
        SessionCommand::Release { reply } => {
            controller.release();
            let _ = reply.send(());
        }
    }
}
