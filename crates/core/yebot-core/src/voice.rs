//! Voice session management
//!
//! The process holds at most one voice session. Every change to it (join,
//! replace, destroy) happens under one async mutex, and playback-end
//! notifications only tear down the session they were issued for.

use crate::{Result, YebotError};
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default time allowed for a voice connection to become ready
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Handle given to a backend so it can report that playback stopped
#[derive(Debug, Clone)]
pub struct PlaybackEnd {
    session_id: Uuid,
    tx: mpsc::UnboundedSender<Uuid>,
}

impl PlaybackEnd {
    /// Session this handle belongs to
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Report that playback ended, failed, or the connection dropped
    pub fn notify(&self) {
        if self.tx.send(self.session_id).is_err() {
            debug!(session_id = %self.session_id, "Session manager gone, dropping playback end");
        }
    }
}

/// How many times a track is played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repeat {
    /// Play once
    #[default]
    Once,
    /// Play this many times in total
    Times(u32),
    /// Play until skipped or the bot leaves
    Forever,
}

impl Repeat {
    /// Repeat for a total play count; 0 and 1 both mean once
    pub fn times(count: u32) -> Self {
        if count <= 1 {
            Repeat::Once
        } else {
            Repeat::Times(count)
        }
    }

    /// Plays after the first one, `None` when unbounded
    pub fn extra_plays(self) -> Option<usize> {
        match self {
            Repeat::Once => Some(0),
            Repeat::Times(n) => Some(n.saturating_sub(1) as usize),
            Repeat::Forever => None,
        }
    }
}

/// Platform voice operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoiceBackend: Send + Sync {
    /// Connect to `channel_id` in `guild_id`, returning once the connection is ready
    async fn join(&self, guild_id: u64, channel_id: u64) -> Result<()>;

    /// Start streaming the audio of `url` `repeat` times; call
    /// `on_end.notify()` when it stops for good
    ///
    /// Returns the track title when the source reports one.
    async fn play(
        &self,
        guild_id: u64,
        url: &str,
        repeat: Repeat,
        on_end: PlaybackEnd,
    ) -> Result<Option<String>>;

    /// Stop whatever is playing in `guild_id`, keeping the connection
    async fn stop(&self, guild_id: u64) -> Result<()>;

    /// Destroy the connection in `guild_id`
    async fn leave(&self, guild_id: u64) -> Result<()>;
}

/// The bot's presence in one voice channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSession {
    /// Unique id, used to match playback-end notifications
    pub id: Uuid,
    /// Guild ID
    pub guild_id: u64,
    /// Voice channel ID the bot is in
    pub channel_id: u64,
    /// What is being played
    pub url: String,
    /// Track title, when the source reported one
    pub title: Option<String>,
    /// How often the track repeats
    pub repeat: Repeat,
    /// When playback started
    pub started_at: Instant,
}

impl VoiceSession {
    /// Title if known, the URL otherwise
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }
}

/// Owner of the single voice session
pub struct VoiceSessionManager {
    backend: Arc<dyn VoiceBackend>,
    current: Mutex<Option<VoiceSession>>,
    join_timeout: Duration,
    ended_tx: mpsc::UnboundedSender<Uuid>,
}

impl VoiceSessionManager {
    /// Create the manager and spawn the task that reaps finished sessions
    ///
    /// Must be called from inside a tokio runtime.
    pub fn start(backend: Arc<dyn VoiceBackend>, join_timeout: Duration) -> Arc<Self> {
        let (ended_tx, ended_rx) = mpsc::unbounded_channel();
        let manager = Arc::new(Self {
            backend,
            current: Mutex::new(None),
            join_timeout,
            ended_tx,
        });
        tokio::spawn(reap_finished(Arc::downgrade(&manager), ended_rx));
        manager
    }

    /// Snapshot of the active session
    pub async fn current(&self) -> Option<VoiceSession> {
        self.current.lock().await.clone()
    }

    /// Join `channel_id` and start streaming `url`
    ///
    /// Rejected with [`YebotError::Busy`] while another session is active.
    pub async fn play(
        &self,
        guild_id: u64,
        channel_id: u64,
        url: &str,
        repeat: Repeat,
    ) -> Result<VoiceSession> {
        let mut current = self.current.lock().await;
        if let Some(active) = current.as_ref() {
            return Err(YebotError::busy(format!(
                "already playing {} in channel {}",
                active.url, active.channel_id
            )));
        }

        match tokio::time::timeout(self.join_timeout, self.backend.join(guild_id, channel_id)).await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(guild_id = %guild_id, channel_id = %channel_id, error = %e, "Failed to join voice channel");
                return Err(e);
            }
            Err(_) => {
                warn!(guild_id = %guild_id, channel_id = %channel_id, timeout = ?self.join_timeout, "Voice join timed out");
                return Err(YebotError::timeout(format!(
                    "voice connection not ready after {}s",
                    self.join_timeout.as_secs()
                )));
            }
        }

        let id = Uuid::new_v4();
        let on_end = PlaybackEnd {
            session_id: id,
            tx: self.ended_tx.clone(),
        };
        let title = match self.backend.play(guild_id, url, repeat, on_end).await {
            Ok(title) => title,
            Err(e) => {
                warn!(guild_id = %guild_id, url = %url, error = %e, "Playback failed to start, leaving");
                if let Err(leave_err) = self.backend.leave(guild_id).await {
                    warn!(guild_id = %guild_id, error = %leave_err, "Cleanup leave failed");
                }
                return Err(e);
            }
        };

        let session = VoiceSession {
            id,
            guild_id,
            channel_id,
            url: url.to_string(),
            title,
            repeat,
            started_at: Instant::now(),
        };
        info!(
            session_id = %id,
            guild_id = %guild_id,
            channel_id = %channel_id,
            url = %url,
            title = ?session.title,
            repeat = ?repeat,
            "Voice session started"
        );
        *current = Some(session.clone());
        Ok(session)
    }

    /// Stop the current track; the session ends once the backend reports it
    ///
    /// Returns `None` without touching the backend when nothing is active.
    pub async fn skip(&self) -> Result<Option<VoiceSession>> {
        let current = self.current.lock().await;
        let Some(session) = current.as_ref() else {
            return Ok(None);
        };

        self.backend.stop(session.guild_id).await?;
        info!(session_id = %session.id, guild_id = %session.guild_id, "Skipped track");
        Ok(Some(session.clone()))
    }

    /// Destroy the active session, if any
    ///
    /// Returns `None` without touching the backend when nothing is active.
    pub async fn leave(&self) -> Result<Option<VoiceSession>> {
        let mut current = self.current.lock().await;
        let Some(session) = current.take() else {
            return Ok(None);
        };

        if let Err(e) = self.backend.leave(session.guild_id).await {
            *current = Some(session);
            return Err(e);
        }

        info!(session_id = %session.id, guild_id = %session.guild_id, "Left voice channel");
        Ok(Some(session))
    }

    /// Tear down the session with `session_id`, if it is still the active one
    pub async fn finish(&self, session_id: Uuid) -> bool {
        let mut current = self.current.lock().await;
        let session = match current.take() {
            Some(session) if session.id == session_id => session,
            other => {
                *current = other;
                debug!(session_id = %session_id, "Ignoring end of a session that is no longer active");
                return false;
            }
        };

        if let Err(e) = self.backend.leave(session.guild_id).await {
            warn!(session_id = %session_id, error = %e, "Leave after playback end failed");
        }
        info!(
            session_id = %session_id,
            played_for = ?session.started_at.elapsed(),
            "Voice session finished"
        );
        true
    }
}

async fn reap_finished(manager: Weak<VoiceSessionManager>, mut ended_rx: mpsc::UnboundedReceiver<Uuid>) {
    while let Some(session_id) = ended_rx.recv().await {
        let Some(manager) = manager.upgrade() else {
            break;
        };
        manager.finish(session_id).await;
    }
}
