//! Discord voice support
//!
//! Songbird implementation of the core [`VoiceBackend`]. Audio comes from
//! yt-dlp through songbird's `YoutubeDl` input, so `yt-dlp` must be on PATH.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    error::JoinError,
    input::{Compose, YoutubeDl},
    tracks::TrackHandle,
    Config, CoreEvent, Event, EventContext, EventHandler as SongbirdEventHandler, Songbird,
    TrackEvent,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use yebot_core::{PlaybackEnd, Repeat, Result, VoiceBackend, YebotError};

/// Voice backend driving songbird
pub struct SongbirdVoice {
    songbird: Arc<Songbird>,
    http: reqwest::Client,
}

impl SongbirdVoice {
    /// Wrap the songbird instance registered with the serenity client
    pub fn new(songbird: Arc<Songbird>) -> Self {
        Self {
            songbird,
            http: reqwest::Client::new(),
        }
    }

    /// Songbird settings whose gateway and driver waits match `join_timeout`
    ///
    /// Songbird gives up after its own timeouts; without this a join would
    /// fail after 10 s no matter what the session manager allows.
    pub fn config(join_timeout: Duration) -> Config {
        Config::default()
            .gateway_timeout(Some(join_timeout))
            .driver_timeout(Some(join_timeout))
    }

    async fn title_of(&self, source: &mut YoutubeDl, url: &str) -> Option<String> {
        match source.aux_metadata().await {
            Ok(meta) => meta.title,
            Err(e) => {
                debug!(url = %url, error = %e, "No metadata for track");
                None
            }
        }
    }
}

fn join_error(e: JoinError, channel_id: u64) -> YebotError {
    match e {
        JoinError::TimedOut => {
            YebotError::timeout(format!("voice connection to channel {} timed out", channel_id))
        }
        e => YebotError::voice(format!("failed to join channel {}: {}", channel_id, e)),
    }
}

fn apply_repeat(track: &TrackHandle, repeat: Repeat) -> Result<()> {
    let looped = match repeat.extra_plays() {
        Some(0) => return Ok(()),
        Some(extra) => track.loop_for(extra),
        None => track.enable_loop(),
    };
    looped.map_err(|e| YebotError::voice(format!("failed to loop track: {}", e)))
}

#[async_trait]
impl VoiceBackend for SongbirdVoice {
    async fn join(&self, guild_id: u64, channel_id: u64) -> Result<()> {
        self.songbird
            .join(GuildId::new(guild_id), ChannelId::new(channel_id))
            .await
            .map_err(|e| join_error(e, channel_id))?;

        info!(guild_id = %guild_id, channel_id = %channel_id, "Joined voice channel");
        Ok(())
    }

    async fn play(
        &self,
        guild_id: u64,
        url: &str,
        repeat: Repeat,
        on_end: PlaybackEnd,
    ) -> Result<Option<String>> {
        let call_lock = self
            .songbird
            .get(GuildId::new(guild_id))
            .ok_or_else(|| YebotError::voice("not connected to a voice channel"))?;

        let mut source = YoutubeDl::new(self.http.clone(), url.to_string());
        let title = self.title_of(&mut source, url).await;

        let mut call = call_lock.lock().await;
        let track = call.play_input(source.into());
        apply_repeat(&track, repeat)?;

        for event in [TrackEvent::End, TrackEvent::Error] {
            track
                .add_event(Event::Track(event), PlaybackEndNotifier(on_end.clone()))
                .map_err(|e| YebotError::voice(format!("failed to watch track: {}", e)))?;
        }
        call.add_global_event(
            Event::Core(CoreEvent::DriverDisconnect),
            PlaybackEndNotifier(on_end),
        );

        info!(
            guild_id = %guild_id,
            url = %url,
            title = ?title,
            repeat = ?repeat,
            track = %track.uuid(),
            "Started streaming"
        );
        Ok(title)
    }

    async fn stop(&self, guild_id: u64) -> Result<()> {
        let call_lock = self
            .songbird
            .get(GuildId::new(guild_id))
            .ok_or_else(|| YebotError::voice("not connected to a voice channel"))?;
        call_lock.lock().await.stop();
        debug!(guild_id = %guild_id, "Stopped all tracks");
        Ok(())
    }

    async fn leave(&self, guild_id: u64) -> Result<()> {
        match self.songbird.remove(GuildId::new(guild_id)).await {
            Ok(()) => {
                info!(guild_id = %guild_id, "Left voice channel");
                Ok(())
            }
            Err(JoinError::NoCall) => {
                debug!(guild_id = %guild_id, "No voice call to leave");
                Ok(())
            }
            Err(e) => Err(YebotError::voice(format!("failed to leave: {}", e))),
        }
    }
}

/// Forwards track end, track error and driver disconnect to the session manager
struct PlaybackEndNotifier(PlaybackEnd);

#[async_trait]
impl SongbirdEventHandler for PlaybackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        match ctx {
            EventContext::Track(tracks) => {
                for (state, handle) in tracks.iter() {
                    debug!(
                        session_id = %self.0.session_id(),
                        track = %handle.uuid(),
                        playing = ?state.playing,
                        "Track stopped"
                    );
                }
            }
            EventContext::DriverDisconnect(data) => {
                warn!(
                    session_id = %self.0.session_id(),
                    reason = ?data.reason,
                    "Voice driver disconnected"
                );
            }
            _ => {}
        }
        self.0.notify();
        None
    }
}
