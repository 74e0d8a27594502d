//! Discord adapter for yebot
//!
//! Turns serenity gateway events into [`IncomingMessage`]s, hands them to the
//! core [`Bot`] and delivers whatever comes back.

use serenity::cache::Settings as CacheSettings;
use serenity::model::channel::Message as DiscordMessage;
use serenity::model::gateway::{GatewayIntents, Ready};
use serenity::model::guild::Guild;
use serenity::model::voice::VoiceState;
use serenity::prelude::*;
use songbird::serenity::SerenityInit;
use songbird::Songbird;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, warn};
use yebot_core::{
    split_message, truncate_utf8, validate_input, Bot, IncomingMessage, Outgoing, Result,
    YebotError, MAX_INPUT_LENGTH, MAX_MESSAGE_CHARS,
};

pub mod voice;
pub use voice::SongbirdVoice;

/// Discord connection settings
#[derive(Clone)]
pub struct DiscordConfig {
    /// Bot token
    pub token: String,
    /// Gateway intents
    pub intents: GatewayIntents,
}

impl DiscordConfig {
    /// Config with the intents the bot needs
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            intents: GatewayIntents::GUILDS
                | GatewayIntents::GUILD_MESSAGES
                | GatewayIntents::DIRECT_MESSAGES
                | GatewayIntents::MESSAGE_CONTENT
                | GatewayIntents::GUILD_VOICE_STATES,
        }
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"<redacted>")
            .field("intents", &self.intents)
            .finish()
    }
}

/// Voice channel of each (guild, user) pair, fed by voice state events
///
/// Updated from `guild_create` and `voice_state_update`; the serenity cache
/// is only consulted when a user is missing here.
#[derive(Clone, Default)]
pub struct VoiceStates {
    inner: Arc<RwLock<HashMap<(u64, u64), u64>>>,
}

impl VoiceStates {
    /// Record that `user_id` is now in `channel_id`, or in no channel
    pub fn update(&self, guild_id: u64, user_id: u64, channel_id: Option<u64>) {
        let mut states = self.inner.write().unwrap_or_else(|e| e.into_inner());
        match channel_id {
            Some(channel_id) => {
                states.insert((guild_id, user_id), channel_id);
            }
            None => {
                states.remove(&(guild_id, user_id));
            }
        }
    }

    /// Voice channel `user_id` sits in, if known
    pub fn channel_of(&self, guild_id: u64, user_id: u64) -> Option<u64> {
        let states = self.inner.read().unwrap_or_else(|e| e.into_inner());
        states.get(&(guild_id, user_id)).copied()
    }

    /// Number of users currently tracked
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True when nobody is tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Chunks to send for `out`; the flag marks the one sent as a reply
pub fn delivery_plan(out: &Outgoing) -> Vec<(bool, String)> {
    let reply = matches!(out, Outgoing::Reply(_));
    split_message(out.text(), MAX_MESSAGE_CHARS)
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| (reply && i == 0, chunk))
        .collect()
}

struct Handler {
    bot: Arc<Bot>,
    voice_states: VoiceStates,
}

impl Handler {
    /// Voice channel of the author, from the tracker first, then the cache
    fn author_voice_channel(&self, ctx: &Context, msg: &DiscordMessage) -> Option<u64> {
        let guild_id = msg.guild_id?;
        if let Some(channel_id) = self.voice_states.channel_of(guild_id.get(), msg.author.id.get()) {
            return Some(channel_id);
        }
        let guild = ctx.cache.guild(guild_id)?;
        guild
            .voice_states
            .get(&msg.author.id)
            .and_then(|vs| vs.channel_id)
            .map(|c| c.get())
    }

    async fn deliver(&self, ctx: &Context, msg: &DiscordMessage, out: Outgoing) {
        for (as_reply, chunk) in delivery_plan(&out) {
            let sent = if as_reply {
                msg.reply(ctx, chunk).await.map(|_| ())
            } else {
                msg.channel_id.say(&ctx.http, chunk).await.map(|_| ())
            };
            if let Err(e) = sent {
                error!(channel_id = %msg.channel_id.get(), error = %format!("{:?}", e), "Discord send failed");
                break;
            }
        }
    }
}

#[serenity::async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: DiscordMessage) {
        debug!(
            author = %msg.author.name,
            guild_id = ?msg.guild_id.map(|g| g.get()),
            channel_id = %msg.channel_id.get(),
            content = %truncate_utf8(&msg.content, 80),
            is_bot = %msg.author.bot,
            "Discord message received"
        );

        if msg.author.bot {
            return;
        }
        if let Err(e) = validate_input(&msg.content, MAX_INPUT_LENGTH) {
            debug!(author = %msg.author.name, error = %e, "Dropping message");
            return;
        }

        let incoming = IncomingMessage {
            author_id: msg.author.id.get(),
            author_name: msg.author.name.clone(),
            author_is_bot: msg.author.bot,
            content: msg.content.clone(),
            channel_id: msg.channel_id.get(),
            guild_id: msg.guild_id.map(|g| g.get()),
            author_voice_channel: self.author_voice_channel(&ctx, &msg),
        };

        if let Some(out) = self.bot.handle(&incoming).await {
            self.deliver(&ctx, &msg, out).await;
        }
    }

    async fn guild_create(&self, _ctx: Context, guild: Guild, _is_new: Option<bool>) {
        let guild_id = guild.id.get();
        for (user_id, state) in guild.voice_states.iter() {
            if let Some(channel_id) = state.channel_id {
                self.voice_states.update(guild_id, user_id.get(), Some(channel_id.get()));
            }
        }
        debug!(
            guild_id = %guild_id,
            guild_name = %guild.name,
            tracked_users = %self.voice_states.len(),
            "Voice states loaded from guild"
        );
    }

    async fn voice_state_update(&self, _ctx: Context, _old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            return;
        };
        let channel_id = new.channel_id.map(|c| c.get());
        debug!(
            guild_id = %guild_id.get(),
            user_id = %new.user_id.get(),
            channel_id = ?channel_id,
            "Voice state update"
        );
        self.voice_states.update(guild_id.get(), new.user_id.get(), channel_id);
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            user = %ready.user.name,
            guilds_count = %ready.guilds.len(),
            "Discord ready"
        );
    }
}

/// Connect to Discord and run until the gateway closes or Ctrl-C is pressed
///
/// `songbird` must be the same instance the [`SongbirdVoice`] backend of
/// `bot` was built with.
pub async fn start_discord(config: DiscordConfig, bot: Arc<Bot>, songbird: Arc<Songbird>) -> Result<()> {
    let handler = Handler {
        bot,
        voice_states: VoiceStates::default(),
    };

    let mut cache_settings = CacheSettings::default();
    cache_settings.cache_guilds = true;
    cache_settings.cache_channels = true;

    let mut client = Client::builder(&config.token, config.intents)
        .event_handler(handler)
        .cache_settings(cache_settings)
        .register_songbird_with(songbird)
        .await
        .map_err(|e| YebotError::config(format!("Err creating Discord client: {:?}", e)))?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            shard_manager.shutdown_all().await;
        } else {
            warn!("Could not listen for Ctrl-C");
        }
    });

    info!("Discord adapter started");
    client
        .start()
        .await
        .map_err(|e| YebotError::other(format!("Discord client error: {:?}", e)))
}
