//! yebot core
//!
//! Platform-independent half of the yebot chat bot. It includes:
//!
//! - Message routing (trigger word, voice commands, `help`, personas)
//! - Persona prompt table keyed by author display name
//! - Completion provider contract used by the model adaptors
//! - Single voice session manager with join timeout and stale-end protection
//! - Configuration from `.env`, an optional JSON settings file and the environment
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use yebot_core::*;
//!
//! async fn answer(
//!     completion: Arc<dyn CompletionProvider>,
//!     backend: Arc<dyn VoiceBackend>,
//! ) -> Result<()> {
//!     let config = BotConfig::from_env(SettingsFile::load(DEFAULT_SETTINGS_FILE)?)?;
//!     let voice = VoiceSessionManager::start(backend, config.join_timeout);
//!     let bot = Bot::new(config.router, config.personas, completion, voice);
//!
//!     let reply = bot.handle(&IncomingMessage::new("someone", "ye,  hello there")).await;
//!     println!("{:?}", reply);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use uuid::Uuid;

pub mod bot;
pub mod completion;
pub mod config;
pub mod error;
pub mod persona;
pub mod router;
pub mod types;
pub mod utils;
pub mod validation;
pub mod voice;

pub use bot::{Bot, HELP_MESSAGE};
pub use completion::{
    complete_or_apologize, ApiStyle, CompletionProvider, CompletionSettings, EMPTY_ANSWER,
    ERROR_PREFIX,
};
pub use config::{
    get_env_float, get_env_int, get_env_or, get_required_env, load_env, load_env_from_path,
    parse_triggers, validate_env, BotConfig, ModelSettings, SettingsFile, DEFAULT_SETTINGS_FILE,
};
pub use error::{Result, YebotError};
pub use persona::{PersonaPrompt, PersonaTable};
pub use router::{route, LoopRequest, PlayRequest, Route, RouterConfig};
pub use types::{IncomingMessage, Outgoing};
pub use utils::{init_logging, split_message, truncate_utf8, Logger, MAX_MESSAGE_CHARS};
pub use validation::{validate_input, MAX_INPUT_LENGTH};
pub use voice::{
    PlaybackEnd, Repeat, VoiceBackend, VoiceSession, VoiceSessionManager, DEFAULT_JOIN_TIMEOUT,
};
