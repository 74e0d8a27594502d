//! Start yebot: load configuration, wire the core to OpenAI and Discord, run.

use clap::Parser;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use yebot_adaptor_discord::{start_discord, DiscordConfig, SongbirdVoice};
use yebot_core::utils::logger::init_logging;
use yebot_core::{
    load_env, load_env_from_path, Bot, BotConfig, Logger, SettingsFile, VoiceSessionManager,
    DEFAULT_SETTINGS_FILE,
};
use yebot_provider_openai::OpenAIProvider;

#[derive(Parser, Debug)]
#[command(name = "run-yebot", about = "Discord bot answering with a language model and playing YouTube audio")]
struct Cli {
    /// Log filter, e.g. `info` or `yebot_core=debug`
    #[arg(long, env = "YEBOT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Optional JSON settings file
    #[arg(long, env = "YEBOT_CONFIG", default_value = DEFAULT_SETTINGS_FILE)]
    config: String,
}

/// Load `.env` (the nearest one, or `env_file`) and then parse `args`
///
/// The CLI falls back to environment variables, so `.env` has to be loaded
/// first for its values to count.
fn load_cli<I, T>(env_file: Option<&Path>, args: I) -> yebot_core::Result<(Cli, Option<PathBuf>)>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let loaded = match env_file {
        Some(path) => load_env_from_path(path)?,
        None => load_env()?,
    };
    Ok((Cli::parse_from(args), loaded))
}

fn main() -> yebot_core::Result<()> {
    let (cli, env_file) = load_cli(None, std::env::args_os())?;
    std::env::set_var("YEBOT_LOG_LEVEL", &cli.log_level);
    init_logging();

    let log = Logger::new("run-yebot");
    match &env_file {
        Some(path) => log.debug(&format!("Environment loaded from {}", path.display())),
        None => log.warn("No .env file found, using the process environment only"),
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(run(cli, log))
}

async fn run(cli: Cli, log: Logger) -> yebot_core::Result<()> {
    let settings = SettingsFile::load(&cli.config)?;
    let config = BotConfig::from_env(settings)?;
    log.info(&format!(
        "model={} style={:?} triggers={:?} personas={}",
        config.completion.model,
        config.completion.api_style,
        config.router.triggers,
        config.personas.len()
    ));

    let songbird =
        songbird::Songbird::serenity_from_config(SongbirdVoice::config(config.join_timeout));
    let voice = VoiceSessionManager::start(
        Arc::new(SongbirdVoice::new(songbird.clone())),
        config.join_timeout,
    );
    let completion = Arc::new(OpenAIProvider::new(config.completion.clone()));
    let bot = Arc::new(Bot::new(config.router, config.personas, completion, voice));

    log.info("Connecting to Discord");
    let result = start_discord(DiscordConfig::new(config.discord_token), bot, songbird).await;
    match &result {
        Ok(()) => log.info("Discord client stopped"),
        Err(e) => log.error(&format!("Discord client failed: {}", e)),
    }
    result
}
