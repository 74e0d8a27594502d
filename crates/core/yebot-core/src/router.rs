//! Message routing
//!
//! Classifies an incoming message into at most one action. The order of the
//! checks matters: the first match wins.
//!
//! 1. bot authors are ignored
//! 2. trigger word: direct prompt to the model
//! 3. `play <url>`: stream audio in the author's voice channel
//! 4. `loop <count> <url>`: same, repeated
//! 5. `skip`: stop the current track
//! 6. `leave`: drop the voice session
//! 7. `help`: command overview
//! 8. persona authors: persona-framed prompt
//! 9. anything else is ignored

use crate::persona::PersonaTable;
use crate::types::IncomingMessage;
use crate::voice::Repeat;
use once_cell::sync::Lazy;
use regex::Regex;

/// Prefix of the play command
pub const PLAY_COMMAND: &str = "play";
/// Prefix of the loop command
pub const LOOP_COMMAND: &str = "loop";
/// Prefix of the skip command
pub const SKIP_COMMAND: &str = "skip";
/// Prefix of the leave command
pub const LEAVE_COMMAND: &str = "leave";
/// Prefix of the help command
pub const HELP_COMMAND: &str = "help";

static VIDEO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^https?://(?:(?:www|m|music)\.)?(?:youtube\.com/(?:watch\?(?:[^\s#]*&)?v=|shorts/)|youtu\.be/)[A-Za-z0-9_-]{6,}",
    )
    .expect("video url pattern is valid")
});

/// Router settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Prefixes that turn a message into a direct prompt
    pub triggers: Vec<String>,
    /// Characters dropped from the start of a triggered message before trimming
    pub prompt_offset: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            triggers: vec!["ye".to_string(), "Ye".to_string()],
            prompt_offset: 5,
        }
    }
}

impl RouterConfig {
    /// Whether `content` starts with one of the trigger words
    pub fn is_triggered(&self, content: &str) -> bool {
        self.triggers
            .iter()
            .any(|trigger| !trigger.is_empty() && content.starts_with(trigger.as_str()))
    }

    /// Prompt text of a triggered message
    pub fn extract_prompt(&self, content: &str) -> String {
        let rest = match content.char_indices().nth(self.prompt_offset) {
            Some((idx, _)) => &content[idx..],
            None => "",
        };
        rest.trim().to_string()
    }
}

/// A parsed `play` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayRequest {
    /// URL that looks like a video-sharing link
    Valid(String),
    /// Anything else, as typed
    Invalid(String),
}

/// A parsed `loop` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopRequest {
    /// Video link with a play count
    Valid {
        /// Video link
        url: String,
        /// How often to play it
        repeat: Repeat,
    },
    /// Video link without a usable count
    MissingCount(String),
    /// No video link, argument as typed
    Invalid(String),
}

/// Routing decision for one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// No outgoing action
    Ignore,
    /// Send the prompt verbatim to the model
    Prompt(String),
    /// Join the author's voice channel and stream the URL
    Play(PlayRequest),
    /// Like `Play`, repeating the track
    Loop(LoopRequest),
    /// Stop the current track
    Skip,
    /// Leave the current voice channel
    Leave,
    /// Show the command overview
    Help,
    /// Persona-framed prompt; the answer mentions the author
    Persona(String),
}

/// Decide what to do with `msg`
pub fn route(msg: &IncomingMessage, config: &RouterConfig, personas: &PersonaTable) -> Route {
    let content = msg.content.as_str();

    if msg.author_is_bot {
        Route::Ignore
    } else if config.is_triggered(content) {
        Route::Prompt(config.extract_prompt(content))
    } else if content.starts_with(PLAY_COMMAND) {
        Route::Play(parse_play(content))
    } else if content.starts_with(LOOP_COMMAND) {
        Route::Loop(parse_loop(content))
    } else if content.starts_with(SKIP_COMMAND) {
        Route::Skip
    } else if content.starts_with(LEAVE_COMMAND) {
        Route::Leave
    } else if content.starts_with(HELP_COMMAND) {
        Route::Help
    } else if let Some(prompt) = personas.prompt_for(&msg.author_name, content) {
        Route::Persona(prompt)
    } else {
        Route::Ignore
    }
}

/// Parse the argument of a `play` command
pub fn parse_play(content: &str) -> PlayRequest {
    let raw = content
        .strip_prefix("play ")
        .unwrap_or_default()
        .trim()
        .to_string();
    if is_video_url(&raw) {
        PlayRequest::Valid(raw)
    } else {
        PlayRequest::Invalid(raw)
    }
}

/// Parse the arguments of `loop <count> <url>`
///
/// The link and the count may come in either order. A count too large for
/// `u32` loops forever.
pub fn parse_loop(content: &str) -> LoopRequest {
    let raw = content.strip_prefix("loop ").unwrap_or_default().trim();
    let mut words = raw.split_whitespace();
    let Some(url) = words.clone().find(|w| is_video_url(w)) else {
        return LoopRequest::Invalid(raw.to_string());
    };
    let count = words.find(|w| w.chars().all(|c| c.is_ascii_digit()));

    let repeat = match count.map(str::parse::<u32>) {
        None | Some(Ok(0)) => return LoopRequest::MissingCount(url.to_string()),
        Some(Ok(n)) => Repeat::times(n),
        Some(Err(_)) => Repeat::Forever,
    };
    LoopRequest::Valid {
        url: url.to_string(),
        repeat,
    }
}

/// Loose check that `url` points at a video-sharing page
pub fn is_video_url(url: &str) -> bool {
    VIDEO_URL.is_match(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(author: &str, content: &str) -> IncomingMessage {
        IncomingMessage::new(author, content)
    }

    fn route_default(m: &IncomingMessage) -> Route {
        route(m, &RouterConfig::default(), &PersonaTable::default())
    }

    #[test]
    fn test_trigger_strips_five_chars_and_trims() {
        assert_eq!(
            route_default(&msg("anyone", "ye,  what is rust?  ")),
            Route::Prompt("what is rust?".to_string())
        );
        assert_eq!(
            route_default(&msg("anyone", "Ye   tell me a joke")),
            Route::Prompt("tell me a joke".to_string())
        );
    }

    #[test]
    fn test_trigger_shorter_than_offset() {
        assert_eq!(route_default(&msg("anyone", "ye")), Route::Prompt(String::new()));
    }

    #[test]
    fn test_trigger_offset_counts_chars_not_bytes() {
        assert_eq!(
            route_default(&msg("anyone", "yeéé ça va")),
            Route::Prompt("ça va".to_string())
        );
    }

    #[test]
    fn test_bots_are_ignored_for_every_trigger() {
        for content in ["ye hello there", "Ye hello there", "play x", "leave"] {
            let m = IncomingMessage {
                author_is_bot: true,
                ..msg("pryceless3", content)
            };
            assert_eq!(route_default(&m), Route::Ignore, "content: {content}");
        }
    }

    #[test]
    fn test_trigger_wins_over_persona() {
        assert!(matches!(
            route_default(&msg("pryceless3", "ye is this a prompt")),
            Route::Prompt(_)
        ));
    }

    #[test]
    fn test_play_command() {
        assert_eq!(
            route_default(&msg("anyone", "play https://www.youtube.com/watch?v=dQw4w9WgXcQ")),
            Route::Play(PlayRequest::Valid(
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string()
            ))
        );
        assert_eq!(
            route_default(&msg("anyone", "play https://example.com/song.mp3")),
            Route::Play(PlayRequest::Invalid("https://example.com/song.mp3".to_string()))
        );
        assert_eq!(
            route_default(&msg("anyone", "play")),
            Route::Play(PlayRequest::Invalid(String::new()))
        );
    }

    #[test]
    fn test_loop_command() {
        assert_eq!(
            route_default(&msg("anyone", "loop 3 https://youtu.be/dQw4w9WgXcQ")),
            Route::Loop(LoopRequest::Valid {
                url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
                repeat: Repeat::Times(3),
            })
        );
        assert_eq!(
            parse_loop("loop https://youtu.be/dQw4w9WgXcQ 2"),
            LoopRequest::Valid {
                url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
                repeat: Repeat::Times(2),
            }
        );
        assert_eq!(
            parse_loop("loop 99999999999999999999 https://youtu.be/dQw4w9WgXcQ"),
            LoopRequest::Valid {
                url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
                repeat: Repeat::Forever,
            }
        );
    }

    #[test]
    fn test_loop_without_count_or_url() {
        assert_eq!(
            parse_loop("loop https://youtu.be/dQw4w9WgXcQ"),
            LoopRequest::MissingCount("https://youtu.be/dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            parse_loop("loop 0 https://youtu.be/dQw4w9WgXcQ"),
            LoopRequest::MissingCount("https://youtu.be/dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            parse_loop("loop 3 https://example.com/a"),
            LoopRequest::Invalid("3 https://example.com/a".to_string())
        );
        assert_eq!(parse_loop("loop"), LoopRequest::Invalid(String::new()));
    }

    #[test]
    fn test_skip_command() {
        assert_eq!(route_default(&msg("anyone", "skip")), Route::Skip);
        assert_eq!(route_default(&msg("pryceless3", "skip this one")), Route::Skip);
    }

    #[test]
    fn test_leave_and_help() {
        assert_eq!(route_default(&msg("anyone", "leave")), Route::Leave);
        assert_eq!(route_default(&msg("anyone", "leave now please")), Route::Leave);
        assert_eq!(route_default(&msg("anyone", "help")), Route::Help);
    }

    #[test]
    fn test_persona_route() {
        match route_default(&msg("pryceless3", "nice shirt")) {
            Route::Persona(prompt) => assert!(prompt.contains("Insult this \"nice shirt\"")),
            other => panic!("expected persona route, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_author_plain_message_is_ignored() {
        for content in ["hello", "Play that again", "nice shirt", ""] {
            assert_eq!(route_default(&msg("random_person", content)), Route::Ignore);
        }
    }

    #[test]
    fn test_lowercase_only_commands() {
        assert_eq!(route_default(&msg("anyone", "LEAVE")), Route::Ignore);
    }

    #[test]
    fn test_video_url_validation() {
        assert!(is_video_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_video_url("http://youtube.com/watch?v=dQw4w9WgXcQ&t=42"));
        assert!(is_video_url("https://m.youtube.com/watch?feature=share&v=dQw4w9WgXcQ"));
        assert!(is_video_url("https://music.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_video_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(is_video_url("https://www.youtube.com/shorts/abcdefghijk"));

        assert!(!is_video_url("https://vimeo.com/123456"));
        assert!(!is_video_url("https://www.youtube.com/"));
        assert!(!is_video_url("youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(!is_video_url("https://evil.example/?https://youtu.be/dQw4w9WgXcQ"));
        assert!(!is_video_url(""));
    }

    #[test]
    fn test_custom_triggers() {
        let config = RouterConfig {
            triggers: vec!["willy".to_string(), "Willy".to_string()],
            prompt_offset: 5,
        };
        let personas = PersonaTable::empty();
        assert_eq!(
            route(&msg("a", "Willy why is the sky blue"), &config, &personas),
            Route::Prompt("why is the sky blue".to_string())
        );
        assert_eq!(route(&msg("a", "ye hello"), &config, &personas), Route::Ignore);
    }
}
