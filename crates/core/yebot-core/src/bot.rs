//! Message dispatcher
//!
//! Runs a routing decision against the completion provider and the voice
//! session manager and produces the single message sent back, if any.

use crate::completion::{complete_or_apologize, CompletionProvider};
use crate::persona::PersonaTable;
use crate::router::{route, LoopRequest, PlayRequest, Route, RouterConfig};
use crate::types::{IncomingMessage, Outgoing};
use crate::voice::{Repeat, VoiceSession, VoiceSessionManager};
use crate::YebotError;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Command overview sent for `help`
pub const HELP_MESSAGE: &str = "**Commands**\n\
```markdown\n\
1. ye <prompt>         -- Ask the language model anything\n\
2. play <url>          -- Play a YouTube video's audio in your voice channel\n\
3. loop <count> <url>  -- Same, played <count> times\n\
4. skip                -- Stop the current track\n\
5. leave               -- Stop playing and leave the voice channel\n\
6. help                -- Show this page\n\
```";

/// Reply for a `play` argument that is not a video link
pub const BAD_URL_REPLY: &str = "Bad URL, send me a YouTube link.";
/// Reply for `play` outside of a guild
pub const NO_GUILD_REPLY: &str = "Voice only works inside a server.";
/// Reply when the author is not in a voice channel
pub const NO_VOICE_CHANNEL_REPLY: &str = "Join a voice channel first.";
/// Reply for `play` while a session is active
pub const BUSY_REPLY: &str = "I am already playing something. Say leave first.";
/// Reply for `loop` without a usable count
pub const LOOP_USAGE_REPLY: &str = "No loop count specified. Expected format 'loop <count> <url>'";
/// Reply for `leave` or `skip` without a session
pub const NOT_IN_VOICE_REPLY: &str = "I am not in a voice channel.";
/// Reply after a successful `leave`
pub const LEFT_REPLY: &str = "Left the voice channel.";

/// Everything needed to answer a message
pub struct Bot {
    router: RouterConfig,
    personas: PersonaTable,
    completion: Arc<dyn CompletionProvider>,
    voice: Arc<VoiceSessionManager>,
}

impl Bot {
    /// Assemble a bot from its parts
    pub fn new(
        router: RouterConfig,
        personas: PersonaTable,
        completion: Arc<dyn CompletionProvider>,
        voice: Arc<VoiceSessionManager>,
    ) -> Self {
        Self {
            router,
            personas,
            completion,
            voice,
        }
    }

    /// Voice session manager shared with the platform adaptor
    pub fn voice(&self) -> &Arc<VoiceSessionManager> {
        &self.voice
    }

    /// Routing decision for `msg`, without side effects
    pub fn route(&self, msg: &IncomingMessage) -> Route {
        route(msg, &self.router, &self.personas)
    }

    /// Handle one message and return what to send back
    pub async fn handle(&self, msg: &IncomingMessage) -> Option<Outgoing> {
        match self.route(msg) {
            Route::Ignore => None,
            Route::Prompt(prompt) => {
                debug!(author = %msg.author_name, prompt_len = %prompt.len(), "Direct prompt");
                let answer = complete_or_apologize(self.completion.as_ref(), &prompt).await;
                Some(Outgoing::Say(answer))
            }
            Route::Play(request) => Some(self.play(msg, request).await),
            Route::Loop(request) => Some(self.play_loop(msg, request).await),
            Route::Skip => Some(self.skip().await),
            Route::Leave => Some(self.leave().await),
            Route::Help => Some(Outgoing::Say(HELP_MESSAGE.to_string())),
            Route::Persona(prompt) => {
                info!(author = %msg.author_name, "Persona prompt");
                let answer = complete_or_apologize(self.completion.as_ref(), &prompt).await;
                Some(Outgoing::Say(format!("{} {}", msg.author_mention(), answer)))
            }
        }
    }

    async fn play(&self, msg: &IncomingMessage, request: PlayRequest) -> Outgoing {
        match request {
            PlayRequest::Valid(url) => self.start(msg, &url, Repeat::Once).await,
            PlayRequest::Invalid(raw) => {
                debug!(author = %msg.author_name, raw = %raw, "Rejected play URL");
                Outgoing::Reply(BAD_URL_REPLY.to_string())
            }
        }
    }

    async fn play_loop(&self, msg: &IncomingMessage, request: LoopRequest) -> Outgoing {
        match request {
            LoopRequest::Valid { url, repeat } => self.start(msg, &url, repeat).await,
            LoopRequest::MissingCount(_) => Outgoing::Reply(LOOP_USAGE_REPLY.to_string()),
            LoopRequest::Invalid(raw) => {
                debug!(author = %msg.author_name, raw = %raw, "Rejected loop URL");
                Outgoing::Reply(BAD_URL_REPLY.to_string())
            }
        }
    }

    async fn start(&self, msg: &IncomingMessage, url: &str, repeat: Repeat) -> Outgoing {
        let Some(guild_id) = msg.guild_id else {
            return Outgoing::Reply(NO_GUILD_REPLY.to_string());
        };
        let Some(channel_id) = msg.author_voice_channel else {
            return Outgoing::Reply(NO_VOICE_CHANNEL_REPLY.to_string());
        };

        match self.voice.play(guild_id, channel_id, url, repeat).await {
            Ok(session) => Outgoing::Say(now_playing(&session)),
            Err(YebotError::Busy(_)) => Outgoing::Reply(BUSY_REPLY.to_string()),
            Err(e) => {
                warn!(guild_id = %guild_id, channel_id = %channel_id, error = %e, "Play command failed");
                Outgoing::Reply(format!("Could not play that: {}", e))
            }
        }
    }

    async fn skip(&self) -> Outgoing {
        match self.voice.skip().await {
            Ok(Some(session)) => Outgoing::Say(format!("Skipped: {}", session.display_name())),
            Ok(None) => Outgoing::Reply(NOT_IN_VOICE_REPLY.to_string()),
            Err(e) => {
                warn!(error = %e, "Skip command failed");
                Outgoing::Reply(format!("Could not skip: {}", e))
            }
        }
    }

    async fn leave(&self) -> Outgoing {
        match self.voice.leave().await {
            Ok(Some(_)) => Outgoing::Say(LEFT_REPLY.to_string()),
            Ok(None) => Outgoing::Reply(NOT_IN_VOICE_REPLY.to_string()),
            Err(e) => {
                warn!(error = %e, "Leave command failed");
                Outgoing::Reply(format!("Could not leave: {}", e))
            }
        }
    }
}

/// Announcement for a session that just started
fn now_playing(session: &VoiceSession) -> String {
    let name = session.display_name();
    match session.repeat {
        Repeat::Once => format!("Playing: {}", name),
        Repeat::Times(n) => format!("Looping {} times: {}", n, name),
        Repeat::Forever => format!("Looping forever: {}", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{MockCompletionProvider, EMPTY_ANSWER, ERROR_PREFIX};
    use crate::voice::{MockVoiceBackend, DEFAULT_JOIN_TIMEOUT};

    fn bot(completion: MockCompletionProvider, backend: MockVoiceBackend) -> Bot {
        Bot::new(
            RouterConfig::default(),
            PersonaTable::default(),
            Arc::new(completion),
            VoiceSessionManager::start(Arc::new(backend), DEFAULT_JOIN_TIMEOUT),
        )
    }

    fn guild_msg(author: &str, content: &str) -> IncomingMessage {
        IncomingMessage {
            author_id: 42,
            guild_id: Some(1),
            channel_id: 10,
            author_voice_channel: Some(20),
            ..IncomingMessage::new(author, content)
        }
    }

    #[tokio::test]
    async fn test_prompt_is_sent_verbatim() {
        let mut completion = MockCompletionProvider::new();
        completion
            .expect_complete()
            .withf(|prompt| prompt == "what is rust")
            .times(1)
            .returning(|_| Ok("a language".to_string()));

        let bot = bot(completion, MockVoiceBackend::new());
        let out = bot.handle(&guild_msg("anyone", "ye,  what is rust ")).await;

        assert_eq!(out, Some(Outgoing::Say("a language".to_string())));
    }

    #[tokio::test]
    async fn test_persona_reply_mentions_author() {
        let mut completion = MockCompletionProvider::new();
        completion
            .expect_complete()
            .withf(|prompt| prompt.contains("Insult this \"nice shirt\""))
            .times(1)
            .returning(|_| Ok("it is not".to_string()));

        let bot = bot(completion, MockVoiceBackend::new());
        let out = bot.handle(&guild_msg("pryceless3", "nice shirt")).await;

        assert_eq!(out, Some(Outgoing::Say("<@42> it is not".to_string())));
    }

    #[tokio::test]
    async fn test_completion_error_is_relayed() {
        let mut completion = MockCompletionProvider::new();
        completion.expect_name().return_const("mock");
        completion
            .expect_complete()
            .returning(|_| Err(YebotError::model("rate limited")));

        let bot = bot(completion, MockVoiceBackend::new());
        let out = bot.handle(&guild_msg("anyone", "ye   hi")).await.unwrap();

        assert!(out.text().starts_with(ERROR_PREFIX));
    }

    #[tokio::test]
    async fn test_unknown_author_gets_nothing() {
        let mut completion = MockCompletionProvider::new();
        completion.expect_complete().times(0);

        let bot = bot(completion, MockVoiceBackend::new());
        assert_eq!(bot.handle(&guild_msg("stranger", "nice shirt")).await, None);
    }

    #[tokio::test]
    async fn test_bad_url_never_touches_voice() {
        let mut backend = MockVoiceBackend::new();
        backend.expect_join().times(0);
        backend.expect_play().times(0);

        let bot = bot(MockCompletionProvider::new(), backend);
        let out = bot.handle(&guild_msg("anyone", "play https://example.com/x")).await;

        assert_eq!(out, Some(Outgoing::Reply(BAD_URL_REPLY.to_string())));
    }

    #[tokio::test]
    async fn test_play_requires_author_voice_channel() {
        let mut backend = MockVoiceBackend::new();
        backend.expect_join().times(0);

        let bot = bot(MockCompletionProvider::new(), backend);
        let msg = IncomingMessage {
            author_voice_channel: None,
            ..guild_msg("anyone", "play https://youtu.be/dQw4w9WgXcQ")
        };

        assert_eq!(
            bot.handle(&msg).await,
            Some(Outgoing::Reply(NO_VOICE_CHANNEL_REPLY.to_string()))
        );
    }

    #[tokio::test]
    async fn test_play_in_dm_is_rejected() {
        let bot = bot(MockCompletionProvider::new(), MockVoiceBackend::new());
        let msg = IncomingMessage {
            guild_id: None,
            ..guild_msg("anyone", "play https://youtu.be/dQw4w9WgXcQ")
        };

        assert_eq!(
            bot.handle(&msg).await,
            Some(Outgoing::Reply(NO_GUILD_REPLY.to_string()))
        );
    }

    #[tokio::test]
    async fn test_play_then_busy_then_leave() {
        let mut backend = MockVoiceBackend::new();
        backend.expect_join().times(1).returning(|_, _| Ok(()));
        backend.expect_play().times(1).returning(|_, _, _, _| Ok(None));
        backend.expect_leave().times(1).returning(|_| Ok(()));

        let bot = bot(MockCompletionProvider::new(), backend);
        let play = guild_msg("anyone", "play https://youtu.be/dQw4w9WgXcQ");

        assert_eq!(
            bot.handle(&play).await,
            Some(Outgoing::Say("Playing: https://youtu.be/dQw4w9WgXcQ".to_string()))
        );
        assert_eq!(bot.handle(&play).await, Some(Outgoing::Reply(BUSY_REPLY.to_string())));
        assert_eq!(
            bot.handle(&guild_msg("anyone", "leave")).await,
            Some(Outgoing::Say(LEFT_REPLY.to_string()))
        );
        assert!(bot.voice().current().await.is_none());
    }

    #[tokio::test]
    async fn test_play_announces_title() {
        let mut backend = MockVoiceBackend::new();
        backend.expect_join().returning(|_, _| Ok(()));
        backend
            .expect_play()
            .returning(|_, _, _, _| Ok(Some("Never Gonna Give You Up".to_string())));

        let bot = bot(MockCompletionProvider::new(), backend);
        let out = bot.handle(&guild_msg("anyone", "play https://youtu.be/dQw4w9WgXcQ")).await;

        assert_eq!(out, Some(Outgoing::Say("Playing: Never Gonna Give You Up".to_string())));
    }

    #[tokio::test]
    async fn test_loop_plays_with_count() {
        let mut backend = MockVoiceBackend::new();
        backend.expect_join().times(1).returning(|_, _| Ok(()));
        backend
            .expect_play()
            .withf(|_, url, repeat, _| url == "https://youtu.be/dQw4w9WgXcQ" && *repeat == Repeat::Times(3))
            .times(1)
            .returning(|_, _, _, _| Ok(Some("Song".to_string())));

        let bot = bot(MockCompletionProvider::new(), backend);
        let out = bot.handle(&guild_msg("anyone", "loop 3 https://youtu.be/dQw4w9WgXcQ")).await;

        assert_eq!(out, Some(Outgoing::Say("Looping 3 times: Song".to_string())));
    }

    #[tokio::test]
    async fn test_loop_without_count_is_explained() {
        let mut backend = MockVoiceBackend::new();
        backend.expect_join().times(0);

        let bot = bot(MockCompletionProvider::new(), backend);
        assert_eq!(
            bot.handle(&guild_msg("anyone", "loop https://youtu.be/dQw4w9WgXcQ")).await,
            Some(Outgoing::Reply(LOOP_USAGE_REPLY.to_string()))
        );
        assert_eq!(
            bot.handle(&guild_msg("anyone", "loop 2 https://example.com/x")).await,
            Some(Outgoing::Reply(BAD_URL_REPLY.to_string()))
        );
    }

    #[tokio::test]
    async fn test_skip_stops_current_track() {
        let mut backend = MockVoiceBackend::new();
        backend.expect_join().returning(|_, _| Ok(()));
        backend.expect_play().returning(|_, _, _, _| Ok(None));
        backend.expect_stop().with(mockall::predicate::eq(1u64)).times(1).returning(|_| Ok(()));

        let bot = bot(MockCompletionProvider::new(), backend);
        bot.handle(&guild_msg("anyone", "play https://youtu.be/dQw4w9WgXcQ")).await;

        assert_eq!(
            bot.handle(&guild_msg("anyone", "skip")).await,
            Some(Outgoing::Say("Skipped: https://youtu.be/dQw4w9WgXcQ".to_string()))
        );
    }

    #[tokio::test]
    async fn test_skip_when_idle() {
        let mut backend = MockVoiceBackend::new();
        backend.expect_stop().times(0);

        let bot = bot(MockCompletionProvider::new(), backend);
        assert_eq!(
            bot.handle(&guild_msg("anyone", "skip")).await,
            Some(Outgoing::Reply(NOT_IN_VOICE_REPLY.to_string()))
        );
    }

    #[tokio::test]
    async fn test_empty_answer_gets_placeholder() {
        let mut completion = MockCompletionProvider::new();
        completion.expect_name().return_const("mock");
        completion.expect_complete().returning(|_| Ok(String::new()));

        let bot = bot(completion, MockVoiceBackend::new());
        let out = bot.handle(&guild_msg("anyone", "ye,  say nothing")).await.unwrap();

        assert_eq!(out, Outgoing::Say(EMPTY_ANSWER.to_string()));
    }

    #[tokio::test]
    async fn test_leave_without_session() {
        let mut backend = MockVoiceBackend::new();
        backend.expect_leave().times(0);

        let bot = bot(MockCompletionProvider::new(), backend);
        assert_eq!(
            bot.handle(&guild_msg("anyone", "leave")).await,
            Some(Outgoing::Reply(NOT_IN_VOICE_REPLY.to_string()))
        );
    }

    #[tokio::test]
    async fn test_help() {
        let bot = bot(MockCompletionProvider::new(), MockVoiceBackend::new());
        let out = bot.handle(&guild_msg("anyone", "help")).await.unwrap();
        assert!(out.text().contains("play <url>"));
        assert!(out.text().contains("loop <count> <url>"));
        assert!(out.text().contains("skip"));
    }
}
