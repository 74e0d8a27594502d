//! Incoming and outgoing chat messages

/// A chat message as seen by the router
///
/// Built by the platform adaptor; the core only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Platform id of the author
    pub author_id: u64,
    /// Author display name, matched against the persona table
    pub author_name: String,
    /// Whether the author is a bot account (including ourselves)
    pub author_is_bot: bool,
    /// Raw message text
    pub content: String,
    /// Text channel the message arrived in
    pub channel_id: u64,
    /// Guild the channel belongs to, `None` for direct messages
    pub guild_id: Option<u64>,
    /// Voice channel the author is connected to, if any
    pub author_voice_channel: Option<u64>,
}

impl IncomingMessage {
    /// Message with just an author and content, mostly for tests
    pub fn new(author_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author_name: author_name.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    /// Platform mention markup for the author
    pub fn author_mention(&self) -> String {
        format!("<@{}>", self.author_id)
    }
}

/// What the bot sends back for a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Plain message in the same channel
    Say(String),
    /// Reply attached to the triggering message
    Reply(String),
}

impl Outgoing {
    /// Text body regardless of delivery style
    pub fn text(&self) -> &str {
        match self {
            Outgoing::Say(text) | Outgoing::Reply(text) => text,
        }
    }
}
