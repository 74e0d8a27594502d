//! Utility modules

pub mod logger;
pub mod text;

pub use logger::{init_logging, Logger};
pub use text::{split_message, truncate_utf8, MAX_MESSAGE_CHARS};
