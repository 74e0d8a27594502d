//! Platform-independent message types

pub mod message;

pub use message::{IncomingMessage, Outgoing};
