//! AI completion plumbing: a provider-agnostic client interface, an
//! OpenAI-compatible HTTP implementation, and the devotional prompt/parse
//! pair used by the batch generator.

pub mod client;
pub mod devotional;

pub use client::{
    ChatMessage, CompletionClient, CompletionError, CompletionRequest, HttpCompletionClient,
};
pub use devotional::{GeneratedDevotional, ParseError};
