//! These models represent the objects passed around by the agent
//!
//! There are two formats we need to interact with:
//! - the `{message}` request/response exchanged with the HTTP surface
//! - openai-compatible chat messages/tools, sent from the agent to the LLM
//!
//! The conversation history is kept in the internal structs below and only
//! converted to the wire format at the provider boundary.
pub mod message;
pub mod role;
pub mod tool;
