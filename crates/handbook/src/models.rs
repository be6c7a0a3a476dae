//! These models represent the objects passed between the route handlers,
//! the provider client and the tool dispatch loop:
//! - conversation messages in the Mistral chat wire shape
//! - non-streaming chat responses with choices and finish reasons
//! - streaming completion events carrying incremental deltas
//! - tool specifications advertised to the model
//!
//! The wire shape and the internal shape are intentionally the same struct;
//! the provider payloads serialize these directly.
pub mod chat;
pub mod message;
pub mod role;
pub mod tool;
