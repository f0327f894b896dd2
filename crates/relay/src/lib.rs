//! Chat relay and lesson asset server
//!
//! A stateless HTTP service: `POST /api/openai` forwards chat messages to
//! the configured completion endpoint with the server-side API key, and
//! `/audios` optionally serves lesson audio from a local directory.

mod chat;
mod error;
mod server;
mod state;

pub use chat::{ChatMessage, ChatRequest};
pub use error::{ChatError, RelayError, RelayResult};
pub use server::{router, serve, serve_on};
pub use state::RelayState;
