//! Terminal UI layer for interactive chat sessions.
//!
//! - [`chat_loop`]: terminal setup, key handling and the event loop that
//!   drives the [`crate::core::session::ChatSession`].
//! - [`renderer`] and [`markdown`]: frame composition and transcript lines.
//! - [`theme`]: immutable style palette chosen at startup.
//! - [`picker`]: model selection list.
//!
//! This layer presents and captures interaction state; [`crate::core`] owns
//! the conversation and the backend streams.

pub mod chat_loop;
pub mod markdown;
pub mod picker;
pub mod renderer;
pub mod theme;
