//! Full-screen terminal chat client for an Ollama server.
//!
//! Replies stream in fragment by fragment through a zero-buffer hand-off, so
//! a slow interface throttles the network reader. Generations can be
//! cancelled at any point, and each one reports token counts and throughput.

pub mod api;
pub mod cli;
pub mod core;
pub mod mcp;
pub mod ui;
pub mod utils;
