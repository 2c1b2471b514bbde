pub mod app;
pub mod chat_stream;
pub mod config;
pub mod handoff;
pub mod message;
pub mod metrics;
pub mod session;
pub mod transcript;
