//! Interactive chat screen: terminal setup, key handling and the event loop.

mod event_loop;
mod executors;
mod keybindings;
mod lifecycle;

pub use event_loop::{handle_event, run_chat, AppEvent, LoopCommand};
