//! Event dispatch and the main UI loop.
//!
//! The loop owns the [`App`] outright. It waits in a single `select!` on
//! terminal input, the active generation's fragments, background task
//! results and an animation tick, turns whatever arrives into an
//! [`AppEvent`] and applies it before drawing the next frame.

use std::{
    error::Error,
    time::{Duration, Instant},
};

use ratatui::crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::layout::Rect;
use ratatui::prelude::Size;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::api::models::ModelsError;
use crate::core::app::App;
use crate::core::chat_stream::{ChatStreamService, StreamError};
use crate::core::config::ChatSettings;
use crate::core::handoff::FragmentSource;
use crate::core::session::{StreamEvent, StreamRequest};
use crate::mcp::tools::load_tools_or_empty;
use crate::ui::renderer::{transcript_metrics, ui, FrameLayout};

use super::executors::{spawn_model_loader, spawn_stream_open};
use super::keybindings::{
    apply_edit_key, insert_newline, resolve_key, sanitize_pasted_text, KeyAction, ScrollAction,
};
use super::lifecycle::{restore_terminal, setup_terminal};

const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Everything the loop reacts to.
pub enum AppEvent {
    WindowResize {
        width: u16,
        height: u16,
    },
    KeyInput(KeyEvent),
    FragmentArrived(StreamEvent),
    SelectionMade(String),
    StreamOpened {
        generation: u64,
        result: Result<FragmentSource, StreamError>,
    },
    ModelsLoaded {
        result: Result<Vec<String>, ModelsError>,
        startup: bool,
    },
    Tick,
}

/// Work the loop must start on behalf of an event.
pub enum LoopCommand {
    OpenStream(StreamRequest),
    FetchModels,
}

pub fn handle_event(app: &mut App, event: AppEvent, now: Instant) -> Option<LoopCommand> {
    match event {
        AppEvent::WindowResize { width, height } => {
            app.ui.last_term_size = Size::new(width, height);
            None
        }
        AppEvent::KeyInput(key) => handle_key(app, key, now),
        AppEvent::FragmentArrived(stream_event) => {
            app.apply_stream_event(stream_event, now);
            None
        }
        AppEvent::SelectionMade(model) => {
            app.select_model(model);
            None
        }
        AppEvent::StreamOpened { generation, result } => {
            app.stream_opened(generation, result, now);
            None
        }
        AppEvent::ModelsLoaded { result, startup } => {
            app.models_loaded(result, startup);
            None
        }
        AppEvent::Tick => {
            app.ui.expire_status(now);
            None
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent, now: Instant) -> Option<LoopCommand> {
    match resolve_key(&key, app.picker.is_some()) {
        KeyAction::Submit => return app.submit_input().map(LoopCommand::OpenStream),
        KeyAction::CancelOrQuit => {
            if !app.cancel_generation(now) {
                app.ui.exit_requested = true;
            }
        }
        KeyAction::Quit => {
            app.cancel_generation(now);
            app.ui.exit_requested = true;
        }
        KeyAction::Clear => app.clear_transcript(now),
        KeyAction::ToggleHelp => app.ui.toggle_help(),
        KeyAction::OpenPicker => {
            if app.models.is_empty() {
                app.ui.set_status("Loading models…");
                return Some(LoopCommand::FetchModels);
            }
            app.open_model_picker();
        }
        KeyAction::ToggleLogging => app.toggle_logging(),
        KeyAction::Scroll(action) => scroll(app, action),
        KeyAction::NewLine => insert_newline(app),
        KeyAction::Edit => apply_edit_key(app, &key),
        KeyAction::PickerUp => with_picker(app, |picker| picker.move_up()),
        KeyAction::PickerDown => with_picker(app, |picker| picker.move_down()),
        KeyAction::PickerTop => with_picker(app, |picker| picker.move_to_start()),
        KeyAction::PickerBottom => with_picker(app, |picker| picker.move_to_end()),
        KeyAction::PickerSelect => {
            let selection = app
                .picker
                .as_ref()
                .and_then(|picker| picker.selected_item())
                .map(str::to_string);
            match selection {
                Some(model) => return handle_event(app, AppEvent::SelectionMade(model), now),
                None => app.close_picker(),
            }
        }
        KeyAction::PickerClose => app.close_picker(),
        KeyAction::Ignore => {}
    }
    None
}

fn with_picker(app: &mut App, f: impl FnOnce(&mut crate::ui::picker::PickerState)) {
    if let Some(picker) = app.picker.as_mut() {
        f(picker);
    }
}

fn scroll(app: &mut App, action: ScrollAction) {
    let size = app.ui.last_term_size;
    let area = Rect::new(0, 0, size.width, size.height);
    let (_, max_offset) = transcript_metrics(app, area);
    let page = FrameLayout::new(area, app.ui.input_area_height(), app.ui.show_help)
        .transcript
        .height
        .max(1);

    app.ui.sync_scroll(max_offset);
    match action {
        ScrollAction::LineUp => app.ui.scroll_up(1),
        ScrollAction::LineDown => app.ui.scroll_down(1, max_offset),
        ScrollAction::PageUp => app.ui.scroll_up(page),
        ScrollAction::PageDown => app.ui.scroll_down(page, max_offset),
        ScrollAction::Top => app.ui.scroll_to_top(),
        ScrollAction::Bottom => app.ui.scroll_to_bottom(max_offset),
    }
}

fn spawn_event_reader(events: mpsc::UnboundedSender<Event>) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while !events.is_closed() {
            match event::poll(Duration::from_millis(50)) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if events.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(_) => continue,
                },
                Ok(false) => {}
                Err(_) => break,
            }
        }
    })
}

enum Incoming {
    Terminal(Event),
    App(AppEvent),
}

pub async fn run_chat(settings: ChatSettings) -> Result<(), Box<dyn Error>> {
    let tools = load_tools_or_empty(settings.tools_file.as_deref());
    let mut app = App::with_log_file(&settings, tools);

    let client = reqwest::Client::new();
    let service = ChatStreamService::new(client.clone(), settings.base_url.clone());
    let (app_tx, mut app_rx) = mpsc::unbounded_channel::<AppEvent>();
    spawn_model_loader(client.clone(), settings.base_url.clone(), true, app_tx.clone());

    let mut terminal = setup_terminal()?;
    let size = terminal.size()?;
    app.ui.last_term_size = size;

    let (term_tx, mut term_rx) = mpsc::unbounded_channel::<Event>();
    let reader = spawn_event_reader(term_tx);

    let mut tick = tokio::time::interval(TICK_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(base_url = %settings.base_url, model = %app.session.model(), "Chat session started");

    let result: Result<(), Box<dyn Error>> = loop {
        if let Err(err) = terminal.draw(|f| ui(f, &app)) {
            break Err(err.into());
        }
        if app.ui.exit_requested {
            break Ok(());
        }

        let incoming = tokio::select! {
            Some(ev) = term_rx.recv() => Incoming::Terminal(ev),
            stream_event = app.session.next_event() => {
                Incoming::App(AppEvent::FragmentArrived(stream_event))
            }
            Some(ev) = app_rx.recv() => Incoming::App(ev),
            _ = tick.tick() => Incoming::App(AppEvent::Tick),
        };

        let event = match incoming {
            Incoming::App(event) => event,
            Incoming::Terminal(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                AppEvent::KeyInput(key)
            }
            Incoming::Terminal(Event::Resize(width, height)) => {
                AppEvent::WindowResize { width, height }
            }
            Incoming::Terminal(Event::Paste(text)) => {
                let text = sanitize_pasted_text(&text);
                if app.picker.is_none() && !text.is_empty() {
                    app.ui.apply_textarea_edit(|ta| {
                        ta.insert_str(&text);
                    });
                }
                continue;
            }
            Incoming::Terminal(_) => continue,
        };

        match handle_event(&mut app, event, Instant::now()) {
            Some(LoopCommand::OpenStream(request)) => {
                debug!(generation = request.generation, "Starting generation");
                spawn_stream_open(service.clone(), request, app_tx.clone());
            }
            Some(LoopCommand::FetchModels) => {
                spawn_model_loader(client.clone(), settings.base_url.clone(), false, app_tx.clone());
            }
            None => {}
        }
    };

    app.cancel_generation(Instant::now());
    drop(term_rx);
    restore_terminal(&mut terminal)?;
    let _ = reader.await;
    info!("Chat session ended");

    result
}
