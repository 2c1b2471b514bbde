//! Application state shared by the event loop and the renderer.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, warn};

use crate::api::models::{resolve_startup_model, ModelsError, DEFAULT_MODEL};
use crate::core::chat_stream::StreamError;
use crate::core::config::ChatSettings;
use crate::core::handoff::FragmentSource;
use crate::core::message::ChatTurn;
use crate::core::session::{ChatSession, SessionError, StreamEvent, StreamRequest};
use crate::mcp::tools::LoadedTools;
use crate::ui::picker::PickerState;
use crate::ui::theme::Theme;
use crate::utils::logging::LoggingState;

pub mod ui_state;

pub use ui_state::UiState;

pub struct App {
    pub session: ChatSession,
    pub ui: UiState,
    pub picker: Option<PickerState>,
    pub models: Vec<String>,
    pub logging: LoggingState,
    pub base_url: String,
    preferred_model: Option<String>,
}

impl App {
    pub fn new(settings: &ChatSettings, tools: LoadedTools, logging: LoggingState) -> Self {
        let model = settings
            .preferred_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let mut session = ChatSession::new(model, tools.tools);
        if let Some(notice) = tools.notice {
            session.add_info(notice);
        }

        Self {
            session,
            ui: UiState::new(Theme::from_name(&settings.theme_name), settings.markdown),
            picker: None,
            models: Vec::new(),
            logging,
            base_url: settings.base_url.clone(),
            preferred_model: settings.preferred_model.clone(),
        }
    }

    /// Build the app with the transcript log from `settings`. A log file that
    /// cannot be opened disables logging and leaves a note in the transcript.
    pub fn with_log_file(settings: &ChatSettings, tools: LoadedTools) -> Self {
        let log_path = settings.log_file.as_ref().map(PathBuf::from);
        match LoggingState::new(log_path) {
            Ok(logging) => Self::new(settings, tools, logging),
            Err(err) => {
                warn!(error = %err, "Transcript logging disabled");
                let mut app = Self::new(settings, tools, LoggingState::disabled());
                app.session
                    .add_info(format!("Could not open log file: {err}. Logging is disabled."));
                app
            }
        }
    }

    pub fn is_generating(&self) -> bool {
        !self.session.is_idle()
    }

    /// Submit the input box contents. Returns the request to open when a
    /// generation started.
    pub fn submit_input(&mut self) -> Option<StreamRequest> {
        if self.is_generating() {
            self.ui
                .set_status("Still generating. Press Esc to cancel first.");
            return None;
        }

        let prompt = self.ui.get_input_text();
        match self.session.submit(&prompt) {
            Ok(request) => {
                self.ui.clear_input();
                self.ui.auto_scroll = true;
                self.ui.pulse_start = Instant::now();
                if let Some(turn) = self.session.transcript().last().cloned() {
                    self.log_turn(&turn);
                }
                Some(request)
            }
            Err(SessionError::EmptyPrompt) => None,
            Err(err @ SessionError::Busy) => {
                self.ui.set_status(err.to_string());
                None
            }
        }
    }

    pub fn stream_opened(
        &mut self,
        generation: u64,
        result: Result<FragmentSource, StreamError>,
        now: Instant,
    ) {
        if self.session.stream_opened(generation, result, now) {
            self.ui.pulse_start = now;
        }
    }

    pub fn apply_stream_event(&mut self, event: StreamEvent, now: Instant) {
        if let Some(turn) = self.session.apply(event, now) {
            self.log_turn(&turn);
        }
    }

    /// Cancel the active generation. Returns `false` when nothing was running.
    pub fn cancel_generation(&mut self, now: Instant) -> bool {
        if !self.is_generating() {
            return false;
        }
        if let Some(turn) = self.session.cancel(now) {
            self.log_turn(&turn);
        }
        self.ui.set_status("Generation cancelled");
        true
    }

    pub fn clear_transcript(&mut self, now: Instant) {
        if let Some(turn) = self.session.cancel(now) {
            self.log_turn(&turn);
        }
        self.session.clear(now);
        self.ui.scroll_offset = 0;
        self.ui.auto_scroll = true;
        self.ui.set_status("Chat cleared");
    }

    /// Record the result of listing installed models.
    ///
    /// At startup this also settles the model to use and opens the picker
    /// when there is something to pick from.
    pub fn models_loaded(&mut self, result: Result<Vec<String>, ModelsError>, startup: bool) {
        match result {
            Ok(models) => {
                debug!(count = models.len(), "Models loaded");
                self.models = models;
                if startup {
                    let model = resolve_startup_model(self.preferred_model.as_deref());
                    self.session.set_model(model);
                    if !self.models.is_empty() {
                        self.open_model_picker();
                    }
                } else {
                    self.open_model_picker();
                }
            }
            Err(err) => {
                warn!(error = %err, "Could not list models");
                self.session.add_info(format!(
                    "Could not list models: {err}. Using {}.",
                    self.session.model()
                ));
            }
        }
    }

    pub fn open_model_picker(&mut self) {
        if self.models.is_empty() {
            self.ui.set_status("No models available");
            return;
        }
        self.picker = Some(PickerState::for_models(&self.models, self.session.model()));
    }

    pub fn close_picker(&mut self) {
        self.picker = None;
    }

    /// Use `model` for the next generation.
    pub fn select_model(&mut self, model: String) {
        self.picker = None;
        if model == self.session.model() {
            return;
        }
        debug!(model = %model, "Model selected");
        self.ui.set_status(format!("Model set to {model}"));
        self.session.set_model(model);
    }

    pub fn toggle_logging(&mut self) {
        match self.logging.toggle_logging() {
            Ok(message) | Err(message) => self.ui.set_status(message),
        }
    }

    fn log_turn(&mut self, turn: &ChatTurn) {
        if let Err(err) = self.logging.log_turn(turn) {
            warn!(error = %err, "Failed to write transcript log");
            self.ui.set_status(format!("Log write failed: {err}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{Config, SettingsOverrides};
    use crate::core::handoff::{handoff, ResponseFragment};
    use crate::core::message::TranscriptRole;
    use crate::core::session::GenerationState;
    use tokio_util::sync::CancellationToken;

    fn app() -> App {
        let settings = ChatSettings::resolve(&Config::default(), SettingsOverrides::default());
        App::new(
            &settings,
            LoadedTools::default(),
            LoggingState::disabled(),
        )
    }

    fn type_text(app: &mut App, text: &str) {
        app.ui.apply_textarea_edit(|ta| {
            ta.insert_str(text);
        });
    }

    #[test]
    fn submit_clears_input_and_starts_generation() {
        let mut app = app();
        type_text(&mut app, "hello");
        let request = app.submit_input().expect("request");
        assert_eq!(request.request.messages.len(), 1);
        assert_eq!(app.ui.get_input_text(), "");
        assert_eq!(app.session.state(), GenerationState::Requesting);
    }

    #[test]
    fn submit_while_generating_keeps_input() {
        let mut app = app();
        type_text(&mut app, "first");
        app.submit_input().expect("request");
        type_text(&mut app, "second");
        assert!(app.submit_input().is_none());
        assert_eq!(app.ui.get_input_text(), "second");
        assert!(app.ui.status.is_some());
        assert_eq!(app.session.transcript().len(), 1);
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut app = app();
        type_text(&mut app, "   ");
        assert!(app.submit_input().is_none());
        assert!(app.session.is_idle());
    }

    #[tokio::test]
    async fn streamed_reply_lands_in_transcript() {
        let mut app = app();
        type_text(&mut app, "hi");
        let request = app.submit_input().expect("request");
        let (sender, source) = handoff(request.cancel_token.clone());
        let now = Instant::now();
        app.stream_opened(request.generation, Ok(source), now);

        tokio::spawn(async move {
            sender.deliver(ResponseFragment::partial("Hel")).await.ok();
            sender.deliver(ResponseFragment::last("lo")).await.ok();
        });

        while app.is_generating() {
            let event = app.session.next_event().await;
            app.apply_stream_event(event, Instant::now());
        }

        let last = app.session.transcript().last().expect("reply");
        assert_eq!(last.role, TranscriptRole::Assistant);
        assert_eq!(last.text, "Hello");
    }

    #[test]
    fn cancel_reports_whether_anything_was_running() {
        let mut app = app();
        assert!(!app.cancel_generation(Instant::now()));
        type_text(&mut app, "hi");
        let request = app.submit_input().expect("request");
        assert!(app.cancel_generation(Instant::now()));
        assert!(request.cancel_token.is_cancelled());
        assert!(app.session.is_idle());
    }

    #[test]
    fn startup_models_keep_default_and_open_picker() {
        let mut app = app();
        app.models_loaded(Ok(vec!["llama3.2".into(), "qwen3:8b".into()]), true);
        assert_eq!(app.session.model(), DEFAULT_MODEL);
        let picker = app.picker.as_ref().expect("picker open");
        assert_eq!(picker.selected_item(), Some("llama3.2"));

        app.select_model("qwen3:8b".into());
        assert!(app.picker.is_none());
        assert_eq!(app.session.model(), "qwen3:8b");
    }

    #[test]
    fn empty_model_list_keeps_default_and_no_picker() {
        let mut app = app();
        app.models_loaded(Ok(Vec::new()), true);
        assert_eq!(app.session.model(), DEFAULT_MODEL);
        assert!(app.picker.is_none());
        app.open_model_picker();
        assert!(app.picker.is_none());
        assert_eq!(app.ui.status.as_deref(), Some("No models available"));
    }

    #[test]
    fn model_list_failure_adds_info_turn() {
        let mut app = app();
        let err = ModelsError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".into(),
        };
        app.models_loaded(Err(err), true);
        let last = app.session.transcript().last().expect("info turn");
        assert_eq!(last.role, TranscriptRole::AppInfo);
        assert!(last.text.contains(DEFAULT_MODEL));
    }

    #[test]
    fn clear_empties_transcript_and_cancels() {
        let mut app = app();
        type_text(&mut app, "hi");
        let request = app.submit_input().expect("request");
        app.clear_transcript(Instant::now());
        assert!(app.session.transcript().is_empty());
        assert!(request.cancel_token.is_cancelled());
        assert!(app.session.is_idle());
    }

    #[test]
    fn stale_open_result_is_ignored() {
        let mut app = app();
        type_text(&mut app, "hi");
        let first = app.submit_input().expect("request");
        app.cancel_generation(Instant::now());
        type_text(&mut app, "again");
        let second = app.submit_input().expect("request");

        let (_sender, stale) = handoff(CancellationToken::new());
        app.stream_opened(first.generation, Ok(stale), Instant::now());
        assert_eq!(app.session.state(), GenerationState::Requesting);
        assert_eq!(app.session.current_generation(), Some(second.generation));
    }

    #[test]
    fn model_fetch_failure_mid_stream_keeps_reply_whole() {
        let mut app = app();
        type_text(&mut app, "hi");
        let request = app.submit_input().expect("request");
        let (_sender, source) = handoff(request.cancel_token.clone());
        let now = Instant::now();
        app.stream_opened(request.generation, Ok(source), now);

        app.apply_stream_event(StreamEvent::Fragment(ResponseFragment::partial("Hel")), now);
        let err = ModelsError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".into(),
        };
        app.models_loaded(Err(err), false);
        app.apply_stream_event(StreamEvent::Fragment(ResponseFragment::last("lo")), now);

        let turns: Vec<_> = app
            .session
            .transcript()
            .turns()
            .iter()
            .map(|turn| (turn.role, turn.text.as_str()))
            .collect();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0], (TranscriptRole::User, "hi"));
        assert_eq!(turns[1].0, TranscriptRole::AppInfo);
        assert!(turns[1].1.starts_with("Could not list models"));
        assert_eq!(turns[2], (TranscriptRole::Assistant, "Hello"));
        assert!(app.session.is_idle());
    }
}
