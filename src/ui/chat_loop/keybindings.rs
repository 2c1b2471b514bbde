//! Key resolution for the chat screen.
//!
//! Keys are mapped to a [`KeyAction`] first so the mapping can be tested
//! without a terminal; the event loop then applies the action.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tui_textarea::{Input as TAInput, Key as TAKey};

use crate::core::app::App;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAction {
    LineUp,
    LineDown,
    PageUp,
    PageDown,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Submit,
    /// Esc: cancel a running generation, or quit when idle.
    CancelOrQuit,
    Quit,
    Clear,
    ToggleHelp,
    OpenPicker,
    ToggleLogging,
    Scroll(ScrollAction),
    NewLine,
    Edit,
    PickerUp,
    PickerDown,
    PickerTop,
    PickerBottom,
    PickerSelect,
    PickerClose,
    Ignore,
}

pub fn resolve_key(key: &KeyEvent, picker_open: bool) -> KeyAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);

    if ctrl && key.code == KeyCode::Char('c') {
        return KeyAction::Quit;
    }

    if picker_open {
        return match key.code {
            KeyCode::Up | KeyCode::Char('k') => KeyAction::PickerUp,
            KeyCode::Down | KeyCode::Char('j') => KeyAction::PickerDown,
            KeyCode::Home => KeyAction::PickerTop,
            KeyCode::End => KeyAction::PickerBottom,
            KeyCode::Enter => KeyAction::PickerSelect,
            KeyCode::Esc => KeyAction::PickerClose,
            _ => KeyAction::Ignore,
        };
    }

    match key.code {
        KeyCode::Enter
            if key
                .modifiers
                .intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) =>
        {
            KeyAction::NewLine
        }
        KeyCode::Enter => KeyAction::Submit,
        KeyCode::Esc => KeyAction::CancelOrQuit,
        KeyCode::F(1) => KeyAction::ToggleHelp,
        KeyCode::F(2) => KeyAction::OpenPicker,
        // Many terminals deliver Ctrl+H as Backspace with the control bit set
        KeyCode::Char('h') | KeyCode::Backspace if ctrl => KeyAction::ToggleHelp,
        KeyCode::Char('p') if ctrl => KeyAction::OpenPicker,
        KeyCode::Char('l') if ctrl => KeyAction::Clear,
        KeyCode::Char('g') if ctrl => KeyAction::ToggleLogging,
        KeyCode::Up => KeyAction::Scroll(ScrollAction::LineUp),
        KeyCode::Down => KeyAction::Scroll(ScrollAction::LineDown),
        KeyCode::PageUp => KeyAction::Scroll(ScrollAction::PageUp),
        KeyCode::PageDown => KeyAction::Scroll(ScrollAction::PageDown),
        // Shift+Home/End move the input cursor instead
        KeyCode::Home if !shift => KeyAction::Scroll(ScrollAction::Top),
        KeyCode::End if !shift => KeyAction::Scroll(ScrollAction::Bottom),
        _ => KeyAction::Edit,
    }
}

/// Forward an editing key to the input box.
pub fn apply_edit_key(app: &mut App, key: &KeyEvent) {
    let input = match key.code {
        KeyCode::Home if key.modifiers.contains(KeyModifiers::SHIFT) => TAInput {
            key: TAKey::Home,
            ..TAInput::default()
        },
        KeyCode::End if key.modifiers.contains(KeyModifiers::SHIFT) => TAInput {
            key: TAKey::End,
            ..TAInput::default()
        },
        _ => TAInput::from(*key),
    };
    app.ui.apply_textarea_edit(|ta| {
        ta.input(input);
    });
}

pub fn insert_newline(app: &mut App) {
    app.ui.apply_textarea_edit(|ta| ta.insert_newline());
}

/// Normalize pasted text for the input box.
pub fn sanitize_pasted_text(text: &str) -> String {
    let without_crlf = text.replace("\r\n", "\n");
    let without_cr = without_crlf.replace('\r', "\n");
    let expanded_tabs = without_cr.replace('\t', "    ");
    expanded_tabs
        .chars()
        .filter(|&c| c == '\n' || !c.is_control())
        .collect()
}
