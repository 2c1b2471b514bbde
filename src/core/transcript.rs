//! Ordered log of conversation turns.
//!
//! Only the most recent assistant turn may still be growing; everything
//! before it is immutable. The log is append-only apart from [`Transcript::clear`].

use crate::api::ChatMessage;
use crate::core::message::ChatTurn;

#[derive(Debug, Default, Clone)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
    live: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    /// Whether the last turn is an assistant reply that is still growing.
    pub fn has_live_turn(&self) -> bool {
        self.live
    }

    /// Append a finished turn. App-level turns arriving while a reply is
    /// growing go in front of it so the live turn stays last; any other turn
    /// finalizes the live turn first.
    pub fn push(&mut self, turn: ChatTurn) {
        if self.live && turn.role.is_app() {
            let at = self.turns.len().saturating_sub(1);
            self.turns.insert(at, turn);
            return;
        }
        self.live = false;
        self.turns.push(turn);
    }

    /// Append text to the live assistant turn, opening one if needed.
    pub fn append_live(&mut self, text: &str) {
        if self.live {
            if let Some(turn) = self.turns.last_mut() {
                turn.text.push_str(text);
                return;
            }
        }
        self.turns.push(ChatTurn::assistant(text));
        self.live = true;
    }

    /// Freeze the live turn, returning it if there was one.
    pub fn finalize_live(&mut self) -> Option<&ChatTurn> {
        if !std::mem::take(&mut self.live) {
            return None;
        }
        self.turns.last()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.live = false;
    }

    /// Conversation history in wire form, excluding app-level turns.
    pub fn api_messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .filter_map(ChatTurn::to_api_message)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::TranscriptRole;

    #[test]
    fn live_turn_accumulates_until_finalized() {
        let mut transcript = Transcript::new();
        transcript.push(ChatTurn::user("hi"));
        transcript.append_live("Hel");
        transcript.append_live("lo");
        assert!(transcript.has_live_turn());
        assert_eq!(transcript.len(), 2);

        let finalized = transcript.finalize_live().cloned().expect("live turn");
        assert_eq!(finalized, ChatTurn::assistant("Hello"));

        transcript.append_live("next");
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.turns()[1].text, "Hello");
    }

    #[test]
    fn finalize_without_live_turn_is_noop() {
        let mut transcript = Transcript::new();
        transcript.push(ChatTurn::user("hi"));
        assert!(transcript.finalize_live().is_none());
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn api_messages_skip_app_turns() {
        let mut transcript = Transcript::new();
        transcript.push(ChatTurn::user("one"));
        transcript.push(ChatTurn::app_error("Backend returned 500"));
        transcript.push(ChatTurn::user("two"));
        transcript.append_live("reply");

        let roles: Vec<_> = transcript
            .api_messages()
            .into_iter()
            .map(|m| (m.role, m.content))
            .collect();
        assert_eq!(
            roles,
            vec![
                ("user".to_string(), "one".to_string()),
                ("user".to_string(), "two".to_string()),
                ("assistant".to_string(), "reply".to_string()),
            ]
        );
    }

    #[test]
    fn clear_drops_everything_including_live_turn() {
        let mut transcript = Transcript::new();
        transcript.push(ChatTurn::user("hi"));
        transcript.append_live("partial");
        transcript.clear();
        assert!(transcript.is_empty());
        assert!(!transcript.has_live_turn());

        transcript.append_live("fresh");
        assert_eq!(transcript.turns()[0].role, TranscriptRole::Assistant);
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn app_turn_during_live_reply_goes_before_it() {
        let mut transcript = Transcript::new();
        transcript.push(ChatTurn::user("hi"));
        transcript.append_live("Hel");
        transcript.push(ChatTurn::app_info("note"));
        transcript.append_live("lo");

        assert!(transcript.has_live_turn());
        assert_eq!(
            transcript.turns(),
            &[
                ChatTurn::user("hi"),
                ChatTurn::app_info("note"),
                ChatTurn::assistant("Hello"),
            ]
        );
        assert_eq!(transcript.finalize_live(), Some(&ChatTurn::assistant("Hello")));
    }
}
