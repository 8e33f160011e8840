use ollama_chat_core::{ChatController, PendingRequest, Submission, Transport, TransportError};
use ratatui::layout::Rect;
use tracing::debug;

use crate::tui::{AppEvent, EventSender};

/// Prompts offered while the conversation only holds the greeting
pub const SUGGESTIONS: [&str; 4] = [
    "Explain quantum computing in simple terms",
    "Write a Python function to sort a list",
    "Help me debug this JavaScript code",
    "Create a React component for a todo list",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Conversation
    pub chat: ChatController,
    pub model: String,

    // Input box (cursor is a char index, not a byte index)
    pub input: String,
    pub cursor: usize,

    // Chat view
    pub chat_scroll: u16,
    pub follow_tail: bool,
    pub chat_height: u16,
    /// Wrapped height of the chat content, measured on the last render
    pub chat_content_height: u16,
    pub chat_area: Option<Rect>,

    // 0-2 for ellipsis animation
    pub animation_frame: u8,

    events: EventSender,
}

impl App {
    pub fn new(chat: ChatController, model: impl Into<String>, events: EventSender) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            chat,
            model: model.into(),
            input: String::new(),
            cursor: 0,
            chat_scroll: 0,
            follow_tail: true,
            chat_height: 0,
            chat_content_height: 0,
            chat_area: None,
            animation_frame: 0,
            events,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.chat.is_loading()
    }

    /// Suggestions are only offered on a fresh, idle conversation
    pub fn show_suggestions(&self) -> bool {
        self.chat.is_fresh() && !self.chat.is_loading()
    }

    /// Host and port of the inference server, for the status bar
    pub fn server_host(&self) -> &str {
        let url = self.chat.server_url();
        let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
        without_scheme.trim_end_matches('/')
    }

    /// Send the input box contents. Ignored while a request is in flight.
    pub fn submit_input(&mut self) {
        if self.chat.is_loading() {
            return;
        }

        let ticket = match self.chat.begin(&self.input) {
            Submission::Dispatched(ticket) => ticket,
            Submission::Skipped | Submission::Busy => return,
        };

        self.input.clear();
        self.cursor = 0;
        self.follow_tail = true;

        let transport = self.chat.transport();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = transport.send(ticket.prompt()).await;
            if events.send(AppEvent::Response { ticket, result }).is_err() {
                debug!("Event loop gone before the reply arrived");
            }
        });
    }

    pub fn finish_request(&mut self, ticket: PendingRequest, result: Result<String, TransportError>) {
        self.chat.complete(ticket, result);
        self.follow_tail = true;
    }

    pub fn reset_conversation(&mut self) {
        self.chat.reset();
        self.chat_scroll = 0;
        self.follow_tail = true;
    }

    pub fn apply_suggestion(&mut self, index: usize) {
        if !self.show_suggestions() {
            return;
        }
        if let Some(suggestion) = SUGGESTIONS.get(index) {
            self.input = suggestion.to_string();
            self.cursor = self.input.chars().count();
            self.input_mode = InputMode::Editing;
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Input editing

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    /// Row and column of the cursor inside the (possibly multi-line) input
    pub fn cursor_row_col(&self) -> (usize, usize) {
        let before: String = self.input.chars().take(self.cursor).collect();
        let row = before.matches('\n').count();
        let col = before
            .rsplit('\n')
            .next()
            .map_or(0, |line| line.chars().count());
        (row, col)
    }

    // Chat scrolling

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max_scroll = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max_scroll);
        self.follow_tail = self.chat_scroll >= max_scroll;
    }

    pub fn scroll_to_top(&mut self) {
        self.follow_tail = false;
        self.chat_scroll = 0;
    }

    /// Keep the newest message (or the thinking indicator) in view
    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
        self.follow_tail = true;
    }

    fn max_scroll(&self) -> u16 {
        self.chat_content_height.saturating_sub(self.visible_height())
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Echoes the prompt back, or fails when asked to
    pub(crate) struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn send(&self, prompt: &str) -> Result<String, TransportError> {
            if prompt == "fail" {
                Err(TransportError::Status(500))
            } else {
                Ok(format!("echo: {prompt}"))
            }
        }
    }

    pub(crate) fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let chat = ChatController::new(Arc::new(EchoTransport), "http://localhost:8000");
        (App::new(chat, "mistral", tx), rx)
    }

    #[test]
    fn editing_handles_multibyte_characters() {
        let (mut app, _rx) = test_app();
        for c in "héllo".chars() {
            app.insert_char(c);
        }
        app.cursor_left();
        app.backspace();
        assert_eq!(app.input, "hélo");
        app.cursor_home();
        app.delete();
        assert_eq!(app.input, "élo");
        app.cursor_end();
        assert_eq!(app.cursor, 3);
    }

    #[test]
    fn cursor_row_col_tracks_newlines() {
        let (mut app, _rx) = test_app();
        app.input = "ab\ncde".to_string();
        app.cursor = 5;
        assert_eq!(app.cursor_row_col(), (1, 2));
        app.cursor = 2;
        assert_eq!(app.cursor_row_col(), (0, 2));
    }

    #[test]
    fn server_host_strips_scheme() {
        let (app, _rx) = test_app();
        assert_eq!(app.server_host(), "localhost:8000");
    }

    #[test]
    fn suggestion_fills_input_only_when_fresh() {
        let (mut app, _rx) = test_app();
        app.apply_suggestion(1);
        assert_eq!(app.input, SUGGESTIONS[1]);
        assert_eq!(app.cursor, SUGGESTIONS[1].chars().count());

        app.apply_suggestion(9);
        assert_eq!(app.input, SUGGESTIONS[1]);
    }

    #[tokio::test]
    async fn submit_round_trips_through_event_channel() {
        let (mut app, mut rx) = test_app();
        app.input = "hello".to_string();
        app.cursor = 5;

        app.submit_input();

        assert!(app.input.is_empty());
        assert!(app.is_loading());
        assert!(!app.show_suggestions());
        assert_eq!(app.chat.len(), 2);

        let Some(AppEvent::Response { ticket, result }) = rx.recv().await else {
            panic!("expected a response event");
        };
        app.finish_request(ticket, result);

        assert!(!app.is_loading());
        assert_eq!(app.chat.messages().last().unwrap().content, "echo: hello");
    }

    #[tokio::test]
    async fn submit_is_ignored_while_loading() {
        let (mut app, mut rx) = test_app();
        app.input = "first".to_string();
        app.submit_input();

        app.input = "second".to_string();
        app.submit_input();

        assert_eq!(app.input, "second");
        assert_eq!(app.chat.len(), 2);

        let Some(AppEvent::Response { ticket, result }) = rx.recv().await else {
            panic!("expected a response event");
        };
        app.finish_request(ticket, result);
        assert_eq!(app.chat.len(), 3);
    }

    #[test]
    fn scroll_down_stops_at_measured_content_height() {
        let (mut app, _rx) = test_app();
        app.chat_height = 10;
        app.chat_content_height = 25;

        app.scroll_to_top();
        app.scroll_down(7);
        assert_eq!(app.chat_scroll, 7);
        assert!(!app.follow_tail);

        app.scroll_down(100);
        assert_eq!(app.chat_scroll, 15);
        assert!(app.follow_tail);
    }
}
