use ollama_chat_core::{Message, Sender};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode, SUGGESTIONS};

/// Tallest the input box grows before it scrolls
const MAX_INPUT_LINES: u16 = 6;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after_open = &rest[start + 2..];
        match after_open.find("**") {
            Some(end) if end > 0 => {
                if start > 0 {
                    spans.push(Span::raw(rest[..start].to_string()));
                }
                spans.push(Span::styled(
                    after_open[..end].to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
                rest = &after_open[end + 2..];
            }
            // No closing **, treat as literal
            _ => break,
        }
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let suggestions_height = if app.show_suggestions() {
        SUGGESTIONS.len() as u16 + 2
    } else {
        0
    };
    let input_lines = (app.input.matches('\n').count() as u16 + 1).min(MAX_INPUT_LINES);

    let [header_area, chat_area, suggestions_area, input_area, footer_area] =
        Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(suggestions_height),
            Constraint::Length(input_lines + 2),
            Constraint::Length(1),
        ])
        .areas(area);

    render_header(frame, header_area);
    render_chat(app, frame, chat_area);
    if suggestions_height > 0 {
        render_suggestions(frame, suggestions_area);
    }
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Ollama Chat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            "Powered by your local Ollama model",
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn message_lines(msg: &Message) -> Vec<Line<'static>> {
    let (label, color) = match (msg.sender, msg.is_error) {
        (Sender::User, _) => ("You", Color::Cyan),
        (Sender::Assistant, false) => ("AI", Color::Yellow),
        (Sender::Assistant, true) => ("AI (error)", Color::Red),
    };
    let alignment = match msg.sender {
        Sender::User => Alignment::Right,
        Sender::Assistant => Alignment::Left,
    };

    let mut lines = Vec::new();
    lines.push(
        Line::from(vec![
            Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("  {}", msg.time_label()),
                Style::default().fg(Color::DarkGray),
            ),
        ])
        .alignment(alignment),
    );

    for line in msg.content.lines() {
        let rendered = match (msg.sender, msg.is_error) {
            (Sender::Assistant, false) => parse_markdown_line(line),
            (Sender::Assistant, true) => {
                Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Red)))
            }
            (Sender::User, _) => Line::from(line.to_string()),
        };
        lines.push(rendered.alignment(alignment));
    }
    lines.push(Line::default());
    lines
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let snapshot = app.chat.snapshot();
    lines.extend(snapshot.messages.iter().flat_map(message_lines));

    if snapshot.is_loading {
        lines.push(Line::from(Span::styled(
            "AI",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("AI is thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true });

    // Chat area for mouse hit-testing, wrapped height for scroll limits
    let inner_width = area.width.saturating_sub(2);
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_content_height = u16::try_from(chat.line_count(inner_width)).unwrap_or(u16::MAX);
    if app.follow_tail {
        app.scroll_chat_to_bottom();
    }

    let border_color = if app.input_mode == InputMode::Normal {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", app.model));

    frame.render_widget(chat.block(block).scroll((app.chat_scroll, 0)), area);
}

fn render_suggestions(frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = SUGGESTIONS
        .iter()
        .enumerate()
        .map(|(i, suggestion)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {} ", i + 1), Style::default().fg(Color::Cyan).bold()),
                Span::raw(*suggestion),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Try asking about (Esc, then 1-4) "),
    );
    frame.render_widget(list, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if app.is_loading() {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        Color::Gray
    };

    let title = if app.is_loading() {
        " Waiting for reply... "
    } else {
        " Message (Enter to send, Alt+Enter for new line) "
    };
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);
    let char_count = app.input.chars().count();
    if char_count > 0 {
        block = block.title_bottom(
            Line::from(format!(" {} characters ", char_count)).alignment(Alignment::Right),
        );
    }

    // Scroll so the cursor stays inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let (row, col) = app.cursor_row_col();
    let col_offset = if inner_width > 0 && col >= inner_width {
        col - inner_width + 1
    } else {
        0
    };
    let row_offset = if inner_height > 0 && row >= inner_height {
        row - inner_height + 1
    } else {
        0
    };

    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(Color::Cyan))
        .block(block)
        .scroll((row_offset as u16, col_offset as u16));
    frame.render_widget(input, area);

    if editing {
        frame.set_cursor_position((
            area.x + (col - col_offset) as u16 + 1,
            area.y + (row - row_offset) as u16 + 1,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = vec![Span::styled(mode_text, mode_style)];
    let pairs: &[(&str, &str)] = match app.input_mode {
        InputMode::Normal => &[
            (" i ", " type "),
            (" j/k ", " scroll "),
            (" c ", " clear "),
            (" q ", " quit "),
        ],
        InputMode::Editing => &[
            (" Enter ", " send "),
            (" Esc ", " normal "),
            (" ^L ", " clear "),
            (" ^C ", " quit "),
        ],
    };
    for (key, label) in pairs {
        hints.push(Span::styled(*key, key_style));
        hints.push(Span::styled(*label, label_style));
    }

    let last_failed = app.chat.messages().last().is_some_and(|msg| msg.is_error);
    let (status_color, status_text) = if last_failed {
        (Color::Red, "Ollama unreachable")
    } else {
        (Color::Green, "Connected to Ollama")
    };
    let count = app.chat.len();
    let noun = if count == 1 { "message" } else { "messages" };

    let status = Line::from(vec![
        Span::styled("● ", Style::default().fg(status_color)),
        Span::raw(status_text),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::raw(app.model.clone()),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::raw(app.server_host().to_string()),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::raw(format!("{count} {noun} ")),
    ])
    .alignment(Alignment::Right);

    let [hints_area, status_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(status.width() as u16)])
            .areas(area);

    frame.render_widget(Paragraph::new(Line::from(hints)), hints_area);
    frame.render_widget(Paragraph::new(status), status_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use crate::tui::AppEvent;
    use ratatui::{backend::TestBackend, Terminal};

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn bold_markdown_becomes_styled_span() {
        let line = parse_markdown_line("a **b** c");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "b");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(plain(&line), "a b c");
    }

    #[test]
    fn unclosed_markdown_stays_literal() {
        let line = parse_markdown_line("a **b");
        assert_eq!(plain(&line), "a **b");
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn renders_greeting_suggestions_and_status() {
        let (mut app, _rx) = test_app();
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();

        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("Ollama Chat"));
        assert!(text.contains("How can I help you today?"));
        assert!(text.contains("Explain quantum computing"));
        assert!(text.contains("localhost:8000"));
        assert!(text.contains("Connected to Ollama"));
        assert!(text.contains("1 message "));
    }

    #[tokio::test]
    async fn renders_thinking_indicator_and_hides_suggestions_while_loading() {
        let (mut app, _rx) = test_app();
        app.input = "hello".to_string();
        app.submit_input();
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();

        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("AI is thinking"));
        assert!(text.contains("Waiting for reply"));
        assert!(!text.contains("Explain quantum computing"));
    }

    #[tokio::test]
    async fn status_bar_reports_failed_request() {
        let (mut app, mut rx) = test_app();
        app.input = "fail".to_string();
        app.submit_input();
        let Some(AppEvent::Response { ticket, result }) = rx.recv().await else {
            panic!("expected a response event");
        };
        app.finish_request(ticket, result);
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();

        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("Ollama unreachable"));
        assert!(!text.contains("Connected to Ollama"));
        assert!(text.contains("3 messages"));
    }

    /// Text of the chat pane rows, without borders
    fn chat_rows(terminal: &Terminal<TestBackend>, app: &App) -> Vec<String> {
        let area = app.chat_area.unwrap();
        let buffer = terminal.backend().buffer();
        (area.y + 1..area.y + area.height - 1)
            .map(|y| {
                (area.x + 1..area.x + area.width - 1)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect()
            })
            .collect()
    }

    #[tokio::test]
    async fn long_word_wrapped_reply_is_fully_reachable() {
        let (mut app, mut rx) = test_app();
        let words = ["abcdefg", "hijklmn"];
        let mut prompt: Vec<&str> = (0..29).map(|i| words[i % 2]).collect();
        prompt.push("END");
        app.input = prompt.join(" ");
        app.submit_input();
        let Some(AppEvent::Response { ticket, result }) = rx.recv().await else {
            panic!("expected a response event");
        };
        app.finish_request(ticket, result);
        let mut terminal = Terminal::new(TestBackend::new(22, 16)).unwrap();

        // Following the tail lands on the reply's last row
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        let rows = chat_rows(&terminal, &app);
        let last_text = rows.iter().rev().find(|row| !row.trim().is_empty()).unwrap();
        assert!(last_text.contains("END"), "bottom row was {last_text:?}");

        // Scrolling down manually from the top gets there too
        app.scroll_to_top();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        for _ in 0..200 {
            app.scroll_down(1);
        }
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        let rows = chat_rows(&terminal, &app);
        assert!(rows.iter().any(|row| row.contains("END")));
        assert!(app.follow_tail);
    }
}
