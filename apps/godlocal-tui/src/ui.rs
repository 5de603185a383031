//! Terminal rendering.
//!
//! Four stacked regions: a one-line header, the transcript viewport, a
//! one-line status strip and the bordered input box. Wrapping is done
//! here by display width so the scroll math in [`crate::scroll`] can
//! work in whole lines.

use crate::app::App;
use godlocal_client::ConnectionState;
use godlocal_session::{Message, Persona, Role, find_persona};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Paragraph};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub fn draw(frame: &mut Frame, app: &mut App) {
    let [header, transcript, status, input] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
        Constraint::Length(3),
    ])
    .areas(frame.area());

    draw_header(frame, app, header);
    draw_transcript(frame, app, transcript);
    draw_status(frame, app, status);
    draw_input(frame, app, input);
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let (badge, badge_style) = match app.connection {
        ConnectionState::Connected => ("● online", Style::default().fg(Color::Green)),
        ConnectionState::Connecting => ("◌ connecting", Style::default().fg(Color::Yellow)),
        ConnectionState::Disconnected => ("○ offline", Style::default().fg(Color::Red)),
    };

    let mut spans = vec![
        Span::styled(
            format!("{} {}", app.persona.icon, app.persona.name),
            Style::default()
                .fg(persona_color(app.persona))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!("session {}", app.service.session_id()),
            Style::default().add_modifier(Modifier::DIM),
        ),
        Span::raw("  "),
        Span::styled(badge, badge_style),
    ];
    if app.sovereign_mode {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            "⚡ sovereign",
            Style::default().fg(Color::Magenta),
        ));
    }
    if app.kill_switch {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            "⛔ kill switch",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }
    if let Some(version) = app
        .health
        .as_ref()
        .and_then(|health| health.version.as_deref())
    {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("v{version}"),
            Style::default().add_modifier(Modifier::DIM),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_transcript(frame: &mut Frame, app: &mut App, area: Rect) {
    let width = area.width.max(1) as usize;

    let mut lines: Vec<Line> = Vec::new();
    for (index, message) in app.transcript.entries().iter().enumerate() {
        if index > 0 {
            lines.push(Line::default());
        }
        lines.extend(message_lines(message, width));
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "ask anything · /help lists commands",
            Style::default().add_modifier(Modifier::DIM),
        )));
    }

    let viewport = area.height as usize;
    let max_offset = lines.len().saturating_sub(viewport);
    app.scroll.clamp_to(max_offset);
    let offset = u16::try_from(app.scroll.offset()).unwrap_or(u16::MAX);

    frame.render_widget(Paragraph::new(Text::from(lines)).scroll((offset, 0)), area);
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();
    if app.busy {
        let spinner = SPINNER[app.tick as usize % SPINNER.len()];
        spans.push(Span::styled(
            format!("{spinner} thinking…"),
            Style::default().fg(Color::Cyan),
        ));
    } else if let Some(status) = &app.status_line {
        spans.push(Span::styled(
            status.clone(),
            Style::default().fg(Color::Yellow),
        ));
    } else {
        spans.push(Span::styled(
            "Enter to send · /help for commands · Ctrl+C to quit",
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    if !app.attachments.is_empty() {
        spans.push(Span::styled(
            format!("  📎 {}", app.attachments.len()),
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    if !app.scroll.is_following() {
        spans.push(Span::styled(
            "  ↓ PgDn to follow",
            Style::default().add_modifier(Modifier::DIM),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_input(frame: &mut Frame, app: &App, area: Rect) {
    let title = if app.sovereign_mode {
        format!("⚡ {} · sovereign", app.persona.name)
    } else {
        format!("{} {}", app.persona.icon, app.persona.name)
    };
    let block = Block::bordered().title(Span::styled(
        title,
        Style::default().fg(persona_color(app.persona)),
    ));
    let inner = block.inner(area);
    let inner_width = inner.width.max(1) as usize;

    // Keep the cursor visible by scrolling the line horizontally once it
    // outgrows the box.
    let cursor_column = app.input[..app.byte_index()].width();
    let scroll_x = cursor_column.saturating_sub(inner_width.saturating_sub(1));

    frame.render_widget(
        Paragraph::new(app.input.as_str())
            .block(block)
            .scroll((0, u16::try_from(scroll_x).unwrap_or(u16::MAX))),
        area,
    );
    frame.set_cursor_position(Position::new(
        inner.x + u16::try_from(cursor_column - scroll_x).unwrap_or(0),
        inner.y,
    ));
}

fn message_lines(message: &Message, width: usize) -> Vec<Line<'static>> {
    match message.role {
        Role::User => {
            let mut lines = vec![Line::from("you".cyan().bold())];
            push_wrapped(&mut lines, &message.content, width, "  ", Style::default());
            lines
        }
        Role::Agent => {
            let color = author_color(message.author.as_deref());
            let mut header = vec![Span::styled(
                author_label(message.author.as_deref()),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )];
            if let Some(model) = &message.model {
                header.push(Span::styled(
                    format!(" · {model}"),
                    Style::default().add_modifier(Modifier::DIM),
                ));
            }
            let mut lines = vec![Line::from(header)];
            push_wrapped(&mut lines, &message.content, width, "  ", Style::default());
            if message.streaming
                && let Some(last) = lines.last_mut()
            {
                last.push_span(Span::styled("▌", Style::default().fg(color)));
            }
            lines
        }
        Role::ToolEvent => {
            let mut lines = Vec::new();
            push_wrapped(
                &mut lines,
                &message.content,
                width,
                "  ",
                Style::default().add_modifier(Modifier::DIM),
            );
            lines
        }
        Role::System => {
            let mut lines = Vec::new();
            push_wrapped(
                &mut lines,
                &message.content,
                width,
                "",
                Style::default().fg(Color::Yellow),
            );
            lines
        }
    }
}

fn push_wrapped(
    lines: &mut Vec<Line<'static>>,
    text: &str,
    width: usize,
    indent: &str,
    style: Style,
) {
    let content_width = width.saturating_sub(indent.width()).max(1);
    for wrapped in wrap_text(text, content_width) {
        lines.push(Line::from(Span::styled(
            format!("{indent}{wrapped}"),
            style,
        )));
    }
}

/// Greedy word wrap by display width; words wider than the viewport are
/// split on character boundaries.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for raw in text.split('\n') {
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        let mut current_width = 0;

        for word in raw.split(' ') {
            let word_width = word.width();
            if word_width > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0;
                }
                let mut piece = String::new();
                let mut piece_width = 0;
                for c in word.chars() {
                    let char_width = c.width().unwrap_or(0);
                    if piece_width + char_width > width && !piece.is_empty() {
                        lines.push(std::mem::take(&mut piece));
                        piece_width = 0;
                    }
                    piece.push(c);
                    piece_width += char_width;
                }
                current = piece;
                current_width = piece_width;
                continue;
            }

            let needed = if current.is_empty() {
                word_width
            } else {
                word_width + 1
            };
            if current_width + needed > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            if !current.is_empty() {
                current.push(' ');
                current_width += 1;
            }
            current.push_str(word);
            current_width += word_width;
        }
        lines.push(current);
    }

    lines
}

fn author_label(author: Option<&str>) -> String {
    match author.and_then(find_persona) {
        Some(persona) => format!("{} {}", persona.icon, persona.name),
        None => author.unwrap_or("agent").to_string(),
    }
}

fn author_color(author: Option<&str>) -> Color {
    match author.and_then(find_persona) {
        Some(persona) => persona_color(persona),
        None => Color::Green,
    }
}

fn persona_color(persona: &Persona) -> Color {
    let (r, g, b) = persona.color;
    Color::Rgb(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use godlocal_protocol::StreamFrame;
    use godlocal_session::Transcript;

    #[test]
    fn wrap_respects_display_width() {
        assert_eq!(
            wrap_text("one two three four", 9),
            vec!["one two", "three", "four"]
        );
        assert_eq!(wrap_text("привет мир", 6), vec!["привет", "мир"]);
    }

    #[test]
    fn wide_words_are_split_on_character_boundaries() {
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        // CJK characters take two columns each.
        assert_eq!(wrap_text("你好世界", 4), vec!["你好", "世界"]);
    }

    #[test]
    fn blank_lines_are_preserved() {
        assert_eq!(wrap_text("a\n\nb", 10), vec!["a", "", "b"]);
        assert_eq!(wrap_text("", 10), vec![""]);
    }

    #[test]
    fn streaming_agent_lines_end_with_a_cursor() {
        let mut transcript = Transcript::new();
        transcript.apply(&StreamFrame::Token {
            text: "Hel".to_string(),
        });

        let lines = message_lines(&transcript.entries()[0], 40);
        assert_eq!(lines.len(), 2);
        let last_span = lines
            .last()
            .and_then(|line| line.spans.last())
            .map(|span| span.content.as_ref());
        assert_eq!(last_span, Some("▌"));

        transcript.apply(&StreamFrame::Done);
        let settled = message_lines(&transcript.entries()[0], 40);
        let last_span = settled
            .last()
            .and_then(|line| line.spans.last())
            .map(|span| span.content.as_ref());
        assert_eq!(last_span, Some("  Hel"));
    }

    #[test]
    fn tool_events_render_without_an_author_line() {
        let mut transcript = Transcript::new();
        transcript.apply(&StreamFrame::Tool {
            name: "web_search".to_string(),
            query: "btc".to_string(),
        });

        let lines = message_lines(&transcript.entries()[0], 60);
        assert_eq!(lines.len(), 1);
        let rendered = lines[0]
            .spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect::<String>();
        assert!(rendered.contains("поиск"));
        assert!(rendered.starts_with("  "));
    }

    #[test]
    fn authors_resolve_through_the_roster() {
        assert_eq!(author_label(Some("architect")), "🏛 Architect");
        assert_eq!(author_label(Some("mystery")), "mystery");
        assert_eq!(author_color(Some("mystery")), Color::Green);
        assert_eq!(
            author_color(Some("godlocal")),
            Color::Rgb(0x00, 0xFF, 0x9D)
        );
    }
}
