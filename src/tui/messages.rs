//! Messages pane: renders the store's current-message projection.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use crate::models::{Conversation, MessageKind, MessageView};

/// Scroll state for the messages pane.
#[derive(Default)]
pub struct MessagesState {
    /// Lines scrolled up from the bottom. 0 = stick to the newest message.
    pub scroll_from_bottom: usize,
}

impl MessagesState {
    pub fn scroll_up(&mut self) {
        self.scroll_from_bottom += 1;
    }

    pub fn scroll_down(&mut self) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(1);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_from_bottom = 0;
    }
}

/// Render the messages pane.
///
/// With no current conversation resolvable, renders the neutral
/// "select a conversation" placeholder -- never an error.
pub fn render(
    area: Rect,
    buf: &mut Buffer,
    current: Option<&Conversation>,
    views: &[MessageView],
    state: &MessagesState,
    focused: bool,
) {
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let border_type = if focused {
        BorderType::Double
    } else {
        BorderType::Plain
    };

    let title = match current {
        Some(conv) => {
            let presence = if conv.online {
                "online".to_string()
            } else {
                conv.last_seen
                    .clone()
                    .map(|t| format!("last seen {}", t))
                    .unwrap_or_else(|| "offline".to_string())
            };
            format!(" {} -- {} ", conv.name, presence)
        }
        None => " Messages ".to_string(),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style);
    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    if current.is_none() {
        let placeholder = Paragraph::new(Line::from(Span::styled(
            "Select a conversation",
            Style::default().fg(Color::DarkGray),
        )))
        .centered();
        let y = inner.y + inner.height / 2;
        placeholder.render(Rect::new(inner.x, y, inner.width, 1), buf);
        return;
    }

    // Build the flat line buffer, oldest first.
    let width = inner.width as usize;
    let mut lines: Vec<Line> = Vec::new();
    for view in views {
        push_message_lines(&mut lines, view, width);
    }

    // Scroll anchored to the bottom so new messages stay in view.
    let visible = inner.height as usize;
    let max_offset = lines.len().saturating_sub(visible);
    let offset = max_offset.saturating_sub(state.scroll_from_bottom.min(max_offset));

    for (row, line) in lines.iter().skip(offset).take(visible).enumerate() {
        let y = inner.y + row as u16;
        Paragraph::new(line.clone()).render(Rect::new(inner.x, y, inner.width, 1), buf);
    }
}

/// Render one message into the line buffer.
fn push_message_lines(lines: &mut Vec<Line<'static>>, view: &MessageView, width: usize) {
    let text_style = if view.outgoing {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::White)
    };
    let meta_style = Style::default().fg(Color::DarkGray);

    let prefix = if view.outgoing { "you" } else { "them" };
    let tag = kind_tag(view.kind);
    let header = if view.time.is_empty() {
        format!(" {}{}", prefix, tag)
    } else {
        format!(" {} {}{}", view.time, prefix, tag)
    };
    lines.push(Line::from(Span::styled(header, meta_style)));

    let body_width = width.saturating_sub(3);
    for wrapped in wrap_text(&view.text, body_width.max(1)) {
        lines.push(Line::from(Span::styled(
            format!("   {}", wrapped),
            text_style,
        )));
    }

    for attachment in &view.attachments {
        lines.push(Line::from(Span::styled(
            format!("   [attachment: {}]", attachment.name),
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::ITALIC),
        )));
    }
}

fn kind_tag(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Text => "",
        MessageKind::Link => " [link]",
        MessageKind::Image => " [image]",
        MessageKind::Document => " [document]",
        MessageKind::Reply => " [reply]",
    }
}

/// Simple word-wrapping: split content by newlines first, then wrap long lines.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut out = Vec::new();
    for raw_line in text.split('\n') {
        if raw_line.chars().count() <= max_width {
            out.push(raw_line.to_string());
            continue;
        }
        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            let candidate_len = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if candidate_len > max_width && !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            out.push(current);
        }
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_short_line_untouched() {
        assert_eq!(wrap_text("hello", 10), vec!["hello"]);
    }

    #[test]
    fn test_wrap_text_wraps_on_word_boundaries() {
        let wrapped = wrap_text("one two three four", 9);
        assert!(wrapped.iter().all(|l| l.chars().count() <= 9));
        assert_eq!(wrapped.join(" "), "one two three four");
    }

    #[test]
    fn test_wrap_text_empty() {
        assert_eq!(wrap_text("", 10), vec![""]);
    }
}
