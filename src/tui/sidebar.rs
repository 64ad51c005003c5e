//! Sidebar widget: conversation list with presence dots and unread badges.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::models::Conversation;

/// Sidebar navigation state. The conversation data itself lives in the store.
pub struct SidebarState {
    /// Index into the store's conversation collection.
    pub selected: usize,
    /// Whether the initial fetch is still in flight.
    pub loading: bool,
}

impl Default for SidebarState {
    fn default() -> Self {
        Self {
            selected: 0,
            loading: true,
        }
    }
}

impl SidebarState {
    pub fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn move_down(&mut self, len: usize) {
        if len > 0 && self.selected + 1 < len {
            self.selected += 1;
        }
    }

    /// Keep the selection inside the collection after it changes size.
    pub fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }
}

/// Render the sidebar into the given area.
pub fn render(
    area: Rect,
    buf: &mut Buffer,
    conversations: &[Conversation],
    state: &SidebarState,
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

    let block = Block::default()
        .title(" Chats ")
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style);
    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    if state.loading {
        Paragraph::new(Line::from(Span::styled(
            " loading...",
            Style::default().fg(Color::DarkGray),
        )))
        .render(inner, buf);
        return;
    }

    if conversations.is_empty() {
        Paragraph::new(Line::from(Span::styled(
            " (no conversations)",
            Style::default().fg(Color::DarkGray),
        )))
        .render(inner, buf);
        return;
    }

    // Scroll so the selection stays visible.
    let visible = inner.height as usize;
    let scroll = state.selected.saturating_sub(visible.saturating_sub(1));

    for (row, (idx, conv)) in conversations
        .iter()
        .enumerate()
        .skip(scroll)
        .take(visible)
        .enumerate()
    {
        let y = inner.y + row as u16;
        let is_selected = idx == state.selected;

        let (dot, dot_color) = if conv.online {
            ("*", Color::Green)
        } else {
            ("o", Color::DarkGray)
        };

        let badge = if conv.unread > 0 {
            format!(" ({})", conv.unread)
        } else {
            String::new()
        };

        let avail = (inner.width as usize).saturating_sub(3 + badge.width());
        let name = truncate_to_width(&conv.name, avail);

        let name_style = if is_selected {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else if conv.unread > 0 {
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };

        let line = Line::from(vec![
            Span::styled(format!(" {} ", dot), Style::default().fg(dot_color)),
            Span::styled(name, name_style),
            Span::styled(badge, Style::default().fg(Color::Cyan)),
        ]);

        Paragraph::new(line).render(Rect::new(inner.x, y, inner.width, 1), buf);
    }
}

/// Truncate a string to the given display width, appending nothing.
fn truncate_to_width(s: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + w > max_width {
            break;
        }
        width += w;
        out.push(ch);
    }
    out
}
