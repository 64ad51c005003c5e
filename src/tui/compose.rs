//! Compose box: single-line text input with horizontal scrolling.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
    Frame,
};

/// Height of the compose box: 1 border + 1 input + 1 border.
pub const COMPOSE_HEIGHT: u16 = 3;

/// Compose input state. The cursor is a byte offset into `input`, kept on a
/// char boundary by construction.
#[derive(Default)]
pub struct ComposeState {
    pub input: String,
    cursor: usize,
}

impl ComposeState {
    pub fn insert_char(&mut self, c: char) {
        self.input.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.input.remove(prev);
            self.cursor = prev;
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.len() {
            self.input.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.cursor = prev;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(c) = self.input[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.input.len();
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    /// Take the trimmed input for sending. Whitespace-only input yields
    /// nothing and the box is left untouched.
    pub fn send(&mut self) -> Option<String> {
        let text = self.input.trim();
        if text.is_empty() {
            return None;
        }
        let text = text.to_string();
        self.clear();
        Some(text)
    }

    /// Cursor position as a character column, for display math.
    pub fn cursor_column(&self) -> usize {
        self.input[..self.cursor].chars().count()
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.input[..self.cursor].char_indices().last().map(|(i, _)| i)
    }
}

/// Render the compose box into the given area.
pub fn render(
    area: Rect,
    frame: &mut Frame,
    state: &ComposeState,
    conversation_name: Option<&str>,
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
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let input_area = Rect::new(inner.x, inner.y, inner.width, 1);
    let cursor = compute_cursor_position(input_area, state, focused);
    render_input(input_area, frame.buffer_mut(), state, conversation_name);

    if let Some((cx, cy)) = cursor {
        frame.set_cursor_position((cx, cy));
    }
}

fn compute_cursor_position(
    input_area: Rect,
    state: &ComposeState,
    focused: bool,
) -> Option<(u16, u16)> {
    if !focused {
        return None;
    }

    if state.input.is_empty() {
        Some((input_area.x + 1, input_area.y))
    } else {
        let w = input_area.width as usize;
        let (_, cursor_offset) = visible_window(&state.input, state.cursor_column(), w);
        Some((input_area.x + 1 + cursor_offset as u16, input_area.y))
    }
}

/// Render the input line (with placeholder or text).
fn render_input(area: Rect, buf: &mut Buffer, state: &ComposeState, name: Option<&str>) {
    let w = area.width as usize;

    if state.input.is_empty() {
        let placeholder = match name {
            Some(n) => format!(" Type a message to {}...", n),
            None => " Select a conversation to start typing...".to_string(),
        };
        let truncated: String = placeholder.chars().take(w).collect();
        Paragraph::new(Line::from(Span::styled(
            truncated,
            Style::default().fg(Color::DarkGray),
        )))
        .render(area, buf);
    } else {
        let (visible, _) = visible_window(&state.input, state.cursor_column(), w);
        Paragraph::new(Line::from(Span::styled(
            format!(" {}", visible),
            Style::default().fg(Color::White),
        )))
        .render(area, buf);
    }
}

/// Compute the visible slice of the input and the cursor's column within it,
/// scrolling horizontally to keep the cursor in view.
fn visible_window(input: &str, cursor_col: usize, width: usize) -> (String, usize) {
    let avail = width.saturating_sub(1);
    if avail == 0 {
        return (String::new(), 0);
    }

    let chars: Vec<char> = input.chars().collect();
    if chars.len() <= avail {
        return (input.to_string(), cursor_col);
    }

    let scroll_start = if cursor_col < avail {
        0
    } else {
        cursor_col - avail + 1
    };
    let end = (scroll_start + avail).min(chars.len());
    let visible: String = chars[scroll_start..end].iter().collect();
    (visible, cursor_col - scroll_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_send() {
        let mut state = ComposeState::default();
        for c in "hi there".chars() {
            state.insert_char(c);
        }
        assert_eq!(state.send().as_deref(), Some("hi there"));
        assert!(state.input.is_empty());
        assert_eq!(state.cursor_column(), 0);
    }

    #[test]
    fn test_send_whitespace_only_is_none() {
        let mut state = ComposeState::default();
        state.insert_char(' ');
        state.insert_char(' ');
        assert!(state.send().is_none());
    }

    #[test]
    fn test_backspace_mid_string_multibyte() {
        let mut state = ComposeState::default();
        for c in "aéb".chars() {
            state.insert_char(c);
        }
        state.move_left();
        state.backspace(); // removes 'é'
        assert_eq!(state.input, "ab");
        assert_eq!(state.cursor_column(), 1);
    }

    #[test]
    fn test_delete_at_end_is_noop() {
        let mut state = ComposeState::default();
        state.insert_char('a');
        state.delete();
        assert_eq!(state.input, "a");
    }

    #[test]
    fn test_visible_window_scrolls_to_cursor() {
        let input = "abcdefghij";
        let (visible, offset) = visible_window(input, 10, 6); // avail = 5
        assert_eq!(visible, "ghij");
        assert_eq!(offset, 4);
    }
}
