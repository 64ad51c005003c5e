//! Top-level layout: header, sidebar, message pane, compose box, status bar.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use super::app::{App, Pane};
use super::{compose, messages, sidebar};

const SIDEBAR_WIDTH: u16 = 28;

pub fn render(frame: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(rows[0], frame, app);
    render_body(rows[1], frame, app);
    render_status_bar(rows[2], frame, app);
}

fn render_header(area: Rect, frame: &mut Frame, app: &App) {
    let conn_color = match app.connection {
        crate::socket::ConnectionState::Connected => Color::Green,
        crate::socket::ConnectionState::Connecting => Color::Yellow,
        crate::socket::ConnectionState::Disconnected => Color::Red,
    };

    let mut spans = vec![
        Span::styled(" dmchat ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("[{}]", app.connection.as_str()),
            Style::default().fg(conn_color),
        ),
    ];
    if !app.user_name.is_empty() {
        spans.push(Span::raw(format!("  {}", app.user_name)));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_body(area: Rect, frame: &mut Frame, app: &App) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(area);

    sidebar::render(
        cols[0],
        frame.buffer_mut(),
        app.store.conversations(),
        &app.sidebar,
        app.active_pane == Pane::Sidebar,
    );

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(compose::COMPOSE_HEIGHT),
        ])
        .split(cols[1]);

    messages::render(
        right[0],
        frame.buffer_mut(),
        app.store.current(),
        app.store.current_messages(),
        &app.messages,
        app.active_pane == Pane::Messages,
    );

    compose::render(
        right[1],
        frame,
        &app.compose,
        app.store.current().map(|c| c.name.as_str()),
        app.active_pane == Pane::Compose,
    );
}

fn render_status_bar(area: Rect, frame: &mut Frame, app: &App) {
    let line = if let Some(ref msg) = app.status_message {
        let color = if app.status_is_error {
            Color::Red
        } else {
            Color::Green
        };
        Line::from(Span::styled(
            format!(" {}", msg),
            Style::default().fg(color),
        ))
    } else {
        let hints = match app.active_pane {
            Pane::Sidebar => "Up/Down: navigate | Enter: open | Tab: pane | q: quit",
            Pane::Messages => "Up/Down: scroll | End: latest | Tab: pane | q: quit",
            Pane::Compose => "Enter: send | Ctrl+U: clear | Tab: pane | Ctrl+C: quit",
        };
        Line::from(vec![
            Span::styled(
                format!(" [{}] ", app.active_pane.as_str()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(hints, Style::default().fg(Color::DarkGray)),
        ])
    };

    frame.render_widget(Paragraph::new(line), area);
}
