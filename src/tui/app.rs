//! TUI application state and main event loop.
//!
//! All asynchronous sources -- socket events, REST backend responses,
//! credential-refresh ticks, and terminal input -- funnel into one
//! `tokio::select!` loop and resolve to sequential store transitions, so the
//! store only ever sees ordered, single-writer updates.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;
use tokio::time;
use tokio_stream::StreamExt;

use super::backend::{Backend, BackendCommand, BackendResponse};
use super::compose::ComposeState;
use super::messages::MessagesState;
use super::sidebar::SidebarState;
use super::ui;
use crate::auth::Session;
use crate::models::{RawMessage, RemoteConversation};
use crate::socket::{ConnectionState, ServerEvent, SocketError, SocketHandle};
use crate::store::ChatStore;

/// Credential refresh cadence and threshold.
const REFRESH_INTERVAL: Duration = Duration::from_secs(60);
const REFRESH_THRESHOLD_SECS: u64 = 120;

/// Active pane in the TUI
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    #[default]
    Sidebar,
    Messages,
    Compose,
}

impl Pane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pane::Sidebar => "chats",
            Pane::Messages => "messages",
            Pane::Compose => "compose",
        }
    }

    fn next(&self) -> Pane {
        match self {
            Pane::Sidebar => Pane::Messages,
            Pane::Messages => Pane::Compose,
            Pane::Compose => Pane::Sidebar,
        }
    }
}

/// Results of work spawned by the app itself (socket-side fetches).
enum AppEvent {
    Conversations(Result<Vec<RemoteConversation>, SocketError>),
}

/// Application state
pub struct App {
    pub should_exit: bool,
    pub store: ChatStore,
    pub subject_id: String,
    pub user_name: String,
    pub connection: ConnectionState,
    /// Credential refresh failed; sends are disabled until re-login.
    pub auth_failed: bool,
    pub active_pane: Pane,
    pub sidebar: SidebarState,
    pub messages: MessagesState,
    pub compose: ComposeState,
    pub status_message: Option<String>,
    pub status_is_error: bool,
}

impl App {
    fn new(subject_id: String) -> Self {
        Self {
            should_exit: false,
            store: ChatStore::new(),
            subject_id,
            user_name: String::new(),
            connection: ConnectionState::default(),
            auth_failed: false,
            active_pane: Pane::default(),
            sidebar: SidebarState::default(),
            messages: MessagesState::default(),
            compose: ComposeState::default(),
            status_message: None,
            status_is_error: false,
        }
    }

    fn set_status(&mut self, msg: impl Into<String>, is_error: bool) {
        self.status_message = Some(msg.into());
        self.status_is_error = is_error;
    }

    fn handle_terminal_event(&mut self, event: Event, socket: &SocketHandle) {
        let Event::Key(key) = event else { return };
        if key.kind != KeyEventKind::Press {
            return;
        }

        // Global bindings first.
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_exit = true;
            return;
        }
        if key.code == KeyCode::Tab {
            self.active_pane = self.active_pane.next();
            return;
        }

        match self.active_pane {
            Pane::Sidebar => self.handle_sidebar_key(key),
            Pane::Messages => self.handle_messages_key(key),
            Pane::Compose => self.handle_compose_key(key, socket),
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_exit = true,
            KeyCode::Up | KeyCode::Char('k') => self.sidebar.move_up(),
            KeyCode::Down | KeyCode::Char('j') => {
                self.sidebar.move_down(self.store.conversations().len())
            }
            KeyCode::Enter => self.select_conversation(),
            _ => {}
        }
    }

    fn handle_messages_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_exit = true,
            KeyCode::Up | KeyCode::Char('k') => self.messages.scroll_up(),
            KeyCode::Down | KeyCode::Char('j') => self.messages.scroll_down(),
            KeyCode::End | KeyCode::Char('G') => self.messages.scroll_to_bottom(),
            _ => {}
        }
    }

    fn handle_compose_key(&mut self, key: KeyEvent, socket: &SocketHandle) {
        match key.code {
            KeyCode::Enter => self.send_current_message(socket),
            KeyCode::Backspace => self.compose.backspace(),
            KeyCode::Delete => self.compose.delete(),
            KeyCode::Left => self.compose.move_left(),
            KeyCode::Right => self.compose.move_right(),
            KeyCode::Home => self.compose.move_home(),
            KeyCode::End => self.compose.move_end(),
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.compose.clear()
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.compose.insert_char(c)
            }
            _ => {}
        }
    }

    /// Explicit user selection: set the room id and the pointer together.
    fn select_conversation(&mut self) {
        let Some(conv) = self.store.conversations().get(self.sidebar.selected).cloned() else {
            return;
        };
        self.store.set_selected_room(Some(conv.id.clone()));
        self.store.set_current(Some(conv), &self.subject_id);
        self.messages.scroll_to_bottom();
        self.active_pane = Pane::Compose;
    }

    /// Optimistic send: insert locally first, then emit. The server echo
    /// carries the same message id and is deduplicated by the store.
    fn send_current_message(&mut self, socket: &SocketHandle) {
        if self.auth_failed {
            self.set_status("Session expired -- run 'dmchat login'", true);
            return;
        }
        if self.connection != ConnectionState::Connected {
            self.set_status("Offline -- sending is disabled until reconnected", true);
            return;
        }
        let Some(current) = self.store.current().cloned() else {
            self.set_status("Select a conversation first", true);
            return;
        };
        // A conversation cannot accept sends until its counterpart id is known.
        let Some(to) = current.user_id.clone() else {
            self.set_status("Conversation is still syncing -- try again shortly", true);
            return;
        };
        let Some(text) = self.compose.send() else {
            return;
        };

        let msg = RawMessage::outgoing_text(text, &self.subject_id, Some(&to), &current.id);
        self.store.append_message(msg.clone(), &self.subject_id);
        socket.send_text_message(&msg);
        self.messages.scroll_to_bottom();
    }

    fn handle_socket_event(
        &mut self,
        event: ServerEvent,
        socket: &Arc<SocketHandle>,
        app_tx: &mpsc::UnboundedSender<AppEvent>,
        backend: &Backend,
    ) {
        match event {
            ServerEvent::Connecting { attempt } => {
                self.connection = ConnectionState::Connecting;
                if attempt > 1 {
                    self.set_status(format!("Reconnecting (attempt {})...", attempt), false);
                }
            }
            ServerEvent::Ready => {
                self.connection = ConnectionState::Connected;
                self.set_status("Connected", false);
                // Fetch-on-ready: the room listing is deferred until the
                // channel is usable.
                let socket = Arc::clone(socket);
                let app_tx = app_tx.clone();
                let subject_id = self.subject_id.clone();
                tokio::spawn(async move {
                    let result = socket.get_direct_conversations(&subject_id).await;
                    let _ = app_tx.send(AppEvent::Conversations(result));
                });
            }
            ServerEvent::NewMessage {
                conversation_id,
                message,
            } => {
                let mut msg = message;
                if msg.conversation_id.is_none() {
                    msg.conversation_id = conversation_id;
                }
                self.store.append_message(msg, &self.subject_id);
                self.store.resolve_selection(&self.subject_id);
            }
            ServerEvent::StartChat { conversation } => {
                self.store.upsert(&conversation, &self.subject_id);
                self.store.resolve_selection(&self.subject_id);
                self.sidebar.clamp(self.store.conversations().len());
            }
            ServerEvent::PresenceUpdate(fact) => {
                self.store.apply_presence(&fact);
            }
            ServerEvent::CallSignal { event, .. } => {
                // Out of core scope; surfaced for visibility only.
                tracing::debug!("call signaling event: {}", event);
            }
            ServerEvent::Disconnected { reason } => {
                self.connection = ConnectionState::Disconnected;
                self.set_status(format!("Disconnected: {}", reason), true);
            }
            ServerEvent::ConnectionFailed { attempts } => {
                self.connection = ConnectionState::Disconnected;
                self.set_status(
                    format!("Connection failed after {} attempts -- read-only", attempts),
                    true,
                );
                // Fall back to a REST snapshot so the list still renders.
                backend.send(BackendCommand::LoadConversations);
            }
        }
    }

    fn handle_app_event(&mut self, event: AppEvent, backend: &Backend) {
        match event {
            AppEvent::Conversations(Ok(records)) => self.apply_conversation_snapshot(&records),
            AppEvent::Conversations(Err(e)) => {
                tracing::warn!("room listing over socket failed: {}", e);
                // The REST collaborator serves the same snapshot.
                backend.send(BackendCommand::LoadConversations);
            }
        }
    }

    fn handle_backend_response(&mut self, response: BackendResponse) {
        match response {
            BackendResponse::Conversations(Ok(records)) => {
                self.apply_conversation_snapshot(&records)
            }
            BackendResponse::Conversations(Err(e)) => {
                self.sidebar.loading = false;
                self.set_status(format!("Failed to load conversations: {:#}", e), true);
            }
            BackendResponse::Profile(Ok(profile)) => {
                self.user_name = profile.name.unwrap_or_default();
            }
            BackendResponse::Profile(Err(e)) => {
                tracing::warn!("profile load failed: {:#}", e);
            }
            BackendResponse::ClientError(e) => {
                self.auth_failed = true;
                self.set_status(format!("Not authenticated: {}", e), true);
            }
        }
    }

    fn apply_conversation_snapshot(&mut self, records: &[RemoteConversation]) {
        self.store.replace_all(records, &self.subject_id);
        self.store.resolve_selection(&self.subject_id);
        self.sidebar.loading = false;
        self.sidebar.clamp(self.store.conversations().len());
    }
}

/// Run the TUI application with terminal restore on exit.
pub async fn run() -> Result<()> {
    let session = Session::load()?;
    let subject_id = session
        .subject_id()
        .context("Not logged in. Run 'dmchat login' first.")?;

    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal, session, subject_id).await;
    ratatui::restore();
    result
}

async fn run_app(
    terminal: &mut DefaultTerminal,
    mut session: Session,
    subject_id: String,
) -> Result<()> {
    let mut app = App::new(subject_id);

    // One channel instance per session; reconnects reuse it.
    let (socket_tx, mut socket_rx) = mpsc::unbounded_channel();
    let socket = Arc::new(SocketHandle::start(session.socket_url(), socket_tx));

    let mut backend = Backend::start();
    backend.send(BackendCommand::LoadProfile);

    let (app_tx, mut app_rx) = mpsc::unbounded_channel();
    let mut terminal_events = EventStream::new();
    let mut refresh = time::interval(REFRESH_INTERVAL);
    refresh.tick().await; // skip the immediate first tick

    while !app.should_exit {
        terminal.draw(|frame| ui::render(frame, &app))?;

        tokio::select! {
            maybe_event = terminal_events.next() => {
                match maybe_event {
                    Some(Ok(event)) => app.handle_terminal_event(event, &socket),
                    Some(Err(e)) => tracing::warn!("terminal event error: {}", e),
                    None => break,
                }
            }
            Some(event) = socket_rx.recv() => {
                app.handle_socket_event(event, &socket, &app_tx, &backend);
            }
            Some(event) = app_rx.recv() => {
                app.handle_app_event(event, &backend);
            }
            Some(response) = backend.recv() => {
                app.handle_backend_response(response);
            }
            _ = refresh.tick() => {
                if let Err(e) = session.refresh(REFRESH_THRESHOLD_SECS).await {
                    tracing::warn!("credential refresh failed: {:#}", e);
                    app.auth_failed = true;
                    app.set_status("Session expired -- run 'dmchat login'", true);
                }
            }
        }
    }

    // Teardown: stop the channel so no stale dispatches outlive the UI.
    socket.stop();
    app.store.reset();
    Ok(())
}
