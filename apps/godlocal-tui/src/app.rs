//! Application state and event loop.
//!
//! One [`App`] per process, owning the transport handle, the transcript,
//! the preference store and the archive. The loop multiplexes terminal
//! input, gateway events and finished background requests over a single
//! `select!`; every mutation happens on this task.

use crate::commands::{Command, HELP_TEXT, parse_command};
use crate::scroll::ScrollState;
use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures_util::StreamExt;
use godlocal_client::{
    ClientError, ConnectionState, GatewayEvent, GatewayHealth, GatewayStatus, SendRoute,
    SessionService,
};
use godlocal_protocol::frame::PRIMARY_AGENT;
use godlocal_protocol::{
    AskEnvelope, FallbackReply, FallbackRequest, HistoryRole, HistoryTurn, StreamFrame, ToolStep,
};
use godlocal_session::{
    Attachment, AttachmentList, PERSONAS, Persona, Role, Transcript, find_persona,
};
use godlocal_sovereign::{SovereignClient, SovereignError, SovereignReply};
use godlocal_store::{ArchiveMode, ArchivedTurn, PreferenceStore, TranscriptArchive};
use ratatui::Terminal;
use ratatui::backend::Backend;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::warn;

/// Redraw cadence; also drives the spinner.
const TICK_INTERVAL: Duration = Duration::from_millis(250);
/// Health/status polling cadence.
const PROBE_INTERVAL: Duration = Duration::from_secs(30);
/// Archived turns replayed into a fresh transcript.
const RESTORE_LIMIT: usize = 50;

/// Results of background work, delivered back to the event loop.
#[derive(Debug)]
pub enum AppEvent {
    FallbackDone(Result<FallbackReply, ClientError>),
    SovereignDone(Result<SovereignReply, SovereignError>),
    Probe {
        health: Option<GatewayHealth>,
        status: Option<GatewayStatus>,
    },
}

pub struct App {
    pub(crate) service: SessionService,
    pub(crate) prefs: PreferenceStore,
    pub(crate) archive: TranscriptArchive,
    pub(crate) transcript: Transcript,
    pub(crate) attachments: AttachmentList,
    pub(crate) persona: &'static Persona,
    pub(crate) sovereign: Option<SovereignClient>,
    pub(crate) sovereign_mode: bool,
    pub(crate) connection: ConnectionState,
    pub(crate) health: Option<GatewayHealth>,
    pub(crate) kill_switch: bool,
    /// A reply is in flight; further sends are refused until it lands.
    pub(crate) busy: bool,
    pub(crate) input: String,
    /// Cursor position in the input line, in characters.
    pub(crate) cursor: usize,
    pub(crate) scroll: ScrollState,
    pub(crate) status_line: Option<String>,
    pub(crate) tick: u64,
    running: bool,
    /// Transcript entries below this index are already on disk.
    archived_upto: usize,
    /// Tool invocations seen since the last archived agent turn; attached
    /// to the next one, the way the reply bodies carry them.
    pending_steps: Vec<ToolStep>,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl App {
    pub fn new(
        service: SessionService,
        prefs: PreferenceStore,
        archive: TranscriptArchive,
        persona: &'static Persona,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let sovereign = prefs
            .api_key()
            .and_then(|key| SovereignClient::new(key).ok());
        let sovereign_mode = prefs.sovereign_mode() && sovereign.is_some();

        let mut app = Self {
            service,
            prefs,
            archive,
            transcript: Transcript::new(),
            attachments: AttachmentList::new(),
            persona,
            sovereign,
            sovereign_mode,
            connection: ConnectionState::Disconnected,
            health: None,
            kill_switch: false,
            busy: false,
            input: String::new(),
            cursor: 0,
            scroll: ScrollState::new(),
            status_line: None,
            tick: 0,
            running: true,
            archived_upto: 0,
            pending_steps: Vec::new(),
            events_tx,
            events_rx,
        };
        app.restore_history();
        app
    }

    /// Drive the UI until the user quits.
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let mut input_events = EventStream::new();
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut probe_ticker = tokio::time::interval(PROBE_INTERVAL);
        probe_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.service.connect().await;

        while self.running {
            terminal.draw(|frame| crate::ui::draw(frame, self))?;

            tokio::select! {
                maybe_event = input_events.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key).await;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => warn!("terminal input error: {error}"),
                    None => break,
                },
                event = self.service.recv_event() => {
                    if let Some(event) = event {
                        self.handle_gateway_event(event);
                    }
                }
                Some(event) = self.events_rx.recv() => self.handle_app_event(event),
                _ = probe_ticker.tick() => self.spawn_probe(),
                _ = ticker.tick() => self.tick = self.tick.wrapping_add(1),
            }
        }

        self.service.shutdown().await;
        Ok(())
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.running = false;
            return;
        }

        match key.code {
            KeyCode::Enter => self.submit().await,
            KeyCode::Char(c) => {
                if !key.modifiers.contains(KeyModifiers::CONTROL) {
                    self.insert_char(c);
                }
            }
            KeyCode::Backspace => self.delete_back(),
            KeyCode::Delete => self.delete_forward(),
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.input.chars().count());
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.input.chars().count(),
            KeyCode::Up => self.scroll.scroll_up(1),
            KeyCode::Down => self.scroll.scroll_down(1),
            KeyCode::PageUp => self.scroll.scroll_up(10),
            KeyCode::PageDown => self.scroll.scroll_down(10),
            KeyCode::Esc => {
                if self.input.is_empty() {
                    self.status_line = None;
                } else {
                    self.input.clear();
                    self.cursor = 0;
                }
            }
            _ => {}
        }
    }

    /// Send the input line: slash commands run locally, everything else
    /// goes out as a prompt by whichever route is up.
    async fn submit(&mut self) {
        let line = self.input.trim().to_string();
        if line.is_empty() {
            return;
        }

        if let Some(parsed) = parse_command(&line) {
            self.input.clear();
            self.cursor = 0;
            match parsed {
                Ok(command) => self.run_command(command),
                Err(message) => self.status_line = Some(message),
            }
            return;
        }

        if self.busy {
            self.status_line = Some("still waiting on the last reply".to_string());
            return;
        }
        if self.kill_switch && !self.sovereign_mode {
            self.status_line =
                Some("backend kill switch is on; /sovereign to go direct".to_string());
            return;
        }

        self.input.clear();
        self.cursor = 0;
        self.status_line = None;

        // History snapshot is taken before the new turn lands so the
        // prompt is not duplicated inside its own context.
        let history = self.transcript.recent_history();
        let prompt = if self.attachments.is_empty() {
            line
        } else {
            format!("{line}\n\n{}", self.attachments.descriptions())
        };
        let files = self.attachments.names();
        self.attachments.drain_for_send();

        self.transcript.push_user(prompt.clone());
        self.scroll.jump_to_bottom();
        self.archive_settled();

        if self.sovereign_mode {
            self.send_sovereign(history, prompt);
            return;
        }

        let envelope = AskEnvelope::new(prompt.clone(), self.service.session_id())
            .with_agent(self.persona.id)
            .with_files(files);
        match self.service.dispatch(&envelope).await {
            SendRoute::Stream => self.busy = true,
            SendRoute::Fallback => self.send_fallback(prompt, history),
        }
    }

    fn run_command(&mut self, command: Command) {
        match command {
            Command::Persona(name) => match find_persona(&name) {
                Some(persona) => {
                    self.persona = persona;
                    self.prefs.set_persona(persona.id);
                    self.status_line = Some(format!(
                        "{} {} · {}",
                        persona.icon, persona.name, persona.tagline
                    ));
                }
                None => {
                    let roster = PERSONAS
                        .iter()
                        .map(|persona| persona.id)
                        .collect::<Vec<_>>()
                        .join(", ");
                    self.status_line = Some(format!("unknown persona; pick one of: {roster}"));
                }
            },
            Command::Key(token) => {
                self.sovereign = SovereignClient::new(token.clone()).ok();
                self.prefs.set_api_key(token);
                self.status_line = Some("sovereign API key stored".to_string());
            }
            Command::SoulShow => {
                let soul = self.prefs.soul();
                self.status_line = Some(if soul.is_empty() {
                    "soul memory is empty".to_string()
                } else {
                    format!("soul: {soul}")
                });
            }
            Command::SoulSet(text) => {
                self.prefs.set_soul(text);
                self.status_line = Some("soul memory updated".to_string());
            }
            Command::Sovereign(direction) => {
                let enabled = direction.unwrap_or(!self.sovereign_mode);
                self.set_sovereign(enabled);
            }
            Command::Attach(path) => match Attachment::from_path(&path) {
                Ok(attachment) => {
                    self.status_line = Some(format!("staged {}", attachment.description()));
                    self.attachments.stage(attachment);
                }
                Err(error) => self.status_line = Some(format!("attach failed: {error:#}")),
            },
            Command::Detach(index) => self.detach(index),
            Command::Clear => {
                self.transcript = Transcript::new();
                self.archive.clear();
                self.archived_upto = 0;
                self.pending_steps.clear();
                self.scroll = ScrollState::new();
                self.status_line = Some("transcript cleared".to_string());
            }
            Command::Help => {
                self.transcript.push_system(HELP_TEXT);
                self.scroll.jump_to_bottom();
            }
            Command::Quit => self.running = false,
        }
    }

    fn set_sovereign(&mut self, enabled: bool) {
        if enabled && self.sovereign.is_none() {
            match self.prefs.api_key().map(SovereignClient::new) {
                Some(Ok(client)) => self.sovereign = Some(client),
                Some(Err(error)) => {
                    self.status_line = Some(error.to_string());
                    return;
                }
                None => {
                    self.status_line = Some(SovereignError::MissingCredential.to_string());
                    return;
                }
            }
        }
        if self.sovereign_mode == enabled {
            return;
        }
        self.sovereign_mode = enabled;
        self.prefs.set_sovereign_mode(enabled);
        self.transcript.push_system(if enabled {
            "⚡ sovereign mode: prompts go straight to the model with your key"
        } else {
            "🌐 server mode: prompts go through the gateway"
        });
        self.scroll.jump_to_bottom();
    }

    fn detach(&mut self, index: Option<usize>) {
        if self.attachments.is_empty() {
            self.status_line = Some("nothing staged".to_string());
            return;
        }
        // Attachment numbers are 1-based in the UI.
        let position = match index {
            Some(0) => {
                self.status_line = Some("attachment numbers start at 1".to_string());
                return;
            }
            Some(n) => n - 1,
            None => self.attachments.len() - 1,
        };
        match self.attachments.remove(position) {
            Some(attachment) => self.status_line = Some(format!("released {}", attachment.name)),
            None => self.status_line = Some(format!("no attachment #{}", position + 1)),
        }
    }

    fn handle_gateway_event(&mut self, event: GatewayEvent) {
        match event {
            GatewayEvent::Connected => {
                self.connection = ConnectionState::Connected;
                self.status_line = Some("stream connected".to_string());
            }
            GatewayEvent::Disconnected => {
                self.connection = ConnectionState::Disconnected;
                self.busy = false;
                // A partial reply stays on screen as-is; nothing settles
                // it until a later completion frame.
                self.status_line = Some(format!(
                    "stream lost; retrying every {}s",
                    self.service.config().reconnect_delay.as_secs()
                ));
            }
            GatewayEvent::Frame(frame) => {
                if let StreamFrame::Tool { name, query } = &frame {
                    self.pending_steps.push(ToolStep {
                        tool: name.clone(),
                        result: query.clone(),
                    });
                }
                if matches!(frame, StreamFrame::Done | StreamFrame::Error { .. }) {
                    self.busy = false;
                }
                self.transcript.apply(&frame);
                self.archive_settled();
            }
        }
    }

    fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::FallbackDone(Ok(reply)) => {
                self.busy = false;
                self.pending_steps.clone_from(&reply.steps);
                self.transcript.fold_reply(&reply);
                self.archive_settled();
            }
            AppEvent::FallbackDone(Err(error)) => {
                self.busy = false;
                self.transcript.fold_reply_error(&error.to_string());
            }
            AppEvent::SovereignDone(Ok(reply)) => {
                self.busy = false;
                let folded = FallbackReply {
                    text: reply.text,
                    steps: Vec::new(),
                    model: Some(reply.model),
                };
                self.transcript.fold_reply(&folded);
                self.archive_settled();
            }
            AppEvent::SovereignDone(Err(error)) => {
                self.busy = false;
                self.transcript.fold_reply_error(&error.to_string());
            }
            AppEvent::Probe { health, status } => {
                self.health = health;
                if let Some(status) = status {
                    self.kill_switch = status.kill_switch;
                }
            }
        }
    }

    /// One-shot HTTP ask in the background; the result lands as an
    /// [`AppEvent::FallbackDone`]. Never retried.
    fn send_fallback(&mut self, prompt: String, history: Vec<HistoryTurn>) {
        self.busy = true;
        let service = self.service.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let request = FallbackRequest { prompt, history };
            let result = service.ask_fallback(&request).await;
            let _ = events.send(AppEvent::FallbackDone(result));
        });
    }

    fn send_sovereign(&mut self, history: Vec<HistoryTurn>, prompt: String) {
        let Some(client) = self.sovereign.clone() else {
            self.transcript
                .fold_reply_error(&SovereignError::MissingCredential.to_string());
            return;
        };
        self.busy = true;
        let soul = self.prefs.soul();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let mut turns = history;
            turns.push(HistoryTurn::new(HistoryRole::User, prompt));
            let result = client.chat(&turns, &soul).await;
            let _ = events.send(AppEvent::SovereignDone(result));
        });
    }

    fn spawn_probe(&self) {
        let service = self.service.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let health = service.health().await;
            let status = service.status().await;
            let _ = events.send(AppEvent::Probe { health, status });
        });
    }

    /// Walk settled entries past the watermark onto disk. Stops at the
    /// first still-streaming entry so the archive stays in order.
    fn archive_settled(&mut self) {
        let mode = if self.sovereign_mode {
            ArchiveMode::Sovereign
        } else {
            ArchiveMode::Server
        };

        while self.archived_upto < self.transcript.len() {
            let Some(entry) = self.transcript.entries().get(self.archived_upto) else {
                break;
            };
            if entry.streaming {
                break;
            }
            let turn = match entry.role {
                Role::User => Some(ArchivedTurn {
                    role: HistoryRole::User,
                    author: None,
                    content: entry.content.clone(),
                    steps: Vec::new(),
                    model: None,
                    mode,
                    ts: entry.timestamp.timestamp_millis(),
                }),
                Role::Agent => Some(ArchivedTurn {
                    role: HistoryRole::Assistant,
                    author: entry.author.clone(),
                    content: entry.content.clone(),
                    steps: Vec::new(),
                    model: entry.model.clone(),
                    mode,
                    ts: entry.timestamp.timestamp_millis(),
                }),
                // Tool events ride along on the next agent turn; notices
                // are not history.
                Role::ToolEvent | Role::System => None,
            };
            self.archived_upto += 1;

            if let Some(mut turn) = turn {
                if turn.role == HistoryRole::Assistant {
                    turn.steps = std::mem::take(&mut self.pending_steps);
                }
                self.archive.append(&turn);
            }
        }
    }

    /// Replay the archived tail into the fresh transcript.
    fn restore_history(&mut self) {
        let restored = self.archive.load_recent(RESTORE_LIMIT);
        if restored.is_empty() {
            return;
        }
        let count = restored.len();
        for turn in restored {
            match turn.role {
                HistoryRole::User => {
                    self.transcript.push_user(turn.content);
                }
                HistoryRole::Assistant => {
                    for step in &turn.steps {
                        self.transcript.apply(&StreamFrame::Tool {
                            name: step.tool.clone(),
                            query: step.result.clone(),
                        });
                    }
                    let author = turn.author.unwrap_or_else(|| PRIMARY_AGENT.to_string());
                    self.transcript.push_agent(author, turn.content);
                }
            }
        }
        self.transcript
            .push_system(format!("restored {count} archived turns"));
        self.archived_upto = self.transcript.len();
    }

    fn insert_char(&mut self, c: char) {
        let index = self.byte_index();
        self.input.insert(index, c);
        self.cursor += 1;
    }

    fn delete_back(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let index = self.byte_index();
        self.input.remove(index);
    }

    fn delete_forward(&mut self) {
        let index = self.byte_index();
        if index < self.input.len() {
            self.input.remove(index);
        }
    }

    /// Byte offset of the character cursor; the input is edited on
    /// character boundaries only.
    pub(crate) fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .map(|(index, _)| index)
            .nth(self.cursor)
            .unwrap_or(self.input.len())
    }
}
