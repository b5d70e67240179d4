//! Session-management core for a SIM-toolkit proactive command handler.
//!
//! The transport below delivers parsed proactive commands; the UI above
//! renders whatever the core decides to present. In between, this crate owns
//! the hard part: classifying commands, keeping at most one interactive
//! command in flight with strict FIFO queueing behind it, building exactly
//! one terminal response per accepted command, and maintaining the
//! setup-event-list subscription filter.
//!
//! All state lives on a single worker task. External callers only ever
//! enqueue [`SessionInput`] messages through a [`SessionHandle`]; state
//! changes happen at exactly one place, the worker's receive loop, which is
//! what guarantees the response-ordering rules of the protocol.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use shared::domain::{EventKind, ResultCode};
use shared::error::{ProtocolViolation, SessionClosed};
use shared::protocol::{
    BrowserSettings, CardResponse, CommandPayload, Menu, ProactiveCommand, ResponseOutcome,
    TerminalResponse, TextMessage,
};

pub mod config;
pub mod events;
pub mod presentation;
pub mod response;

pub use config::{load_settings, Settings};
pub use presentation::{LauncherInstaller, PresentationDispatcher};

use events::EventFilter;
use response::TurnEffect;

/// Whether a command needs a user response before the next one may run.
///
/// Send-class commands, idle-mode text, menu installation and event-list
/// updates are informative: they run inline, immediately, and never enter
/// the pending queue. Everything else awaits the user.
pub fn is_interactive(cmd: &ProactiveCommand) -> bool {
    !matches!(
        cmd.payload,
        CommandPayload::SendDtmf { .. }
            | CommandPayload::SendSms { .. }
            | CommandPayload::SendSs { .. }
            | CommandPayload::SendUssd { .. }
            | CommandPayload::SetupIdleModeText { .. }
            | CommandPayload::SetupMenu { .. }
            | CommandPayload::SetupEventList { .. }
    )
}

/// Every signal the worker reacts to. Commands and responses from outside,
/// plus the self-posted drain and tone-stop steps.
#[derive(Debug)]
pub enum SessionInput {
    Command(ProactiveCommand),
    Response(ResponseOutcome),
    EndSession,
    /// Self-posted: consume exactly one queued item.
    Drain,
    ScreenStatus { idle: bool },
    Event { event: EventKind, cause: u8 },
    MenuVisibility { visible: bool },
    DialogVisibility { visible: bool },
    /// Self-posted by the tone timer when a null-alpha tone expires.
    StopTone,
    CardRemoved,
    CardInserted,
    BootCompleted,
}

/// Cloneable entry point for everything outside the worker: transport,
/// presentation callbacks, timers.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionInput>,
}

impl SessionHandle {
    fn send(&self, input: SessionInput) -> Result<(), SessionClosed> {
        self.tx.send(input).map_err(|_| SessionClosed)
    }

    pub fn submit(&self, cmd: ProactiveCommand) -> Result<(), SessionClosed> {
        self.send(SessionInput::Command(cmd))
    }

    pub fn respond(&self, outcome: ResponseOutcome) -> Result<(), SessionClosed> {
        self.send(SessionInput::Response(outcome))
    }

    pub fn end_session(&self) -> Result<(), SessionClosed> {
        self.send(SessionInput::EndSession)
    }

    pub fn notify_screen_idle(&self, idle: bool) -> Result<(), SessionClosed> {
        self.send(SessionInput::ScreenStatus { idle })
    }

    pub fn notify_event(&self, event: EventKind, cause: u8) -> Result<(), SessionClosed> {
        self.send(SessionInput::Event { event, cause })
    }

    pub fn notify_browser_closed(&self, cause: u8) -> Result<(), SessionClosed> {
        self.notify_event(EventKind::BrowserTermination, cause)
    }

    pub fn notify_timeout(&self) -> Result<(), SessionClosed> {
        self.respond(ResponseOutcome::Timeout)
    }

    pub fn notify_menu_visible(&self, visible: bool) -> Result<(), SessionClosed> {
        self.send(SessionInput::MenuVisibility { visible })
    }

    pub fn notify_dialog_visible(&self, visible: bool) -> Result<(), SessionClosed> {
        self.send(SessionInput::DialogVisibility { visible })
    }

    pub fn notify_card_removed(&self) -> Result<(), SessionClosed> {
        self.send(SessionInput::CardRemoved)
    }

    pub fn notify_card_inserted(&self) -> Result<(), SessionClosed> {
        self.send(SessionInput::CardInserted)
    }

    pub fn notify_boot_completed(&self) -> Result<(), SessionClosed> {
        self.send(SessionInput::BootCompleted)
    }
}

/// A command (or session-end marker) accepted while a previous interactive
/// command still awaits its response. Consumed strictly in arrival order.
#[derive(Debug)]
enum PendingInput {
    Command(ProactiveCommand),
    EndSession,
}

#[derive(Debug, Default)]
struct SessionState {
    /// Command a response is currently built against. Outside a turn this
    /// points at the main command so a main-menu selection can be answered.
    current_cmd: Option<Arc<ProactiveCommand>>,
    /// The last SetupMenu command; never cleared once seen, except by a
    /// card-removal reset.
    main_cmd: Option<Arc<ProactiveCommand>>,
    current_menu: Option<Menu>,
    last_selected_item: Option<String>,
    menu_visible: bool,
    dialog_visible: bool,
    screen_idle: bool,
    response_needed: bool,
    cmd_in_progress: bool,
    pending: VecDeque<PendingInput>,
    event_filter: EventFilter,
    idle_text: Option<TextMessage>,
    /// DisplayText parked on a screen-status query.
    pending_display: Option<TextMessage>,
    /// Skip re-presenting the menu at session end.
    clear_select_item: bool,
    /// Confirmed browser launch, executed after session-end bookkeeping.
    deferred_browser: Option<BrowserSettings>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            response_needed: true,
            ..Self::default()
        }
    }
}

/// The worker. Owns all session state; consumes [`SessionInput`]s one at a
/// time from its channel.
pub struct SessionService {
    state: SessionState,
    rx: mpsc::UnboundedReceiver<SessionInput>,
    self_tx: mpsc::UnboundedSender<SessionInput>,
    responses: mpsc::UnboundedSender<CardResponse>,
    presenter: Arc<dyn PresentationDispatcher>,
    installer: Arc<dyn LauncherInstaller>,
    settings: Settings,
    shutdown: CancellationToken,
    tone_timer: Option<JoinHandle<()>>,
}

/// Running session core: the handle to feed it, the response stream the
/// transport drains, and the shutdown token.
pub struct SessionRuntime {
    pub handle: SessionHandle,
    pub responses: mpsc::UnboundedReceiver<CardResponse>,
    pub shutdown: CancellationToken,
    pub worker: JoinHandle<()>,
}

/// Spawn the session worker on the current tokio runtime.
pub fn spawn(
    presenter: Arc<dyn PresentationDispatcher>,
    installer: Arc<dyn LauncherInstaller>,
    settings: Settings,
) -> SessionRuntime {
    let (service, handle, responses) = SessionService::new(presenter, installer, settings);
    let shutdown = service.shutdown.clone();
    let worker = tokio::spawn(service.run());
    SessionRuntime {
        handle,
        responses,
        shutdown,
        worker,
    }
}

impl SessionService {
    pub fn new(
        presenter: Arc<dyn PresentationDispatcher>,
        installer: Arc<dyn LauncherInstaller>,
        settings: Settings,
    ) -> (
        Self,
        SessionHandle,
        mpsc::UnboundedReceiver<CardResponse>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();
        let service = Self {
            state: SessionState::new(),
            rx,
            self_tx: tx.clone(),
            responses: responses_tx,
            presenter,
            installer,
            settings,
            shutdown: CancellationToken::new(),
            tone_timer: None,
        };
        (service, SessionHandle { tx }, responses_rx)
    }

    pub async fn run(mut self) {
        info!("session worker started");
        loop {
            let input = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                received = self.rx.recv() => match received {
                    Some(input) => input,
                    None => break,
                },
            };
            self.dispatch(input).await;
        }
        if let Some(timer) = self.tone_timer.take() {
            timer.abort();
        }
        info!("session worker stopped");
    }

    async fn dispatch(&mut self, input: SessionInput) {
        match input {
            SessionInput::Command(cmd) => self.on_command(cmd),
            SessionInput::Response(outcome) => self.on_response(outcome).await,
            SessionInput::EndSession => self.on_end_session().await,
            SessionInput::Drain => self.on_drain().await,
            SessionInput::ScreenStatus { idle } => self.on_screen_status(idle),
            SessionInput::Event { event, cause } => self.on_event(event, cause),
            SessionInput::MenuVisibility { visible } => self.state.menu_visible = visible,
            SessionInput::DialogVisibility { visible } => self.state.dialog_visible = visible,
            SessionInput::StopTone => {
                self.presenter.stop_tone();
                self.on_response(ResponseOutcome::Done).await;
            }
            SessionInput::CardRemoved => self.force_reset(),
            SessionInput::CardInserted => {
                info!("card inserted: waiting for a new setup menu");
            }
            SessionInput::BootCompleted => self.on_boot_completed(),
        }
    }

    fn on_command(&mut self, cmd: ProactiveCommand) {
        if !is_interactive(&cmd) {
            self.handle_informative(cmd);
        } else if !self.state.cmd_in_progress {
            self.state.cmd_in_progress = true;
            self.handle_interactive(cmd);
        } else {
            debug!(
                command = cmd.payload.name(),
                queued = self.state.pending.len() + 1,
                "turn in flight, queueing command"
            );
            self.state.pending.push_back(PendingInput::Command(cmd));
        }
    }

    /// Dispatch one interactive command for presentation. The turn stays
    /// open until a response outcome (or timeout) arrives, except for the
    /// auto-completing cases that need no user response.
    fn handle_interactive(&mut self, cmd: ProactiveCommand) {
        let cmd = Arc::new(cmd);
        self.state.current_cmd = Some(cmd.clone());
        self.state.response_needed = true;
        debug!(command = cmd.payload.name(), "presenting command");

        let mut wait_for_response = true;
        match &cmd.payload {
            CommandPayload::DisplayText { message } => {
                let presented = message.with_title(self.display_title());
                if !message.response_needed {
                    // Transport already answered the card; show and move on.
                    self.presenter.present_text_dialog(&presented);
                    self.state.response_needed = false;
                    self.send_terminal(TerminalResponse::ok());
                    wait_for_response = false;
                } else if !(message.high_priority
                    || self.state.menu_visible
                    || self.state.dialog_visible)
                {
                    // Low-priority text may only interrupt an idle screen.
                    self.state.pending_display = Some(presented);
                    self.presenter.request_screen_status(true);
                } else {
                    self.presenter.present_text_dialog(&presented);
                }
            }
            CommandPayload::SelectItem { menu } => {
                self.state.current_menu = Some(menu.clone());
                if !self.state.menu_visible {
                    // Menu UI is not up: drop back out after the selection.
                    self.state.clear_select_item = true;
                }
                self.presenter.present_menu(Some(menu));
            }
            CommandPayload::GetInput { input } | CommandPayload::GetInkey { input } => {
                self.presenter.present_input(input);
            }
            CommandPayload::LaunchBrowser { message, .. } => {
                let msg = message.with_title(self.state.last_selected_item.clone());
                self.presenter.present_confirmation(&msg);
            }
            CommandPayload::SetupCall { settings } => {
                let msg = settings
                    .confirm_message
                    .with_title(self.state.last_selected_item.clone());
                self.presenter.present_confirmation(&msg);
            }
            CommandPayload::PlayTone { message, settings } => {
                self.presenter.present_tone(message.as_ref(), settings);
                if message.as_ref().and_then(|m| m.text.as_ref()).is_none() {
                    // No alpha text means no dialog; the core times the tone.
                    self.schedule_tone_stop(settings.duration_ms);
                }
            }
            _ => {
                warn!(
                    command = cmd.payload.name(),
                    "informative command reached the interactive path"
                );
                wait_for_response = false;
            }
        }

        if !wait_for_response {
            self.finish_turn();
        }
    }

    /// Informative commands run inline exactly once: side effect plus an
    /// immediate OK acknowledgement. They never own the turn and never touch
    /// a response another command is still waiting on.
    fn handle_informative(&mut self, cmd: ProactiveCommand) {
        let cmd = Arc::new(cmd);
        debug!(command = cmd.payload.name(), "handling informative command");
        match &cmd.payload {
            CommandPayload::SetupMenu { menu } => {
                self.state.current_menu = Some(menu.clone());
                if menu.is_removal() {
                    info!("menu removal sentinel received, disabling launcher");
                    self.state.current_menu = None;
                    if let Err(err) = self.installer.uninstall() {
                        warn!("launcher uninstall failed: {err:#}");
                    }
                } else if let Err(err) = self.installer.install() {
                    warn!("launcher install failed: {err:#}");
                }
                self.state.main_cmd = Some(cmd.clone());
                if self.state.menu_visible {
                    self.presenter.present_menu(None);
                }
            }
            CommandPayload::SetupIdleModeText { message } => {
                self.state.idle_text = message.clone();
                match message {
                    Some(_) => self.presenter.request_screen_status(true),
                    None => {
                        self.presenter.request_screen_status(false);
                        self.presenter.present_idle_text(None);
                    }
                }
            }
            CommandPayload::SendDtmf { message }
            | CommandPayload::SendSms { message }
            | CommandPayload::SendSs { message }
            | CommandPayload::SendUssd { message } => {
                if let Some(msg) = message.as_ref().filter(|m| m.text.is_some()) {
                    self.presenter.present_notice(msg);
                }
            }
            CommandPayload::SetupEventList { settings } => {
                self.state.event_filter.replace(settings.clone());
            }
            _ => {
                warn!(
                    command = cmd.payload.name(),
                    "interactive command reached the informative path"
                );
                return;
            }
        }
        self.send_terminal(TerminalResponse::ok());
        if !self.state.cmd_in_progress {
            self.state.current_cmd = self.state.main_cmd.clone();
        }
    }

    async fn on_response(&mut self, outcome: ResponseOutcome) {
        if !self.state.response_needed {
            debug!("response already delivered for the current command");
            self.state.response_needed = true;
            self.finish_turn();
            return;
        }
        let Some(cmd) = self.state.current_cmd.clone() else {
            warn!(
                outcome = outcome.name(),
                "{}",
                ProtocolViolation::ResponseWithoutCommand
            );
            return;
        };

        match response::build(&cmd, &outcome, self.presenter.browser_running()) {
            Ok(built) => {
                if let ResponseOutcome::MenuSelection { item_id, .. } = &outcome {
                    self.state.last_selected_item = cmd
                        .menu()
                        .and_then(|menu| menu.item_label(*item_id))
                        .map(str::to_string);
                }
                match built.effect {
                    TurnEffect::None => {}
                    TurnEffect::DeferBrowserLaunch(settings) => {
                        self.state.deferred_browser = Some(settings);
                    }
                    TurnEffect::AnnounceCall(message) => {
                        // Calls announce immediately, unlike browser launches.
                        let msg = message.with_title(self.state.last_selected_item.clone());
                        if msg.text.as_deref().is_some_and(|t| !t.is_empty()) {
                            self.presenter.request_call_message(&msg);
                        }
                    }
                }
                self.send_terminal(built.response);
                self.state.response_needed = true;
                self.handle_session_end().await;
            }
            Err(err) => {
                warn!(command = cmd.payload.name(), "abandoning turn: {err}");
            }
        }
    }

    async fn on_end_session(&mut self) {
        if !self.state.cmd_in_progress {
            self.state.cmd_in_progress = true;
            self.handle_session_end().await;
        } else {
            self.state.pending.push_back(PendingInput::EndSession);
        }
    }

    async fn on_drain(&mut self) {
        match self.state.pending.pop_front() {
            Some(PendingInput::Command(cmd)) => self.handle_interactive(cmd),
            Some(PendingInput::EndSession) => self.handle_session_end().await,
            None => self.state.cmd_in_progress = false,
        }
    }

    /// End-of-turn bookkeeping shared by responses and session-end signals:
    /// fall back to the main command and menu, re-present the menu when it is
    /// on screen, then drain the queue or go idle. A browser launch confirmed
    /// during the turn fires exactly once, after all of the above.
    async fn handle_session_end(&mut self) {
        self.state.current_cmd = self.state.main_cmd.clone();
        self.state.last_selected_item = None;
        self.state.pending_display = None;
        if self.state.current_menu.is_some() {
            if let Some(main) = &self.state.main_cmd {
                self.state.current_menu = main.menu().cloned();
            }
        }
        if self.state.menu_visible && !self.state.clear_select_item {
            self.presenter.present_menu(None);
        }
        self.state.clear_select_item = false;
        self.finish_turn();

        if let Some(settings) = self.state.deferred_browser.take() {
            info!(url = ?settings.url, "launching browser after session end");
            self.presenter.request_browser_launch(&settings);
            self.settle_after_browser_launch().await;
        }
    }

    /// Consume the next queued item, or drop back to idle.
    fn finish_turn(&mut self) {
        if self.state.pending.is_empty() {
            self.state.cmd_in_progress = false;
        } else if self.self_tx.send(SessionInput::Drain).is_err() {
            self.state.cmd_in_progress = false;
        }
    }

    fn on_screen_status(&mut self, idle: bool) {
        debug!(idle, "screen status");
        self.state.screen_idle = idle;
        if self.state.idle_text.is_some() {
            self.refresh_idle_text();
        }
        if let Some(message) = self.state.pending_display.take() {
            if idle {
                self.presenter.present_text_dialog(&message);
            } else {
                self.send_screen_busy();
            }
            if self.state.idle_text.is_none() {
                // Nothing left that cares about screen status.
                self.presenter.request_screen_status(false);
            }
        }
    }

    fn refresh_idle_text(&self) {
        match &self.state.idle_text {
            Some(message) if self.state.screen_idle => {
                self.presenter.present_idle_text(Some(message));
            }
            _ => self.presenter.present_idle_text(None),
        }
    }

    fn send_screen_busy(&mut self) {
        if self.state.current_cmd.is_none() {
            return;
        }
        info!("screen busy, rejecting low-priority display text");
        self.send_terminal(TerminalResponse::with_result(ResultCode::ScreenBusy));
        self.state.response_needed = true;
        self.finish_turn();
    }

    fn on_event(&mut self, event: EventKind, cause: u8) {
        if !self.state.event_filter.is_subscribed(event) {
            debug!(?event, "event not in the active event list");
            return;
        }
        let cause = EventFilter::encode_cause(event, cause);
        self.send(CardResponse::EventDownload { event, cause });
    }

    fn on_boot_completed(&mut self) {
        if self.state.main_cmd.is_none() {
            info!("boot completed with no setup menu seen, disabling launcher");
            if let Err(err) = self.installer.uninstall() {
                warn!("launcher uninstall failed: {err:#}");
            }
        }
    }

    /// Card removal invalidates everything: in-flight turn, queue, menu,
    /// event subscriptions.
    fn force_reset(&mut self) {
        info!("card removed, resetting session state");
        if let Some(timer) = self.tone_timer.take() {
            timer.abort();
        }
        self.state = SessionState::new();
        self.presenter.present_idle_text(None);
        if let Err(err) = self.installer.uninstall() {
            warn!("launcher uninstall failed: {err:#}");
        }
    }

    fn schedule_tone_stop(&mut self, duration_ms: Option<u64>) {
        let duration = duration_ms
            .map(Duration::from_millis)
            .filter(|d| !d.is_zero())
            .unwrap_or(self.settings.tone_default);
        debug!(?duration, "tone will stop after timeout");
        if let Some(previous) = self.tone_timer.take() {
            previous.abort();
        }
        let tx = self.self_tx.clone();
        self.tone_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = tx.send(SessionInput::StopTone);
        }));
    }

    /// Give the browser time to take the foreground before the next command
    /// runs. Cancellable through the worker's shutdown token; the suspension
    /// is the throttle, there is no busy wait.
    async fn settle_after_browser_launch(&self) {
        if self.settings.browser_settle.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(self.settings.browser_settle) => {}
            _ = self.shutdown.cancelled() => {}
        }
    }

    fn display_title(&self) -> Option<String> {
        if self.state.last_selected_item.is_some() {
            return self.state.last_selected_item.clone();
        }
        self.state
            .main_cmd
            .as_ref()
            .and_then(|main| main.menu())
            .and_then(|menu| menu.title.clone())
    }

    fn send_terminal(&self, response: TerminalResponse) {
        debug!(result = ?response.result, "sending terminal response");
        self.send(CardResponse::Terminal(response));
    }

    fn send(&self, response: CardResponse) {
        if self.responses.send(response).is_err() {
            warn!("response channel closed, transport is gone");
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
