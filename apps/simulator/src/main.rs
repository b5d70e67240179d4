//! Card-side simulator: feeds a scripted stream of proactive commands and
//! user outcomes through the session core and prints every response the
//! transport would carry back to the card.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use session_core::{
    load_settings, LauncherInstaller, PresentationDispatcher, SessionRuntime,
};
use shared::domain::ItemId;
use shared::protocol::{
    BrowserSettings, CommandPayload, InputSpec, Menu, MenuItem, ProactiveCommand,
    ResponseOutcome, TextMessage, ToneSettings,
};
use tracing::info;

#[derive(Parser, Debug)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a canned menu/dialog session end to end.
    Demo,
    /// Replay a JSON script of session inputs.
    Run { script: PathBuf },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
enum ScriptStep {
    Submit { command: ProactiveCommand },
    Respond { outcome: ResponseOutcome },
    EndSession,
    ScreenStatus { idle: bool },
    BrowserClosed { cause: u8 },
    Timeout,
    MenuVisible { visible: bool },
    Wait { ms: u64 },
}

/// Presentation layer that just narrates what a UI would show.
struct LoggingPresenter;

impl PresentationDispatcher for LoggingPresenter {
    fn present_menu(&self, menu: Option<&Menu>) {
        match menu {
            Some(menu) => info!(title = ?menu.title, items = menu.items.len(), "ui: menu"),
            None => info!("ui: main menu"),
        }
    }

    fn present_input(&self, input: &InputSpec) {
        info!(prompt = ?input.prompt.text, yes_no = input.yes_no, "ui: input");
    }

    fn present_text_dialog(&self, message: &TextMessage) {
        info!(title = ?message.title, text = ?message.text, "ui: text dialog");
    }

    fn present_confirmation(&self, message: &TextMessage) {
        info!(text = ?message.text, "ui: confirmation");
    }

    fn present_tone(&self, message: Option<&TextMessage>, settings: &ToneSettings) {
        info!(alpha = ?message.and_then(|m| m.text.as_ref()), tone = ?settings.tone, "ui: tone");
    }

    fn stop_tone(&self) {
        info!("ui: tone stopped");
    }

    fn present_idle_text(&self, message: Option<&TextMessage>) {
        info!(text = ?message.and_then(|m| m.text.as_ref()), "ui: idle text");
    }

    fn present_notice(&self, message: &TextMessage) {
        info!(text = ?message.text, "ui: notice");
    }

    fn request_browser_launch(&self, settings: &BrowserSettings) {
        info!(url = ?settings.url, mode = ?settings.mode, "ui: browser launch");
    }

    fn request_call_message(&self, message: &TextMessage) {
        info!(text = ?message.text, "ui: call message");
    }

    fn request_screen_status(&self, subscribe: bool) {
        info!(subscribe, "ui: screen status request");
    }

    fn browser_running(&self) -> bool {
        false
    }
}

struct LoggingInstaller;

impl LauncherInstaller for LoggingInstaller {
    fn install(&self) -> Result<()> {
        info!("launcher: enabled");
        Ok(())
    }

    fn uninstall(&self) -> Result<()> {
        info!("launcher: disabled");
        Ok(())
    }
}

fn demo_steps() -> Vec<ScriptStep> {
    let main_menu = Menu {
        title: Some("Operator services".into()),
        items: vec![
            Some(MenuItem {
                id: ItemId(1),
                label: "Balance".into(),
            }),
            Some(MenuItem {
                id: ItemId(2),
                label: "News".into(),
            }),
        ],
    };
    vec![
        ScriptStep::Submit {
            command: ProactiveCommand::new(CommandPayload::SetupMenu { menu: main_menu }),
        },
        ScriptStep::MenuVisible { visible: true },
        ScriptStep::Respond {
            outcome: ResponseOutcome::MenuSelection {
                item_id: ItemId(1),
                help_requested: false,
            },
        },
        ScriptStep::Submit {
            command: ProactiveCommand::new(CommandPayload::DisplayText {
                message: TextMessage {
                    text: Some("Balance: 12.34".into()),
                    high_priority: true,
                    user_clear: true,
                    ..TextMessage::default()
                },
            }),
        },
        ScriptStep::Respond {
            outcome: ResponseOutcome::Confirm { confirmed: true },
        },
        ScriptStep::EndSession,
    ]
}

async fn replay(steps: Vec<ScriptStep>) -> Result<()> {
    let SessionRuntime {
        handle,
        mut responses,
        shutdown,
        worker,
    } = session_core::spawn(
        Arc::new(LoggingPresenter),
        Arc::new(LoggingInstaller),
        load_settings(),
    );

    let printer = tokio::spawn(async move {
        while let Some(response) = responses.recv().await {
            match serde_json::to_string(&response) {
                Ok(line) => println!("{line}"),
                Err(err) => eprintln!("unprintable response: {err}"),
            }
        }
    });

    for step in steps {
        match step {
            ScriptStep::Submit { command } => handle.submit(command)?,
            ScriptStep::Respond { outcome } => handle.respond(outcome)?,
            ScriptStep::EndSession => handle.end_session()?,
            ScriptStep::ScreenStatus { idle } => handle.notify_screen_idle(idle)?,
            ScriptStep::BrowserClosed { cause } => handle.notify_browser_closed(cause)?,
            ScriptStep::Timeout => handle.notify_timeout()?,
            ScriptStep::MenuVisible { visible } => handle.notify_menu_visible(visible)?,
            ScriptStep::Wait { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
        }
    }

    // Let in-flight turns settle before shutting the worker down.
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown.cancel();
    worker.await.context("session worker panicked")?;
    printer.await.context("printer task panicked")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();

    match cli.command {
        Command::Demo => replay(demo_steps()).await,
        Command::Run { script } => {
            let raw = std::fs::read_to_string(&script)
                .with_context(|| format!("failed to read script '{}'", script.display()))?;
            let steps: Vec<ScriptStep> =
                serde_json::from_str(&raw).context("failed to parse script")?;
            replay(steps).await
        }
    }
}
