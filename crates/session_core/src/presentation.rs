//! Contracts for the collaborators the session core drives: the UI
//! presentation layer and the launcher installer. The core only ever calls
//! these fire-and-forget; implementations must not block the caller.

use shared::protocol::{BrowserSettings, InputSpec, Menu, TextMessage, ToneSettings};
use tracing::warn;

/// Presentation surface the state machine dispatches against once it has
/// decided a command must be shown to the user.
pub trait PresentationDispatcher: Send + Sync {
    /// Show a selection menu. `None` means re-present the main menu.
    fn present_menu(&self, menu: Option<&Menu>);
    fn present_input(&self, input: &InputSpec);
    fn present_text_dialog(&self, message: &TextMessage);
    fn present_confirmation(&self, message: &TextMessage);
    fn present_tone(&self, message: Option<&TextMessage>, settings: &ToneSettings);
    fn stop_tone(&self);
    /// Show or clear (`None`) the idle-mode text.
    fn present_idle_text(&self, message: Option<&TextMessage>);
    /// Transient notice for send-class commands carrying alpha text.
    fn present_notice(&self, message: &TextMessage);
    fn request_browser_launch(&self, settings: &BrowserSettings);
    fn request_call_message(&self, message: &TextMessage);
    /// Ask the platform to start (`true`) or stop (`false`) reporting screen
    /// idle status back through the session handle.
    fn request_screen_status(&self, subscribe: bool);
    fn browser_running(&self) -> bool;
}

/// Toggles the launcher entry that lets the user open the toolkit menu.
/// Failures are best-effort: logged by the core, never fatal.
pub trait LauncherInstaller: Send + Sync {
    fn install(&self) -> anyhow::Result<()>;
    fn uninstall(&self) -> anyhow::Result<()>;
}

/// Null object used when no UI layer is wired up yet.
pub struct MissingPresentation;

impl PresentationDispatcher for MissingPresentation {
    fn present_menu(&self, _menu: Option<&Menu>) {
        warn!("presentation layer unavailable: dropping menu");
    }

    fn present_input(&self, _input: &InputSpec) {
        warn!("presentation layer unavailable: dropping input request");
    }

    fn present_text_dialog(&self, _message: &TextMessage) {
        warn!("presentation layer unavailable: dropping text dialog");
    }

    fn present_confirmation(&self, _message: &TextMessage) {
        warn!("presentation layer unavailable: dropping confirmation");
    }

    fn present_tone(&self, _message: Option<&TextMessage>, _settings: &ToneSettings) {
        warn!("presentation layer unavailable: dropping tone");
    }

    fn stop_tone(&self) {}

    fn present_idle_text(&self, _message: Option<&TextMessage>) {
        warn!("presentation layer unavailable: dropping idle text");
    }

    fn present_notice(&self, _message: &TextMessage) {
        warn!("presentation layer unavailable: dropping notice");
    }

    fn request_browser_launch(&self, _settings: &BrowserSettings) {
        warn!("presentation layer unavailable: dropping browser launch");
    }

    fn request_call_message(&self, _message: &TextMessage) {
        warn!("presentation layer unavailable: dropping call message");
    }

    fn request_screen_status(&self, _subscribe: bool) {}

    fn browser_running(&self) -> bool {
        false
    }
}

/// Null object for platforms without a toggleable launcher component.
pub struct MissingLauncherInstaller;

impl LauncherInstaller for MissingLauncherInstaller {
    fn install(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn uninstall(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
