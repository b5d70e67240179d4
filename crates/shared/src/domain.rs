use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub u8);
    };
}

id_newtype!(ItemId);
id_newtype!(ToneId);

/// Terminal result codes reported back to the card for a proactive command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    Ok,
    /// Command performed, but the optional icon could not be displayed.
    IconNotDisplayed,
    HelpInfoRequired,
    SessionTerminatedByUser,
    BackwardMoveByUser,
    NoResponseFromUser,
    LaunchBrowserError,
    /// Terminal is currently unable to process the command (busy screen).
    ScreenBusy,
}

/// Asynchronous event types a card may subscribe to via SetupEventList.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UserActivity,
    IdleScreenAvailable,
    LanguageSelection,
    BrowserTermination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchBrowserMode {
    UseExistingBrowser,
    LaunchNewBrowser,
    LaunchIfNotAlreadyLaunched,
}
