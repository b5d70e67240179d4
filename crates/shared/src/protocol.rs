use serde::{Deserialize, Serialize};

use crate::domain::{EventKind, ItemId, LaunchBrowserMode, ResultCode, ToneId};

/// Fixed size of the additional-info buffer attached to an event report.
pub const EVENT_CAUSE_LEN: usize = 8;

/// Literal token a yes/no input presentation reports for the affirmative key.
pub const YES_RESPONSE: &str = "YES";

fn default_true() -> bool {
    true
}

/// Alpha identifier / text payload attached to most proactive commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub high_priority: bool,
    /// The user must clear the message; without it the card's timer clears it.
    #[serde(default)]
    pub user_clear: bool,
    #[serde(default = "default_true")]
    pub response_needed: bool,
}

impl Default for TextMessage {
    fn default() -> Self {
        Self {
            title: None,
            text: None,
            high_priority: false,
            user_clear: false,
            response_needed: true,
        }
    }
}

impl TextMessage {
    pub fn with_title(&self, title: Option<String>) -> Self {
        Self {
            title,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: ItemId,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// A menu whose items are exactly `[None]` is the removal sentinel.
    pub items: Vec<Option<MenuItem>>,
}

impl Menu {
    /// Documented sentinel for "remove the application": one null item.
    pub fn is_removal(&self) -> bool {
        self.items.len() == 1 && self.items[0].is_none()
    }

    pub fn item_label(&self, id: ItemId) -> Option<&str> {
        self.items
            .iter()
            .flatten()
            .find(|item| item.id == id)
            .map(|item| item.label.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    pub prompt: TextMessage,
    /// The input presentation offers only yes/no keys.
    #[serde(default)]
    pub yes_no: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub mode: LaunchBrowserMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSettings {
    pub confirm_message: TextMessage,
    pub call_message: TextMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<ToneId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub vibrate: bool,
}

/// Subscription set carried by a SetupEventList command. Replaces the active
/// set wholesale; the card never merges lists across commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventListSettings {
    pub events: Vec<EventKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum CommandPayload {
    DisplayText { message: TextMessage },
    SelectItem { menu: Menu },
    SetupMenu { menu: Menu },
    GetInput { input: InputSpec },
    GetInkey { input: InputSpec },
    SetupIdleModeText { message: Option<TextMessage> },
    SendDtmf { message: Option<TextMessage> },
    SendSms { message: Option<TextMessage> },
    SendSs { message: Option<TextMessage> },
    SendUssd { message: Option<TextMessage> },
    LaunchBrowser { message: TextMessage, settings: BrowserSettings },
    SetupCall { settings: CallSettings },
    PlayTone { message: Option<TextMessage>, settings: ToneSettings },
    SetupEventList { settings: EventListSettings },
}

impl CommandPayload {
    /// Stable name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            CommandPayload::DisplayText { .. } => "display_text",
            CommandPayload::SelectItem { .. } => "select_item",
            CommandPayload::SetupMenu { .. } => "setup_menu",
            CommandPayload::GetInput { .. } => "get_input",
            CommandPayload::GetInkey { .. } => "get_inkey",
            CommandPayload::SetupIdleModeText { .. } => "setup_idle_mode_text",
            CommandPayload::SendDtmf { .. } => "send_dtmf",
            CommandPayload::SendSms { .. } => "send_sms",
            CommandPayload::SendSs { .. } => "send_ss",
            CommandPayload::SendUssd { .. } => "send_ussd",
            CommandPayload::LaunchBrowser { .. } => "launch_browser",
            CommandPayload::SetupCall { .. } => "setup_call",
            CommandPayload::PlayTone { .. } => "play_tone",
            CommandPayload::SetupEventList { .. } => "setup_event_list",
        }
    }
}

/// One proactive command as delivered by the transport layer. Immutable for
/// the whole time the session core holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProactiveCommand {
    pub payload: CommandPayload,
    /// The transport failed to load the command's optional icon.
    #[serde(default)]
    pub icon_load_failed: bool,
}

impl ProactiveCommand {
    pub fn new(payload: CommandPayload) -> Self {
        Self {
            payload,
            icon_load_failed: false,
        }
    }

    pub fn menu(&self) -> Option<&Menu> {
        match &self.payload {
            CommandPayload::SelectItem { menu } | CommandPayload::SetupMenu { menu } => Some(menu),
            _ => None,
        }
    }
}

/// Outcome of one user interaction, reported by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ResponseOutcome {
    MenuSelection { item_id: ItemId, help_requested: bool },
    Input { text: String, help_requested: bool },
    Confirm { confirmed: bool },
    Done,
    Backward,
    EndSession,
    Timeout,
}

impl ResponseOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            ResponseOutcome::MenuSelection { .. } => "menu_selection",
            ResponseOutcome::Input { .. } => "input",
            ResponseOutcome::Confirm { .. } => "confirm",
            ResponseOutcome::Done => "done",
            ResponseOutcome::Backward => "backward",
            ResponseOutcome::EndSession => "end_session",
            ResponseOutcome::Timeout => "timeout",
        }
    }
}

/// Terminal response for exactly one accepted proactive command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalResponse {
    pub result: ResultCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_item: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<u8>,
}

impl TerminalResponse {
    pub fn with_result(result: ResultCode) -> Self {
        Self {
            result,
            selected_item: None,
            input: None,
            confirmed: None,
            additional_info: None,
        }
    }

    pub fn ok() -> Self {
        Self::with_result(ResultCode::Ok)
    }
}

/// Everything the core sends back towards the card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum CardResponse {
    Terminal(TerminalResponse),
    /// Unsolicited report for a subscribed asynchronous event; not paired
    /// with any proactive command.
    EventDownload {
        event: EventKind,
        cause: [u8; EVENT_CAUSE_LEN],
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_sentinel_is_single_null_item() {
        let removal = Menu {
            title: None,
            items: vec![None],
        };
        assert!(removal.is_removal());

        let regular = Menu {
            title: Some("Operator".into()),
            items: vec![Some(MenuItem {
                id: ItemId(1),
                label: "Balance".into(),
            })],
        };
        assert!(!regular.is_removal());

        let empty = Menu::default();
        assert!(!empty.is_removal());
    }

    #[test]
    fn item_label_skips_null_entries() {
        let menu = Menu {
            title: None,
            items: vec![
                None,
                Some(MenuItem {
                    id: ItemId(2),
                    label: "News".into(),
                }),
            ],
        };
        assert_eq!(menu.item_label(ItemId(2)), Some("News"));
        assert_eq!(menu.item_label(ItemId(9)), None);
    }

    #[test]
    fn text_message_response_needed_defaults_true() {
        let msg: TextMessage = serde_json::from_str(r#"{"text":"hello"}"#).expect("parse");
        assert!(msg.response_needed);
        assert!(!msg.user_clear);
    }
}
