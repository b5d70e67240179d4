use super::*;
use shared::domain::ItemId;
use shared::protocol::{CallSettings, InputSpec, Menu, MenuItem};

fn menu_command(kind: fn(Menu) -> CommandPayload) -> ProactiveCommand {
    ProactiveCommand::new(kind(Menu {
        title: Some("Operator".into()),
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
    }))
}

fn select_item() -> ProactiveCommand {
    menu_command(|menu| CommandPayload::SelectItem { menu })
}

fn display_text(user_clear: bool) -> ProactiveCommand {
    ProactiveCommand::new(CommandPayload::DisplayText {
        message: TextMessage {
            text: Some("hello".into()),
            user_clear,
            response_needed: true,
            ..TextMessage::default()
        },
    })
}

fn get_input(yes_no: bool) -> ProactiveCommand {
    ProactiveCommand::new(CommandPayload::GetInput {
        input: InputSpec {
            prompt: TextMessage {
                text: Some("enter pin".into()),
                ..TextMessage::default()
            },
            yes_no,
        },
    })
}

fn launch_browser(mode: LaunchBrowserMode) -> ProactiveCommand {
    ProactiveCommand::new(CommandPayload::LaunchBrowser {
        message: TextMessage::default(),
        settings: BrowserSettings {
            url: Some("http://portal.example".into()),
            mode,
        },
    })
}

fn setup_call() -> ProactiveCommand {
    ProactiveCommand::new(CommandPayload::SetupCall {
        settings: CallSettings {
            confirm_message: TextMessage {
                text: Some("call support?".into()),
                ..TextMessage::default()
            },
            call_message: TextMessage {
                text: Some("calling support".into()),
                ..TextMessage::default()
            },
        },
    })
}

fn selection(item: u8, help: bool) -> ResponseOutcome {
    ResponseOutcome::MenuSelection {
        item_id: ItemId(item),
        help_requested: help,
    }
}

#[test]
fn menu_selection_round_trips_item_id() {
    let built = build(&select_item(), &selection(2, false), false).expect("build");
    assert_eq!(built.response.result, ResultCode::Ok);
    assert_eq!(built.response.selected_item, Some(ItemId(2)));
    assert_eq!(built.effect, TurnEffect::None);
}

#[test]
fn help_outranks_icon_failure_for_selections() {
    let mut cmd = select_item();
    cmd.icon_load_failed = true;
    let built = build(&cmd, &selection(1, true), false).expect("build");
    assert_eq!(built.response.result, ResultCode::HelpInfoRequired);

    let built = build(&cmd, &selection(1, false), false).expect("build");
    assert_eq!(built.response.result, ResultCode::IconNotDisplayed);
    assert_eq!(built.response.selected_item, Some(ItemId(1)));
}

#[test]
fn input_attaches_text_unless_help_requested() {
    let outcome = ResponseOutcome::Input {
        text: "1234".into(),
        help_requested: false,
    };
    let built = build(&get_input(false), &outcome, false).expect("build");
    assert_eq!(built.response.result, ResultCode::Ok);
    assert_eq!(built.response.input.as_deref(), Some("1234"));

    let outcome = ResponseOutcome::Input {
        text: "1234".into(),
        help_requested: true,
    };
    let built = build(&get_input(false), &outcome, false).expect("build");
    assert_eq!(built.response.result, ResultCode::HelpInfoRequired);
    assert_eq!(built.response.input, None);
}

#[test]
fn yes_no_input_maps_affirmative_token() {
    let outcome = ResponseOutcome::Input {
        text: YES_RESPONSE.into(),
        help_requested: false,
    };
    let built = build(&get_input(true), &outcome, false).expect("build");
    assert_eq!(built.response.result, ResultCode::Ok);
    assert_eq!(built.response.confirmed, Some(true));
    assert_eq!(built.response.input, None);

    let outcome = ResponseOutcome::Input {
        text: "NO".into(),
        help_requested: false,
    };
    let built = build(&get_input(true), &outcome, false).expect("build");
    assert_eq!(built.response.confirmed, Some(false));
}

#[test]
fn display_text_confirmation() {
    let confirm = ResponseOutcome::Confirm { confirmed: true };
    let built = build(&display_text(true), &confirm, false).expect("build");
    assert_eq!(built.response.result, ResultCode::Ok);

    let decline = ResponseOutcome::Confirm { confirmed: false };
    let built = build(&display_text(true), &decline, false).expect("build");
    assert_eq!(built.response.result, ResultCode::SessionTerminatedByUser);

    let mut cmd = display_text(true);
    cmd.icon_load_failed = true;
    let built = build(&cmd, &confirm, false).expect("build");
    assert_eq!(built.response.result, ResultCode::IconNotDisplayed);
}

#[test]
fn confirmed_browser_launch_is_deferred() {
    let confirm = ResponseOutcome::Confirm { confirmed: true };
    let built = build(
        &launch_browser(LaunchBrowserMode::LaunchNewBrowser),
        &confirm,
        false,
    )
    .expect("build");
    assert_eq!(built.response.result, ResultCode::Ok);
    assert!(matches!(built.effect, TurnEffect::DeferBrowserLaunch(_)));
}

#[test]
fn declined_browser_launch_terminates_session() {
    let decline = ResponseOutcome::Confirm { confirmed: false };
    let built = build(
        &launch_browser(LaunchBrowserMode::LaunchNewBrowser),
        &decline,
        true,
    )
    .expect("build");
    assert_eq!(built.response.result, ResultCode::SessionTerminatedByUser);
    assert_eq!(built.effect, TurnEffect::None);
}

#[test]
fn browser_already_running_reports_unavailable_and_launches_nothing() {
    let confirm = ResponseOutcome::Confirm { confirmed: true };
    let built = build(
        &launch_browser(LaunchBrowserMode::LaunchIfNotAlreadyLaunched),
        &confirm,
        true,
    )
    .expect("build");
    assert_eq!(built.response.result, ResultCode::LaunchBrowserError);
    assert_eq!(built.response.additional_info, Some(0x02));
    assert_eq!(built.effect, TurnEffect::None);

    // Same mode with no browser running launches normally.
    let built = build(
        &launch_browser(LaunchBrowserMode::LaunchIfNotAlreadyLaunched),
        &confirm,
        false,
    )
    .expect("build");
    assert_eq!(built.response.result, ResultCode::Ok);
    assert!(matches!(built.effect, TurnEffect::DeferBrowserLaunch(_)));
}

#[test]
fn setup_call_always_ok_and_announces_when_confirmed() {
    let confirm = ResponseOutcome::Confirm { confirmed: true };
    let built = build(&setup_call(), &confirm, false).expect("build");
    assert_eq!(built.response.result, ResultCode::Ok);
    assert_eq!(built.response.confirmed, Some(true));
    assert!(matches!(built.effect, TurnEffect::AnnounceCall(_)));

    let decline = ResponseOutcome::Confirm { confirmed: false };
    let built = build(&setup_call(), &decline, false).expect("build");
    assert_eq!(built.response.result, ResultCode::Ok);
    assert_eq!(built.response.confirmed, Some(false));
    assert_eq!(built.effect, TurnEffect::None);
}

#[test]
fn navigation_and_termination_outcomes() {
    let built = build(&display_text(true), &ResponseOutcome::Done, false).expect("build");
    assert_eq!(built.response.result, ResultCode::Ok);

    let built = build(&select_item(), &ResponseOutcome::Backward, false).expect("build");
    assert_eq!(built.response.result, ResultCode::BackwardMoveByUser);

    let built = build(&select_item(), &ResponseOutcome::EndSession, false).expect("build");
    assert_eq!(built.response.result, ResultCode::SessionTerminatedByUser);
}

#[test]
fn timeout_is_ok_only_for_auto_clearing_display_text() {
    let built = build(&display_text(false), &ResponseOutcome::Timeout, false).expect("build");
    assert_eq!(built.response.result, ResultCode::Ok);

    let built = build(&display_text(true), &ResponseOutcome::Timeout, false).expect("build");
    assert_eq!(built.response.result, ResultCode::NoResponseFromUser);

    let built = build(&get_input(false), &ResponseOutcome::Timeout, false).expect("build");
    assert_eq!(built.response.result, ResultCode::NoResponseFromUser);
}

#[test]
fn outcome_command_mismatch_is_a_typed_error() {
    let err = build(&display_text(true), &selection(1, false), false).unwrap_err();
    let ResponseError::Violation(violation) = err;
    assert_eq!(
        violation,
        ProtocolViolation::OutcomeMismatch {
            outcome: "menu_selection",
            command: "display_text",
        }
    );
}
