//! Response builder: turns a (command, user outcome) pair into the terminal
//! response the transport sends back to the card.

use shared::domain::{LaunchBrowserMode, ResultCode};
use shared::error::ProtocolViolation;
use shared::protocol::{
    BrowserSettings, CommandPayload, ProactiveCommand, ResponseOutcome, TerminalResponse,
    TextMessage, YES_RESPONSE,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error(transparent)]
    Violation(#[from] ProtocolViolation),
}

/// Side effect the state machine must perform after a response is sent.
/// A confirmed browser launch is deferred until session-end bookkeeping is
/// done; a confirmed call is announced immediately. That asymmetry is part
/// of the protocol's documented timing rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEffect {
    None,
    DeferBrowserLaunch(BrowserSettings),
    AnnounceCall(TextMessage),
}

#[derive(Debug)]
pub struct Built {
    pub response: TerminalResponse,
    pub effect: TurnEffect,
}

impl Built {
    fn plain(response: TerminalResponse) -> Self {
        Self {
            response,
            effect: TurnEffect::None,
        }
    }
}

fn mismatch(cmd: &ProactiveCommand, outcome: &ResponseOutcome) -> ResponseError {
    ProtocolViolation::OutcomeMismatch {
        outcome: outcome.name(),
        command: cmd.payload.name(),
    }
    .into()
}

/// Result code for an outcome that succeeded but may have had its optional
/// icon dropped by the transport.
fn performed(cmd: &ProactiveCommand) -> ResultCode {
    if cmd.icon_load_failed {
        ResultCode::IconNotDisplayed
    } else {
        ResultCode::Ok
    }
}

/// Build the terminal response for `cmd` given the user-supplied `outcome`.
///
/// `browser_running` feeds the LaunchBrowser "only if not already launched"
/// check; it is sampled by the caller at response time.
pub fn build(
    cmd: &ProactiveCommand,
    outcome: &ResponseOutcome,
    browser_running: bool,
) -> Result<Built, ResponseError> {
    match outcome {
        ResponseOutcome::MenuSelection {
            item_id,
            help_requested,
        } => match &cmd.payload {
            CommandPayload::SetupMenu { .. } | CommandPayload::SelectItem { .. } => {
                let result = if *help_requested {
                    ResultCode::HelpInfoRequired
                } else {
                    performed(cmd)
                };
                let mut response = TerminalResponse::with_result(result);
                response.selected_item = Some(*item_id);
                Ok(Built::plain(response))
            }
            _ => Err(mismatch(cmd, outcome)),
        },
        ResponseOutcome::Input {
            text,
            help_requested,
        } => match &cmd.payload {
            CommandPayload::GetInput { input } | CommandPayload::GetInkey { input } => {
                if input.yes_no {
                    let mut response = TerminalResponse::ok();
                    response.confirmed = Some(text == YES_RESPONSE);
                    Ok(Built::plain(response))
                } else if *help_requested {
                    Ok(Built::plain(TerminalResponse::with_result(
                        ResultCode::HelpInfoRequired,
                    )))
                } else {
                    let mut response = TerminalResponse::with_result(performed(cmd));
                    response.input = Some(text.clone());
                    Ok(Built::plain(response))
                }
            }
            _ => Err(mismatch(cmd, outcome)),
        },
        ResponseOutcome::Confirm { confirmed } => match &cmd.payload {
            CommandPayload::DisplayText { .. } => {
                let result = if *confirmed {
                    performed(cmd)
                } else {
                    ResultCode::SessionTerminatedByUser
                };
                Ok(Built::plain(TerminalResponse::with_result(result)))
            }
            CommandPayload::LaunchBrowser { settings, .. } => {
                if settings.mode == LaunchBrowserMode::LaunchIfNotAlreadyLaunched
                    && *confirmed
                    && browser_running
                {
                    // Browser unavailable: report the error, launch nothing.
                    let mut response =
                        TerminalResponse::with_result(ResultCode::LaunchBrowserError);
                    response.additional_info = Some(0x02);
                    Ok(Built::plain(response))
                } else if *confirmed {
                    Ok(Built {
                        response: TerminalResponse::ok(),
                        effect: TurnEffect::DeferBrowserLaunch(settings.clone()),
                    })
                } else {
                    Ok(Built::plain(TerminalResponse::with_result(
                        ResultCode::SessionTerminatedByUser,
                    )))
                }
            }
            CommandPayload::SetupCall { settings } => {
                let mut response = TerminalResponse::ok();
                response.confirmed = Some(*confirmed);
                let effect = if *confirmed {
                    TurnEffect::AnnounceCall(settings.call_message.clone())
                } else {
                    TurnEffect::None
                };
                Ok(Built { response, effect })
            }
            _ => Err(mismatch(cmd, outcome)),
        },
        ResponseOutcome::Done => Ok(Built::plain(TerminalResponse::ok())),
        ResponseOutcome::Backward => Ok(Built::plain(TerminalResponse::with_result(
            ResultCode::BackwardMoveByUser,
        ))),
        ResponseOutcome::EndSession => Ok(Built::plain(TerminalResponse::with_result(
            ResultCode::SessionTerminatedByUser,
        ))),
        ResponseOutcome::Timeout => {
            // DisplayText without user-initiated clearing resolves to OK on
            // timeout; everything else reports no response from the user.
            // Interoperability requirement, not an oversight.
            let result = match &cmd.payload {
                CommandPayload::DisplayText { message } if !message.user_clear => ResultCode::Ok,
                _ => ResultCode::NoResponseFromUser,
            };
            Ok(Built::plain(TerminalResponse::with_result(result)))
        }
    }
}

#[cfg(test)]
#[path = "tests/response_tests.rs"]
mod tests;
