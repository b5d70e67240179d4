use thiserror::Error;

/// Protocol violations observed at the session core boundary. None of these
/// is fatal: the offending turn is logged and abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("response received while no command is awaiting one")]
    ResponseWithoutCommand,
    #[error("{outcome} response does not apply to a {command} command")]
    OutcomeMismatch {
        outcome: &'static str,
        command: &'static str,
    },
}

/// The session worker has stopped and its inbound channel is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("session worker is no longer running")]
pub struct SessionClosed;
