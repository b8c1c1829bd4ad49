// Error taxonomy for roster registration.

use thiserror::Error;

use crate::submission::RosterUpdateReport;
use crate::validation::ValidationReport;

/// A remote call failed or was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The server answered with a non-success status. `message` carries the
    /// server-supplied `msg` when the body had one.
    #[error("request rejected with status {status}")]
    Rejected { status: u16, message: Option<String> },

    /// The bearer token was missing, expired, or refused.
    #[error("not authorized")]
    Unauthorized { message: Option<String> },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("request timed out")]
    Timeout,
}

impl ApiError {
    /// The server-supplied message, if the failure carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message, .. } | ApiError::Unauthorized { message } => {
                message.as_deref().filter(|m| !m.trim().is_empty())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvitationError {
    #[error("invitation code is missing")]
    Missing,

    #[error("invitation code must have at least {min} characters")]
    TooShort { min: usize },

    #[error("invitation code rejected: {message}")]
    Rejected { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("a team can have at most {max} players")]
    CapacityReached { max: usize },

    #[error("slot index {index} out of range (roster has {len} slots)")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhotoError {
    #[error("`{declared_type}` is not an image type")]
    NotAnImage { declared_type: String },

    #[error("the selected file is empty")]
    Empty,

    #[error(transparent)]
    Slot(#[from] RosterError),
}

/// Everything that can stop a registration flow. None of these is fatal:
/// the user can correct input, retry, or navigate away.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("{}", .0.summary)]
    Validation(ValidationReport),

    #[error(transparent)]
    Network(#[from] ApiError),

    #[error(transparent)]
    Invitation(#[from] InvitationError),

    #[error("{} of {} player records failed", .0.failed_count(), .0.outcomes.len())]
    PartialRoster(RosterUpdateReport),

    #[error("a submission is already in flight")]
    SubmissionInFlight,

    #[error("the roster form is locked until the invitation code is valid")]
    GateLocked,

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Photo(#[from] PhotoError),
}
