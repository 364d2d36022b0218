//! Error types for the LockUp client.
//!
//! Validation variants display the fixed message shown to the user.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockupError {
    /// HTTP request failed or returned a non-success status
    #[error("Network error: {message}")]
    Network { message: String },

    /// Response body was neither an array nor an object wrapping one in `data`
    #[error("Unexpected response structure: {message}")]
    UnexpectedShape { message: String },

    #[error("Failed to fetch user info.")]
    UserInfo,

    #[error("Your email is not registered, please contact the administrator.")]
    NotRegistered,

    #[error("The request took too long, please try again.")]
    Timeout,

    #[error("Please enter an enrollment key.")]
    MissingEnrollmentKey,

    #[error("Subject not found.")]
    SubjectNotFound,

    #[error("Invalid enrolment key.")]
    InvalidEnrollmentKey,

    #[error("User not found in storage.")]
    NoStoredUser,

    #[error("User not found or invalid user data.")]
    InvalidStoredUser,

    #[error("Failed to enroll in the subject.")]
    EnrollmentRejected { status: String },

    /// Local session store could not be read or written
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Invalid URL: {message}")]
    Url { message: String },
}

impl LockupError {
    /// Message for errors raised while talking to the backend during enrollment.
    pub const GENERIC_REQUEST_FAILURE: &'static str =
        "An error occurred while processing your request.";

    /// Returns true if the user has to fix their input or session rather than retry.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LockupError::NotRegistered
                | LockupError::MissingEnrollmentKey
                | LockupError::SubjectNotFound
                | LockupError::InvalidEnrollmentKey
                | LockupError::NoStoredUser
                | LockupError::InvalidStoredUser
        )
    }

    /// Text for the alert shown to the user.
    pub fn alert_message(&self) -> String {
        match self {
            LockupError::Network { .. } | LockupError::UnexpectedShape { .. } => {
                Self::GENERIC_REQUEST_FAILURE.to_owned()
            }
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for LockupError {
    fn from(err: reqwest::Error) -> Self {
        LockupError::Network {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for LockupError {
    fn from(err: std::io::Error) -> Self {
        LockupError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for LockupError {
    fn from(err: serde_json::Error) -> Self {
        LockupError::Storage {
            message: err.to_string(),
        }
    }
}
