/*!
 * Error types for the subremote application.
 *
 * This module contains custom error types for the service client and the
 * translation session, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when talking to the translation service's JSON endpoints
#[derive(Error, Debug)]
pub enum ApiError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the service itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the service
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The configured base URL is unusable
    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),
}

/// Errors that can occur during a translation session
///
/// Only `Validation` (and `Transport` when the stream cannot even be opened)
/// is ever returned to callers. The others are folded into the session's log
/// lines and terminal status by the controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The request is missing required fields
    #[error("Validation error: {0}")]
    Validation(String),

    /// A stream message could not be parsed as a tagged message
    #[error("Malformed stream event: {0}")]
    MalformedEvent(String),

    /// The service reported an error for the running job
    #[error("Remote error: {0}")]
    Remote(String),

    /// The stream failed before a terminal message arrived
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}
