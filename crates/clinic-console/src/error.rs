//! Error types surfaced by the console core.
//!
//! Nothing here is ever raised as a panic: transport errors become
//! [`FetchError`], a settled load cycle carries a [`LoadFailure`], and refused
//! bulk actions come back as a [`GateNotice`].

use thiserror::Error;

/// Failure reported by a [`crate::api::ResourceApi`] call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request never produced an HTTP status (connection refused, CORS, DNS, reset).
    #[error("network error: {message}")]
    Network {
        /// Transport diagnostic.
        message: String,
    },
    /// The server answered with a non-2xx status.
    #[error("HTTP {status} ({url}): {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
        /// Message taken from the error body, or the reason phrase.
        message: String,
    },
    /// The transport gave up waiting for the response.
    #[error("request to {url} timed out after {after_ms} ms")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Configured per-call timeout.
        after_ms: u64,
    },
    /// A 2xx response whose body was not valid JSON.
    #[error("failed to decode response from {url}: {message}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Decoder diagnostic.
        message: String,
    },
    /// The request could not be built (bad base URL, unserialisable body).
    #[error("invalid request: {message}")]
    Request {
        /// Builder diagnostic.
        message: String,
    },
}

/// Terminal failure of a load cycle or a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadFailure {
    /// Connectivity failure (status 0).
    #[error("Network/CORS error (status 0). {message}")]
    NetworkOrCors {
        /// Transport diagnostic.
        message: String,
    },
    /// The server answered with an error status.
    #[error("HTTP error {status} ({url}): {message}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
        /// Server-provided message.
        message: String,
    },
    /// The watchdog fired before the request settled.
    #[error("Timeout: the request returned no usable response.")]
    Timeout,
    /// Anything else (transport timeout, undecodable body).
    #[error("Unknown error: {message}")]
    Unknown {
        /// Diagnostic text.
        message: String,
    },
}

impl LoadFailure {
    /// HTTP status associated with the failure; `0` for connectivity failures.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::NetworkOrCors { .. } => Some(0),
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Timeout | Self::Unknown { .. } => None,
        }
    }
}

impl From<FetchError> for LoadFailure {
    fn from(value: FetchError) -> Self {
        match value {
            FetchError::Network { message } => Self::NetworkOrCors { message },
            FetchError::Status {
                status,
                url,
                message,
            } => Self::HttpStatus {
                status,
                url,
                message,
            },
            other @ (FetchError::Timeout { .. }
            | FetchError::Decode { .. }
            | FetchError::Request { .. }) => Self::Unknown {
                message: other.to_string(),
            },
        }
    }
}

/// User-facing refusal or failure from the bulk action gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateNotice {
    /// Edit / inspect need exactly one selected record.
    #[error("Select exactly one {kind} to {action} ({selected} selected).")]
    RequiresExactlyOne {
        /// Singular kind label.
        kind: &'static str,
        /// Action verb.
        action: &'static str,
        /// Current selection size.
        selected: usize,
    },
    /// View / delete need at least one selected record.
    #[error("Select at least one {kind} to {action}.")]
    RequiresAtLeastOne {
        /// Singular kind label.
        kind: &'static str,
        /// Action verb.
        action: &'static str,
    },
    /// The user declined the confirmation prompt.
    #[error("Cancelled; nothing was changed.")]
    Cancelled,
    /// The mutating call failed; prior state is untouched.
    #[error("Could not {action}: {failure}")]
    Failed {
        /// Action verb.
        action: &'static str,
        /// Underlying failure.
        failure: LoadFailure,
    },
}

/// Errors raised by the record editor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    /// A required field is blank.
    #[error("{field} is required")]
    MissingField {
        /// Wire name of the field.
        field: &'static str,
    },
    /// The editor was opened for inspection only.
    #[error("records opened for inspection cannot be saved")]
    ReadOnly,
    /// The save call failed or timed out.
    #[error("save failed: {0}")]
    Save(LoadFailure),
}

/// Configuration or construction errors.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// A configuration value was rejected.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        /// Configuration field.
        field: &'static str,
        /// Reason for the rejection.
        reason: &'static str,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    HttpClient {
        /// Source error.
        #[source]
        source: reqwest::Error,
    },
    /// A header value contained invalid characters.
    #[error("invalid header value for {header}")]
    InvalidHeader {
        /// Header name.
        header: &'static str,
    },
}
