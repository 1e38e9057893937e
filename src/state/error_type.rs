//! Failure taxonomy and the retryability classifier
//!
//! Every failed fetch is tagged with one [`ErrorType`]. Whether the failure
//! is worth retrying depends on that type *and* on the HTTP status that came
//! with it: a status in [`RETRYABLE_STATUS_CODES`] forces a retry even when
//! the type alone would not.

use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP statuses that are always worth retrying, whatever the error type
pub const RETRYABLE_STATUS_CODES: [u16; 6] = [406, 429, 500, 502, 503, 504];

/// Kind of failure recorded for a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    // ===== Network =====
    /// Request exceeded its timeout
    Timeout,
    /// Connection refused, reset, DNS failure
    ConnectionError,

    // ===== Protocol =====
    /// Non-200 status with no more specific mapping
    HttpError,
    /// HTTP 404
    NotFound,
    /// HTTP 403
    AccessForbidden,
    /// HTTP 406 or 429
    RateLimited,
    /// HTTP 5xx
    ServerError,
    /// Short-lived condition reported by the site itself
    TemporaryError,

    // ===== Content state =====
    PositionFilled,
    ApplicationsClosed,
    JobExpired,

    // ===== Extraction =====
    MissingTitle,
    ParseError,

    // ===== Orchestration =====
    RetryExhausted,
    ExternalRedirect,
    /// Worker task died while handling the URL
    ProcessingError,
}

/// Layer of the stack a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Network,
    Protocol,
    ContentState,
    Extraction,
    Orchestration,
}

/// Outcome of classifying a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub retryable: bool,
    pub category: FailureCategory,
}

impl ErrorType {
    /// Every variant, in declaration order
    pub const ALL: [ErrorType; 16] = [
        Self::Timeout,
        Self::ConnectionError,
        Self::HttpError,
        Self::NotFound,
        Self::AccessForbidden,
        Self::RateLimited,
        Self::ServerError,
        Self::TemporaryError,
        Self::PositionFilled,
        Self::ApplicationsClosed,
        Self::JobExpired,
        Self::MissingTitle,
        Self::ParseError,
        Self::RetryExhausted,
        Self::ExternalRedirect,
        Self::ProcessingError,
    ];

    /// Maps a non-200 HTTP status to its error type
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            403 => Self::AccessForbidden,
            406 | 429 => Self::RateLimited,
            s if s >= 500 => Self::ServerError,
            _ => Self::HttpError,
        }
    }

    /// Returns true if the type alone marks the failure as transient
    pub fn is_retryable_type(&self) -> bool {
        matches!(
            self,
            Self::Timeout
                | Self::ConnectionError
                | Self::RateLimited
                | Self::ServerError
                | Self::TemporaryError
        )
    }

    /// Returns true for the "posting is gone" outcomes
    pub fn is_content_state(&self) -> bool {
        matches!(
            self,
            Self::PositionFilled | Self::ApplicationsClosed | Self::JobExpired
        )
    }

    pub fn category(&self) -> FailureCategory {
        match self {
            Self::Timeout | Self::ConnectionError => FailureCategory::Network,
            Self::HttpError
            | Self::NotFound
            | Self::AccessForbidden
            | Self::RateLimited
            | Self::ServerError
            | Self::TemporaryError => FailureCategory::Protocol,
            Self::PositionFilled | Self::ApplicationsClosed | Self::JobExpired => {
                FailureCategory::ContentState
            }
            Self::MissingTitle | Self::ParseError => FailureCategory::Extraction,
            Self::RetryExhausted | Self::ExternalRedirect | Self::ProcessingError => {
                FailureCategory::Orchestration
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionError => "connection_error",
            Self::HttpError => "http_error",
            Self::NotFound => "not_found",
            Self::AccessForbidden => "access_forbidden",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::TemporaryError => "temporary_error",
            Self::PositionFilled => "position_filled",
            Self::ApplicationsClosed => "applications_closed",
            Self::JobExpired => "job_expired",
            Self::MissingTitle => "missing_title",
            Self::ParseError => "parse_error",
            Self::RetryExhausted => "retry_exhausted",
            Self::ExternalRedirect => "external_redirect",
            Self::ProcessingError => "processing_error",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if a status code is in the always-retry set
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUS_CODES.contains(&status)
}

/// Decides whether a failure should be retried
///
/// The status override takes precedence over the type default, so
/// `http_error` with status 406 is retryable.
///
/// # Examples
///
/// ```
/// use avature_harvester::state::{is_retryable, ErrorType};
///
/// assert!(is_retryable(ErrorType::Timeout, None));
/// assert!(!is_retryable(ErrorType::HttpError, Some(410)));
/// assert!(is_retryable(ErrorType::HttpError, Some(406)));
/// ```
pub fn is_retryable(error_type: ErrorType, http_status: Option<u16>) -> bool {
    error_type.is_retryable_type() || http_status.map(is_retryable_status).unwrap_or(false)
}

/// Full classification of a failure: retryability plus category
pub fn classify(error_type: ErrorType, http_status: Option<u16>) -> Classification {
    Classification {
        retryable: is_retryable(error_type, http_status),
        category: error_type.category(),
    }
}
