//! Failure conditions for queries.
//!
//! A `QueryError` is data, not a control-flow error. Every query-domain
//! failure (parse errors, semantic errors, timeouts, shutdown) ends up attached
//! to a terminal query so clients can read it back.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Broad classification of an error code, used for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    UserError,
    InternalError,
    InsufficientResources,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SyntaxError,
    InvalidParameterUsage,
    ExpressionNotConstant,
    NotSupported,
    NotFound,
    InvalidSessionProperty,
    QueryTextTooLarge,
    UserCanceled,
    AbandonedQuery,
    ExceededTimeLimit,
    ExceededMemoryLimit,
    QueryQueueFull,
    ServerShuttingDown,
    GenericInternalError,
}

impl ErrorCode {
    /// Stable name for the code.
    pub const fn name(&self) -> &'static str {
        match self {
            ErrorCode::SyntaxError => "SYNTAX_ERROR",
            ErrorCode::InvalidParameterUsage => "INVALID_PARAMETER_USAGE",
            ErrorCode::ExpressionNotConstant => "EXPRESSION_NOT_CONSTANT",
            ErrorCode::NotSupported => "NOT_SUPPORTED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InvalidSessionProperty => "INVALID_SESSION_PROPERTY",
            ErrorCode::QueryTextTooLarge => "QUERY_TEXT_TOO_LARGE",
            ErrorCode::UserCanceled => "USER_CANCELED",
            ErrorCode::AbandonedQuery => "ABANDONED_QUERY",
            ErrorCode::ExceededTimeLimit => "EXCEEDED_TIME_LIMIT",
            ErrorCode::ExceededMemoryLimit => "EXCEEDED_MEMORY_LIMIT",
            ErrorCode::QueryQueueFull => "QUERY_QUEUE_FULL",
            ErrorCode::ServerShuttingDown => "SERVER_SHUTTING_DOWN",
            ErrorCode::GenericInternalError => "GENERIC_INTERNAL_ERROR",
        }
    }

    pub const fn error_type(&self) -> ErrorType {
        match self {
            ErrorCode::SyntaxError
            | ErrorCode::InvalidParameterUsage
            | ErrorCode::ExpressionNotConstant
            | ErrorCode::NotSupported
            | ErrorCode::NotFound
            | ErrorCode::InvalidSessionProperty
            | ErrorCode::QueryTextTooLarge
            | ErrorCode::UserCanceled
            | ErrorCode::AbandonedQuery => ErrorType::UserError,
            ErrorCode::ExceededTimeLimit
            | ErrorCode::ExceededMemoryLimit
            | ErrorCode::QueryQueueFull => ErrorType::InsufficientResources,
            ErrorCode::ServerShuttingDown | ErrorCode::GenericInternalError => {
                ErrorType::InternalError
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A failure condition attached to a query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct QueryError {
    pub code: ErrorCode,
    pub message: String,
    /// Resource group the query was rejected from, only set for queue-full
    /// conditions.
    pub resource_group: Option<String>,
}

impl QueryError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        QueryError {
            code,
            message: message.into(),
            resource_group: None,
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SyntaxError, message)
    }

    /// Parameter count mismatch between a statement and the supplied values.
    pub fn parameter_count(expected: usize, found: usize) -> Self {
        Self::new(
            ErrorCode::InvalidParameterUsage,
            format!("Incorrect number of parameters: expected {expected} but found {found}"),
        )
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotSupported, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn expression_not_constant(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExpressionNotConstant, message)
    }

    pub fn user_canceled() -> Self {
        Self::new(ErrorCode::UserCanceled, "Query was canceled")
    }

    pub fn abandoned(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AbandonedQuery, message)
    }

    pub fn exceeded_time_limit(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExceededTimeLimit, message)
    }

    pub fn query_text_too_large(length: usize, max_length: usize) -> Self {
        Self::new(
            ErrorCode::QueryTextTooLarge,
            format!("Query text length ({length}) exceeds the maximum length ({max_length})"),
        )
    }

    pub fn queue_full(resource_group: impl Into<String>, message: impl Into<String>) -> Self {
        QueryError {
            code: ErrorCode::QueryQueueFull,
            message: message.into(),
            resource_group: Some(resource_group.into()),
        }
    }

    pub fn server_shutting_down(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServerShuttingDown, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::GenericInternalError, message)
    }

    pub fn error_type(&self) -> ErrorType {
        self.code.error_type()
    }
}
