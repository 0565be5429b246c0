//! # Error Types Module
//!
//! Failure modes of a single request cycle. None of them is fatal to the process:
//! every variant is turned into a user-facing notice by the menu controller.

use std::fmt;

/// Malformed admin input for a new contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Input has no `|` between service and phone
    MissingSeparator,
    EmptyService,
    EmptyPhone,
    /// Service name does not fit into a callback payload
    ServiceTooLong,
    /// Phone does not match any accepted format
    InvalidPhone,
}

impl ValidationError {
    /// Localization key of the help message shown for this error
    pub fn message_key(&self) -> &'static str {
        match self {
            ValidationError::MissingSeparator => "error-missing-separator",
            ValidationError::EmptyService => "error-empty-service",
            ValidationError::EmptyPhone => "error-empty-phone",
            ValidationError::ServiceTooLong => "error-service-too-long",
            ValidationError::InvalidPhone => "error-invalid-phone",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingSeparator => write!(f, "missing '|' separator"),
            ValidationError::EmptyService => write!(f, "empty service name"),
            ValidationError::EmptyPhone => write!(f, "empty phone number"),
            ValidationError::ServiceTooLong => write!(f, "service name too long"),
            ValidationError::InvalidPhone => write!(f, "unsupported phone format"),
        }
    }
}

/// Why a request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// Requester is not in the admin set
    NotAdmin,
    /// Screen needs group-scoped data but the chat is private or not allowed
    GroupOnly,
    /// Chat is not in the allowed group list
    ChatNotAllowed,
}

impl DenialReason {
    pub fn message_key(&self) -> &'static str {
        match self {
            DenialReason::NotAdmin => "denied-not-admin",
            DenialReason::GroupOnly => "denied-group-only",
            DenialReason::ChatNotAllowed => "denied-chat",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::NotAdmin => write!(f, "requester is not an admin"),
            DenialReason::GroupOnly => write!(f, "available only in an allowed group"),
            DenialReason::ChatNotAllowed => write!(f, "chat is not allowed"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("invalid input: {0}")]
    InputValidation(ValidationError),

    #[error("permission denied: {0}")]
    PermissionDenied(DenialReason),

    #[error("contact not found: {service}")]
    NotFound { service: String },

    #[error("{operation} failed: {source}")]
    Collaborator {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl BotError {
    pub fn collaborator(operation: &'static str, source: anyhow::Error) -> Self {
        BotError::Collaborator { operation, source }
    }
}

impl From<ValidationError> for BotError {
    fn from(err: ValidationError) -> Self {
        BotError::InputValidation(err)
    }
}

impl From<DenialReason> for BotError {
    fn from(reason: DenialReason) -> Self {
        BotError::PermissionDenied(reason)
    }
}

pub type BotResult<T> = std::result::Result<T, BotError>;
