//! Error taxonomy shared by every layer of the engine.

use serde::{Deserialize, Serialize};

/// Broad category of a failure. Drives HTTP status mapping and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Operation attempted in the wrong state machine state.
    InvalidState,
    /// Optimistic-concurrency mismatch.
    Conflict,
    NotFound,
    /// Too close to an autonext or to the previous take.
    Timing,
    LockTimeout,
    Persistence,
    Validation,
    Internal,
}

/// Stable machine-readable codes for user-facing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserErrorCode {
    InactiveRundown,
    RundownAlreadyActive,
    RundownAlreadyActiveNames,
    RundownResetWhileActive,
    RundownMoveWhileOnAir,
    RundownRemoveWhileOnAir,
    SetNextToCurrentPart,
    TakeNoNextPart,
    TakeFromIncorrectPart,
    TakeCloseToAutonext,
    TakeRateLimit,
    AdlibRequiresCurrentPart,
    PlaylistNotFound,
    RundownNotFound,
    SegmentNotFound,
    PartNotFound,
    PartInstanceNotFound,
    AdlibNotFound,
}

impl UserErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InactiveRundown => "INACTIVE_RUNDOWN",
            Self::RundownAlreadyActive => "RUNDOWN_ALREADY_ACTIVE",
            Self::RundownAlreadyActiveNames => "RUNDOWN_ALREADY_ACTIVE_NAMES",
            Self::RundownResetWhileActive => "RUNDOWN_RESET_WHILE_ACTIVE",
            Self::RundownMoveWhileOnAir => "RUNDOWN_MOVE_WHILE_ON_AIR",
            Self::RundownRemoveWhileOnAir => "RUNDOWN_REMOVE_WHILE_ON_AIR",
            Self::SetNextToCurrentPart => "SET_NEXT_TO_CURRENT_PART",
            Self::TakeNoNextPart => "TAKE_NO_NEXT_PART",
            Self::TakeFromIncorrectPart => "TAKE_FROM_INCORRECT_PART",
            Self::TakeCloseToAutonext => "TAKE_CLOSE_TO_AUTONEXT",
            Self::TakeRateLimit => "TAKE_RATE_LIMIT",
            Self::AdlibRequiresCurrentPart => "ADLIB_REQUIRES_CURRENT_PART",
            Self::PlaylistNotFound => "PLAYLIST_NOT_FOUND",
            Self::RundownNotFound => "RUNDOWN_NOT_FOUND",
            Self::SegmentNotFound => "SEGMENT_NOT_FOUND",
            Self::PartNotFound => "PART_NOT_FOUND",
            Self::PartInstanceNotFound => "PART_INSTANCE_NOT_FOUND",
            Self::AdlibNotFound => "ADLIB_NOT_FOUND",
        }
    }

    pub fn kind(self) -> ErrorKind {
        match self {
            Self::TakeFromIncorrectPart => ErrorKind::Conflict,
            Self::TakeCloseToAutonext | Self::TakeRateLimit => ErrorKind::Timing,
            Self::PlaylistNotFound
            | Self::RundownNotFound
            | Self::SegmentNotFound
            | Self::PartNotFound
            | Self::PartInstanceNotFound
            | Self::AdlibNotFound => ErrorKind::NotFound,
            Self::InactiveRundown
            | Self::RundownAlreadyActive
            | Self::RundownAlreadyActiveNames
            | Self::RundownResetWhileActive
            | Self::RundownMoveWhileOnAir
            | Self::RundownRemoveWhileOnAir
            | Self::SetNextToCurrentPart
            | Self::TakeNoNextPart
            | Self::AdlibRequiresCurrentPart => ErrorKind::InvalidState,
        }
    }
}

/// Domain-level error type.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A user-facing refusal carrying a stable code.
    #[error("{message}")]
    User { code: UserErrorCode, message: String },

    #[error("{entity} not found: {id}")]
    NotFound {
        code: UserErrorCode,
        entity: &'static str,
        id: String,
    },

    #[error("Timed out after {waited_ms}ms waiting for lock on {resource}")]
    LockTimeout { resource: String, waited_ms: u64 },

    /// The cache flush could not complete. Nothing was committed.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn user(code: UserErrorCode, message: impl Into<String>) -> Self {
        Self::User {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(code: UserErrorCode, entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            code,
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::User { code, .. } => code.kind(),
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::LockTimeout { .. } => ErrorKind::LockTimeout,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Machine-readable code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            Self::User { code, .. } | Self::NotFound { code, .. } => code.as_str(),
            Self::LockTimeout { .. } => "LOCK_TIMEOUT",
            Self::Persistence(_) => "PERSISTENCE_FAILURE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn user_code(&self) -> Option<UserErrorCode> {
        match self {
            Self::User { code, .. } | Self::NotFound { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the error is surfaced verbatim to the calling UI.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidState | ErrorKind::Conflict | ErrorKind::NotFound | ErrorKind::Timing
        )
    }
}
