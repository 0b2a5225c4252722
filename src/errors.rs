// ⚠️ Errors - Typed failures of the profile API
// Each failure carries a kind tag, a result code and a human-readable message

use std::fmt;

// ============================================================================
// RESULT CODES
// ============================================================================

/// Command finished without errors
pub const CMD_SUCCESS: i32 = 0;

pub const CODE_DATABASE_ERROR: i32 = 4;
pub const CODE_NOT_FOUND_ERROR: i32 = 9;
pub const CODE_VALUE_ERROR: i32 = 10;

// ============================================================================
// ERROR KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Referenced entity does not exist in the store
    NotFound,

    /// Attribute failed validation
    InvalidValue,

    /// Backing store failed
    Database,
}

impl ErrorKind {
    /// Machine-usable result code, used as the process exit status
    pub fn code(&self) -> i32 {
        match self {
            ErrorKind::NotFound => CODE_NOT_FOUND_ERROR,
            ErrorKind::InvalidValue => CODE_VALUE_ERROR,
            ErrorKind::Database => CODE_DATABASE_ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidValue => "invalid_value",
            ErrorKind::Database => "database",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// API ERROR
// ============================================================================

/// Failure returned by the profile API.
///
/// Callers branch on `kind` only when they need to; the command layer just
/// reports `message` and exits with `code()`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn not_found(entity: &str) -> Self {
        ApiError {
            kind: ErrorKind::NotFound,
            message: format!("{} not found in the registry", entity),
        }
    }

    pub fn invalid_value(msg: impl Into<String>) -> Self {
        ApiError {
            kind: ErrorKind::InvalidValue,
            message: msg.into(),
        }
    }

    pub fn database(msg: impl Into<String>) -> Self {
        ApiError {
            kind: ErrorKind::Database,
            message: msg.into(),
        }
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::database(err.to_string())
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        assert_eq!(ApiError::not_found("abc").code(), CODE_NOT_FOUND_ERROR);
        assert_eq!(ApiError::invalid_value("bad").code(), CODE_VALUE_ERROR);
        assert_eq!(ApiError::database("locked").code(), CODE_DATABASE_ERROR);
        assert_ne!(CODE_NOT_FOUND_ERROR, CMD_SUCCESS);
        assert_ne!(CODE_VALUE_ERROR, CMD_SUCCESS);
    }

    #[test]
    fn test_display_is_message() {
        let err = ApiError::not_found("uuid-4");
        assert_eq!(err.to_string(), "uuid-4 not found in the registry");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
