//! Shared error type across pushwire crates.

use thiserror::Error;

/// Wire-level error codes carried inside an ERROR frame (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Command byte not understood by the server.
    UnknownCommand,
    /// Connection tried to bind a second time.
    RepeatBinding,
    /// Requested id is already held by another connection.
    BindConflict,
    /// Requested id is zero.
    BindInvalid,
}

impl ErrorCode {
    /// Numeric value written as the big-endian u16 of an ERROR frame.
    pub fn as_u16(self) -> u16 {
        match self {
            ErrorCode::UnknownCommand => 0,
            ErrorCode::RepeatBinding => 1,
            ErrorCode::BindConflict => 2,
            ErrorCode::BindInvalid => 3,
        }
    }

    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            0 => Some(ErrorCode::UnknownCommand),
            1 => Some(ErrorCode::RepeatBinding),
            2 => Some(ErrorCode::BindConflict),
            3 => Some(ErrorCode::BindInvalid),
            _ => None,
        }
    }

    /// String form used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UnknownCommand => "UNKNOWN_COMMAND",
            ErrorCode::RepeatBinding => "REPEAT_BINDING",
            ErrorCode::BindConflict => "BIND_CONFLICT",
            ErrorCode::BindInvalid => "BIND_INVALID",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PushwireError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum PushwireError {
    #[error("unknown command byte {0}")]
    UnknownCommand(u8),
    #[error("connection already bound to id {0}")]
    RepeatBinding(u32),
    #[error("id {0} is bound to another connection")]
    BindConflict(u32),
    #[error("bind id must be non-zero")]
    BindInvalid,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("connection closed")]
    Closed,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl PushwireError {
    /// Map a protocol rejection to the code reported to the client.
    ///
    /// Transport and setup failures have no wire code: the connection is
    /// closed without an ERROR frame.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            PushwireError::UnknownCommand(_) => Some(ErrorCode::UnknownCommand),
            PushwireError::RepeatBinding(_) => Some(ErrorCode::RepeatBinding),
            PushwireError::BindConflict(_) => Some(ErrorCode::BindConflict),
            PushwireError::BindInvalid => Some(ErrorCode::BindInvalid),
            PushwireError::Io(_)
            | PushwireError::Closed
            | PushwireError::BadRequest(_)
            | PushwireError::UnsupportedVersion
            | PushwireError::Internal(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_wire_values() {
        for (code, v) in [
            (ErrorCode::UnknownCommand, 0),
            (ErrorCode::RepeatBinding, 1),
            (ErrorCode::BindConflict, 2),
            (ErrorCode::BindInvalid, 3),
        ] {
            assert_eq!(code.as_u16(), v);
            assert_eq!(ErrorCode::from_u16(v), Some(code));
        }
        assert_eq!(ErrorCode::from_u16(4), None);
    }

    #[test]
    fn transport_errors_have_no_wire_code() {
        let io = PushwireError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(io.error_code().is_none());
        assert!(PushwireError::Closed.error_code().is_none());
        assert_eq!(
            PushwireError::BindConflict(7).error_code(),
            Some(ErrorCode::BindConflict)
        );
    }
}
