use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Io,
    Parse,
    ConfigMissingKey,
    MigrationBackupFailed,
    ResolutionFault,
    BaselineUnavailable,
    InvalidCommandArgument,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::Io, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::Parse, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::InvalidCommandArgument, message)
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for CoreError {}
