//! CLI error type and exit codes.

use std::fmt;

use tilevault::installer::{ClientError, InstallError};
use tilevault::store::StoreError;

/// Errors surfaced to the terminal.
#[derive(Debug)]
pub enum CliError {
    /// Configuration problem (missing catalog URL, bad config file).
    Config(String),

    /// Registry or tile storage failure.
    Store(StoreError),

    /// Install workflow failure.
    Install(InstallError),

    /// Catalog or download failure.
    Client(ClientError),

    /// Operation-level failure with a ready-to-print message.
    Operation(String),
}

impl CliError {
    /// Process exit code: 2 for usage/config problems, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "configuration error: {}", msg),
            CliError::Store(e) => write!(f, "{}", e),
            CliError::Install(e) => write!(f, "{}", e),
            CliError::Client(e) => write!(f, "{}", e),
            CliError::Operation(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Store(e) => Some(e),
            CliError::Install(e) => Some(e),
            CliError::Client(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Store(e)
    }
}

impl From<InstallError> for CliError {
    fn from(e: InstallError) -> Self {
        CliError::Install(e)
    }
}

impl From<ClientError> for CliError {
    fn from(e: ClientError) -> Self {
        CliError::Client(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Config("x".into()).exit_code(), 2);
        assert_eq!(CliError::Operation("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_display() {
        let err = CliError::Config("no catalog URL".into());
        assert!(err.to_string().contains("no catalog URL"));
    }
}
