//! CLI error types.

use std::fmt;

use error_stack::Report;
use pubcid_common::error::PubcidError;

#[derive(Debug)]
pub enum CliError {
    /// Configuration file error
    Config(String),
    /// Bid request or browser state document error
    Document(String),
    /// IO error
    Io(std::io::Error),
    /// JSON parsing error
    Json(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Document(msg) => write!(f, "Document error: {}", msg),
            CliError::Io(err) => write!(f, "IO error: {}", err),
            CliError::Json(msg) => write!(f, "JSON error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Json(err.to_string())
    }
}

impl From<Report<PubcidError>> for CliError {
    fn from(report: Report<PubcidError>) -> Self {
        match report.current_context() {
            PubcidError::Configuration { .. } => CliError::Config(format!("{report:?}")),
            _ => CliError::Document(format!("{report:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_cli_error_display() {
        assert_eq!(
            format!("{}", CliError::Config("test".into())),
            "Configuration error: test"
        );
        assert_eq!(
            format!("{}", CliError::Document("test".into())),
            "Document error: test"
        );
        assert_eq!(
            format!("{}", CliError::Json("test".into())),
            "JSON error: test"
        );
    }

    #[test]
    fn test_cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(matches!(cli_err, CliError::Io(_)));
        assert!(cli_err.source().is_some());
    }

    #[test]
    fn test_cli_error_from_report() {
        let config: CliError = Report::new(PubcidError::Configuration {
            message: "bad".into(),
        })
        .into();
        assert!(matches!(config, CliError::Config(_)));

        let request: CliError = Report::new(PubcidError::BidRequest {
            message: "bad".into(),
        })
        .into();
        assert!(matches!(request, CliError::Document(_)));
        assert!(request.source().is_none());
    }
}
