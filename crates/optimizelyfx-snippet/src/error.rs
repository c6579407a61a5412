// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::command::CommandError;
use crate::fetcher::DatafileError;
use crate::logger::LoggerError;

/// Failures of a single command, plus configuration and startup errors.
///
/// Command failures never leave the queue: they are logged where the command is processed and
/// the next command runs.
#[derive(Debug, thiserror::Error)]
pub enum SnippetError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    InvalidCommand(#[from] CommandError),

    #[error("No User ID provided: {0}")]
    MissingIdentity(String),

    #[error("No User ID set. Please set a User ID before tracking events.")]
    IdentityNotSet,

    #[error(transparent)]
    Datafile(#[from] DatafileError),

    #[error("Datafile not loaded yet; push an init command first")]
    DatafileUnavailable,

    #[error("No event name provided")]
    MissingEventName,

    #[error("Event name not found in datafile: {0}")]
    UnknownEventName(String),

    #[error("Attribute key not found in datafile: {0}")]
    UnknownAttributeKey(String),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("Invalid poll interval: {0}")]
    InvalidPollInterval(String),

    #[error("Snippet already initialized; ignoring init command")]
    AlreadyInitialized,

    #[error(transparent)]
    Logger(#[from] LoggerError),

    #[error("Command queue closed: {0}")]
    QueueClosed(String),
}

impl SnippetError {
    /// Whether this failure is reported at warning rather than error level.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            SnippetError::AlreadyInitialized
                | SnippetError::UnknownAttributeKey(_)
                | SnippetError::InvalidCommand(CommandError::UnsupportedType(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SnippetError::UnknownEventName("checkout".to_string());
        assert_eq!(error.to_string(), "Event name not found in datafile: checkout");

        let error = SnippetError::from(DatafileError::Status { status: 404 });
        assert_eq!(error.to_string(), "failed to fetch the datafile. Status: 404");

        let error = SnippetError::from(CommandError::MissingEventType("{}".to_string()));
        assert_eq!(error.to_string(), "No Event Type Found: {}");
    }

    #[test]
    fn test_warning_classification() {
        assert!(SnippetError::AlreadyInitialized.is_warning());
        assert!(SnippetError::UnknownAttributeKey("ghost".into()).is_warning());
        assert!(SnippetError::from(CommandError::UnsupportedType("page".into())).is_warning());

        assert!(!SnippetError::IdentityNotSet.is_warning());
        assert!(!SnippetError::from(CommandError::NotAnObject("1".into())).is_warning());
        assert!(!SnippetError::InvalidLogLevel("loud".into()).is_warning());
        assert!(!SnippetError::from(DatafileError::MissingSource).is_warning());
    }
}
