//! Common error type definitions.

use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
///
/// Used as the source of a structured [`Error`], wrapping any error that
/// implements the standard `Error` trait while keeping `Send + Sync` bounds.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur while building a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// A constructor or mutator received a malformed argument.
    ///
    /// Raised for tokens that would break the header grammar and for
    /// missing or relative URIs. These are programmer errors at
    /// configuration time and are never surfaced to a response.
    InvalidArgument,
    /// A policy could not be loaded from its configuration source.
    Configuration,
}

/// A structured error type for policy construction.
#[derive(Debug, Error)]
#[error("{}{}", kind.as_ref(), message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument() -> Self {
        Self::new(ErrorKind::InvalidArgument)
    }

    /// Creates a new configuration error.
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns true if this error was caused by a malformed argument.
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        self.kind == ErrorKind::InvalidArgument
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::invalid_argument()
            .with_message(format!("malformed URI: {err}"))
            .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as StdError;

    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let error = Error::invalid_argument().with_message("token contains ';'");
        assert_eq!(error.to_string(), "invalid_argument: token contains ';'");
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn display_without_message() {
        let error = Error::configuration();
        assert_eq!(error.to_string(), "configuration");
    }

    #[test]
    fn url_errors_convert_to_invalid_argument() {
        let parse_error = url::Url::parse("/relative").unwrap_err();
        let error = Error::from(parse_error);

        assert!(error.is_invalid_argument());
        assert!(StdError::source(&error).is_some());
    }
}
