//! Error types for the SQL Server provider core.
//!
//! Every failure here is scoped to the operation that triggered it; nothing
//! is fatal to the process. Configuration problems are accumulated and
//! reported together so a user editing a declarative configuration sees the
//! complete diagnostic picture in one pass.

use thiserror::Error;

/// Domain errors for the provider pipeline.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport, status, or parse failure while acquiring a managed
    /// identity token from the instance-metadata service.
    #[error("failed to acquire managed identity token: {message}")]
    CredentialFetch {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The metadata service answered with a well-formed body that carries
    /// no usable `access_token`.
    #[error("metadata service response did not contain an access token")]
    MissingToken,

    /// Configuration is incomplete or not yet resolvable.
    #[error("configuration invalid: {0}")]
    Config(ConfigErrors),

    /// The requested authentication mode has no implemented path.
    #[error("unsupported authentication mode: {0}")]
    UnsupportedAuth(String),

    /// The driver failed to establish a session.
    #[error("failed to open connection: {message}")]
    ConnectionOpen {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The driver rejected or failed a statement.
    #[error("statement execution failed: {message}")]
    StatementExecution {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A bounded deadline expired before the operation completed.
    #[error("operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
}

impl ProviderError {
    /// Create a credential fetch error.
    pub fn credential_fetch(msg: impl Into<String>) -> Self {
        Self::CredentialFetch {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a credential fetch error with an underlying cause.
    pub fn credential_fetch_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::CredentialFetch {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an unsupported-authentication error.
    pub fn unsupported_auth(msg: impl Into<String>) -> Self {
        Self::UnsupportedAuth(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionOpen {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a connection error with an underlying cause.
    pub fn connection_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConnectionOpen {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a statement execution error.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::StatementExecution {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a statement execution error with an underlying cause.
    pub fn execution_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::StatementExecution {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a timeout error.
    pub fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }
}

impl From<ConfigErrors> for ProviderError {
    fn from(errors: ConfigErrors) -> Self {
        Self::Config(errors)
    }
}

/// Why a single configuration field failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// The caller's evaluation has not determined the value yet; resolution
    /// must be deferred until it is known.
    Unknown,
    /// No concrete value from either the configuration or the environment.
    Missing,
}

/// A resolution failure for one configuration field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Logical attribute name, e.g. `server`.
    pub field: &'static str,
    /// What went wrong.
    pub kind: FieldErrorKind,
}

impl FieldError {
    pub fn unknown(field: &'static str) -> Self {
        Self {
            field,
            kind: FieldErrorKind::Unknown,
        }
    }

    pub fn missing(field: &'static str) -> Self {
        Self {
            field,
            kind: FieldErrorKind::Missing,
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            FieldErrorKind::Unknown => write!(f, "'{}' is not yet known", self.field),
            FieldErrorKind::Missing => write!(
                f,
                "'{}' is missing: set the attribute or its environment default",
                self.field
            ),
        }
    }
}

/// All field errors accumulated during one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigErrors(Vec<FieldError>);

impl ConfigErrors {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any field is still unknown, signalling the host to defer
    /// resolution rather than report a hard failure.
    pub fn has_unknown(&self) -> bool {
        self.0.iter().any(|e| e.kind == FieldErrorKind::Unknown)
    }
}

impl std::fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ConfigErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_error_display() {
        let err = FieldError::missing("server");
        assert!(err.to_string().contains("'server' is missing"));

        let err = FieldError::unknown("database");
        assert!(err.to_string().contains("'database' is not yet known"));
    }

    #[test]
    fn config_errors_aggregate_display() {
        let errors = ConfigErrors::new(vec![
            FieldError::missing("server"),
            FieldError::unknown("database"),
        ]);
        let rendered = errors.to_string();
        assert!(rendered.contains("'server'"));
        assert!(rendered.contains("'database'"));
        assert_eq!(errors.len(), 2);
        assert!(errors.has_unknown());
    }

    #[test]
    fn provider_error_display() {
        let err = ProviderError::unsupported_auth("only managed identity is supported");
        assert!(err.to_string().contains("unsupported authentication mode"));

        let err = ProviderError::timeout(30);
        assert_eq!(err.to_string(), "operation timed out after 30 seconds");

        let err = ProviderError::MissingToken;
        assert!(err.to_string().contains("access token"));
    }

    #[test]
    fn error_sources_are_chained() {
        use std::error::Error;

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ProviderError::connection_with_source("failed to connect", io);
        assert!(err.source().is_some());

        let err = ProviderError::connection("failed to connect");
        assert!(err.source().is_none());
    }
}
