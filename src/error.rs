//! Error handler for adproxy.

use ldap3::LdapError;
use thiserror::Error;
use validator::ValidationErrors;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration or building a client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to deserialize configuration: {0}")]
    Deserialize(#[from] serde_yaml::Error),

    #[error("invalid directory configuration: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("directory endpoint is invalid: {0}")]
    Url(#[from] url::ParseError),

    #[error("closed account marker is not a valid pattern: {0}")]
    Pattern(#[from] regex_lite::Error),
}

/// Failures reported by a directory transport.
///
/// [`crate::directory::DirectoryClient`] is the only place these are turned
/// into a [`crate::directory::ReturnCode`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint could not be reached at all.
    #[error("directory unreachable: {0}")]
    Unreachable(String),

    /// Anything that went wrong once a connection existed.
    #[error("{0}")]
    Protocol(String),
}

impl From<LdapError> for TransportError {
    fn from(err: LdapError) -> Self {
        Self::Protocol(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ldap_error_is_protocol() {
        let err: TransportError = LdapError::FilterParsing.into();
        assert!(matches!(err, TransportError::Protocol(_)));
    }

    #[test]
    fn test_display_keeps_detail() {
        let err = TransportError::Protocol("busy".into());
        assert_eq!(err.to_string(), "busy");
        let err = TransportError::Unreachable("refused".into());
        assert_eq!(err.to_string(), "directory unreachable: refused");
    }
}
