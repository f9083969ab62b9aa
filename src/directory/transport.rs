//! Interface for directory transports.

use async_trait::async_trait;

use super::entry::{DirectoryEntry, SearchFilter};
use crate::config::DirectoryConfig;
use crate::error::TransportError;

/// Outcome of a simple bind the server answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindStatus {
    Accepted,
    Rejected,
}

/// Port opening sessions against a directory endpoint.
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Open a new, unbound session.
    ///
    /// Fails with [`TransportError::Unreachable`] when no connection can be
    /// established.
    async fn connect(
        &self,
        config: &DirectoryConfig,
    ) -> Result<Box<dyn DirectorySession>, TransportError>;
}

/// One connection to the directory.
///
/// Dropping the session closes the connection.
#[async_trait]
pub trait DirectorySession: Send {
    /// Simple bind with a user principal and password.
    async fn bind(
        &mut self,
        principal: &str,
        password: &str,
    ) -> Result<BindStatus, TransportError>;

    /// Subtree search below `base`, entries in server order.
    async fn search(
        &mut self,
        base: &str,
        filter: &SearchFilter,
    ) -> Result<Vec<DirectoryEntry>, TransportError>;

    /// Politely end the session.
    async fn unbind(&mut self) -> Result<(), TransportError>;
}
