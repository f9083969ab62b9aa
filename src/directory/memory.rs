//! In-memory directory, for tests and offline demos.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::entry::{DirectoryEntry, SearchFilter};
use super::transport::{BindStatus, DirectoryConnector, DirectorySession};
use crate::config::DirectoryConfig;
use crate::error::TransportError;

#[derive(Debug, Default)]
struct Counters {
    connections: AtomicUsize,
    searches: AtomicUsize,
    open_sessions: AtomicUsize,
}

/// Directory held in memory.
///
/// Clones share the same counters, so a test can keep one handle while the
/// client owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    accounts: HashMap<String, String>,
    entries: Vec<DirectoryEntry>,
    unreachable: bool,
    bind_error: Option<String>,
    search_error: Option<String>,
    counters: Arc<Counters>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept binds for `principal` (e.g. `jdoe@example.com`) with
    /// `password`.
    pub fn with_account(
        mut self,
        principal: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.accounts
            .insert(principal.into().to_lowercase(), password.into());
        self
    }

    /// Add an entry; searches return entries in insertion order.
    pub fn with_entry(mut self, entry: DirectoryEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Refuse every connection.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Fail every bind with `detail`, as a connection lost mid-bind would.
    pub fn failing_bind(mut self, detail: impl Into<String>) -> Self {
        self.bind_error = Some(detail.into());
        self
    }

    /// Fail every search with `detail`.
    pub fn failing_search(mut self, detail: impl Into<String>) -> Self {
        self.search_error = Some(detail.into());
        self
    }

    /// Number of connections opened so far.
    pub fn connections(&self) -> usize {
        self.counters.connections.load(Ordering::SeqCst)
    }

    /// Number of searches executed so far.
    pub fn searches(&self) -> usize {
        self.counters.searches.load(Ordering::SeqCst)
    }

    /// Sessions opened and not yet dropped.
    pub fn open_sessions(&self) -> usize {
        self.counters.open_sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryConnector for MemoryDirectory {
    async fn connect(
        &self,
        config: &DirectoryConfig,
    ) -> Result<Box<dyn DirectorySession>, TransportError> {
        if self.unreachable {
            return Err(TransportError::Unreachable(format!(
                "connection refused by {}:{}",
                config.host, config.port
            )));
        }

        self.counters.connections.fetch_add(1, Ordering::SeqCst);
        self.counters.open_sessions.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MemorySession {
            directory: self.clone(),
            bound: false,
        }))
    }
}

struct MemorySession {
    directory: MemoryDirectory,
    bound: bool,
}

#[async_trait]
impl DirectorySession for MemorySession {
    async fn bind(
        &mut self,
        principal: &str,
        password: &str,
    ) -> Result<BindStatus, TransportError> {
        if let Some(detail) = &self.directory.bind_error {
            return Err(TransportError::Protocol(detail.clone()));
        }

        let accepted = self
            .directory
            .accounts
            .get(&principal.to_lowercase())
            .is_some_and(|expected| expected == password);

        self.bound = accepted;
        Ok(if accepted {
            BindStatus::Accepted
        } else {
            BindStatus::Rejected
        })
    }

    async fn search(
        &mut self,
        _base: &str,
        filter: &SearchFilter,
    ) -> Result<Vec<DirectoryEntry>, TransportError> {
        if !self.bound {
            return Err(TransportError::Protocol(
                "operations error: bind required".into(),
            ));
        }

        self.directory
            .counters
            .searches
            .fetch_add(1, Ordering::SeqCst);

        if let Some(detail) = &self.directory.search_error {
            return Err(TransportError::Protocol(detail.clone()));
        }

        Ok(self
            .directory
            .entries
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect())
    }

    async fn unbind(&mut self) -> Result<(), TransportError> {
        self.bound = false;
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.directory
            .counters
            .open_sessions
            .fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_and_search() {
        let directory = MemoryDirectory::new()
            .with_account("jdoe@example.com", "secret")
            .with_entry(
                DirectoryEntry::new("CN=Jane Doe,DC=example,DC=com")
                    .with_attr("sAMAccountName", ["jdoe"]),
            );
        let config = DirectoryConfig::default();

        let mut session = directory.connect(&config).await.unwrap();
        assert_eq!(directory.open_sessions(), 1);
        assert_eq!(
            session.bind("JDoe@example.com", "secret").await.unwrap(),
            BindStatus::Accepted
        );

        let filter = SearchFilter::equality("sAMAccountName", "jdoe");
        let found = session.search("DC=example,DC=com", &filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(directory.searches(), 1);

        drop(session);
        assert_eq!(directory.open_sessions(), 0);
        assert_eq!(directory.connections(), 1);
    }

    #[tokio::test]
    async fn test_search_requires_bind() {
        let directory = MemoryDirectory::new();
        let mut session =
            directory.connect(&DirectoryConfig::default()).await.unwrap();

        assert_eq!(
            session.bind("nobody@example.com", "x").await.unwrap(),
            BindStatus::Rejected
        );
        let filter = SearchFilter::equality("cn", "x");
        assert!(session.search("", &filter).await.is_err());
    }

    #[tokio::test]
    async fn test_failing_bind() {
        let directory = MemoryDirectory::new()
            .with_account("jdoe@example.com", "secret")
            .failing_bind("connection reset by peer");
        let mut session =
            directory.connect(&DirectoryConfig::default()).await.unwrap();

        let result = session.bind("jdoe@example.com", "secret").await;
        assert!(matches!(result, Err(TransportError::Protocol(_))));
        let filter = SearchFilter::equality("cn", "x");
        assert!(session.search("", &filter).await.is_err());
        assert_eq!(directory.searches(), 0);
    }

    #[tokio::test]
    async fn test_unreachable() {
        let directory = MemoryDirectory::new().unreachable();
        let result = directory.connect(&DirectoryConfig::default()).await;

        assert!(matches!(result, Err(TransportError::Unreachable(_))));
        assert_eq!(directory.connections(), 0);
    }
}
