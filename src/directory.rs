//! Directory client: bind, search and classify the outcome.

mod entry;
pub mod ldap;
pub mod memory;
mod transport;

use std::fmt;
use std::sync::Arc;

use regex_lite::Regex;
use serde::Serialize;
use validator::Validate;

use crate::config::DirectoryConfig;
use crate::error::{Result, TransportError};
use crate::mapping::{AttributeMapper, AttributeMapping};
pub use entry::{DirectoryEntry, SearchFilter};
pub use transport::{BindStatus, DirectoryConnector, DirectorySession};

const ACCOUNT_NAME_ATTRIBUTE: &str = "sAMAccountName";
const COMMON_NAME_ATTRIBUTE: &str = "cn";

const ACCESS_FAILURE_MSG: &str = "Access AD failure";
const FETCH_FAILURE_MSG: &str = "Fetch data failed";
const FETCH_SUCCESS_MSG: &str = "Fetch data successful";
const NO_ELIGIBLE_ENTRY_MSG: &str = "No eligible entry found";

/// Login and password of the account binding to the directory.
#[derive(Clone, Default)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    /// Both login and password are required to attempt a bind.
    pub fn is_complete(&self) -> bool {
        !self.login.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Which entry the search looks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Entry of the authenticating account.
    #[default]
    SelfLookup,
    /// Any entry, by common name (e.g. a manager).
    NamedLookup,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub mode: SearchMode,
    /// Common name searched by [`SearchMode::NamedLookup`]. Ignored
    /// otherwise.
    pub target: String,
}

impl SearchRequest {
    /// Search the authenticating account itself.
    pub fn own_entry() -> Self {
        Self::default()
    }

    /// Search another entry by common name.
    pub fn named(target: impl Into<String>) -> Self {
        Self {
            mode: SearchMode::NamedLookup,
            target: target.into(),
        }
    }

    fn filter(&self, login: &str) -> SearchFilter {
        match self.mode {
            SearchMode::SelfLookup => {
                SearchFilter::equality(ACCOUNT_NAME_ATTRIBUTE, login)
            },
            SearchMode::NamedLookup => {
                SearchFilter::equality(COMMON_NAME_ATTRIBUTE, &self.target)
            },
        }
    }
}

/// Classified outcome of an authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnCode {
    Success,
    /// Directory unreachable or bind refused.
    ConnectionFailure,
    /// No entry found, or none eligible.
    SearchFailure,
    /// Unexpected transport failure.
    OtherException,
}

impl ReturnCode {
    /// Numeric code, `0` to `3`.
    pub fn value(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::ConnectionFailure => 1,
            Self::SearchFailure => 2,
            Self::OtherException => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ConnectionFailure => "connection_failure",
            Self::SearchFailure => "search_failure",
            Self::OtherException => "other_exception",
        }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`DirectoryClient::authenticate`].
///
/// An entry is present if and only if the code is
/// [`ReturnCode::Success`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnObject {
    code: ReturnCode,
    message: String,
    entry: Option<DirectoryEntry>,
}

impl ReturnObject {
    fn success(entry: DirectoryEntry) -> Self {
        Self {
            code: ReturnCode::Success,
            message: FETCH_SUCCESS_MSG.into(),
            entry: Some(entry),
        }
    }

    fn failure(code: ReturnCode, message: impl Into<String>) -> Self {
        debug_assert_ne!(code, ReturnCode::Success);
        Self {
            code,
            message: message.into(),
            entry: None,
        }
    }

    pub fn code(&self) -> ReturnCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn entry(&self) -> Option<&DirectoryEntry> {
        self.entry.as_ref()
    }

    pub fn into_entry(self) -> Option<DirectoryEntry> {
        self.entry
    }
}

/// Authenticates against one configured directory.
///
/// Holds only immutable configuration; every call opens its own session.
#[derive(Clone)]
pub struct DirectoryClient {
    config: DirectoryConfig,
    closed_marker: Regex,
    mapper: AttributeMapper,
    connector: Arc<dyn DirectoryConnector>,
}

impl fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("config", &self.config)
            .field("mapper", &self.mapper)
            .finish_non_exhaustive()
    }
}

impl DirectoryClient {
    /// Create a new [`DirectoryClient`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if the directory configuration is incomplete, or the
    /// closed account marker is not a valid pattern.
    pub fn new(
        config: DirectoryConfig,
        mapping: AttributeMapping,
        connector: Arc<dyn DirectoryConnector>,
    ) -> Result<Self> {
        config.validate()?;
        config.url()?;
        let closed_marker = Regex::new(&config.closed_marker)?;

        Ok(Self {
            config,
            closed_marker,
            mapper: AttributeMapper::new(mapping),
            connector,
        })
    }

    /// Mapper over the configured attribute mapping.
    pub fn mapper(&self) -> &AttributeMapper {
        &self.mapper
    }

    /// Bind as `credentials` and search the entry described by `request`.
    ///
    /// Returns `None`, without contacting the directory, when login or
    /// password is empty. Every directory failure is reported inside the
    /// [`ReturnObject`].
    #[tracing::instrument(
        skip_all,
        fields(login = %credentials.login, mode = ?request.mode)
    )]
    pub async fn authenticate(
        &self,
        credentials: &Credentials,
        request: &SearchRequest,
    ) -> Option<ReturnObject> {
        if !credentials.is_complete() {
            tracing::debug!("incomplete credentials, no attempt made");
            return None;
        }

        let outcome = match self.connector.connect(&self.config).await {
            Ok(mut session) => {
                let outcome =
                    self.run(session.as_mut(), credentials, request).await;
                if let Err(err) = session.unbind().await {
                    tracing::debug!(error = %err, "unbind failed");
                }
                outcome
            },
            Err(err) => {
                tracing::warn!(error = %err, "cannot connect to directory");
                ReturnObject::failure(
                    ReturnCode::ConnectionFailure,
                    ACCESS_FAILURE_MSG,
                )
            },
        };

        metrics::counter!(
            "directory_authentications_total",
            "code" => outcome.code().as_str()
        )
        .increment(1);
        tracing::info!(
            code = %outcome.code(),
            message = outcome.message(),
            "authentication finished"
        );

        Some(outcome)
    }

    async fn run(
        &self,
        session: &mut dyn DirectorySession,
        credentials: &Credentials,
        request: &SearchRequest,
    ) -> ReturnObject {
        self.bind_and_search(session, credentials, request)
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "directory transport failed");
                ReturnObject::failure(ReturnCode::OtherException, err.to_string())
            })
    }

    async fn bind_and_search(
        &self,
        session: &mut dyn DirectorySession,
        credentials: &Credentials,
        request: &SearchRequest,
    ) -> std::result::Result<ReturnObject, TransportError> {
        let principal = self.config.principal(&credentials.login);
        if session.bind(&principal, &credentials.password).await?
            == BindStatus::Rejected
        {
            tracing::debug!(%principal, "bind rejected");
            return Ok(ReturnObject::failure(
                ReturnCode::ConnectionFailure,
                ACCESS_FAILURE_MSG,
            ));
        }

        let filter = request.filter(&credentials.login);
        tracing::debug!(%filter, base = %self.config.base_dn, "searching");
        let entries = session.search(&self.config.base_dn, &filter).await?;

        if entries.is_empty() {
            return Ok(ReturnObject::failure(
                ReturnCode::SearchFailure,
                FETCH_FAILURE_MSG,
            ));
        }

        let candidates = entries.len();
        match self.select(entries) {
            Some(entry) => Ok(ReturnObject::success(entry)),
            None => {
                tracing::debug!(candidates, "every candidate is closed");
                Ok(ReturnObject::failure(
                    ReturnCode::SearchFailure,
                    NO_ELIGIBLE_ENTRY_MSG,
                ))
            },
        }
    }

    /// First entry, in directory order, not flagged as closed.
    fn select(&self, entries: Vec<DirectoryEntry>) -> Option<DirectoryEntry> {
        entries
            .into_iter()
            .find(|entry| !self.closed_marker.is_match(entry.dn()))
    }
}
