//! adproxy authenticates against Active Directory and exposes a curated
//! user profile.
//!
//! ```no_run
//! use adproxy::config::Configuration;
//! use adproxy::directory::{Credentials, SearchRequest};
//!
//! # async fn run() -> Result<(), adproxy::error::Error> {
//! let extractor = adproxy::initialize(&Configuration::default().read())?;
//! let credentials = Credentials::new("jdoe", "secret");
//!
//! if let Some((code, profile)) =
//!     extractor.fetch(&credentials, &SearchRequest::own_entry()).await
//! {
//!     println!("{code}: {}", profile.full_name);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_debug_implementations, unused_mut)]

pub mod audit;
pub mod config;
pub mod directory;
pub mod error;
pub mod mapping;
pub mod profile;
pub mod telemetry;

use std::sync::Arc;

use audit::{AuditPort, FileAudit, TracingAudit};
use config::Configuration;
use directory::ldap::Ldap3Connector;
use directory::{DirectoryClient, DirectoryConnector};
use error::Result;
use profile::ProfileExtractor;

/// Build a [`ProfileExtractor`] talking to the configured directory.
pub fn initialize(config: &Configuration) -> Result<ProfileExtractor> {
    initialize_with(config, Arc::new(Ldap3Connector))
}

/// Same as [`initialize`] with another transport, such as
/// [`directory::memory::MemoryDirectory`].
pub fn initialize_with(
    config: &Configuration,
    connector: Arc<dyn DirectoryConnector>,
) -> Result<ProfileExtractor> {
    let client = DirectoryClient::new(
        config.directory.clone(),
        config.attributes.clone(),
        connector,
    )?;

    let audit: Arc<dyn AuditPort> = match &config.audit {
        Some(audit) => Arc::new(FileAudit::new(&audit.directory)),
        None => Arc::new(TracingAudit),
    };

    Ok(ProfileExtractor::new(client, config.profile.clone()).with_audit(audit))
}
