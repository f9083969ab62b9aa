//! LDAP support through `ldap3`.

use std::time::Duration;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};

use super::entry::{DirectoryEntry, SearchFilter};
use super::transport::{BindStatus, DirectoryConnector, DirectorySession};
use crate::config::DirectoryConfig;
use crate::error::TransportError;

/// Every user attribute is requested; mapping picks what it needs.
const ALL_USER_ATTRIBUTES: &str = "*";

/// Connector to a real LDAP / Active Directory server.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ldap3Connector;

#[async_trait]
impl DirectoryConnector for Ldap3Connector {
    async fn connect(
        &self,
        config: &DirectoryConfig,
    ) -> Result<Box<dyn DirectorySession>, TransportError> {
        let url = config
            .url()
            .map_err(|err| TransportError::Unreachable(err.to_string()))?;
        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(config.timeout))
            .set_starttls(config.starttls && !config.ldaps);

        let (handle, conn) =
            LdapConnAsync::with_settings(settings, url.as_str())
                .await
                .map_err(|err| TransportError::Unreachable(err.to_string()))?;

        // Driver ends once every `Ldap` handle is dropped.
        tokio::spawn(async move {
            if let Err(err) = handle.drive().await {
                tracing::warn!(error = %err, "LDAP connection driver failed");
            }
        });

        Ok(Box::new(Ldap3Session { conn }))
    }
}

struct Ldap3Session {
    conn: Ldap,
}

#[async_trait]
impl DirectorySession for Ldap3Session {
    async fn bind(
        &mut self,
        principal: &str,
        password: &str,
    ) -> Result<BindStatus, TransportError> {
        let result = self.conn.simple_bind(principal, password).await?;

        if result.rc == 0 {
            Ok(BindStatus::Accepted)
        } else {
            tracing::debug!(rc = result.rc, text = %result.text, "bind refused");
            Ok(BindStatus::Rejected)
        }
    }

    async fn search(
        &mut self,
        base: &str,
        filter: &SearchFilter,
    ) -> Result<Vec<DirectoryEntry>, TransportError> {
        let (entries, _) = self
            .conn
            .search(
                base,
                Scope::Subtree,
                &filter.to_string(),
                vec![ALL_USER_ATTRIBUTES],
            )
            .await?
            .success()?;

        Ok(entries
            .into_iter()
            .filter(|e| !e.is_ref())
            .map(|e| SearchEntry::construct(e).into())
            .collect())
    }

    async fn unbind(&mut self) -> Result<(), TransportError> {
        self.conn.unbind().await?;
        Ok(())
    }
}
