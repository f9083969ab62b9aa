//! Profile record handed to applications.
//!
//! The profile has its own, smaller mapping table, separate from
//! [`crate::mapping::AttributeMapping`]: the fields below are fixed and
//! only their source attributes are configurable.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditEvent, AuditPort, TracingAudit};
use crate::directory::{
    Credentials, DirectoryClient, DirectoryEntry, ReturnCode, SearchRequest,
};
use crate::mapping::{AttributeMapper, AttributeMapping, AttributeRule};

const USER_ID: &str = "user_id";
const FULL_NAME: &str = "full_name";
const ROLE_ID: &str = "role_id";
const EMPLOYEE_ID: &str = "employee_id";
const ROLE: &str = "role";
const LOCATION: &str = "location";

/// Curated user record. Every field is empty unless the fetch succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub user_id: String,
    pub full_name: String,
    pub role_id: String,
    pub employee_id: String,
    pub role: String,
    pub location: String,
}

/// Profile field → source attribute.
///
/// By default `full_name` is read from `name` (the relative name of the
/// entry), not from `displayName`, so it can differ from the name shown in
/// address books. `role_id` has no source by default and stays empty.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct ProfileMapping(HashMap<String, AttributeRule>);

impl Default for ProfileMapping {
    fn default() -> Self {
        Self(HashMap::from([
            (USER_ID.into(), AttributeRule::new("samaccountname")),
            (FULL_NAME.into(), AttributeRule::new("name")),
            (EMPLOYEE_ID.into(), AttributeRule::new("employeeid")),
            (LOCATION.into(), AttributeRule::new("st")),
            (ROLE.into(), AttributeRule::new("extensionattribute2")),
        ]))
    }
}

impl ProfileMapping {
    pub fn rule(&self, field: &str) -> Option<&AttributeRule> {
        self.0.get(field)
    }

    /// Set the source of a profile field.
    pub fn with_rule(mut self, field: &str, rule: AttributeRule) -> Self {
        self.0.insert(field.to_owned(), rule);
        self
    }
}

impl From<ProfileMapping> for AttributeMapping {
    fn from(profile: ProfileMapping) -> Self {
        profile
            .0
            .into_iter()
            .fold(AttributeMapping::empty(), |mapping, (field, rule)| {
                mapping.single_valued(field, rule)
            })
    }
}

/// Fetches a [`Profile`] through a [`DirectoryClient`].
pub struct ProfileExtractor {
    client: DirectoryClient,
    mapper: AttributeMapper,
    audit: Arc<dyn AuditPort>,
}

impl std::fmt::Debug for ProfileExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileExtractor")
            .field("client", &self.client)
            .field("mapper", &self.mapper)
            .finish_non_exhaustive()
    }
}

impl ProfileExtractor {
    /// Create a new [`ProfileExtractor`], auditing through `tracing`.
    pub fn new(client: DirectoryClient, mapping: ProfileMapping) -> Self {
        Self {
            client,
            mapper: AttributeMapper::new(mapping.into()),
            audit: Arc::new(TracingAudit),
        }
    }

    /// Replace the audit sink.
    pub fn with_audit(mut self, audit: Arc<dyn AuditPort>) -> Self {
        self.audit = audit;
        self
    }

    /// Authenticate and read the profile of the requested entry.
    ///
    /// Returns `None` when no attempt was made (incomplete input). The code
    /// is the one of [`DirectoryClient::authenticate`]; the profile is only
    /// filled on [`ReturnCode::Success`].
    pub async fn fetch(
        &self,
        credentials: &Credentials,
        request: &SearchRequest,
    ) -> Option<(ReturnCode, Profile)> {
        let result = self.client.authenticate(credentials, request).await?;

        self.audit.record(&AuditEvent {
            timestamp: Utc::now(),
            login: &credentials.login,
            mode: request.mode,
            target: &request.target,
            code: result.code(),
            message: result.message(),
        });

        let code = result.code();
        let profile = result
            .into_entry()
            .map(|entry| self.extract(&entry))
            .unwrap_or_default();

        Some((code, profile))
    }

    fn extract(&self, entry: &DirectoryEntry) -> Profile {
        Profile {
            user_id: self.mapper.get(entry, USER_ID),
            full_name: self.mapper.get(entry, FULL_NAME),
            role_id: self.mapper.get(entry, ROLE_ID),
            employee_id: self.mapper.get(entry, EMPLOYEE_ID),
            role: self.mapper.get(entry, ROLE),
            location: self.mapper.get(entry, LOCATION),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::config::DirectoryConfig;
    use crate::directory::memory::MemoryDirectory;
    use crate::mapping::Transform;

    #[derive(Default)]
    struct RecordingAudit(Mutex<Vec<(String, ReturnCode)>>);

    impl AuditPort for RecordingAudit {
        fn record(&self, event: &AuditEvent<'_>) {
            self.0
                .lock()
                .unwrap()
                .push((event.login.to_owned(), event.code));
        }
    }

    fn directory() -> MemoryDirectory {
        MemoryDirectory::new()
            .with_account("jdoe@example.com", "secret")
            .with_entry(
                DirectoryEntry::new("CN=Jane Doe,OU=Staff,DC=example,DC=com")
                    .with_attr("sAMAccountName", ["jdoe"])
                    .with_attr("cn", ["Jane Doe"])
                    .with_attr("name", ["Jane Doe"])
                    .with_attr("displayName", ["Doe, Jane (Engineering)"])
                    .with_attr("employeeID", ["E1024"])
                    .with_attr("st", ["CA"])
                    .with_attr("extensionAttribute2", ["Engineer"]),
            )
    }

    fn extractor(
        directory: &MemoryDirectory,
        mapping: ProfileMapping,
    ) -> ProfileExtractor {
        let client = DirectoryClient::new(
            DirectoryConfig::default(),
            AttributeMapping::default(),
            Arc::new(directory.clone()),
        )
        .unwrap();
        ProfileExtractor::new(client, mapping)
    }

    #[tokio::test]
    async fn test_fetch_own_profile() {
        let directory = directory();
        let extractor = extractor(&directory, ProfileMapping::default());

        let (code, profile) = extractor
            .fetch(
                &Credentials::new("jdoe", "secret"),
                &SearchRequest::own_entry(),
            )
            .await
            .unwrap();

        assert_eq!(code, ReturnCode::Success);
        assert_eq!(profile, Profile {
            user_id: "jdoe".into(),
            full_name: "Jane Doe".into(),
            role_id: String::new(),
            employee_id: "E1024".into(),
            role: "Engineer".into(),
            location: "CA".into(),
        });
    }

    #[tokio::test]
    async fn test_empty_password_makes_no_attempt() {
        let directory = directory();
        let audit = Arc::new(RecordingAudit::default());
        let extractor = extractor(&directory, ProfileMapping::default())
            .with_audit(audit.clone());

        let result = extractor
            .fetch(&Credentials::new("jdoe", ""), &SearchRequest::own_entry())
            .await;

        assert!(result.is_none());
        assert_eq!(directory.connections(), 0);
        assert!(audit.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_leaves_profile_empty() {
        let directory = directory();
        let audit = Arc::new(RecordingAudit::default());
        let extractor = extractor(&directory, ProfileMapping::default())
            .with_audit(audit.clone());

        let (code, profile) = extractor
            .fetch(
                &Credentials::new("jdoe", "wrong"),
                &SearchRequest::own_entry(),
            )
            .await
            .unwrap();
        assert_eq!(code, ReturnCode::ConnectionFailure);
        assert_eq!(profile, Profile::default());

        let (code, profile) = extractor
            .fetch(
                &Credentials::new("jdoe", "secret"),
                &SearchRequest::named("Nobody Here"),
            )
            .await
            .unwrap();
        assert_eq!(code, ReturnCode::SearchFailure);
        assert_eq!(profile, Profile::default());

        assert_eq!(*audit.0.lock().unwrap(), [
            ("jdoe".to_string(), ReturnCode::ConnectionFailure),
            ("jdoe".to_string(), ReturnCode::SearchFailure),
        ]);
    }

    #[tokio::test]
    async fn test_custom_profile_mapping() {
        let directory = directory();
        let mapping = ProfileMapping::default()
            .with_rule(ROLE_ID, AttributeRule::new("extensionAttribute2"))
            .with_rule(
                USER_ID,
                AttributeRule::new("samaccountname")
                    .with_transform(Transform::Uppercase),
            );
        let extractor = extractor(&directory, mapping);

        let (_, profile) = extractor
            .fetch(
                &Credentials::new("jdoe", "secret"),
                &SearchRequest::own_entry(),
            )
            .await
            .unwrap();

        assert_eq!(profile.user_id, "JDOE");
        assert_eq!(profile.role_id, "Engineer");
    }

    #[tokio::test]
    async fn test_fetch_is_idempotent() {
        let directory = directory();
        let extractor = extractor(&directory, ProfileMapping::default());
        let credentials = Credentials::new("jdoe", "secret");

        let first = extractor
            .fetch(&credentials, &SearchRequest::own_entry())
            .await;
        let second = extractor
            .fetch(&credentials, &SearchRequest::own_entry())
            .await;

        assert_eq!(first, second);
    }
}
