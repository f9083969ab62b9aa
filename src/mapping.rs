//! Declarative mapping from friendly names to raw directory attributes.
//!
//! Exposing a new attribute only takes a new line in the mapping table:
//!
//! ```yaml
//! attributes:
//!   single:
//!     email: { attribute: mail }
//!   multi:
//!     groups: { attribute: memberof, transform: common_name }
//! ```

pub mod transform;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::directory::DirectoryEntry;
pub use transform::Transform;

/// Raw attribute name, with an optional transform.
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeRule {
    pub attribute: String,
    #[serde(default)]
    pub transform: Option<Transform>,
}

impl AttributeRule {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    fn apply(&self, value: &str) -> String {
        match &self.transform {
            Some(transform) => transform.apply(value),
            None => value.to_owned(),
        }
    }
}

/// Single-valued and multi-valued mapping tables.
///
/// A table omitted from a configuration section is empty; the built-in
/// defaults only apply when the whole section is missing.
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeMapping {
    #[serde(default)]
    single: HashMap<String, AttributeRule>,
    #[serde(default)]
    multi: HashMap<String, AttributeRule>,
}

impl Default for AttributeMapping {
    fn default() -> Self {
        Self::empty()
            .single_valued("login", AttributeRule::new("samaccountname"))
            .single_valued("first_name", AttributeRule::new("givenname"))
            .single_valued("last_name", AttributeRule::new("sn"))
            .single_valued("email", AttributeRule::new("mail"))
            .multi_valued(
                "groups",
                AttributeRule::new("memberof")
                    .with_transform(Transform::CommonName),
            )
    }
}

impl AttributeMapping {
    /// Mapping without any friendly name.
    pub fn empty() -> Self {
        Self {
            single: HashMap::new(),
            multi: HashMap::new(),
        }
    }

    /// Add or replace a single-valued friendly name.
    pub fn single_valued(
        mut self,
        name: impl Into<String>,
        rule: AttributeRule,
    ) -> Self {
        self.single.insert(name.into(), rule);
        self
    }

    /// Add or replace a multi-valued friendly name.
    pub fn multi_valued(
        mut self,
        name: impl Into<String>,
        rule: AttributeRule,
    ) -> Self {
        self.multi.insert(name.into(), rule);
        self
    }

    pub fn single(&self, name: &str) -> Option<&AttributeRule> {
        self.single.get(name)
    }

    pub fn multi(&self, name: &str) -> Option<&AttributeRule> {
        self.multi.get(name)
    }
}

/// Reads friendly names out of a [`DirectoryEntry`].
///
/// Absent attributes and unknown friendly names read as empty values.
#[derive(Debug, Clone)]
pub struct AttributeMapper {
    mapping: Arc<AttributeMapping>,
}

impl AttributeMapper {
    /// Create a new [`AttributeMapper`].
    pub fn new(mapping: AttributeMapping) -> Self {
        Self {
            mapping: Arc::new(mapping),
        }
    }

    pub fn mapping(&self) -> &AttributeMapping {
        &self.mapping
    }

    /// Single-valued attribute, `""` when absent.
    pub fn get(&self, entry: &DirectoryEntry, name: &str) -> String {
        let Some(rule) = self.mapping.single(name) else {
            tracing::debug!(name, "unknown single-valued attribute");
            return String::new();
        };

        entry
            .first(&rule.attribute)
            .map(|value| rule.apply(value))
            .unwrap_or_default()
    }

    /// Multi-valued attribute, empty when absent. Order is preserved.
    pub fn get_multi(&self, entry: &DirectoryEntry, name: &str) -> Vec<String> {
        let Some(rule) = self.mapping.multi(name) else {
            tracing::debug!(name, "unknown multi-valued attribute");
            return Vec::new();
        };

        entry
            .values(&rule.attribute)
            .map(|values| values.iter().map(|v| rule.apply(v)).collect())
            .unwrap_or_default()
    }

    /// `first_name` and `last_name` joined by a space.
    pub fn full_name(&self, entry: &DirectoryEntry) -> String {
        format!(
            "{} {}",
            self.get(entry, "first_name"),
            self.get(entry, "last_name")
        )
    }

    /// Whether `groups` contains `group`.
    pub fn is_member_of(&self, entry: &DirectoryEntry, group: &str) -> bool {
        self.get_multi(entry, "groups").iter().any(|g| g == group)
    }
}

impl Default for AttributeMapper {
    fn default() -> Self {
        Self::new(AttributeMapping::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> DirectoryEntry {
        DirectoryEntry::new("CN=Jane Doe,OU=Staff,DC=example,DC=com")
            .with_attr("sAMAccountName", ["jdoe"])
            .with_attr("givenName", ["Jane"])
            .with_attr("sn", ["Doe"])
            .with_attr("memberOf", [
                "CN=Mac Users,OU=Groups,DC=example,DC=com",
                "CN=Geeks,OU=Groups,DC=example,DC=com",
                "CN=Ruby Coders,OU=Groups,DC=example,DC=com",
            ])
    }

    #[test]
    fn test_single_valued() {
        let mapper = AttributeMapper::default();
        let entry = entry();

        assert_eq!(mapper.get(&entry, "login"), "jdoe");
        assert_eq!(mapper.get(&entry, "first_name"), "Jane");
        // no `mail` on the entry.
        assert_eq!(mapper.get(&entry, "email"), "");
        assert_eq!(mapper.get(&entry, "not_configured"), "");
        assert_eq!(mapper.full_name(&entry), "Jane Doe");
    }

    #[test]
    fn test_multi_valued() {
        let mapper = AttributeMapper::default();
        let entry = entry();

        assert_eq!(mapper.get_multi(&entry, "groups"), [
            "Mac Users",
            "Geeks",
            "Ruby Coders"
        ]);
        assert!(mapper.is_member_of(&entry, "Geeks"));
        assert!(!mapper.is_member_of(&entry, "Admins"));

        let bare = DirectoryEntry::new("CN=Bare,DC=example,DC=com");
        assert!(mapper.get_multi(&bare, "groups").is_empty());
        assert!(mapper.get_multi(&entry, "login").is_empty());
    }

    #[test]
    fn test_multi_valued_without_transform() {
        let mapper = AttributeMapper::new(
            AttributeMapping::empty()
                .multi_valued("raw_groups", AttributeRule::new("memberOf")),
        );

        assert_eq!(
            mapper.get_multi(&entry(), "raw_groups")[0],
            "CN=Mac Users,OU=Groups,DC=example,DC=com"
        );
    }

    #[test]
    fn test_transform_is_consistent_between_single_and_multi() {
        let rule = AttributeRule::new("memberof")
            .with_transform(Transform::CommonName);
        let mapper = AttributeMapper::new(
            AttributeMapping::empty()
                .single_valued("primary_group", rule.clone())
                .multi_valued("groups", rule),
        );
        let entry = entry();

        assert_eq!(
            mapper.get(&entry, "primary_group"),
            mapper.get_multi(&entry, "groups")[0]
        );
    }

    #[test]
    fn test_new_attribute_from_config() {
        let mapping: AttributeMapping = serde_yaml::from_str(
            "single:\n  department: { attribute: department, transform: uppercase }\n",
        )
        .unwrap();
        let mapper = AttributeMapper::new(mapping);
        let entry = entry().with_attr("department", ["Research"]);

        assert_eq!(mapper.get(&entry, "department"), "RESEARCH");
        // omitted table stays empty.
        assert!(mapper.mapping().multi("groups").is_none());
    }
}
