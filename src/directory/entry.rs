//! Directory entries and search filters.

use std::collections::HashMap;
use std::fmt;

use ldap3::{SearchEntry, ldap_escape};

/// Raw entry returned by a directory search.
///
/// Attribute names are stored lowercased so lookups do not depend on the
/// casing the server chose (`sAMAccountName` vs `samaccountname`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryEntry {
    dn: String,
    attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// Create a new [`DirectoryEntry`].
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
        }
    }

    /// Add values to an attribute, keeping previous ones.
    pub fn with_attr<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs
            .entry(name.to_lowercase())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Distinguished name of the entry.
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// Every value of an attribute, if the entry carries it.
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.attrs.get(&name.to_lowercase()).map(Vec::as_slice)
    }

    /// First value of an attribute.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// Names of all attributes present, lowercased.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }
}

impl From<SearchEntry> for DirectoryEntry {
    fn from(entry: SearchEntry) -> Self {
        entry
            .attrs
            .into_iter()
            .fold(Self::new(entry.dn), |acc, (name, values)| {
                acc.with_attr(&name, values)
            })
    }
}

/// Equality filter such as `(sAMAccountName=jdoe)`.
///
/// Transports receive the structured form; [`fmt::Display`] renders the
/// RFC 4515 string with the value escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    pub attribute: String,
    pub value: String,
}

impl SearchFilter {
    pub fn equality(
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Whether `entry` satisfies the filter.
    ///
    /// Values compare case-insensitively, as directory string attributes do.
    pub fn matches(&self, entry: &DirectoryEntry) -> bool {
        entry.values(&self.attribute).is_some_and(|values| {
            values.iter().any(|v| v.eq_ignore_ascii_case(&self.value))
        })
    }
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}={})", self.attribute, ldap_escape(self.value.as_str()))
    }
}
