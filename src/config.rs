//! Configuration manager for adproxy.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

use crate::error::Result;
use crate::mapping::AttributeMapping;
use crate::profile::ProfileMapping;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Related to the directory endpoint.
    pub directory: DirectoryConfig,
    /// Friendly names exposed through [`crate::mapping::AttributeMapper`].
    pub attributes: AttributeMapping,
    /// Attributes copied into a [`crate::profile::Profile`].
    pub profile: ProfileMapping,
    /// Related to the daily audit file.
    pub audit: Option<Audit>,
    #[serde(skip)]
    path: PathBuf,
}

/// Directory endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Hostname or IP of the domain controller.
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    /// DN searches start from.
    #[validate(length(min = 1))]
    pub base_dn: String,
    /// Appended to the login for `user@domain` binds.
    #[validate(length(min = 1))]
    pub domain: String,
    /// Entries whose DN matches this pattern are never selected. An empty
    /// pattern would match every DN, so it is rejected.
    #[validate(length(min = 1))]
    pub closed_marker: String,
    pub starttls: bool,
    pub ldaps: bool,
    /// Connection timeout, in seconds.
    pub timeout: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 389,
            base_dn: "DC=example,DC=com".into(),
            domain: "example.com".into(),
            closed_marker: "Close".into(),
            starttls: false,
            ldaps: false,
            timeout: 10,
        }
    }
}

impl DirectoryConfig {
    /// `ldap://` or `ldaps://` URL of the endpoint.
    pub fn url(&self) -> std::result::Result<Url, url::ParseError> {
        let scheme = if self.ldaps { "ldaps" } else { "ldap" };
        Url::parse(&format!("{scheme}://{}:{}", self.host, self.port))
    }

    /// Simplified `user@domain` login format.
    pub fn principal(&self, login: &str) -> String {
        format!("{login}@{}", self.domain)
    }
}

/// Audit file configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    /// Folder receiving `adproxy.log.YYYYMMDD` files.
    pub directory: PathBuf,
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    ///
    /// An unreadable or malformed file is logged and the built-in defaults
    /// are used instead.
    pub fn read(self) -> Self {
        let file_path = if self.path.is_file() {
            self.path.clone()
        } else {
            PathBuf::from(DEFAULT_CONFIG_PATH)
        };

        Self::load(&file_path)
            .map(|config| config.path(file_path.clone()))
            .unwrap_or_else(|err| {
                tracing::error!(
                    error = %err,
                    path = %file_path.display(),
                    "configuration cannot be used, falling back to defaults"
                );
                Self::default().path(self.path)
            })
    }

    /// Parse the YAML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the file cannot be read or is not valid YAML for
    /// this structure.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}
