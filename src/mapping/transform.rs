//! Value transforms applied to raw directory attributes.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::Deserialize;

static COMMON_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*?CN=(.*?),").unwrap());

/// Pure function turning a raw attribute value into a derived one.
///
/// Every transform is total: input it cannot make sense of is returned
/// unchanged.
#[derive(Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// `CN=Geeks,OU=Groups,DC=example,DC=com` becomes `Geeks`.
    CommonName,
    Lowercase,
    Uppercase,
    Trim,
    /// Caller-provided function, only available programmatically.
    #[serde(skip)]
    Custom(fn(&str) -> String),
}

impl Transform {
    /// Apply the transform to a single value.
    pub fn apply(&self, value: &str) -> String {
        match self {
            Self::CommonName => common_name(value),
            Self::Lowercase => value.to_lowercase(),
            Self::Uppercase => value.to_uppercase(),
            Self::Trim => value.trim().to_owned(),
            Self::Custom(f) => f(value),
        }
    }

    /// Name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CommonName => "common_name",
            Self::Lowercase => "lowercase",
            Self::Uppercase => "uppercase",
            Self::Trim => "trim",
            Self::Custom(_) => "custom",
        }
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// TODO: handle escaped commas (`\,`) inside the CN value.
fn common_name(dn: &str) -> String {
    COMMON_NAME_RE
        .captures(dn)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
        .unwrap_or_else(|| dn.to_owned())
}
