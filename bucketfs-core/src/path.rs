//! Mapping between logical paths and store keys.

use serde::{Deserialize, Serialize};

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// A fixed key prefix that scopes an adapter to part of a bucket.
///
/// `strip(apply(p)) == PathPrefix::normalize(p)` holds for every logical path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PathPrefix {
    prefix: String,
}

impl PathPrefix {
    pub fn new(prefix: impl AsRef<str>) -> Self {
        let trimmed = prefix.as_ref().trim_matches(is_separator).replace('\\', "/");
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}/")
        };
        Self { prefix }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }

    /// Store keys never start with a separator. Inner backslashes are kept
    /// as part of the key.
    pub fn normalize(path: &str) -> String {
        path.trim_start_matches(is_separator).to_string()
    }

    pub fn apply(&self, path: &str) -> String {
        let mut key = self.prefix.clone();
        key.push_str(&Self::normalize(path));
        key
    }

    /// Keys outside the prefix are returned unchanged.
    pub fn strip<'a>(&self, key: &'a str) -> &'a str {
        key.strip_prefix(self.prefix.as_str()).unwrap_or(key)
    }
}

impl From<String> for PathPrefix {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for PathPrefix {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<PathPrefix> for String {
    fn from(value: PathPrefix) -> Self {
        value.prefix
    }
}

/// Parent directory of a logical path, empty when the path is top-level.
pub fn dirname(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => trimmed[..idx].trim_end_matches('/').to_string(),
        None => String::new(),
    }
}
