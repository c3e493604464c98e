use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// One item discovered while listing a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Logical path, without the adapter prefix and without a trailing `/`.
    pub path: String,
    /// Last modified time in unix seconds. Always 0 for directories.
    pub timestamp: i64,
    /// Size in bytes. Always 0 for directories.
    pub size: u64,
}

impl Entry {
    pub fn file(path: impl Into<String>, timestamp: i64, size: u64) -> Self {
        Self {
            kind: EntryKind::File,
            path: path.into(),
            timestamp,
            size,
        }
    }

    /// Object stores do not materialize directories, so there is no
    /// timestamp or size to report.
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Dir,
            path: path.into(),
            timestamp: 0,
            size: 0,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub dirname: String,
    pub path: String,
    pub timestamp: i64,
    pub mimetype: Option<String>,
    pub size: u64,
}

/// Access level of an object, expressed as a canned ACL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    Private,
    PublicRead,
    PublicReadWrite,
    /// The object carries no ACL of its own and inherits the bucket's.
    Default,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::PublicRead => "public-read",
            Visibility::PublicReadWrite => "public-read-write",
            Visibility::Default => "default",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown visibility: {0}")]
pub struct ParseVisibilityError(pub String);

impl FromStr for Visibility {
    type Err = ParseVisibilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Visibility::Private),
            "public-read" | "public" => Ok(Visibility::PublicRead),
            "public-read-write" => Ok(Visibility::PublicReadWrite),
            "default" => Ok(Visibility::Default),
            other => Err(ParseVisibilityError(other.to_string())),
        }
    }
}

/// Per-call options for writes and directory creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub visibility: Option<Visibility>,
    /// User metadata stored alongside the object.
    pub metadata: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Overlay `overrides` on top of `self`. Fields set in `overrides` win,
    /// metadata maps are unioned with `overrides` taking precedence.
    pub fn merge(&self, overrides: &Config) -> Config {
        let mut metadata = self.metadata.clone();
        metadata.extend(
            overrides
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        Config {
            content_type: overrides
                .content_type
                .clone()
                .or_else(|| self.content_type.clone()),
            cache_control: overrides
                .cache_control
                .clone()
                .or_else(|| self.cache_control.clone()),
            content_disposition: overrides
                .content_disposition
                .clone()
                .or_else(|| self.content_disposition.clone()),
            visibility: overrides.visibility.or(self.visibility),
            metadata,
        }
    }
}

/// What the store reported back after accepting a write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReceipt {
    pub etag: Option<String>,
}
