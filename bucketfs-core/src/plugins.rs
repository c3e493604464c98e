//! Optional URL accessors.
//!
//! Adapters opt in by implementing [`UrlAdapter`] and/or
//! [`TemporaryUrlAdapter`]. Bringing [`FileUrl`] or [`TemporaryUrl`] into
//! scope then exposes `get_url` / `temporary_url` on the [`Filesystem`].

use crate::adapter::Adapter;
use crate::filesystem::{normalize_path, Filesystem, FilesystemError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long a signed URL stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Valid for this long from the moment of signing.
    In(Duration),
    /// Valid until this point in time.
    At(DateTime<Utc>),
}

impl Expiration {
    pub fn seconds(secs: u64) -> Self {
        Expiration::In(Duration::from_secs(secs))
    }

    /// Relative validity as seen from `now`. A point in the past gives zero.
    pub fn timeout_from(&self, now: DateTime<Utc>) -> Duration {
        match self {
            Expiration::In(duration) => *duration,
            Expiration::At(at) => (*at - now).to_std().unwrap_or(Duration::ZERO),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_from(Utc::now())
    }
}

impl From<Duration> for Expiration {
    fn from(value: Duration) -> Self {
        Expiration::In(value)
    }
}

impl From<DateTime<Utc>> for Expiration {
    fn from(value: DateTime<Utc>) -> Self {
        Expiration::At(value)
    }
}

/// Response overrides baked into a signed URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlOptions {
    pub response_content_type: Option<String>,
    pub response_content_disposition: Option<String>,
}

pub trait UrlAdapter: Adapter {
    fn get_url(&self, path: &str) -> Result<String, Self::Error>;
}

pub trait TemporaryUrlAdapter: Adapter {
    fn temporary_url(
        &self,
        path: &str,
        expiration: Expiration,
        options: &UrlOptions,
    ) -> Result<String, Self::Error>;
}

/// Public URL of a file.
pub trait FileUrl {
    type Error;

    fn get_url(&self, path: &str) -> Result<String, Self::Error>;
}

/// Time-limited signed URL of a file.
pub trait TemporaryUrl {
    type Error;

    fn temporary_url(
        &self,
        path: &str,
        expiration: Expiration,
        options: &UrlOptions,
    ) -> Result<String, Self::Error>;
}

impl<A: UrlAdapter> FileUrl for Filesystem<A> {
    type Error = FilesystemError<A::Error>;

    fn get_url(&self, path: &str) -> Result<String, Self::Error> {
        let path = normalize_path(path).map_err(FilesystemError::PathOutsideRoot)?;
        self.adapter()
            .get_url(&path)
            .map_err(FilesystemError::Adapter)
    }
}

impl<A: TemporaryUrlAdapter> TemporaryUrl for Filesystem<A> {
    type Error = FilesystemError<A::Error>;

    fn temporary_url(
        &self,
        path: &str,
        expiration: Expiration,
        options: &UrlOptions,
    ) -> Result<String, Self::Error> {
        let path = normalize_path(path).map_err(FilesystemError::PathOutsideRoot)?;
        self.adapter()
            .temporary_url(&path, expiration, options)
            .map_err(FilesystemError::Adapter)
    }
}
