//! Storage Client Capability
//!
//! The operations an object-storage SDK has to offer for [`OssAdapter`]
//! to sit on top of it. Keys passed here are full store keys, prefix
//! already applied.
//!
//! [`OssAdapter`]: crate::OssAdapter

use crate::error::StoreError;
use bucketfs_core::{Config, UrlOptions, Visibility, WriteReceipt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Parameters of a single delimiter-based listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only keys starting with this are returned. Empty means the whole bucket.
    pub prefix: String,
    /// Keys with this after the prefix are rolled up into common prefixes.
    pub delimiter: String,
    pub max_keys: usize,
    /// Resume point from the previous page, empty for the first page.
    pub marker: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub key: String,
    /// ISO 8601 / RFC 3339 timestamp as reported by the store.
    pub last_modified: String,
    pub size: u64,
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingPage {
    pub objects: Vec<ObjectRecord>,
    /// Rolled-up "directories", each ending with the delimiter.
    pub common_prefixes: Vec<String>,
    /// `None` (or an empty string) on the last page.
    pub next_marker: Option<String>,
}

impl ListingPage {
    pub fn is_last(&self) -> bool {
        self.next_marker.as_deref().map_or(true, str::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// HTTP date or RFC 3339 timestamp.
    pub last_modified: String,
    pub content_type: Option<String>,
    pub content_length: u64,
    pub etag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketMeta {
    /// Public base URL objects of this bucket are served from.
    pub request_url: String,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
        })
    }
}

pub trait StorageClient: Send + Sync {
    fn list_objects(&self, bucket: &str, options: &ListOptions) -> Result<ListingPage, StoreError>;

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        contents: &[u8],
        options: &Config,
    ) -> Result<WriteReceipt, StoreError>;

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), StoreError>;

    fn copy_object(
        &self,
        from_bucket: &str,
        from_key: &str,
        to_bucket: &str,
        to_key: &str,
    ) -> Result<(), StoreError>;

    fn does_object_exist(&self, bucket: &str, key: &str) -> Result<bool, StoreError>;

    fn get_object_meta(&self, bucket: &str, key: &str) -> Result<ObjectMeta, StoreError>;

    /// [`Visibility::Default`] means the object inherits the bucket ACL.
    fn get_object_acl(&self, bucket: &str, key: &str) -> Result<Visibility, StoreError>;

    fn put_object_acl(&self, bucket: &str, key: &str, acl: Visibility) -> Result<(), StoreError>;

    fn get_bucket_acl(&self, bucket: &str) -> Result<Visibility, StoreError>;

    fn get_bucket_meta(&self, bucket: &str) -> Result<BucketMeta, StoreError>;

    /// Create an empty placeholder object for `key`, which ends with `/`.
    fn create_object_dir(&self, bucket: &str, key: &str, options: &Config)
        -> Result<(), StoreError>;

    fn sign_url(
        &self,
        bucket: &str,
        key: &str,
        timeout: Duration,
        method: HttpMethod,
        options: &UrlOptions,
    ) -> Result<String, StoreError>;
}

impl<C: StorageClient + ?Sized> StorageClient for Arc<C> {
    fn list_objects(&self, bucket: &str, options: &ListOptions) -> Result<ListingPage, StoreError> {
        (**self).list_objects(bucket, options)
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        contents: &[u8],
        options: &Config,
    ) -> Result<WriteReceipt, StoreError> {
        (**self).put_object(bucket, key, contents, options)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        (**self).get_object(bucket, key)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        (**self).delete_object(bucket, key)
    }

    fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), StoreError> {
        (**self).delete_objects(bucket, keys)
    }

    fn copy_object(
        &self,
        from_bucket: &str,
        from_key: &str,
        to_bucket: &str,
        to_key: &str,
    ) -> Result<(), StoreError> {
        (**self).copy_object(from_bucket, from_key, to_bucket, to_key)
    }

    fn does_object_exist(&self, bucket: &str, key: &str) -> Result<bool, StoreError> {
        (**self).does_object_exist(bucket, key)
    }

    fn get_object_meta(&self, bucket: &str, key: &str) -> Result<ObjectMeta, StoreError> {
        (**self).get_object_meta(bucket, key)
    }

    fn get_object_acl(&self, bucket: &str, key: &str) -> Result<Visibility, StoreError> {
        (**self).get_object_acl(bucket, key)
    }

    fn put_object_acl(&self, bucket: &str, key: &str, acl: Visibility) -> Result<(), StoreError> {
        (**self).put_object_acl(bucket, key, acl)
    }

    fn get_bucket_acl(&self, bucket: &str) -> Result<Visibility, StoreError> {
        (**self).get_bucket_acl(bucket)
    }

    fn get_bucket_meta(&self, bucket: &str) -> Result<BucketMeta, StoreError> {
        (**self).get_bucket_meta(bucket)
    }

    fn create_object_dir(
        &self,
        bucket: &str,
        key: &str,
        options: &Config,
    ) -> Result<(), StoreError> {
        (**self).create_object_dir(bucket, key, options)
    }

    fn sign_url(
        &self,
        bucket: &str,
        key: &str,
        timeout: Duration,
        method: HttpMethod,
        options: &UrlOptions,
    ) -> Result<String, StoreError> {
        (**self).sign_url(bucket, key, timeout, method, options)
    }
}
