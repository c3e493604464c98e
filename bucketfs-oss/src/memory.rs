//! In-Memory Storage Client
//!
//! A process-local [`StorageClient`] that follows the same delimiter and
//! marker rules as a real object store. Useful for development and tests.

use crate::client::{
    BucketMeta, HttpMethod, ListOptions, ListingPage, ObjectMeta, ObjectRecord, StorageClient,
};
use crate::error::StoreError;
use bucketfs_core::{Config, UrlOptions, Visibility, WriteReceipt};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

#[derive(Debug, Clone)]
struct StoredObject {
    contents: Vec<u8>,
    last_modified: DateTime<Utc>,
    content_type: Option<String>,
    acl: Visibility,
    metadata: BTreeMap<String, String>,
}

/// FNV-1a, good enough to tell contents apart.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325_u64, |acc, b| {
        (acc ^ u64::from(*b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

impl StoredObject {
    fn etag(&self) -> String {
        format!("\"{:016x}\"", fnv1a(&self.contents))
    }
}

#[derive(Debug, Default)]
struct MemoryBucket {
    objects: BTreeMap<String, StoredObject>,
    acl: Option<Visibility>,
}

/// A recorded `sign_url` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    pub bucket: String,
    pub key: String,
    pub timeout: Duration,
    pub method: HttpMethod,
    pub options: UrlOptions,
}

#[derive(Debug)]
pub struct MemoryClient {
    buckets: RwLock<HashMap<String, MemoryBucket>>,
    endpoint: String,
    page_size: usize,
    list_calls: AtomicUsize,
    fail_list_call: Mutex<Option<usize>>,
    sign_requests: Mutex<Vec<SignRequest>>,
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryClient {
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            endpoint: "http://localhost".to_string(),
            page_size: usize::MAX,
            list_calls: AtomicUsize::new(0),
            fail_list_call: Mutex::new(None),
            sign_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_bucket(self, bucket: impl Into<String>) -> Self {
        self.create_bucket(bucket);
        self
    }

    /// Base URL bucket request URLs are derived from.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Cap every listing page at `page_size` records, regardless of `max_keys`.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn create_bucket(&self, bucket: impl Into<String>) {
        if let Ok(mut buckets) = self.buckets.write() {
            buckets.entry(bucket.into()).or_default();
        }
    }

    pub fn set_bucket_acl(&self, bucket: &str, acl: Visibility) -> Result<(), StoreError> {
        self.with_bucket_mut(bucket, |b| {
            b.acl = Some(acl);
            Ok(())
        })
    }

    /// Store an object with an explicit modification time.
    pub fn insert_object(
        &self,
        bucket: &str,
        key: &str,
        contents: impl Into<Vec<u8>>,
        last_modified: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let contents = contents.into();
        self.with_bucket_mut(bucket, |b| {
            b.objects.insert(
                key.to_string(),
                StoredObject {
                    contents,
                    last_modified,
                    content_type: None,
                    acl: Visibility::Default,
                    metadata: BTreeMap::new(),
                },
            );
            Ok(())
        })
    }

    /// Every key in `bucket`, in key order.
    pub fn keys(&self, bucket: &str) -> Result<Vec<String>, StoreError> {
        self.read_bucket(bucket, |b| Ok(b.objects.keys().cloned().collect()))
    }

    pub fn object_metadata(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<BTreeMap<String, String>, StoreError> {
        self.with_object(bucket, key, |o| Ok(o.metadata.clone()))
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Make the `call`-th `list_objects` call from now (1-based) fail.
    pub fn fail_list_call(&self, call: usize) {
        if let Ok(mut fail) = self.fail_list_call.lock() {
            *fail = Some(self.list_calls() + call);
        }
    }

    pub fn sign_requests(&self) -> Vec<SignRequest> {
        self.sign_requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn poisoned() -> StoreError {
        StoreError::Provider("memory store lock poisoned".to_string())
    }

    fn read_bucket<T>(
        &self,
        bucket: &str,
        f: impl FnOnce(&MemoryBucket) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let buckets = self.buckets.read().map_err(|_| Self::poisoned())?;
        let b = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NotFound(format!("bucket {bucket}")))?;
        f(b)
    }

    fn with_bucket_mut<T>(
        &self,
        bucket: &str,
        f: impl FnOnce(&mut MemoryBucket) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut buckets = self.buckets.write().map_err(|_| Self::poisoned())?;
        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NotFound(format!("bucket {bucket}")))?;
        f(b)
    }

    fn with_object<T>(
        &self,
        bucket: &str,
        key: &str,
        f: impl FnOnce(&StoredObject) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.read_bucket(bucket, |b| {
            let object = b
                .objects
                .get(key)
                .ok_or_else(|| StoreError::NotFound(format!("{bucket}/{key}")))?;
            f(object)
        })
    }

    fn store(
        &self,
        bucket: &str,
        key: &str,
        contents: &[u8],
        options: &Config,
    ) -> Result<WriteReceipt, StoreError> {
        let object = StoredObject {
            contents: contents.to_vec(),
            last_modified: Utc::now(),
            content_type: options.content_type.clone(),
            acl: options.visibility.unwrap_or(Visibility::Default),
            metadata: options.metadata.clone(),
        };
        let etag = object.etag();
        self.with_bucket_mut(bucket, |b| {
            b.objects.insert(key.to_string(), object);
            Ok(WriteReceipt { etag: Some(etag) })
        })
    }
}

enum Listed<'a> {
    Object(&'a String, &'a StoredObject),
    Prefix(String),
}

impl Listed<'_> {
    fn marker(&self) -> String {
        match self {
            Listed::Object(key, _) => (*key).clone(),
            Listed::Prefix(common) => common.clone(),
        }
    }
}

/// Whether `key` falls under a common prefix that was already returned as
/// `marker` on a previous page.
fn rolled_up_by_marker(key: &str, marker: &str, options: &ListOptions) -> bool {
    if options.delimiter.is_empty() || !key.starts_with(marker) {
        return false;
    }
    marker
        .strip_prefix(options.prefix.as_str())
        .map_or(false, |rest| rest.contains(options.delimiter.as_str()))
}

impl StorageClient for MemoryClient {
    fn list_objects(&self, bucket: &str, options: &ListOptions) -> Result<ListingPage, StoreError> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let fail_at = *self.fail_list_call.lock().map_err(|_| Self::poisoned())?;
        if fail_at == Some(call) {
            return Err(StoreError::Network(format!("injected failure on list call {call}")));
        }

        self.read_bucket(bucket, |b| {
            let marker = options.marker.as_str();
            let limit = options.max_keys.min(self.page_size).max(1);

            // Key-ordered stream of objects and rolled-up prefixes after the marker.
            let mut listed: Vec<Listed<'_>> = Vec::new();
            let after_marker: (Bound<&str>, Bound<&str>) = (Bound::Excluded(marker), Bound::Unbounded);
            for (key, object) in b.objects.range::<str, _>(after_marker) {
                if !key.starts_with(options.prefix.as_str()) {
                    continue;
                }
                if !marker.is_empty() && rolled_up_by_marker(key, marker, options) {
                    continue;
                }

                let rest = &key[options.prefix.len()..];
                let split = if options.delimiter.is_empty() {
                    None
                } else {
                    rest.find(options.delimiter.as_str())
                };
                match split {
                    Some(idx) => {
                        let common = format!(
                            "{}{}",
                            options.prefix,
                            &rest[..idx + options.delimiter.len()]
                        );
                        let repeated = matches!(listed.last(), Some(Listed::Prefix(last)) if *last == common);
                        if !repeated {
                            listed.push(Listed::Prefix(common));
                        }
                    }
                    None => listed.push(Listed::Object(key, object)),
                }
                if listed.len() > limit {
                    break;
                }
            }

            let truncated = listed.len() > limit;
            listed.truncate(limit);
            let next_marker = if truncated {
                listed.last().map(Listed::marker)
            } else {
                None
            };

            let mut page = ListingPage {
                next_marker,
                ..ListingPage::default()
            };
            for item in listed {
                match item {
                    Listed::Object(key, object) => page.objects.push(ObjectRecord {
                        key: key.clone(),
                        last_modified: object
                            .last_modified
                            .to_rfc3339_opts(SecondsFormat::Millis, true),
                        size: object.contents.len() as u64,
                    }),
                    Listed::Prefix(common) => page.common_prefixes.push(common),
                }
            }
            Ok(page)
        })
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        contents: &[u8],
        options: &Config,
    ) -> Result<WriteReceipt, StoreError> {
        self.store(bucket, key, contents, options)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.with_object(bucket, key, |o| Ok(o.contents.clone()))
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.with_bucket_mut(bucket, |b| {
            b.objects.remove(key);
            Ok(())
        })
    }

    fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), StoreError> {
        self.with_bucket_mut(bucket, |b| {
            for key in keys {
                b.objects.remove(key);
            }
            Ok(())
        })
    }

    fn copy_object(
        &self,
        from_bucket: &str,
        from_key: &str,
        to_bucket: &str,
        to_key: &str,
    ) -> Result<(), StoreError> {
        let mut object = self.with_object(from_bucket, from_key, |o| Ok(o.clone()))?;
        object.last_modified = Utc::now();
        self.with_bucket_mut(to_bucket, |b| {
            b.objects.insert(to_key.to_string(), object);
            Ok(())
        })
    }

    fn does_object_exist(&self, bucket: &str, key: &str) -> Result<bool, StoreError> {
        self.read_bucket(bucket, |b| Ok(b.objects.contains_key(key)))
    }

    fn get_object_meta(&self, bucket: &str, key: &str) -> Result<ObjectMeta, StoreError> {
        self.with_object(bucket, key, |o| {
            Ok(ObjectMeta {
                last_modified: o.last_modified.to_rfc2822(),
                content_type: o.content_type.clone(),
                content_length: o.contents.len() as u64,
                etag: Some(o.etag()),
            })
        })
    }

    fn get_object_acl(&self, bucket: &str, key: &str) -> Result<Visibility, StoreError> {
        self.with_object(bucket, key, |o| Ok(o.acl))
    }

    fn put_object_acl(&self, bucket: &str, key: &str, acl: Visibility) -> Result<(), StoreError> {
        self.with_bucket_mut(bucket, |b| {
            let object = b
                .objects
                .get_mut(key)
                .ok_or_else(|| StoreError::NotFound(format!("{bucket}/{key}")))?;
            object.acl = acl;
            Ok(())
        })
    }

    fn get_bucket_acl(&self, bucket: &str) -> Result<Visibility, StoreError> {
        self.read_bucket(bucket, |b| Ok(b.acl.unwrap_or(Visibility::Private)))
    }

    fn get_bucket_meta(&self, bucket: &str) -> Result<BucketMeta, StoreError> {
        self.read_bucket(bucket, |_| {
            Ok(BucketMeta {
                request_url: format!("{}/{}", self.endpoint.trim_end_matches('/'), bucket),
                region: None,
            })
        })
    }

    fn create_object_dir(
        &self,
        bucket: &str,
        key: &str,
        options: &Config,
    ) -> Result<(), StoreError> {
        let key = format!("{}/", key.trim_end_matches('/'));
        self.store(bucket, &key, &[], options).map(|_| ())
    }

    fn sign_url(
        &self,
        bucket: &str,
        key: &str,
        timeout: Duration,
        method: HttpMethod,
        options: &UrlOptions,
    ) -> Result<String, StoreError> {
        let request_url = self.get_bucket_meta(bucket)?.request_url;
        let expires = Utc::now().timestamp() + timeout.as_secs() as i64;
        self.sign_requests
            .lock()
            .map_err(|_| Self::poisoned())?
            .push(SignRequest {
                bucket: bucket.to_string(),
                key: key.to_string(),
                timeout,
                method,
                options: options.clone(),
            });
        let signature = fnv1a(format!("{method}\n{bucket}/{key}\n{expires}").as_bytes());
        Ok(format!(
            "{request_url}/{key}?Expires={expires}&Method={method}&Signature={signature:016x}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MemoryClient {
        let client = MemoryClient::new().with_bucket("b");
        for key in ["a.txt", "dir/x", "dir/y", "dir/sub/z", "e.txt", "f/g"] {
            client.insert_object("b", key, "data", Utc::now()).unwrap();
        }
        client
    }

    fn list(client: &MemoryClient, prefix: &str, marker: &str, max_keys: usize) -> ListingPage {
        client
            .list_objects(
                "b",
                &ListOptions {
                    prefix: prefix.to_string(),
                    delimiter: "/".to_string(),
                    max_keys,
                    marker: marker.to_string(),
                },
            )
            .unwrap()
    }

    #[test]
    fn test_delimiter_rolls_up_prefixes() {
        let page = list(&client(), "", "", 1000);
        let keys: Vec<_> = page.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, ["a.txt", "e.txt"]);
        assert_eq!(page.common_prefixes, ["dir/", "f/"]);
        assert!(page.is_last());
    }

    #[test]
    fn test_marker_skips_rolled_up_prefix() {
        let client = client();
        let first = list(&client, "", "", 2);
        assert_eq!(first.objects.len(), 1);
        assert_eq!(first.common_prefixes, ["dir/"]);
        assert_eq!(first.next_marker.as_deref(), Some("dir/"));

        let second = list(&client, "", "dir/", 2);
        let keys: Vec<_> = second.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, ["e.txt"]);
        assert_eq!(second.common_prefixes, ["f/"]);
        assert!(second.is_last());
    }

    #[test]
    fn test_nested_prefix_listing() {
        let page = list(&client(), "dir/", "", 1000);
        let keys: Vec<_> = page.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, ["dir/x", "dir/y"]);
        assert_eq!(page.common_prefixes, ["dir/sub/"]);
    }

    #[test]
    fn test_builder_bucket_is_readable() {
        let client = MemoryClient::new().with_bucket("b");
        assert!(client.keys("b").unwrap().is_empty());
        assert!(!client.does_object_exist("b", "k").unwrap());
        assert_eq!(client.get_bucket_acl("b").unwrap(), Visibility::Private);
    }

    #[test]
    fn test_missing_bucket_is_not_found() {
        let client = MemoryClient::new();
        assert!(matches!(
            client.get_object("nope", "k"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_injected_list_failure() {
        let client = client();
        client.fail_list_call(2);
        list(&client, "", "", 1000);
        let err = client
            .list_objects("b", &ListOptions::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::Network(_)));
        assert_eq!(client.list_calls(), 2);
    }
}
