#![allow(dead_code)]

use bucketfs_core::{Config, UrlOptions, Visibility, WriteReceipt};
use bucketfs_oss::{
    BucketMeta, HttpMethod, ListOptions, ListingPage, ObjectMeta, ObjectRecord, StorageClient,
    StoreError,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Serves canned listing pages keyed by `(prefix, marker)` and records every
/// request it receives.
#[derive(Default)]
pub struct ScriptedClient {
    pages: HashMap<(String, String), ListingPage>,
    failing: HashMap<(String, String), String>,
    requests: Mutex<Vec<ListOptions>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, prefix: &str, marker: &str, page: ListingPage) -> Self {
        self.pages
            .insert((prefix.to_string(), marker.to_string()), page);
        self
    }

    pub fn fail(mut self, prefix: &str, marker: &str, message: &str) -> Self {
        self.failing.insert(
            (prefix.to_string(), marker.to_string()),
            message.to_string(),
        );
        self
    }

    pub fn requests(&self) -> Vec<ListOptions> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested_prefixes(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.prefix).collect()
    }
}

pub fn object(key: &str, last_modified: &str, size: u64) -> ObjectRecord {
    ObjectRecord {
        key: key.to_string(),
        last_modified: last_modified.to_string(),
        size,
    }
}

pub fn page(objects: Vec<ObjectRecord>, prefixes: &[&str], next_marker: Option<&str>) -> ListingPage {
    ListingPage {
        objects,
        common_prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        next_marker: next_marker.map(str::to_string),
    }
}

fn unsupported<T>() -> Result<T, StoreError> {
    Err(StoreError::Provider("not scripted".to_string()))
}

impl StorageClient for ScriptedClient {
    fn list_objects(&self, _bucket: &str, options: &ListOptions) -> Result<ListingPage, StoreError> {
        self.requests.lock().unwrap().push(options.clone());
        let key = (options.prefix.clone(), options.marker.clone());
        if let Some(message) = self.failing.get(&key) {
            return Err(StoreError::Network(message.clone()));
        }
        Ok(self.pages.get(&key).cloned().unwrap_or_default())
    }

    fn put_object(&self, _: &str, _: &str, _: &[u8], _: &Config) -> Result<WriteReceipt, StoreError> {
        unsupported()
    }

    fn get_object(&self, _: &str, _: &str) -> Result<Vec<u8>, StoreError> {
        unsupported()
    }

    fn delete_object(&self, _: &str, _: &str) -> Result<(), StoreError> {
        unsupported()
    }

    fn delete_objects(&self, _: &str, _: &[String]) -> Result<(), StoreError> {
        unsupported()
    }

    fn copy_object(&self, _: &str, _: &str, _: &str, _: &str) -> Result<(), StoreError> {
        unsupported()
    }

    fn does_object_exist(&self, _: &str, _: &str) -> Result<bool, StoreError> {
        unsupported()
    }

    fn get_object_meta(&self, _: &str, _: &str) -> Result<ObjectMeta, StoreError> {
        unsupported()
    }

    fn get_object_acl(&self, _: &str, _: &str) -> Result<Visibility, StoreError> {
        unsupported()
    }

    fn put_object_acl(&self, _: &str, _: &str, _: Visibility) -> Result<(), StoreError> {
        unsupported()
    }

    fn get_bucket_acl(&self, _: &str) -> Result<Visibility, StoreError> {
        unsupported()
    }

    fn get_bucket_meta(&self, _: &str) -> Result<BucketMeta, StoreError> {
        unsupported()
    }

    fn create_object_dir(&self, _: &str, _: &str, _: &Config) -> Result<(), StoreError> {
        unsupported()
    }

    fn sign_url(
        &self,
        _: &str,
        _: &str,
        _: Duration,
        _: HttpMethod,
        _: &UrlOptions,
    ) -> Result<String, StoreError> {
        unsupported()
    }
}
