//! Object Storage Adapter
//!
//! Implements the filesystem [`Adapter`] contract by forwarding every call to
//! a [`StorageClient`], with the configured path prefix applied on the way in
//! and stripped on the way out.

use crate::client::{HttpMethod, StorageClient};
use crate::config::AdapterConfig;
use crate::error::StoreError;
use crate::lister::DirectoryLister;
use crate::time::parse_timestamp;
use bucketfs_core::{
    dirname, Adapter, Config, Entry, EntryKind, Expiration, Metadata, PathPrefix,
    TemporaryUrlAdapter, UrlAdapter, UrlOptions, Visibility, WriteReceipt,
};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct OssAdapter<C> {
    client: C,
    bucket: String,
    prefix: PathPrefix,
    options: Config,
}

impl<C: StorageClient> OssAdapter<C> {
    /// # Arguments
    /// * `client` - Storage client, owned by the adapter from here on
    /// * `bucket` - Bucket every call is made against
    /// * `prefix` - Key prefix that scopes the adapter inside the bucket
    /// * `options` - Write options applied unless a call overrides them
    pub fn new(
        client: C,
        bucket: impl Into<String>,
        prefix: impl Into<PathPrefix>,
        options: Config,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
            options,
        }
    }

    pub fn from_config(client: C, config: AdapterConfig) -> Self {
        Self::new(client, config.bucket, config.prefix, config.options)
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn set_bucket(&mut self, bucket: impl Into<String>) -> &mut Self {
        self.bucket = bucket.into();
        self
    }

    pub fn prefix(&self) -> &PathPrefix {
        &self.prefix
    }

    pub fn options(&self) -> &Config {
        &self.options
    }

    pub fn lister(&self) -> DirectoryLister<'_, C> {
        DirectoryLister::new(&self.client, &self.bucket, &self.prefix)
    }

    fn key(&self, path: &str) -> String {
        self.prefix.apply(path)
    }
}

impl<C: StorageClient> Adapter for OssAdapter<C> {
    type Error = StoreError;

    fn write(&self, path: &str, contents: &[u8], config: &Config) -> Result<WriteReceipt, StoreError> {
        let key = self.key(path);
        debug!(bucket = %self.bucket, %key, bytes = contents.len(), "put object");
        self.client
            .put_object(&self.bucket, &key, contents, &self.options.merge(config))
    }

    fn update(&self, path: &str, contents: &[u8], config: &Config) -> Result<WriteReceipt, StoreError> {
        self.write(path, contents, config)
    }

    fn rename(&self, path: &str, new_path: &str) -> Result<(), StoreError> {
        self.copy(path, new_path)?;
        self.delete(path)
    }

    fn copy(&self, path: &str, new_path: &str) -> Result<(), StoreError> {
        let from = self.key(path);
        let to = self.key(new_path);
        debug!(bucket = %self.bucket, %from, %to, "copy object");
        self.client
            .copy_object(&self.bucket, &from, &self.bucket, &to)
    }

    fn delete(&self, path: &str) -> Result<(), StoreError> {
        let key = self.key(path);
        debug!(bucket = %self.bucket, %key, "delete object");
        self.client.delete_object(&self.bucket, &key)
    }

    fn delete_dir(&self, dirname: &str) -> Result<(), StoreError> {
        let keys: Vec<String> = self
            .list_contents(dirname, true)?
            .into_iter()
            .map(|entry| match entry.kind {
                EntryKind::File => self.key(&entry.path),
                EntryKind::Dir => format!("{}/", self.key(&entry.path)),
            })
            .collect();

        debug!(bucket = %self.bucket, dirname, objects = keys.len(), "delete directory");
        if keys.is_empty() {
            return Ok(());
        }
        self.client.delete_objects(&self.bucket, &keys)
    }

    fn create_dir(&self, dirname: &str, config: &Config) -> Result<(), StoreError> {
        let key = format!("{}/", self.key(dirname).trim_end_matches('/'));
        self.client
            .create_object_dir(&self.bucket, &key, &self.options.merge(config))
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<(), StoreError> {
        self.client
            .put_object_acl(&self.bucket, &self.key(path), visibility)
    }

    fn has(&self, path: &str) -> Result<bool, StoreError> {
        self.client.does_object_exist(&self.bucket, &self.key(path))
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.client.get_object(&self.bucket, &self.key(path))
    }

    fn list_contents(&self, directory: &str, recursive: bool) -> Result<Vec<Entry>, StoreError> {
        self.lister().list(directory, recursive)
    }

    fn get_metadata(&self, path: &str) -> Result<Metadata, StoreError> {
        let meta = self.client.get_object_meta(&self.bucket, &self.key(path))?;

        Ok(Metadata {
            kind: EntryKind::File,
            dirname: dirname(path),
            path: path.to_string(),
            timestamp: parse_timestamp(&meta.last_modified)?,
            mimetype: meta.content_type,
            size: meta.content_length,
        })
    }

    /// Objects without an ACL of their own report the bucket's.
    fn get_visibility(&self, path: &str) -> Result<Visibility, StoreError> {
        match self.client.get_object_acl(&self.bucket, &self.key(path))? {
            Visibility::Default => self.client.get_bucket_acl(&self.bucket),
            visibility => Ok(visibility),
        }
    }
}

impl<C: StorageClient> UrlAdapter for OssAdapter<C> {
    fn get_url(&self, path: &str) -> Result<String, StoreError> {
        let key = self.key(path);
        let meta = self.client.get_bucket_meta(&self.bucket)?;
        Ok(format!(
            "{}/{}",
            meta.request_url.trim_matches('/'),
            key.trim_matches('/')
        ))
    }
}

impl<C: StorageClient> TemporaryUrlAdapter for OssAdapter<C> {
    fn temporary_url(
        &self,
        path: &str,
        expiration: Expiration,
        options: &UrlOptions,
    ) -> Result<String, StoreError> {
        let key = self.key(path);
        let timeout = expiration.timeout();
        debug!(bucket = %self.bucket, %key, timeout_secs = timeout.as_secs(), "sign url");
        self.client
            .sign_url(&self.bucket, &key, timeout, HttpMethod::Get, options)
    }
}
