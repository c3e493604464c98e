//! Object Storage Filesystem Adapter
//!
//! Maps the bucketfs [`Adapter`](bucketfs_core::Adapter) contract onto an
//! object store reached through a [`StorageClient`]. The store is treated as
//! flat keys; directories exist only as `/`-delimited common prefixes.

mod adapter;
mod client;
mod config;
mod error;
mod lister;
mod memory;
mod time;

#[cfg(feature = "s3")]
mod s3;

// Re-exports
pub use adapter::OssAdapter;
pub use client::{
    BucketMeta, HttpMethod, ListOptions, ListingPage, ObjectMeta, ObjectRecord, StorageClient,
};
pub use config::AdapterConfig;
pub use error::StoreError;
pub use lister::{directory_filter, DirectoryLister, DELIMITER, MAX_KEYS};
pub use memory::{MemoryClient, SignRequest};
pub use time::parse_timestamp;

#[cfg(feature = "s3")]
pub use s3::{S3Client, S3ClientConfig};
