//! Filesystem abstraction shared by the bucketfs adapters.
//!
//! An [`Adapter`] speaks in logical paths; a [`Filesystem`] wraps one and
//! normalizes caller paths before forwarding. The [`plugins`] module adds the
//! optional URL accessors for adapters that can produce them.

mod adapter;
mod filesystem;
mod path;
pub mod plugins;
mod types;

pub use adapter::Adapter;
pub use filesystem::{normalize_path, Filesystem, FilesystemError};
pub use path::{dirname, PathPrefix};
pub use plugins::{
    Expiration, FileUrl, TemporaryUrl, TemporaryUrlAdapter, UrlAdapter, UrlOptions,
};
pub use types::{Config, Entry, EntryKind, Metadata, ParseVisibilityError, Visibility, WriteReceipt};
