//! Directory Listing
//!
//! Walks the store's paginated, delimiter-based listing and turns it into
//! [`Entry`] values. Recursion is driven by an explicit stack of pending
//! directories so deep trees do not grow the call stack.

use crate::client::{ListOptions, ObjectRecord, StorageClient};
use crate::error::StoreError;
use crate::time::parse_timestamp;
use bucketfs_core::{Entry, PathPrefix};
use metrics::counter;
use std::collections::VecDeque;
use tracing::{debug, instrument};

/// Upper bound on records requested per page.
pub const MAX_KEYS: usize = 1000;

pub const DELIMITER: &str = "/";

/// The store-side filter for a logical directory: prefix applied, exactly one
/// trailing `/`, or empty for the bucket root.
pub fn directory_filter(prefix: &PathPrefix, directory: &str) -> String {
    let applied = prefix.apply(directory);
    let trimmed = applied.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

enum Record {
    Object(ObjectRecord),
    Prefix(String),
}

/// Listing state of one directory level.
struct Frame {
    filter: String,
    marker: Option<String>,
    fetched: bool,
    pending: VecDeque<Record>,
}

impl Frame {
    fn new(filter: String) -> Self {
        Self {
            filter,
            marker: None,
            fetched: false,
            pending: VecDeque::new(),
        }
    }

    /// All pages fetched and every record emitted.
    fn is_done(&self) -> bool {
        self.fetched && self.marker.is_none() && self.pending.is_empty()
    }
}

pub struct DirectoryLister<'a, C: ?Sized> {
    client: &'a C,
    bucket: &'a str,
    prefix: &'a PathPrefix,
}

impl<'a, C: StorageClient + ?Sized> DirectoryLister<'a, C> {
    pub fn new(client: &'a C, bucket: &'a str, prefix: &'a PathPrefix) -> Self {
        Self {
            client,
            bucket,
            prefix,
        }
    }

    /// List `directory`, optionally descending into every sub-directory.
    ///
    /// Within a page files come first, then directories, each in store order.
    /// With `recursive`, a directory's contents follow its own entry before
    /// any later sibling. The first store error aborts the whole listing.
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub fn list(&self, directory: &str, recursive: bool) -> Result<Vec<Entry>, StoreError> {
        let mut entries = Vec::new();
        let mut stack = vec![Frame::new(directory_filter(self.prefix, directory))];

        while let Some(frame) = stack.last_mut() {
            let Some(record) = frame.pending.pop_front() else {
                if frame.is_done() {
                    stack.pop();
                } else {
                    self.fetch_page(frame)?;
                }
                continue;
            };

            match record {
                Record::Object(object) => {
                    let timestamp = parse_timestamp(&object.last_modified)?;
                    entries.push(Entry::file(
                        self.prefix.strip(&object.key),
                        timestamp,
                        object.size,
                    ));
                }
                Record::Prefix(common_prefix) => {
                    let logical = self.prefix.strip(&common_prefix);
                    entries.push(Entry::dir(logical.trim_end_matches('/')));
                    if recursive {
                        stack.push(Frame::new(directory_filter(self.prefix, logical)));
                    }
                }
            }
        }

        counter!("bucketfs_list_entries_total", "bucket" => self.bucket.to_string())
            .increment(entries.len() as u64);
        Ok(entries)
    }

    fn fetch_page(&self, frame: &mut Frame) -> Result<(), StoreError> {
        let options = ListOptions {
            prefix: frame.filter.clone(),
            delimiter: DELIMITER.to_string(),
            max_keys: MAX_KEYS,
            marker: frame.marker.clone().unwrap_or_default(),
        };
        let page = self.client.list_objects(self.bucket, &options)?;
        counter!("bucketfs_list_pages_total", "bucket" => self.bucket.to_string()).increment(1);
        debug!(
            prefix = %frame.filter,
            objects = page.objects.len(),
            prefixes = page.common_prefixes.len(),
            last = page.is_last(),
            "fetched listing page"
        );

        frame.fetched = true;
        frame.marker = page.next_marker.filter(|marker| !marker.is_empty());
        frame
            .pending
            .extend(page.objects.into_iter().map(Record::Object));
        frame
            .pending
            .extend(page.common_prefixes.into_iter().map(Record::Prefix));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_filter() {
        let none = PathPrefix::none();
        assert_eq!(directory_filter(&none, ""), "");
        assert_eq!(directory_filter(&none, "/"), "");
        assert_eq!(directory_filter(&none, "a"), "a/");
        assert_eq!(directory_filter(&none, "a/b///"), "a/b/");

        let scoped = PathPrefix::new("tenant");
        assert_eq!(directory_filter(&scoped, ""), "tenant/");
        assert_eq!(directory_filter(&scoped, "docs/"), "tenant/docs/");
    }
}
