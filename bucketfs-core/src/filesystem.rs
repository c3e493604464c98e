use crate::adapter::Adapter;
use crate::types::{Config, Entry, Metadata, Visibility, WriteReceipt};
use std::io::Read;

#[derive(Debug, thiserror::Error)]
pub enum FilesystemError<E: std::error::Error + 'static> {
    #[error("path is outside of the filesystem root: {0}")]
    PathOutsideRoot(String),

    #[error("root directory can not be deleted")]
    RootViolation,

    #[error(transparent)]
    Adapter(E),
}

/// Resolve `.`, `..` and repeated separators in a caller supplied path.
pub fn normalize_path(path: &str) -> Result<String, String> {
    let unified = path.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(path.to_string());
                }
            }
            other => parts.push(other),
        }
    }
    Ok(parts.join("/"))
}

/// Caller-facing side of the abstraction. Normalizes paths and forwards to
/// the wrapped adapter; adapter errors come back untouched.
#[derive(Debug, Clone)]
pub struct Filesystem<A> {
    adapter: A,
    config: Config,
}

type FsResult<T, A> = Result<T, FilesystemError<<A as Adapter>::Error>>;

impl<A: Adapter> Filesystem<A> {
    pub fn new(adapter: A) -> Self {
        Self::with_config(adapter, Config::default())
    }

    /// `config` is merged under the per-call config of every write.
    pub fn with_config(adapter: A, config: Config) -> Self {
        Self { adapter, config }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_inner(self) -> A {
        self.adapter
    }

    fn normalize(path: &str) -> FsResult<String, A> {
        normalize_path(path).map_err(FilesystemError::PathOutsideRoot)
    }

    pub fn write(&self, path: &str, contents: &[u8], config: &Config) -> FsResult<WriteReceipt, A> {
        let path = Self::normalize(path)?;
        self.adapter
            .write(&path, contents, &self.config.merge(config))
            .map_err(FilesystemError::Adapter)
    }

    pub fn write_stream(
        &self,
        path: &str,
        reader: &mut dyn Read,
        config: &Config,
    ) -> FsResult<WriteReceipt, A> {
        let path = Self::normalize(path)?;
        self.adapter
            .write_stream(&path, reader, &self.config.merge(config))
            .map_err(FilesystemError::Adapter)
    }

    pub fn update(&self, path: &str, contents: &[u8], config: &Config) -> FsResult<WriteReceipt, A> {
        let path = Self::normalize(path)?;
        self.adapter
            .update(&path, contents, &self.config.merge(config))
            .map_err(FilesystemError::Adapter)
    }

    /// Write when the path is new, update when it already exists.
    pub fn put(&self, path: &str, contents: &[u8], config: &Config) -> FsResult<WriteReceipt, A> {
        if self.has(path)? {
            self.update(path, contents, config)
        } else {
            self.write(path, contents, config)
        }
    }

    pub fn read(&self, path: &str) -> FsResult<Vec<u8>, A> {
        let path = Self::normalize(path)?;
        self.adapter.read(&path).map_err(FilesystemError::Adapter)
    }

    pub fn read_stream(&self, path: &str) -> FsResult<Box<dyn Read + Send>, A> {
        let path = Self::normalize(path)?;
        self.adapter
            .read_stream(&path)
            .map_err(FilesystemError::Adapter)
    }

    pub fn has(&self, path: &str) -> FsResult<bool, A> {
        let path = Self::normalize(path)?;
        if path.is_empty() {
            return Ok(false);
        }
        self.adapter.has(&path).map_err(FilesystemError::Adapter)
    }

    pub fn delete(&self, path: &str) -> FsResult<(), A> {
        let path = Self::normalize(path)?;
        self.adapter.delete(&path).map_err(FilesystemError::Adapter)
    }

    pub fn delete_dir(&self, dirname: &str) -> FsResult<(), A> {
        let dirname = Self::normalize(dirname)?;
        if dirname.is_empty() {
            return Err(FilesystemError::RootViolation);
        }
        self.adapter
            .delete_dir(&dirname)
            .map_err(FilesystemError::Adapter)
    }

    pub fn create_dir(&self, dirname: &str, config: &Config) -> FsResult<(), A> {
        let dirname = Self::normalize(dirname)?;
        self.adapter
            .create_dir(&dirname, &self.config.merge(config))
            .map_err(FilesystemError::Adapter)
    }

    pub fn rename(&self, path: &str, new_path: &str) -> FsResult<(), A> {
        let path = Self::normalize(path)?;
        let new_path = Self::normalize(new_path)?;
        self.adapter
            .rename(&path, &new_path)
            .map_err(FilesystemError::Adapter)
    }

    pub fn copy(&self, path: &str, new_path: &str) -> FsResult<(), A> {
        let path = Self::normalize(path)?;
        let new_path = Self::normalize(new_path)?;
        self.adapter
            .copy(&path, &new_path)
            .map_err(FilesystemError::Adapter)
    }

    /// Entries come back in the order the adapter produced them.
    pub fn list_contents(&self, directory: &str, recursive: bool) -> FsResult<Vec<Entry>, A> {
        let directory = Self::normalize(directory)?;
        self.adapter
            .list_contents(&directory, recursive)
            .map_err(FilesystemError::Adapter)
    }

    pub fn get_metadata(&self, path: &str) -> FsResult<Metadata, A> {
        let path = Self::normalize(path)?;
        self.adapter
            .get_metadata(&path)
            .map_err(FilesystemError::Adapter)
    }

    pub fn get_size(&self, path: &str) -> FsResult<u64, A> {
        let path = Self::normalize(path)?;
        self.adapter.get_size(&path).map_err(FilesystemError::Adapter)
    }

    pub fn get_mimetype(&self, path: &str) -> FsResult<Option<String>, A> {
        let path = Self::normalize(path)?;
        self.adapter
            .get_mimetype(&path)
            .map_err(FilesystemError::Adapter)
    }

    pub fn get_timestamp(&self, path: &str) -> FsResult<i64, A> {
        let path = Self::normalize(path)?;
        self.adapter
            .get_timestamp(&path)
            .map_err(FilesystemError::Adapter)
    }

    pub fn get_visibility(&self, path: &str) -> FsResult<Visibility, A> {
        let path = Self::normalize(path)?;
        self.adapter
            .get_visibility(&path)
            .map_err(FilesystemError::Adapter)
    }

    pub fn set_visibility(&self, path: &str, visibility: Visibility) -> FsResult<(), A> {
        let path = Self::normalize(path)?;
        self.adapter
            .set_visibility(&path, visibility)
            .map_err(FilesystemError::Adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/a/./b//c").unwrap(), "a/b/c");
        assert_eq!(normalize_path("a/b/../c").unwrap(), "a/c");
        assert_eq!(normalize_path("a\\b").unwrap(), "a/b");
        assert_eq!(normalize_path("dir/").unwrap(), "dir");
        assert_eq!(normalize_path("").unwrap(), "");
    }

    #[test]
    fn test_normalize_path_rejects_escape() {
        assert_eq!(normalize_path("../etc/passwd").unwrap_err(), "../etc/passwd");
        assert!(normalize_path("a/../../b").is_err());
    }
}
