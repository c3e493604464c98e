use crate::types::{Config, Entry, Metadata, Visibility, WriteReceipt};
use std::io::{Cursor, Read};

/// Backend-facing side of the filesystem abstraction.
///
/// Every path an adapter receives is logical: already normalized by the
/// [`Filesystem`](crate::Filesystem), not yet scoped to the backend's prefix.
pub trait Adapter {
    type Error: std::error::Error + From<std::io::Error> + Send + Sync + 'static;

    fn write(&self, path: &str, contents: &[u8], config: &Config)
        -> Result<WriteReceipt, Self::Error>;

    /// Buffers the whole stream, then writes it in one call.
    fn write_stream(
        &self,
        path: &str,
        reader: &mut dyn Read,
        config: &Config,
    ) -> Result<WriteReceipt, Self::Error> {
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents)?;
        self.write(path, &contents, config)
    }

    fn update(&self, path: &str, contents: &[u8], config: &Config)
        -> Result<WriteReceipt, Self::Error>;

    fn update_stream(
        &self,
        path: &str,
        reader: &mut dyn Read,
        config: &Config,
    ) -> Result<WriteReceipt, Self::Error> {
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents)?;
        self.update(path, &contents, config)
    }

    fn rename(&self, path: &str, new_path: &str) -> Result<(), Self::Error>;

    fn copy(&self, path: &str, new_path: &str) -> Result<(), Self::Error>;

    fn delete(&self, path: &str) -> Result<(), Self::Error>;

    /// Delete a directory and everything below it.
    fn delete_dir(&self, dirname: &str) -> Result<(), Self::Error>;

    fn create_dir(&self, dirname: &str, config: &Config) -> Result<(), Self::Error>;

    fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<(), Self::Error>;

    fn has(&self, path: &str) -> Result<bool, Self::Error>;

    fn read(&self, path: &str) -> Result<Vec<u8>, Self::Error>;

    fn read_stream(&self, path: &str) -> Result<Box<dyn Read + Send>, Self::Error> {
        Ok(Box::new(Cursor::new(self.read(path)?)))
    }

    /// List a directory. With `recursive`, every sub-directory's contents
    /// follow its own entry, depth first.
    fn list_contents(&self, directory: &str, recursive: bool) -> Result<Vec<Entry>, Self::Error>;

    fn get_metadata(&self, path: &str) -> Result<Metadata, Self::Error>;

    fn get_size(&self, path: &str) -> Result<u64, Self::Error> {
        Ok(self.get_metadata(path)?.size)
    }

    fn get_mimetype(&self, path: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.get_metadata(path)?.mimetype)
    }

    fn get_timestamp(&self, path: &str) -> Result<i64, Self::Error> {
        Ok(self.get_metadata(path)?.timestamp)
    }

    fn get_visibility(&self, path: &str) -> Result<Visibility, Self::Error>;
}
