use bytes::Bytes;

use super::{
    backend::{BackendError, BackendErrorKind, StorageBackend},
    bucket::BucketClient,
};
use crate::error::{Error, Result};

impl<B: StorageBackend> BucketClient<B> {
    /// Write `body` under `key`, replacing any existing object.
    pub fn save_object(&self, key: &str, body: impl Into<Bytes>) -> Result<()> {
        let body = body.into();
        let bytes = body.len();
        self.backend()
            .put_object(self.bucket(), key, body)
            .map_err(|source| self.object_error(key, source))?;

        tracing::debug!(
            log_type = "BucketClient",
            category = "put_object",
            bucket = self.bucket(),
            key,
            bytes,
            "Saved object"
        );
        Ok(())
    }

    /// Read the full body stored under `key`, exactly as it was written.
    pub fn load_object(&self, key: &str) -> Result<Bytes> {
        let body = self
            .backend()
            .get_object(self.bucket(), key)
            .map_err(|source| self.object_error(key, source))?;

        tracing::debug!(
            log_type = "BucketClient",
            category = "get_object",
            bucket = self.bucket(),
            key,
            bytes = body.len(),
            "Loaded object"
        );
        Ok(body)
    }

    /// [`load_object`](Self::load_object) for objects holding UTF-8 text.
    /// The text is returned as stored; invalid UTF-8 is an error.
    pub fn load_object_text(&self, key: &str) -> Result<String> {
        let body = self.load_object(key)?;
        String::from_utf8(body.into()).map_err(|err| Error::Backend {
            bucket: self.bucket().to_owned(),
            key: Some(key.to_owned()),
            source: BackendError::new(BackendErrorKind::InvalidData, err),
        })
    }

    fn object_error(&self, key: &str, source: BackendError) -> Error {
        if !matches!(
            source.kind(),
            BackendErrorKind::NotFound | BackendErrorKind::BucketNotFound
        ) {
            tracing::warn!(bucket = self.bucket(), key, error = %source, "Object request failed");
        }
        Error::from_backend(self.region(), self.bucket(), Some(key), source)
    }
}
