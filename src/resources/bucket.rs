use super::{
    backend::{BackendErrorKind, StorageBackend},
    s3::S3Backend,
};
use crate::{
    config::ClientConfig,
    error::{Error, Result},
};

/// What a bucket probe found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketStatus {
    Exists,
    Missing,
}

/// A client bound to a single bucket.
///
/// Construction guarantees the bucket exists: it is either found, created
/// (when [`ClientConfig::create_if_missing`] is set), or construction fails.
/// Each operation afterwards is a single request against the backend; the
/// client caches nothing.
pub struct BucketClient<B = S3Backend> {
    config: ClientConfig,
    backend: B,
}

impl BucketClient<S3Backend> {
    /// Connect to S3 in `region` with default settings, creating `bucket`
    /// if it does not exist yet.
    pub fn new(region: impl Into<String>, bucket: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig::new(region, bucket))
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let backend = S3Backend::new(&config)
            .map_err(|source| Error::from_backend(&config.region, &config.bucket, None, source))?;
        Self::with_backend(config, backend)
    }
}

impl<B: StorageBackend> BucketClient<B> {
    pub fn with_backend(config: ClientConfig, backend: B) -> Result<Self> {
        let client = Self { config, backend };
        client.ensure_bucket()?;
        Ok(client)
    }

    fn ensure_bucket(&self) -> Result<()> {
        let (region, bucket) = (self.region(), self.bucket());
        let exists = self.backend.head_bucket(bucket).map_err(|source| {
            tracing::warn!(bucket, region, error = %source, "Bucket probe failed");
            Error::from_backend(region, bucket, None, source)
        })?;
        if exists {
            tracing::debug!(bucket, region, "Bucket already exists");
            return Ok(());
        }
        if !self.config.create_if_missing {
            return Err(Error::NotFound {
                bucket: bucket.to_owned(),
                key: None,
            });
        }

        match self.backend.create_bucket(bucket, region) {
            Ok(()) => {
                tracing::info!(bucket, region, "Created bucket");
                Ok(())
            }
            // Another client won the race to create it.
            Err(err) if err.kind() == BackendErrorKind::AlreadyOwned => {
                tracing::debug!(bucket, region, "Bucket created concurrently");
                Ok(())
            }
            Err(source) => {
                tracing::warn!(bucket, region, error = %source, "Bucket creation failed");
                Err(Error::BucketCreation {
                    bucket: bucket.to_owned(),
                    region: region.to_owned(),
                    source,
                })
            }
        }
    }

    /// Probe the bucket with a metadata-only request.
    ///
    /// Only a "not found" answer yields [`BucketStatus::Missing`]; a denied
    /// probe is [`Error::PermissionDenied`] rather than a missing bucket.
    pub fn bucket_status(&self) -> Result<BucketStatus> {
        match self.backend.head_bucket(self.bucket()) {
            Ok(true) => Ok(BucketStatus::Exists),
            Ok(false) => Ok(BucketStatus::Missing),
            Err(source) => Err(Error::from_backend(self.region(), self.bucket(), None, source)),
        }
    }

    pub fn is_bucket_created(&self) -> Result<bool> {
        Ok(self.bucket_status()? == BucketStatus::Exists)
    }

    pub fn region(&self) -> &str {
        &self.config.region
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
