use crate::resources::backend::{BackendError, BackendErrorKind};

/// Errors returned by [`BucketClient`](crate::BucketClient).
///
/// A backend that cannot be reached or does not answer in time is always
/// [`Error::Connection`], during construction or any later request.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("could not reach the storage backend for bucket {bucket} in {region}")]
    Connection {
        region: String,
        bucket: String,
        key: Option<String>,
        #[source]
        source: BackendError,
    },
    #[error("failed to create bucket {bucket} in {region}")]
    BucketCreation {
        bucket: String,
        region: String,
        #[source]
        source: BackendError,
    },
    #[error("{}", describe("not found", .bucket, .key))]
    NotFound { bucket: String, key: Option<String> },
    #[error("{}", describe("access denied", .bucket, .key))]
    PermissionDenied {
        bucket: String,
        key: Option<String>,
        #[source]
        source: BackendError,
    },
    #[error("{}", describe("backend request failed", .bucket, .key))]
    Backend {
        bucket: String,
        key: Option<String>,
        #[source]
        source: BackendError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn describe(what: &str, bucket: &str, key: &Option<String>) -> String {
    match key {
        Some(key) => format!("{what}: object {key} in bucket {bucket}"),
        None => format!("{what}: bucket {bucket}"),
    }
}

impl Error {
    /// Sort a failed bucket or object request into the variant callers
    /// match on. A missing bucket drops the key so it is not mistaken for a
    /// missing object.
    pub(crate) fn from_backend(
        region: &str,
        bucket: &str,
        key: Option<&str>,
        source: BackendError,
    ) -> Self {
        let bucket = bucket.to_owned();
        let key = key.map(str::to_owned);
        match source.kind() {
            BackendErrorKind::Unreachable | BackendErrorKind::TimedOut => Self::Connection {
                region: region.to_owned(),
                bucket,
                key,
                source,
            },
            BackendErrorKind::NotFound => Self::NotFound { bucket, key },
            BackendErrorKind::BucketNotFound => Self::NotFound { bucket, key: None },
            BackendErrorKind::PermissionDenied => Self::PermissionDenied {
                bucket,
                key,
                source,
            },
            _ => Self::Backend {
                bucket,
                key,
                source,
            },
        }
    }

    /// Whether repeating the same request later may succeed. Callers own
    /// the retry policy; nothing in this crate retries.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } => true,
            Self::BucketCreation { source, .. } | Self::Backend { source, .. } => {
                source.is_retryable()
            }
            Self::NotFound { .. } | Self::PermissionDenied { .. } => false,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The backend's classification of the failure, if one reached us.
    pub fn backend_kind(&self) -> Option<BackendErrorKind> {
        match self {
            Self::Connection { source, .. }
            | Self::BucketCreation { source, .. }
            | Self::PermissionDenied { source, .. }
            | Self::Backend { source, .. } => Some(source.kind()),
            Self::NotFound { .. } => None,
        }
    }
}
