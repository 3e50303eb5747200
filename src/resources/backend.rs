use std::{error::Error as StdError, fmt};

use bytes::Bytes;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The storage service a [`BucketClient`](crate::BucketClient) talks to.
///
/// Every method is a single blocking request. Implementations report
/// failures as a [`BackendError`] whose kind says what went wrong, never
/// retry on their own, and keep no state about objects beyond what the
/// service itself holds.
pub trait StorageBackend: Send {
    /// Probe `bucket` without touching its contents. `Ok(false)` means the
    /// service reported the bucket as not found; a denied probe is an error.
    fn head_bucket(&self, bucket: &str) -> Result<bool, BackendError>;

    /// Create `bucket` in `region`.
    fn create_bucket(&self, bucket: &str, region: &str) -> Result<(), BackendError>;

    /// Store `body` under `key`, replacing whatever was there.
    fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), BackendError>;

    /// Fetch the full body stored under `key`.
    fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum BackendErrorKind {
    /// The key does not exist.
    NotFound,
    /// The bucket itself does not exist.
    BucketNotFound,
    /// The caller may not access the bucket or key.
    PermissionDenied,
    /// Bucket creation found the bucket already owned by the caller.
    AlreadyOwned,
    /// The request conflicts with state owned by someone else, e.g. a
    /// bucket name taken by another account.
    Conflict,
    /// The service could not be reached at all.
    Unreachable,
    TimedOut,
    Throttled,
    /// The service answered with a server-side failure.
    Unavailable,
    /// The response arrived but its content was unusable.
    InvalidData,
    Other,
}

impl BackendErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Unreachable | Self::TimedOut | Self::Throttled | Self::Unavailable
        )
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::BucketNotFound => "bucket not found",
            Self::PermissionDenied => "permission denied",
            Self::AlreadyOwned => "already owned",
            Self::Conflict => "conflict",
            Self::Unreachable => "unreachable",
            Self::TimedOut => "timed out",
            Self::Throttled => "throttled",
            Self::Unavailable => "unavailable",
            Self::InvalidData => "invalid data",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed backend request: what kind of failure it was, plus the
/// underlying cause as reported by the backend.
#[derive(Debug)]
pub struct BackendError {
    kind: BackendErrorKind,
    source: BoxError,
}

impl BackendError {
    pub fn new<E>(kind: BackendErrorKind, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> BackendErrorKind {
        self.kind
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Unwrap the cause this error was built from.
    pub fn into_inner(self) -> BoxError {
        self.source
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.source)
    }
}

impl StdError for BackendError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.source)
    }
}
