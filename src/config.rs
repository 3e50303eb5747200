use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings fixed for the lifetime of a [`BucketClient`](crate::BucketClient).
///
/// Credentials are not part of this: the S3 backend picks them up from the
/// standard AWS environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub region: String,
    pub bucket: String,
    /// Create the bucket during construction when the probe finds it absent.
    pub create_if_missing: bool,
    /// Upper bound on each backend request. `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,
    /// Custom endpoint, e.g. a local S3-compatible service.
    pub endpoint_url: Option<String>,
    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`.
    pub force_path_style: bool,
}

impl ClientConfig {
    pub fn new(region: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            bucket: bucket.into(),
            create_if_missing: true,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            endpoint_url: None,
            force_path_style: false,
        }
    }

    pub fn with_create_if_missing(mut self, create_if_missing: bool) -> Self {
        self.create_if_missing = create_if_missing;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn with_force_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = force_path_style;
        self
    }
}
