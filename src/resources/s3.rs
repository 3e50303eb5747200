use std::error::Error as StdError;

use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{retry::RetryConfig, timeout::TimeoutConfig, Region},
    error::{ProvideErrorMetadata, SdkError},
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client,
};
use bytes::Bytes;
use tokio::runtime::Runtime;

use super::backend::{BackendError, BackendErrorKind, StorageBackend};
use crate::config::ClientConfig;

/// Region in which S3 rejects an explicit location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// [`StorageBackend`] over the AWS S3 API (or anything speaking it).
///
/// The SDK is async; each call is driven to completion on a current-thread
/// runtime owned by this backend, so callers simply block. Building one
/// from inside another tokio runtime fails; do not move it into one either.
pub struct S3Backend {
    client: Client,
    runtime: Runtime,
}

impl S3Backend {
    /// Create an `S3Backend` with the AWS configuration loaded from the
    /// environment, overridden by `config`.
    ///
    /// SDK retries are disabled: a failed request surfaces immediately and
    /// the caller decides whether to try again.
    pub fn new(config: &ClientConfig) -> Result<Self, BackendError> {
        let runtime = build_runtime()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint_url) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let sdk_config = runtime.block_on(loader.load());

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .retry_config(RetryConfig::disabled())
            .force_path_style(config.force_path_style);
        if let Some(timeout) = config.request_timeout {
            s3_config_builder = s3_config_builder
                .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());
        }
        let client = Client::from_conf(s3_config_builder.build());

        tracing::debug!(
            region = %config.region,
            endpoint_url = ?config.endpoint_url,
            force_path_style = config.force_path_style,
            "Built S3 client"
        );
        Ok(Self { client, runtime })
    }

    /// Create an `S3Backend` around an already configured SDK `client`.
    pub fn from_client(client: Client) -> Result<Self, BackendError> {
        Ok(Self {
            client,
            runtime: build_runtime()?,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn build_runtime() -> Result<Runtime, BackendError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(BackendError::new(
            BackendErrorKind::Other,
            "S3Backend blocks the calling thread and cannot be built inside a tokio runtime",
        ));
    }
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| BackendError::new(BackendErrorKind::Other, err))
}

impl StorageBackend for S3Backend {
    fn head_bucket(&self, bucket: &str) -> Result<bool, BackendError> {
        let response = self
            .runtime
            .block_on(self.client.head_bucket().bucket(bucket).send());
        match response {
            Ok(_) => Ok(true),
            Err(sdk_err) => {
                let err = classify(sdk_err);
                match err.kind() {
                    BackendErrorKind::NotFound | BackendErrorKind::BucketNotFound => Ok(false),
                    _ => Err(err),
                }
            }
        }
    }

    fn create_bucket(&self, bucket: &str, region: &str) -> Result<(), BackendError> {
        let mut create_bucket_request = self.client.create_bucket().bucket(bucket);
        if region != DEFAULT_REGION {
            create_bucket_request = create_bucket_request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }
        self.runtime
            .block_on(create_bucket_request.send())
            .map_err(classify)?;
        Ok(())
    }

    fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), BackendError> {
        let put_object_request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body));
        self.runtime
            .block_on(put_object_request.send())
            .map_err(classify)?;
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, BackendError> {
        let get_object_request = self.client.get_object().bucket(bucket).key(key);
        self.runtime.block_on(async {
            let response = get_object_request.send().await.map_err(classify)?;
            let aggregated = response
                .body
                .collect()
                .await
                .map_err(|err| BackendError::new(BackendErrorKind::Unavailable, err))?;
            Ok(aggregated.into_bytes())
        })
    }
}

/// Sort an SDK failure by what a caller can do about it.
fn classify<E>(sdk_err: SdkError<E>) -> BackendError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
{
    let kind = match &sdk_err {
        SdkError::TimeoutError(_) => BackendErrorKind::TimedOut,
        SdkError::DispatchFailure(failure) if failure.is_timeout() => BackendErrorKind::TimedOut,
        SdkError::DispatchFailure(_) => BackendErrorKind::Unreachable,
        SdkError::ResponseError(_) => BackendErrorKind::Unavailable,
        SdkError::ServiceError(svc_err) => {
            service_error_kind(svc_err.raw().status().as_u16(), svc_err.err().code())
        }
        _ => BackendErrorKind::Other,
    };
    BackendError::new(kind, sdk_err)
}

/// HEAD responses carry no body, so the status code is often all there is
/// to go on; the error code wins when it is more specific.
fn service_error_kind(status: u16, code: Option<&str>) -> BackendErrorKind {
    match (status, code) {
        (_, Some("BucketAlreadyOwnedByYou")) => BackendErrorKind::AlreadyOwned,
        (_, Some("SlowDown" | "Throttling" | "ThrottlingException" | "RequestLimitExceeded"))
        | (429, _) => BackendErrorKind::Throttled,
        (_, Some("NoSuchBucket")) => BackendErrorKind::BucketNotFound,
        (404, _) | (_, Some("NoSuchKey" | "NotFound")) => BackendErrorKind::NotFound,
        (403, _) | (_, Some("AccessDenied")) => BackendErrorKind::PermissionDenied,
        (409, _) => BackendErrorKind::Conflict,
        (500..=599, _) => BackendErrorKind::Unavailable,
        _ => BackendErrorKind::Other,
    }
}
