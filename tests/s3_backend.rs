use std::{
    io::{Read, Write},
    net::TcpListener,
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

use aws_sdk_s3::config::{retry::RetryConfig, BehaviorVersion, Credentials, Region};
use aws_smithy_runtime::client::http::test_util::{ReplayEvent, StaticReplayClient};
use aws_smithy_types::body::SdkBody;
use bucket_client::*;

const NO_SUCH_KEY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message><Key>missing</Key></Error>"#;

const ALREADY_OWNED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>BucketAlreadyOwnedByYou</Code><Message>Your previous request to create the named bucket succeeded and you already own it.</Message></Error>"#;

const ALREADY_EXISTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>BucketAlreadyExists</Code><Message>The requested bucket name is not available.</Message></Error>"#;

const NO_SUCH_BUCKET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>NoSuchBucket</Code><Message>The specified bucket does not exist.</Message><BucketName>my-bucket</BucketName></Error>"#;

const SLOW_DOWN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>SlowDown</Code><Message>Please reduce your request rate.</Message></Error>"#;

fn event(status: u16, body: &'static str) -> ReplayEvent {
    ReplayEvent::new(
        http::Request::builder()
            .uri("https://s3.us-east-1.amazonaws.com/")
            .body(SdkBody::empty())
            .unwrap(),
        http::Response::builder()
            .status(status)
            .body(SdkBody::from(body))
            .unwrap(),
    )
}

fn sdk_client(region: &'static str, http_client: &StaticReplayClient) -> aws_sdk_s3::Client {
    let config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(region))
        .credentials_provider(Credentials::new("test", "test", None, None, "test"))
        .retry_config(RetryConfig::disabled())
        .http_client(http_client.clone())
        .build();
    aws_sdk_s3::Client::from_conf(config)
}

fn backend(region: &'static str, events: Vec<ReplayEvent>) -> (S3Backend, StaticReplayClient) {
    let http_client = StaticReplayClient::new(events);
    let backend = S3Backend::from_client(sdk_client(region, &http_client)).unwrap();
    (backend, http_client)
}

/// `S3Backend::new` resolves credentials through the standard AWS chain.
fn set_static_credentials() {
    std::env::set_var("AWS_ACCESS_KEY_ID", "test");
    std::env::set_var("AWS_SECRET_ACCESS_KEY", "test");
}

fn local_config(endpoint_url: &str) -> ClientConfig {
    ClientConfig::new("us-east-1", "my-bucket")
        .with_endpoint_url(endpoint_url)
        .with_force_path_style(true)
        .with_request_timeout(Some(Duration::from_millis(300)))
}

/// Accepts connections and never answers them.
fn stalled_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut buf = [0; 1024];
            while matches!(stream.read(&mut buf), Ok(n) if n > 0) {}
        }
    });
    format!("http://{addr}")
}

/// Answers a single request with `response`, then closes the connection.
/// The request head is sent back over the channel.
fn one_shot_endpoint(response: &'static [u8]) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut head = Vec::new();
        let mut buf = [0; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => head.extend_from_slice(&buf[..n]),
            }
        }
        tx.send(String::from_utf8_lossy(&head).into_owned()).unwrap();
        stream.write_all(response).unwrap();
    });
    (format!("http://{addr}"), rx)
}

fn sent_methods(http_client: &StaticReplayClient) -> Vec<String> {
    http_client
        .actual_requests()
        .map(|request| request.method().to_owned())
        .collect()
}

#[test]
fn creates_missing_bucket_then_round_trips() {
    let (backend, http_client) = backend(
        "us-east-1",
        vec![
            event(404, ""),
            event(200, ""),
            event(200, ""),
            event(200, r#"{"a":1}"#),
        ],
    );
    let client =
        BucketClient::with_backend(ClientConfig::new("us-east-1", "my-bucket"), backend).unwrap();
    client.save_object("home", r#"{"a":1}"#).unwrap();
    assert_eq!(client.load_object("home").unwrap(), r#"{"a":1}"#);

    assert_eq!(sent_methods(&http_client), ["HEAD", "PUT", "PUT", "GET"]);
    let create_body = http_client.actual_requests().nth(1).unwrap().body().bytes();
    assert!(create_body.unwrap_or_default().is_empty());
}

#[test]
fn location_constraint_outside_default_region() {
    let (backend, http_client) = backend("eu-west-1", vec![event(200, "")]);
    backend.create_bucket("my-bucket", "eu-west-1").unwrap();

    let request = http_client.actual_requests().next().unwrap();
    let body = std::str::from_utf8(request.body().bytes().unwrap()).unwrap();
    assert!(body.contains("<LocationConstraint>eu-west-1</LocationConstraint>"), "{body}");
}

#[test]
fn head_bucket_distinguishes_missing_from_forbidden() {
    let (backend, _) = backend("us-east-1", vec![event(404, ""), event(403, ""), event(200, "")]);
    assert!(!backend.head_bucket("b").unwrap());
    let err = backend.head_bucket("b").unwrap_err();
    assert_eq!(err.kind(), BackendErrorKind::PermissionDenied);
    assert!(backend.head_bucket("b").unwrap());
}

#[test]
fn missing_key_is_not_found() {
    let (backend, _) = backend("us-east-1", vec![event(200, ""), event(404, NO_SUCH_KEY)]);
    let client =
        BucketClient::with_backend(ClientConfig::new("us-east-1", "my-bucket"), backend).unwrap();

    let err = client.load_object("missing").unwrap_err();
    assert!(err.is_not_found(), "{err}");
}

#[test]
fn create_bucket_conflicts() {
    let (backend, _) = backend(
        "us-east-1",
        vec![event(409, ALREADY_OWNED), event(409, ALREADY_EXISTS)],
    );
    let err = backend.create_bucket("b", "us-east-1").unwrap_err();
    assert_eq!(err.kind(), BackendErrorKind::AlreadyOwned);
    let err = backend.create_bucket("b", "us-east-1").unwrap_err();
    assert_eq!(err.kind(), BackendErrorKind::Conflict);
}

#[test]
fn raced_creation_is_not_an_error() {
    let (backend, _) = backend("us-east-1", vec![event(404, ""), event(409, ALREADY_OWNED)]);
    let client =
        BucketClient::with_backend(ClientConfig::new("us-east-1", "my-bucket"), backend).unwrap();
    assert_eq!(client.bucket(), "my-bucket");
}

#[test]
fn server_failures_are_retryable() {
    let (backend, http_client) = backend(
        "us-east-1",
        vec![event(200, ""), event(503, SLOW_DOWN), event(500, "")],
    );
    let client =
        BucketClient::with_backend(ClientConfig::new("us-east-1", "my-bucket"), backend).unwrap();

    let err = client.save_object("k", "v").unwrap_err();
    assert_eq!(err.backend_kind(), Some(BackendErrorKind::Throttled));
    assert!(err.is_retryable());

    let err = client.load_object("k").unwrap_err();
    assert_eq!(err.backend_kind(), Some(BackendErrorKind::Unavailable));
    assert!(err.is_retryable());

    // One request each: nothing is retried behind the caller's back.
    assert_eq!(sent_methods(&http_client).len(), 3);
}

#[test]
fn missing_bucket_is_not_a_missing_key() {
    let (backend, _) = backend("us-east-1", vec![event(200, ""), event(404, NO_SUCH_BUCKET)]);
    let client =
        BucketClient::with_backend(ClientConfig::new("us-east-1", "my-bucket"), backend).unwrap();

    let err = client.load_object("home").unwrap_err();
    assert!(matches!(err, Error::NotFound { key: None, .. }), "{err}");
}

#[test]
fn unreachable_endpoint_fails_construction() {
    set_static_credentials();
    let err = BucketClient::with_config(local_config("http://127.0.0.1:1"))
        .err()
        .unwrap();
    assert!(matches!(err, Error::Connection { key: None, .. }), "{err}");
    assert_eq!(err.backend_kind(), Some(BackendErrorKind::Unreachable));
    assert!(err.is_retryable());
}

#[test]
fn request_timeout_applies() {
    set_static_credentials();
    let backend = S3Backend::new(&local_config(&stalled_endpoint())).unwrap();

    let started = Instant::now();
    let err = backend.get_object("my-bucket", "home").unwrap_err();
    assert_eq!(err.kind(), BackendErrorKind::TimedOut, "{err}");
    assert!(err.is_retryable());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn endpoint_and_path_style_reach_the_wire() {
    set_static_credentials();
    let (endpoint_url, requests) =
        one_shot_endpoint(b"HTTP/1.1 200 OK\r\nContent-Length: 7\r\n\r\n{\"a\":1}");
    let backend = S3Backend::new(&local_config(&endpoint_url)).unwrap();

    assert_eq!(backend.get_object("my-bucket", "home").unwrap(), r#"{"a":1}"#);
    let head = requests.recv().unwrap();
    assert!(head.starts_with("GET /my-bucket/home"), "{head}");
}

#[test]
fn truncated_body_is_unavailable() {
    set_static_credentials();
    let (endpoint_url, _requests) =
        one_shot_endpoint(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n{\"a\":1}");
    let backend = S3Backend::new(&local_config(&endpoint_url)).unwrap();

    let err = backend.get_object("my-bucket", "home").unwrap_err();
    assert_eq!(err.kind(), BackendErrorKind::Unavailable, "{err}");
    assert!(err.is_retryable());
}

#[test]
fn refuses_to_run_inside_async_runtime() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let http_client = StaticReplayClient::new(vec![]);

    let err = runtime.block_on(async {
        S3Backend::from_client(sdk_client("us-east-1", &http_client))
            .err()
            .unwrap()
    });
    assert_eq!(err.kind(), BackendErrorKind::Other);

    let err = runtime.block_on(async {
        BucketClient::with_config(ClientConfig::new("us-east-1", "my-bucket"))
            .err()
            .unwrap()
    });
    assert!(matches!(err, Error::Backend { key: None, .. }), "{err}");
    assert!(!err.is_retryable());
}

/// Needs an S3-compatible service on 127.0.0.1:9000 and credentials in the
/// environment.
#[test]
#[ignore]
fn integration_test_local_endpoint() {
    let config = ClientConfig::new("us-east-1", "bucket-client-it")
        .with_endpoint_url("http://127.0.0.1:9000")
        .with_force_path_style(true);
    let client = BucketClient::with_config(config.clone()).unwrap();
    assert!(client.is_bucket_created().unwrap());

    client.save_object("home", r#"{"a":1}"#).unwrap();
    assert_eq!(client.load_object("home").unwrap(), r#"{"a":1}"#);
    assert!(client.load_object("missing").unwrap_err().is_not_found());

    let again = BucketClient::with_config(config).unwrap();
    assert!(again.is_bucket_created().unwrap());
}
