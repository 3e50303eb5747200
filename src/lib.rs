//! A blocking client for a single bucket of an S3-compatible object store.
//!
//! [`BucketClient`] makes sure its bucket exists when it is built, then
//! writes and reads whole objects by key. Object bodies are opaque bytes and
//! come back exactly as they were written.
//!
//! ```no_run
//! use bucket_client::BucketClient;
//!
//! let client = BucketClient::new("us-east-1", "my-bucket")?;
//! client.save_object("home", r#"{"a":1}"#)?;
//! assert_eq!(client.load_object("home")?, r#"{"a":1}"#);
//! # Ok::<(), bucket_client::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod resources;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use resources::{
    backend::{BackendError, BackendErrorKind, BoxError, StorageBackend},
    bucket::{BucketClient, BucketStatus},
    memory::MemoryBackend,
    s3::S3Backend,
};
