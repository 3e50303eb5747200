use std::{
    collections::{hash_map, HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bytes::Bytes;

use super::backend::{BackendError, BackendErrorKind, StorageBackend};

/// In-process [`StorageBackend`].
///
/// Clones share the same buckets, so several clients built from clones of
/// one `MemoryBackend` behave like clients of the same account. Buckets
/// registered with [`add_foreign_bucket`](Self::add_foreign_bucket) belong
/// to "someone else" and deny every request.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    buckets: HashMap<String, HashMap<String, Bytes>>,
    foreign: HashSet<String>,
    offline: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline, every request fails as unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn add_foreign_bucket(&self, name: impl Into<String>) {
        self.lock().foreign.insert(name.into());
    }

    /// Drop `name` and everything in it, as another client of the same
    /// account would.
    pub fn delete_bucket(&self, name: &str) -> bool {
        self.lock().buckets.remove(name).is_some()
    }

    pub fn bucket_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.lock().buckets.keys().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the state for a request against `bucket`, failing the way a
    /// remote service would when it is offline or the bucket is not ours.
    fn request(&self, bucket: &str) -> Result<MutexGuard<'_, State>, BackendError> {
        let state = self.lock();
        if state.offline {
            return Err(BackendError::new(
                BackendErrorKind::Unreachable,
                "memory backend is offline",
            ));
        }
        if state.foreign.contains(bucket) {
            return Err(BackendError::new(
                BackendErrorKind::PermissionDenied,
                format!("bucket '{bucket}' belongs to another owner"),
            ));
        }
        Ok(state)
    }
}

fn no_such_bucket(bucket: &str) -> BackendError {
    BackendError::new(
        BackendErrorKind::BucketNotFound,
        format!("bucket '{bucket}' does not exist"),
    )
}

impl StorageBackend for MemoryBackend {
    fn head_bucket(&self, bucket: &str) -> Result<bool, BackendError> {
        Ok(self.request(bucket)?.buckets.contains_key(bucket))
    }

    fn create_bucket(&self, bucket: &str, _region: &str) -> Result<(), BackendError> {
        let mut state = match self.request(bucket) {
            Err(err) if err.kind() == BackendErrorKind::PermissionDenied => {
                return Err(BackendError::new(
                    BackendErrorKind::Conflict,
                    format!("bucket '{bucket}' already exists"),
                ))
            }
            result => result?,
        };
        match state.buckets.entry(bucket.to_owned()) {
            hash_map::Entry::Vacant(ent) => {
                ent.insert(HashMap::new());
                Ok(())
            }
            hash_map::Entry::Occupied(_) => Err(BackendError::new(
                BackendErrorKind::AlreadyOwned,
                format!("bucket '{bucket}' is already owned by you"),
            )),
        }
    }

    fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), BackendError> {
        let mut state = self.request(bucket)?;
        let objects = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket(bucket))?;
        objects.insert(key.to_owned(), body);
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, BackendError> {
        let state = self.request(bucket)?;
        let objects = state
            .buckets
            .get(bucket)
            .ok_or_else(|| no_such_bucket(bucket))?;
        objects.get(key).cloned().ok_or_else(|| {
            BackendError::new(
                BackendErrorKind::NotFound,
                format!("object '{key}' does not exist"),
            )
        })
    }
}
