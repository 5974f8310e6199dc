//! Object storage for deployed model bundles

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use tracing::{debug, info};

use crate::config::constants::{AWS_ACCESS_KEY_ID_ENV_KEY, AWS_SECRET_ACCESS_KEY_ENV_KEY};
use crate::error::{ChurnError, Result};

/// Bucket/key blob storage. Implementors only resolve a bucket to an
/// [`ObjectStore`]; the operations are shared.
#[async_trait]
pub trait ModelStorage: Send + Sync {
    fn bucket(&self, name: &str) -> Result<Arc<dyn ObjectStore>>;

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let store = self.bucket(bucket)?;
        match store.head(&ObjectPath::from(key)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        let size = bytes.len();
        let store = self.bucket(bucket)?;
        store.put(&ObjectPath::from(key), PutPayload::from(bytes)).await?;
        info!(bucket, key, size, "Uploaded object");
        Ok(())
    }

    async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let store = self.bucket(bucket)?;
        let bytes = store.get(&ObjectPath::from(key)).await?.bytes().await?;
        debug!(bucket, key, size = bytes.len(), "Downloaded object");
        Ok(bytes.to_vec())
    }
}

fn lock_error<T>(_: std::sync::PoisonError<T>) -> ChurnError {
    ChurnError::Internal("bucket cache lock poisoned".to_string())
}

/// Amazon S3 storage, credentials from the environment
pub struct S3ModelStorage {
    region: String,
    access_key_id: String,
    secret_access_key: String,
    buckets: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl S3ModelStorage {
    pub fn from_env(region: &str) -> Result<Self> {
        let access_key_id = std::env::var(AWS_ACCESS_KEY_ID_ENV_KEY)
            .map_err(|_| ChurnError::MissingEnvVar(AWS_ACCESS_KEY_ID_ENV_KEY.to_string()))?;
        let secret_access_key = std::env::var(AWS_SECRET_ACCESS_KEY_ENV_KEY)
            .map_err(|_| ChurnError::MissingEnvVar(AWS_SECRET_ACCESS_KEY_ENV_KEY.to_string()))?;
        Ok(Self {
            region: region.to_string(),
            access_key_id,
            secret_access_key,
            buckets: Mutex::new(HashMap::new()),
        })
    }
}

impl ModelStorage for S3ModelStorage {
    fn bucket(&self, name: &str) -> Result<Arc<dyn ObjectStore>> {
        let mut buckets = self.buckets.lock().map_err(lock_error)?;
        if let Some(store) = buckets.get(name) {
            return Ok(Arc::clone(store));
        }
        let store: Arc<dyn ObjectStore> = Arc::new(
            AmazonS3Builder::new()
                .with_region(&self.region)
                .with_bucket_name(name)
                .with_access_key_id(&self.access_key_id)
                .with_secret_access_key(&self.secret_access_key)
                .build()?,
        );
        buckets.insert(name.to_string(), Arc::clone(&store));
        Ok(store)
    }
}

/// One directory per bucket under `root`
pub struct LocalModelStorage {
    root: PathBuf,
}

impl LocalModelStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ModelStorage for LocalModelStorage {
    fn bucket(&self, name: &str) -> Result<Arc<dyn ObjectStore>> {
        let dir = self.root.join(name);
        std::fs::create_dir_all(&dir)?;
        Ok(Arc::new(LocalFileSystem::new_with_prefix(dir)?))
    }
}

/// Buckets kept in process memory
#[derive(Default)]
pub struct InMemoryModelStorage {
    buckets: Mutex<HashMap<String, Arc<InMemory>>>,
}

impl InMemoryModelStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelStorage for InMemoryModelStorage {
    fn bucket(&self, name: &str) -> Result<Arc<dyn ObjectStore>> {
        let mut buckets = self.buckets.lock().map_err(lock_error)?;
        let store = buckets
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(InMemory::new()));
        Ok(Arc::clone(store) as Arc<dyn ObjectStore>)
    }
}
