use std::{collections::HashMap, io::ErrorKind, path::PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};

use crate::{config::Config, errors::StoreError};

/// Key/value persistence for the handful of objects the chain core keeps across restarts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
    async fn remove_object(&self, key: &str) -> Result<(), StoreError>;
}

/// Reads and decodes a JSON object stored under `key`.
pub async fn get_object<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get_bytes(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Encodes `value` as JSON and stores it under `key`.
pub async fn set_object<T: Serialize + ?Sized>(
    store: &dyn ObjectStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(value)?;
    store.set_bytes(key, bytes).await
}

/// Stores one file per key in a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    pub fn new(config: &Config) -> Result<Self, StoreError> {
        match &config.data_dir {
            Some(data_dir) => Ok(Self::with_dir(data_dir.clone())),
            None => Err(StoreError::Backend("data dir not in config".to_string())),
        }
    }

    pub fn with_dir(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl ObjectStore for FileStore {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let path = self.path(key);
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, value).await?;
        tokio::fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn remove_object(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path(key)).await {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

/// Keeps objects in memory only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().contains_key(key)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.objects.lock().get(key).cloned())
    }

    async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.objects.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_object(&self, key: &str) -> Result<(), StoreError> {
        self.objects.lock().remove(key);
        Ok(())
    }
}
