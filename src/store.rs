//! Local key/value store
//!
//! A small fjall keyspace holding postcard-encoded values: the onboarding
//! flag and the community readings. Every fjall call runs on the blocking
//! pool.

use crate::Result;
use fjall::Keyspace;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;
use std::path::Path;
use tokio::task;

/// Key marking that the onboarding message has been shown
pub const SEEN_KEY: &str = "canopy_seen";

pub struct LocalStore {
    store: Keyspace,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

impl LocalStore {
    /// Open (or create) the store under `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let items = db.keyspace("canopy", fjall::KeyspaceCreateOptions::default)?;
        Ok(LocalStore { store: items })
    }

    #[tracing::instrument(name = "put_store", level = "debug", skip(self))]
    pub async fn put<T: Serialize + Send + Debug + 'static>(&self, key: &str, value: T) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        let bytes = postcard::to_stdvec(&value)?;

        task::spawn_blocking(move || store.insert(key, bytes)).await??;
        Ok(())
    }

    /// Returns `None` when the key is absent
    #[tracing::instrument(name = "query_store", level = "debug", skip(self))]
    pub async fn get<T: DeserializeOwned + Send + 'static>(&self, key: &str) -> Result<Option<T>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes = task::spawn_blocking(move || get_from_store(store, key_bytes)).await??;

        match maybe_bytes {
            Some(bytes) => Ok(Some(postcard::from_bytes(&bytes)?)),
            None => {
                tracing::debug!("Key not found");
                Ok(None)
            }
        }
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        let key = key.as_bytes().to_vec();
        let store = self.store.clone();
        task::spawn_blocking(move || store.remove(key)).await??;
        Ok(())
    }

    /// True exactly once per store: the first call records the seen flag.
    pub async fn first_run(&self) -> Result<bool> {
        if self.get::<bool>(SEEN_KEY).await?.unwrap_or(false) {
            return Ok(false);
        }
        self.put(SEEN_KEY, true).await?;
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// Fresh directory per test so parallel tests never share a keyspace
    pub(crate) fn temp_store_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "canopy-test-{}-{}-{}",
            name,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let store = LocalStore::open(temp_store_dir("kv")).unwrap();
        assert_eq!(store.get::<u32>("answer").await.unwrap(), None);

        store.put("answer", 42u32).await.unwrap();
        assert_eq!(store.get::<u32>("answer").await.unwrap(), Some(42));

        store.remove("answer").await.unwrap();
        assert_eq!(store.get::<u32>("answer").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_first_run_only_once() {
        let store = LocalStore::open(temp_store_dir("seen")).unwrap();
        assert!(store.first_run().await.unwrap());
        assert!(!store.first_run().await.unwrap());
    }
}
