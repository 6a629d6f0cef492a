use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use anyhow::{Result, anyhow, bail};
use bytes::Bytes;
use pictalk_types::models::Picto;
use uuid::Uuid;

use crate::blob::BlobStore;
use crate::error::{StoreError, StoreResult};
use crate::store::{NewPicto, PictoFilter, TreeStore};

/// HashMap-backed tree store for tests and embedding.
#[derive(Default)]
pub struct InMemoryTreeStore {
    pictos: RwLock<HashMap<Uuid, Picto>>,
}

impl InMemoryTreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records across all users.
    pub fn len(&self) -> usize {
        self.pictos.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.pictos
            .read()
            .map(|m| m.contains_key(&id))
            .unwrap_or(false)
    }

    /// Insert a fully-formed record, bypassing id assignment.
    pub fn insert(&self, picto: Picto) -> StoreResult<()> {
        let mut map = self.pictos.write().map_err(poisoned)?;
        if map.contains_key(&picto.id) {
            return Err(StoreError::Constraint(format!("duplicate picto id {}", picto.id)));
        }
        map.insert(picto.id, picto);
        Ok(())
    }
}

impl TreeStore for InMemoryTreeStore {
    fn create(&self, record: NewPicto) -> StoreResult<Picto> {
        let picto = record.into_picto(Uuid::new_v4());
        self.insert(picto.clone())?;
        Ok(picto)
    }

    fn find_one(&self, filter: &PictoFilter) -> StoreResult<Option<Picto>> {
        let map = self.pictos.read().map_err(poisoned)?;
        Ok(map.values().find(|p| filter.matches(p)).cloned())
    }

    fn find_many(&self, filter: &PictoFilter) -> StoreResult<Vec<Picto>> {
        let map = self.pictos.read().map_err(poisoned)?;
        Ok(map.values().filter(|p| filter.matches(p)).cloned().collect())
    }

    fn update(&self, picto: &Picto) -> StoreResult<usize> {
        let mut map = self.pictos.write().map_err(poisoned)?;
        match map.get_mut(&picto.id) {
            Some(existing) if existing.user_id == picto.user_id => {
                existing.speech = picto.speech.clone();
                existing.meaning = picto.meaning.clone();
                existing.folder = picto.folder;
                existing.father_id = picto.father_id;
                existing.path = picto.path.clone();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn delete_one(&self, id: Uuid, user_id: Uuid) -> StoreResult<usize> {
        let mut map = self.pictos.write().map_err(poisoned)?;
        if map.get(&id).is_some_and(|p| p.user_id == user_id) {
            map.remove(&id);
            Ok(1)
        } else {
            Ok(0)
        }
    }

    fn delete_many(&self, filter: &PictoFilter) -> StoreResult<usize> {
        let mut map = self.pictos.write().map_err(poisoned)?;
        let before = map.len();
        map.retain(|_, p| !filter.matches(p));
        Ok(before - map.len())
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {}", e))
}

/// In-memory blob store that keeps a log of every removal it was asked for.
pub struct InMemoryBlobStore {
    buckets: HashSet<String>,
    objects: RwLock<HashMap<String, Bytes>>,
    removals: Mutex<Vec<String>>,
    fail_removals: AtomicBool,
}

impl InMemoryBlobStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            buckets: HashSet::from([bucket.to_string()]),
            objects: RwLock::new(HashMap::new()),
            removals: Mutex::new(Vec::new()),
            fail_removals: AtomicBool::new(false),
        }
    }

    /// A store where no bucket exists.
    pub fn without_buckets() -> Self {
        Self {
            buckets: HashSet::new(),
            ..Self::new("")
        }
    }

    /// Make every subsequent `remove` fail after recording the attempt.
    pub fn set_fail_removals(&self, fail: bool) {
        self.fail_removals.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects
            .read()
            .map(|m| m.contains_key(key))
            .unwrap_or(false)
    }

    /// Keys passed to `remove`, in call order.
    pub fn removals(&self) -> Vec<String> {
        self.removals.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl BlobStore for InMemoryBlobStore {
    async fn exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.buckets.contains(bucket))
    }

    async fn put(&self, key: &str, content: Bytes) -> Result<()> {
        self.objects
            .write()
            .map_err(|e| anyhow!("Blob lock poisoned: {}", e))?
            .insert(key.to_string(), content);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.removals
            .lock()
            .map_err(|e| anyhow!("Blob lock poisoned: {}", e))?
            .push(key.to_string());
        if self.fail_removals.load(Ordering::SeqCst) {
            bail!("Simulated failure removing {}", key);
        }
        self.objects
            .write()
            .map_err(|e| anyhow!("Blob lock poisoned: {}", e))?
            .remove(key);
        Ok(())
    }
}
