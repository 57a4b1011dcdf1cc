//! The in-memory key/value map.
//!
//! A single mutex guards the whole map. Reads and writes are serialized
//! against each other, so no caller ever observes a half-applied mutation.
//! The lock is never held across an `.await` or while touching the disk.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::observability::metrics;
use crate::store::StoreError;

/// Thread-safe string to string map.
#[derive(Debug, Default)]
pub struct KeyStore {
    keys: Mutex<HashMap<String, String>>,
}

impl KeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the map half-written
    // (every critical section is a single map call), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Look up several keys at once. Missing keys are left out of the result.
    pub fn get_many<I, S>(&self, keys: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let map = self.lock();
        keys.into_iter()
            .filter_map(|key| {
                let key = key.as_ref();
                map.get(key).map(|value| (key.to_string(), value.clone()))
            })
            .collect()
    }

    /// Unconditional upsert.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let len = {
            let mut map = self.lock();
            map.insert(key.into(), value.into());
            map.len()
        };
        metrics::record_store_size(len);
    }

    /// Insert only when `key` is absent. Returns whether the value was stored.
    pub fn insert_if_absent(&self, key: &str, value: &str) -> bool {
        let len = {
            let mut map = self.lock();
            if map.contains_key(key) {
                return false;
            }
            map.insert(key.to_string(), value.to_string());
            map.len()
        };
        metrics::record_store_size(len);
        true
    }

    /// Replace the value only when `key` is present. Returns whether it did.
    pub fn update_if_present(&self, key: &str, value: &str) -> bool {
        match self.lock().get_mut(key) {
            Some(slot) => {
                *slot = value.to_string();
                true
            }
            None => false,
        }
    }

    /// Remove `key`. A missing key is a no-op; returns whether anything was removed.
    pub fn delete(&self, key: &str) -> bool {
        let (removed, len) = {
            let mut map = self.lock();
            let removed = map.remove(key).is_some();
            (removed, map.len())
        };
        if removed {
            metrics::record_store_size(len);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Owned copy of the current contents.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.lock().clone()
    }

    /// Replace the whole map with the JSON object read from `reader`.
    ///
    /// Decoding happens into a fresh map; the live map is only swapped once
    /// decoding succeeded, so a malformed snapshot leaves the store untouched.
    pub fn load_from<R: Read>(&self, reader: R) -> Result<(), StoreError> {
        let decoded: HashMap<String, String> =
            serde_json::from_reader(reader).map_err(StoreError::MalformedSnapshot)?;
        let len = decoded.len();
        *self.lock() = decoded;
        metrics::record_store_size(len);
        Ok(())
    }

    /// Serialize the whole map as a JSON object into `writer`.
    ///
    /// The lock is held for the duration of the write, so a dump never
    /// interleaves with a mutation.
    pub fn dump_to<W: Write>(&self, mut writer: W) -> Result<(), StoreError> {
        let map = self.lock();
        serde_json::to_writer(&mut writer, &*map).map_err(std::io::Error::from)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Encode the whole map into an owned buffer.
    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        let mut buf = Vec::new();
        self.dump_to(&mut buf)?;
        Ok(buf)
    }
}
