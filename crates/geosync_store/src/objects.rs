//! Object graph store trait and the in-memory arena.

use crate::error::{StoreError, StoreResult};
use crate::object::Object;
use crate::oid::ObjectId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Content-addressable storage of commits, trees and values.
///
/// Objects are immutable: once an id is present it is never rewritten or
/// removed. Implementations must be `Send + Sync`; reads need no
/// coordination with writers because an object's content never changes.
pub trait ObjectStore: Send + Sync {
    /// Returns true if the object is present.
    fn has(&self, oid: &ObjectId) -> StoreResult<bool>;

    /// Reads an object, returning `None` if it is absent.
    fn try_get(&self, oid: &ObjectId) -> StoreResult<Option<Object>>;

    /// Writes a batch of objects in the given order.
    ///
    /// Callers that need the closure invariant (no object visible before
    /// the objects it references) must order the batch accordingly.
    /// Writing an object that already exists is a no-op.
    fn put_batch(&self, objects: &[Object]) -> StoreResult<Vec<ObjectId>>;

    /// Returns the number of stored objects.
    fn len(&self) -> StoreResult<usize>;

    /// Reads an object, failing with `ObjectNotFound` if it is absent.
    fn get(&self, oid: &ObjectId) -> StoreResult<Object> {
        self.try_get(oid)?.ok_or(StoreError::ObjectNotFound(*oid))
    }

    /// Writes a single object.
    fn put(&self, object: &Object) -> StoreResult<ObjectId> {
        let ids = self.put_batch(std::slice::from_ref(object))?;
        ids.into_iter()
            .next()
            .ok_or_else(|| StoreError::corrupted("put_batch returned no id"))
    }

    /// Returns true if the store holds no objects.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// An in-memory object arena keyed by id.
///
/// Suitable for tests and for embedding; all data is lost on drop.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, Object>>,
}

impl MemoryObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored id, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<_> = self.objects.read().keys().copied().collect();
        ids.sort();
        ids
    }
}

impl ObjectStore for MemoryObjectStore {
    fn has(&self, oid: &ObjectId) -> StoreResult<bool> {
        Ok(self.objects.read().contains_key(oid))
    }

    fn try_get(&self, oid: &ObjectId) -> StoreResult<Option<Object>> {
        Ok(self.objects.read().get(oid).cloned())
    }

    fn put_batch(&self, objects: &[Object]) -> StoreResult<Vec<ObjectId>> {
        let mut ids = Vec::with_capacity(objects.len());
        for object in objects {
            let oid = object.id()?;
            // One lock per object keeps each insert individually visible.
            self.objects
                .write()
                .entry(oid)
                .or_insert_with(|| object.clone());
            ids.push(oid);
        }
        Ok(ids)
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.objects.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Value;

    #[test]
    fn memory_store_starts_empty() {
        let store = MemoryObjectStore::new();
        assert!(store.is_empty().unwrap());
        assert!(store.ids().is_empty());
    }

    #[test]
    fn put_and_get() {
        let store = MemoryObjectStore::new();
        let object = Object::from(Value::new(b"LINESTRING(0 0, 1 1)".to_vec()));
        let oid = store.put(&object).unwrap();

        assert!(store.has(&oid).unwrap());
        assert_eq!(store.get(&oid).unwrap(), object);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn put_is_idempotent() {
        let store = MemoryObjectStore::new();
        let object = Object::from(Value::new(vec![1, 2, 3]));
        let first = store.put(&object).unwrap();
        let second = store.put(&object).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn get_missing_fails() {
        let store = MemoryObjectStore::new();
        let oid = ObjectId::digest(b"absent");
        assert!(store.try_get(&oid).unwrap().is_none());
        assert!(matches!(store.get(&oid), Err(StoreError::ObjectNotFound(id)) if id == oid));
    }

    #[test]
    fn batch_returns_ids_in_order() {
        let store = MemoryObjectStore::new();
        let a = Object::from(Value::new(b"a".to_vec()));
        let b = Object::from(Value::new(b"b".to_vec()));
        let ids = store.put_batch(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(ids, vec![a.id().unwrap(), b.id().unwrap()]);
    }
}
