//! Typed record use cases over an owned storage handle.
//!
//! # Responsibility
//! - Create, load, list, count and destroy entities of one type at a time.
//! - Own the storage handle whose lifecycle the entry point controls.
//!
//! # Invariants
//! - Loaded records are always rebuilt through `Entity::rehydrate`.
//! - Storage errors are passed through unchanged inside `ServiceError`.

use crate::model::base_record::RecordError;
use crate::model::entity::Entity;
use crate::storage::{RecordKey, Storage, StorageError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    /// A stored record could not be rebuilt.
    Record(RecordError),
    /// Storage backend failure.
    Storage(StorageError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Record(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Record(err) => Some(err),
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<RecordError> for ServiceError {
    fn from(value: RecordError) -> Self {
        Self::Record(value)
    }
}

impl From<StorageError> for ServiceError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Use-case wrapper owning a storage backend.
pub struct RecordService<S: Storage> {
    storage: S,
}

impl<S: Storage> RecordService<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Creates and persists a fresh entity.
    pub fn create<E: Entity>(&mut self) -> ServiceResult<E> {
        let mut entity = E::create();
        entity.save(&mut self.storage)?;
        Ok(entity)
    }

    /// Persists `entity`, bumping its `updated_at`.
    pub fn save<E: Entity>(&mut self, entity: &mut E) -> ServiceResult<()> {
        entity.save(&mut self.storage)?;
        Ok(())
    }

    /// Loads one entity by id.
    pub fn get<E: Entity>(&self, id: &str) -> ServiceResult<Option<E>> {
        let key = RecordKey::new(E::type_name(), id);
        match self.storage.lookup(&key)? {
            Some(fields) => Ok(Some(E::rehydrate(fields)?)),
            None => Ok(None),
        }
    }

    /// Loads every stored entity of type `E`.
    pub fn all<E: Entity>(&self) -> ServiceResult<Vec<E>> {
        self.storage
            .all(Some(E::type_name()))?
            .into_iter()
            .map(|(_, fields)| E::rehydrate(fields).map_err(ServiceError::from))
            .collect()
    }

    pub fn count<E: Entity>(&self) -> ServiceResult<usize> {
        Ok(self.storage.count(Some(E::type_name()))?)
    }

    /// Removes the entity with `id`.
    ///
    /// Returns `false` when no such entity is stored.
    pub fn destroy<E: Entity>(&mut self, id: &str) -> ServiceResult<bool> {
        let Some(entity) = self.get::<E>(id)? else {
            return Ok(false);
        };
        entity.delete(&mut self.storage)?;
        Ok(true)
    }
}
