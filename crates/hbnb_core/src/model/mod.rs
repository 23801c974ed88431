//! Record model shared by every persisted entity type.
//!
//! # Responsibility
//! - Define identity, timestamps and the serialized field layout.
//! - Keep entity definitions independent from any storage backend.
//!
//! # Invariants
//! - Every record is identified by a non-empty string `id`.
//! - The serialized layout always carries `__class__`, `id`, `created_at`
//!   and `updated_at`.

pub mod base_record;
pub mod entity;
pub mod field;
pub mod timestamp;
