//! Record use-case services.
//!
//! # Responsibility
//! - Orchestrate entity construction and storage calls into typed use cases.
//! - Keep CLI and other entry points decoupled from storage details.

pub mod record_service;
