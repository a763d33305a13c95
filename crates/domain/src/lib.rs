//! Domain layer for the Taskly dispatch gateway.
//!
//! This crate contains:
//! - Domain models (tenants, settings, webhooks, notification templates)
//! - Storage traits and an in-memory implementation
//! - The scoped settings resolver

pub mod error;
pub mod models;
pub mod services;

pub use error::{DomainError, StoreError};
