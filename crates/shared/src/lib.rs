//! Shared utilities for the dispatch gateway.
//!
//! - URL safety checks for outbound requests and redirects
//! - Template placeholder rendering
//! - Bearer token validation

pub mod jwt;
pub mod template;
pub mod url_safety;
