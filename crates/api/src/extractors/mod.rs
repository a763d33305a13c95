//! Custom request extractors.

pub mod tenant;

pub use tenant::{AuthenticatedTenant, Tenant};
