//! Domain services for the dispatch gateway.
//!
//! Services contain business logic that operates on domain models through
//! the storage traits in [`store`].

pub mod memory;
pub mod settings_resolver;
pub mod store;

pub use memory::InMemoryStore;
pub use settings_resolver::SettingsResolver;
pub use store::{SettingsStore, TemplateStore, UserDirectory, WebhookStore};
