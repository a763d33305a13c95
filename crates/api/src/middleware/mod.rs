//! HTTP middleware components.

pub mod logging;
pub mod metrics;
pub mod tenant;
pub mod trace_id;

pub use metrics::{init_metrics, metrics_handler, metrics_middleware, record_dispatch_outcome};
pub use tenant::{optional_tenant, require_super_admin, require_tenant};
pub use trace_id::{trace_id, REQUEST_ID_HEADER};
