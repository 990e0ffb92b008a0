pub mod model;
pub mod registry;
pub mod store;

pub use model::{Plan, TenantConfig};
pub use registry::{name_to_subdomain, validate_subdomain, TenantRegistry};
pub use store::{FsTenantStore, TenantStore, TenantStoreError};
