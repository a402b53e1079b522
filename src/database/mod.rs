pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use manager::DatabaseManager;
pub use memory::{Fault, Fixture, MemoryStore};
pub use postgres::PgStore;
pub use store::{ComplianceStore, StoreError, TenantStore};
