pub mod catalog;
pub mod config;
pub mod types;

pub use catalog::{CapacityCatalog, CatalogError, InstanceProfile};
pub use config::SimConfig;
pub use types::*;
