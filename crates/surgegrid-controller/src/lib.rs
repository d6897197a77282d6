mod buckets;
pub mod controller;
pub mod error;

pub use controller::{ControllerSettings, RegionController, RegionCounters};
pub use error::{ControllerError, ControllerResult};
