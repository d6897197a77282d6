//! surge.toml simulation configuration.
//!
//! A `SimConfig` carries everything a deployment of the simulator needs:
//! the regions to run, the time-scale factor between simulated and real
//! seconds, the capacity catalog with per-region pricing, and the traffic
//! generator ranges. The built-in default mirrors the measured constants
//! of the reference deployment (c8 through c88, three regions).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CapacityCatalog, CatalogError, InstanceProfile};
use crate::types::{InstanceType, RegionName};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no regions configured")]
    NoRegions,

    #[error("no instance types configured")]
    NoInstanceTypes,

    #[error("no hourly price for instance type {instance_type} in region {region}")]
    MissingPrice {
        region: RegionName,
        instance_type: InstanceType,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub simulation: SimSettings,
    /// Capacity catalog entries, ordered smallest to largest.
    #[serde(rename = "instance_type")]
    pub instance_types: Vec<InstanceTypeConfig>,
    #[serde(default)]
    pub traffic: TrafficSettings,
}

/// Global simulation knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimSettings {
    /// Simulated seconds per real second.
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
    /// Average cloud boot duration in simulated seconds, charged per
    /// scaling event in the period report.
    #[serde(default = "default_boot_secs")]
    pub average_boot_secs: f64,
    /// Execution duration for a work unit that doesn't carry its own,
    /// in simulated seconds.
    #[serde(default = "default_execution_secs")]
    pub default_execution_secs: f64,
    /// Length of one accounting day in simulated seconds.
    #[serde(default = "default_day_secs")]
    pub day_length_secs: f64,
    pub regions: Vec<RegionName>,
}

/// One capacity catalog entry with per-region pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceTypeConfig {
    pub name: InstanceType,
    pub min_threshold: u32,
    pub max_threshold: u32,
    pub absolute_limit: u32,
    /// region → USD per simulated hour.
    pub hourly_price: HashMap<RegionName, f64>,
}

/// Inter-arrival ranges for the synthetic traffic generator, in simulated
/// seconds. The generator draws uniformly from the active range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficSettings {
    #[serde(default = "default_low_interarrival")]
    pub low_interarrival_secs: [f64; 2],
    #[serde(default = "default_high_interarrival")]
    pub high_interarrival_secs: [f64; 2],
}

impl Default for TrafficSettings {
    fn default() -> Self {
        Self {
            low_interarrival_secs: default_low_interarrival(),
            high_interarrival_secs: default_high_interarrival(),
        }
    }
}

fn default_time_scale() -> f64 {
    200.0
}

fn default_boot_secs() -> f64 {
    11.381333
}

fn default_execution_secs() -> f64 {
    60.0
}

fn default_day_secs() -> f64 {
    86_400.0
}

fn default_low_interarrival() -> [f64; 2] {
    [2_000.0, 4_000.0]
}

fn default_high_interarrival() -> [f64; 2] {
    [200.0, 400.0]
}

impl SimConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SimConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants the serde layer can't express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.simulation.regions.is_empty() {
            return Err(ConfigError::NoRegions);
        }
        if self.instance_types.is_empty() {
            return Err(ConfigError::NoInstanceTypes);
        }
        for region in &self.simulation.regions {
            // Builds and validates the full catalog for each region, so a
            // bad threshold or a missing price fails at startup.
            self.catalog_for_region(region)?;
        }
        Ok(())
    }

    /// Materialize the capacity catalog for one region, with that region's
    /// hourly prices resolved onto each profile.
    pub fn catalog_for_region(&self, region: &str) -> ConfigResult<CapacityCatalog> {
        let mut profiles = Vec::with_capacity(self.instance_types.len());
        for entry in &self.instance_types {
            let price = entry.hourly_price.get(region).copied().ok_or_else(|| {
                ConfigError::MissingPrice {
                    region: region.to_string(),
                    instance_type: entry.name.clone(),
                }
            })?;
            profiles.push(InstanceProfile::new(
                &entry.name,
                entry.min_threshold,
                entry.max_threshold,
                entry.absolute_limit,
                price,
            ));
        }
        Ok(CapacityCatalog::new(profiles)?)
    }
}

impl Default for SimConfig {
    /// The reference deployment: three regions, five instance types.
    fn default() -> Self {
        let entry = |name: &str,
                     min: u32,
                     max: u32,
                     abs: u32,
                     oregon: f64,
                     london: f64,
                     singapore: f64| InstanceTypeConfig {
            name: name.to_string(),
            min_threshold: min,
            max_threshold: max,
            absolute_limit: abs,
            hourly_price: HashMap::from([
                ("oregon".to_string(), oregon),
                ("london".to_string(), london),
                ("singapore".to_string(), singapore),
            ]),
        };

        Self {
            simulation: SimSettings {
                time_scale: default_time_scale(),
                average_boot_secs: default_boot_secs(),
                default_execution_secs: default_execution_secs(),
                day_length_secs: default_day_secs(),
                regions: vec![
                    "oregon".to_string(),
                    "london".to_string(),
                    "singapore".to_string(),
                ],
            },
            instance_types: vec![
                entry("c8", 2, 3, 5, 0.2859, 0.3547, 0.3412),
                entry("c16", 3, 7, 10, 0.5719, 0.7095, 0.6824),
                entry("c32", 5, 19, 22, 1.1437, 1.4190, 1.3648),
                entry("c52", 15, 33, 36, 1.8655, 2.3217, 2.2316),
                entry("c88", 28, 58, 62, 3.1869, 3.9969, 3.8360),
            ],
            traffic: TrafficSettings::default(),
        }
    }
}
