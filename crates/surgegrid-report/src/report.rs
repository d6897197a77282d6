//! Report types emitted by regional controllers.
//!
//! Reports render to line-oriented text with stable field labels. The
//! format is meant for humans reading a console or a per-region log file,
//! not for machine parsing.

use serde::Serialize;

/// One bucket's slice of a status report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BucketStatus {
    /// Number of servers currently in this bucket.
    pub servers: usize,
    /// Active process count of the bucket's foremost server, when the
    /// bucket is non-empty.
    pub lead_active: Option<usize>,
}

/// Periodic snapshot of a region's bucket collections.
#[derive(Debug, Clone, Serialize)]
pub struct RegionStatus {
    pub region: String,
    pub underloaded: BucketStatus,
    pub nominal: BucketStatus,
    pub overloaded: BucketStatus,
    pub saturated: BucketStatus,
}

impl RegionStatus {
    pub fn render(&self) -> String {
        format!(
            "status region={} {} {} {} {}",
            self.region,
            field("underloaded", &self.underloaded),
            field("nominal", &self.nominal),
            field("overloaded", &self.overloaded),
            field("saturated", &self.saturated),
        )
    }
}

fn field(label: &str, bucket: &BucketStatus) -> String {
    match bucket.lead_active {
        Some(active) => format!("{label}={}(lead {active})", bucket.servers),
        None => format!("{label}={}", bucket.servers),
    }
}

/// Emitted when a server drains to zero processes and is decommissioned.
#[derive(Debug, Clone, Serialize)]
pub struct Decommission {
    pub region: String,
    pub server_id: u64,
    pub instance_type: String,
    /// Lifetime in simulated seconds.
    pub lifetime_secs: f64,
    /// Cost accrued over that lifetime, in USD.
    pub cost_usd: f64,
}

impl Decommission {
    pub fn render(&self) -> String {
        format!(
            "decommission region={} server={} type={} lifetime_secs={:.2} cost_usd={:.4}",
            self.region, self.server_id, self.instance_type, self.lifetime_secs, self.cost_usd,
        )
    }
}

/// End-of-period accounting summary for one region.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodSummary {
    pub region: String,
    pub processes_routed: u64,
    pub cost_usd: f64,
    /// Time lost to boot overhead: scaling events times the average boot
    /// duration, in simulated seconds.
    pub scaling_overhead_secs: f64,
    /// Absolute process limit of the largest catalog type, the ceiling
    /// any single server can reach.
    pub max_vertical_capacity: u32,
}

impl PeriodSummary {
    pub fn render(&self) -> String {
        format!(
            "period region={} processes_routed={} cost_usd={:.4} scaling_overhead_secs={:.2} max_vertical_capacity={}",
            self.region,
            self.processes_routed,
            self.cost_usd,
            self.scaling_overhead_secs,
            self.max_vertical_capacity,
        )
    }
}
