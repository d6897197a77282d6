//! Regional controller: the per-region autoscaling control loop.
//!
//! The controller owns every server in the region through four bucketed
//! collections and reacts to two kinds of input: work-unit arrivals
//! (placement) and server bucket-change notifications (relocation plus
//! scaling policy). One lock guards the collections and the accounting
//! counters together. Placement releases that lock before launching a
//! process, and servers release their own lock before notifying the
//! controller, so the two locks are never held at the same time.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use surge_core::catalog::{CapacityCatalog, InstanceProfile};
use surge_core::config::SimSettings;
use surge_core::types::LoadBucket;
use surge_sim::{BucketChangeCallback, Server};
use surgegrid_report::{BucketStatus, Decommission, PeriodSummary, RegionStatus, ReportSink};

use crate::buckets::BucketMap;
use crate::error::ControllerResult;

/// Placement tries buckets in this order and takes the first non-empty
/// one's foremost server. Saturated servers are never placement targets.
const PLACEMENT_ORDER: [LoadBucket; 3] = [
    LoadBucket::Underloaded,
    LoadBucket::Nominal,
    LoadBucket::Overloaded,
];

/// The slice of simulation settings the controller needs.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Simulated seconds per real second.
    pub time_scale: f64,
    /// Average boot duration in simulated seconds, charged per scaling
    /// event in the period report.
    pub average_boot_secs: f64,
}

impl From<&SimSettings> for ControllerSettings {
    fn from(settings: &SimSettings) -> Self {
        Self {
            time_scale: settings.time_scale,
            average_boot_secs: settings.average_boot_secs,
        }
    }
}

/// Running totals for the current accounting period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionCounters {
    pub processes_routed: u64,
    pub scaling_events: u64,
    pub accumulated_cost: f64,
}

/// State guarded by the controller lock: bucket collections and counters.
struct ControllerInner {
    buckets: BucketMap,
    counters: RegionCounters,
}

/// Autoscaling controller for one region.
///
/// Regions are fully independent; nothing here is shared across
/// controllers.
pub struct RegionController {
    region: String,
    catalog: CapacityCatalog,
    settings: ControllerSettings,
    inner: Mutex<ControllerInner>,
    sink: Arc<dyn ReportSink>,
}

impl RegionController {
    pub fn new(
        region: &str,
        catalog: CapacityCatalog,
        settings: ControllerSettings,
        sink: Arc<dyn ReportSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            region: region.to_string(),
            catalog,
            settings,
            inner: Mutex::new(ControllerInner {
                buckets: BucketMap::new(),
                counters: RegionCounters::default(),
            }),
            sink,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Snapshot of the running counters.
    pub async fn counters(&self) -> RegionCounters {
        self.inner.lock().await.counters.clone()
    }

    /// Servers currently held in `bucket`, foremost first.
    pub async fn servers_in(&self, bucket: LoadBucket) -> Vec<Arc<Server>> {
        self.inner.lock().await.buckets.servers_in(bucket)
    }

    /// Route one arriving work unit to a server.
    ///
    /// Selection and any first-server creation happen under the controller
    /// lock; the process launch happens after the lock is released so a
    /// slow launch never serializes other placements behind it.
    pub async fn add_work_unit(self: &Arc<Self>, sim_duration_secs: f64) -> ControllerResult<()> {
        let target = {
            let mut inner = self.inner.lock().await;
            match inner.buckets.select(&PLACEMENT_ORDER) {
                Some(server) => server,
                None => {
                    let profile = self.catalog.smallest().clone();
                    let server = self.create_server(profile);
                    info!(
                        region = %self.region,
                        server = server.id(),
                        instance_type = server.instance_type(),
                        "no servers available, provisioning first server"
                    );
                    inner
                        .buckets
                        .push_front(LoadBucket::Underloaded, Arc::clone(&server));
                    inner.counters.scaling_events += 1;
                    server
                }
            }
        };

        target.launch_process(sim_duration_secs).await?;

        {
            let mut inner = self.inner.lock().await;
            inner.counters.processes_routed += 1;
        }
        debug!(
            region = %self.region,
            server = target.id(),
            duration_secs = sim_duration_secs,
            "work unit routed"
        );

        self.emit_status().await;
        Ok(())
    }

    /// Move a server to the collection for its new bucket and apply the
    /// scaling policy tied to the transition.
    ///
    /// Already-in-place and untracked servers are no-ops: a relocation
    /// for a server the controller no longer holds means the server was
    /// decommissioned while the notification was in flight.
    pub async fn relocate_server(self: &Arc<Self>, server: Arc<Server>, new_bucket: LoadBucket) {
        let decommission = {
            let mut inner = self.inner.lock().await;

            if inner.buckets.locate(&server) == Some(new_bucket) {
                return;
            }
            if inner.buckets.remove(&server).is_none() {
                warn!(
                    region = %self.region,
                    server = server.id(),
                    bucket = %new_bucket,
                    "bucket change for untracked server, treating as already removed"
                );
                return;
            }

            match new_bucket {
                LoadBucket::ScalingDown => {
                    // The server drained to zero: charge its lifetime and
                    // let it drop. Nothing retains it past this report.
                    let lifetime_secs = server.sim_lifetime_secs();
                    let cost_usd = lifetime_secs / 3_600.0 * server.profile().hourly_price;
                    inner.counters.accumulated_cost += cost_usd;
                    Some(Decommission {
                        region: self.region.clone(),
                        server_id: server.id(),
                        instance_type: server.instance_type().to_string(),
                        lifetime_secs,
                        cost_usd,
                    })
                }
                bucket => {
                    inner.buckets.push_front(bucket, Arc::clone(&server));
                    if bucket == LoadBucket::Overloaded
                        && inner.buckets.is_empty(LoadBucket::Underloaded)
                    {
                        self.scale_out(&mut inner, &server);
                    }
                    None
                }
            }
        };

        if let Some(report) = decommission {
            info!(
                region = %self.region,
                server = report.server_id,
                instance_type = %report.instance_type,
                cost_usd = report.cost_usd,
                "server decommissioned"
            );
            self.emit(&report.render());
        } else {
            debug!(
                region = %self.region,
                server = server.id(),
                bucket = %new_bucket,
                "server relocated"
            );
        }

        self.emit_status().await;
    }

    /// Close the accounting period: emit the summary and reset counters.
    ///
    /// Live servers are untouched; only the counters restart.
    pub async fn end_of_period(&self) {
        let summary = {
            let mut inner = self.inner.lock().await;
            let summary = PeriodSummary {
                region: self.region.clone(),
                processes_routed: inner.counters.processes_routed,
                cost_usd: inner.counters.accumulated_cost,
                scaling_overhead_secs: inner.counters.scaling_events as f64
                    * self.settings.average_boot_secs,
                max_vertical_capacity: self.catalog.largest().absolute_limit,
            };
            inner.counters = RegionCounters::default();
            summary
        };

        info!(
            region = %self.region,
            processes_routed = summary.processes_routed,
            cost_usd = summary.cost_usd,
            "end of period"
        );
        self.emit(&summary.render());
    }

    /// Current per-bucket census, with the foremost server's active count
    /// for each non-empty bucket.
    pub async fn status(&self) -> RegionStatus {
        // Collect sizes and lead servers under the controller lock, then
        // query the lead servers' own locks after releasing it; the two
        // locks are never held together.
        let (sizes, leads) = {
            let inner = self.inner.lock().await;
            let sizes: Vec<usize> = LoadBucket::PLACEABLE
                .iter()
                .map(|&b| inner.buckets.len(b))
                .collect();
            let leads: Vec<Option<Arc<Server>>> = LoadBucket::PLACEABLE
                .iter()
                .map(|&b| inner.buckets.front(b))
                .collect();
            (sizes, leads)
        };

        let mut lead_active = Vec::with_capacity(leads.len());
        for lead in leads {
            match lead {
                Some(server) => lead_active.push(Some(server.active_count().await)),
                None => lead_active.push(None),
            }
        }

        let bucket = |i: usize| BucketStatus {
            servers: sizes[i],
            lead_active: lead_active[i],
        };
        RegionStatus {
            region: self.region.clone(),
            underloaded: bucket(0),
            nominal: bucket(1),
            overloaded: bucket(2),
            saturated: bucket(3),
        }
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Build a server whose bucket-change notifications route back into
    /// this controller. The callback holds a weak reference so servers
    /// never keep a torn-down controller alive.
    fn create_server(self: &Arc<Self>, profile: InstanceProfile) -> Arc<Server> {
        let weak = Arc::downgrade(self);
        let callback: BucketChangeCallback = Arc::new(move |server, bucket| {
            let weak = weak.clone();
            Box::pin(async move {
                match weak.upgrade() {
                    Some(controller) => controller.relocate_server(server, bucket).await,
                    None => debug!("controller gone, dropping bucket change"),
                }
            })
        });
        Server::new(profile, self.settings.time_scale, callback)
    }

    /// Provision extra capacity in response to an overload that left the
    /// underloaded collection empty: the next larger instance type while
    /// one exists, otherwise another server of the same type.
    fn scale_out(self: &Arc<Self>, inner: &mut ControllerInner, overloaded: &Server) {
        let profile = match self.catalog.successor(overloaded.instance_type()) {
            Ok(Some(larger)) => larger.clone(),
            Ok(None) => overloaded.profile().clone(),
            Err(e) => {
                warn!(
                    region = %self.region,
                    instance_type = overloaded.instance_type(),
                    error = %e,
                    "scale-out skipped"
                );
                return;
            }
        };

        let server = self.create_server(profile);
        info!(
            region = %self.region,
            server = server.id(),
            instance_type = server.instance_type(),
            triggered_by = overloaded.id(),
            "scaling out"
        );
        inner
            .buckets
            .push_front(LoadBucket::Underloaded, server);
        inner.counters.scaling_events += 1;
    }

    async fn emit_status(&self) {
        let status = self.status().await;
        self.emit(&status.render());
    }

    fn emit(&self, line: &str) {
        if let Err(e) = self.sink.emit(line) {
            warn!(region = %self.region, error = %e, "report emission failed");
        }
    }
}
