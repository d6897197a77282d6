//! End-to-end regional flow: bus messages through ingestion, placement,
//! process completion, and end-of-day accounting.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};

use surge_core::SimConfig;
use surge_core::types::LoadBucket;
use surgegrid_controller::{ControllerSettings, RegionController};
use surgegrid_ingest::{BusMessage, run_region};
use surgegrid_report::{MemorySink, ReportSink};

fn message(payload: &str) -> BusMessage {
    BusMessage {
        region: "oregon".to_string(),
        payload: payload.to_string(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn a_day_of_traffic_settles_and_reports() {
    let config = SimConfig::default();
    let catalog = config.catalog_for_region("oregon").unwrap();
    let sink = Arc::new(MemorySink::new());
    let dyn_sink: Arc<dyn ReportSink> = sink.clone() as Arc<dyn ReportSink>;

    // Fast clock: a 60 sim-second process runs for 10ms of real time.
    let controller = RegionController::new(
        "oregon",
        catalog,
        ControllerSettings {
            time_scale: 6_000.0,
            average_boot_secs: config.simulation.average_boot_secs,
        },
        dyn_sink,
    );

    let (tx, rx) = mpsc::channel(256);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let loop_handle = tokio::spawn(run_region(
        Arc::clone(&controller),
        rx,
        shutdown_rx,
        config.simulation.default_execution_secs,
    ));

    const ARRIVALS: u64 = 40;
    for _ in 0..ARRIVALS {
        tx.send(message("REQUEST")).await.unwrap();
    }

    // All arrivals routed.
    let deadline = Instant::now() + Duration::from_secs(10);
    while controller.counters().await.processes_routed < ARRIVALS {
        assert!(Instant::now() < deadline, "placements did not settle");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // All work completed.
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let mut active = 0;
        for bucket in LoadBucket::PLACEABLE {
            for server in controller.servers_in(bucket).await {
                active += server.active_count().await;
            }
        }
        if active == 0 {
            break;
        }
        assert!(Instant::now() < deadline, "work did not complete");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    tx.send(message("END OF DAY")).await.unwrap();
    tx.send(message("quit")).await.unwrap();
    loop_handle.await.unwrap();

    let lines = sink.lines();

    let period = lines
        .iter()
        .find(|l| l.starts_with("period region=oregon"))
        .expect("expected an end-of-day report");
    assert!(period.contains(&format!("processes_routed={ARRIVALS}")));
    assert!(period.contains("max_vertical_capacity=62"));

    assert!(
        lines
            .iter()
            .any(|l| l.starts_with("decommission region=oregon")),
        "expected decommission reports for drained servers"
    );
    assert!(
        lines
            .iter()
            .any(|l| l.starts_with("status region=oregon")),
        "expected periodic status reports"
    );

    // Counters restarted for the next day.
    assert_eq!(controller.counters().await.processes_routed, 0);
}
