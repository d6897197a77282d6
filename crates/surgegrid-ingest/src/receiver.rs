//! Per-region ingestion loop.
//!
//! Bridges the bus to the regional controller. Work units are dispatched
//! fire-and-forget so a slow placement never blocks the next event;
//! period and shutdown events are handled inline. Shutdown is
//! cooperative: the loop checks the flag before consuming each message
//! and exits without joining in-flight placements.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use surgegrid_controller::RegionController;

use crate::event::{BusMessage, RegionEvent};

pub async fn run_region(
    controller: Arc<RegionController>,
    mut messages: mpsc::Receiver<BusMessage>,
    mut shutdown: watch::Receiver<bool>,
    default_duration_secs: f64,
) {
    info!(region = %controller.region(), "region ingestion started");

    loop {
        if *shutdown.borrow() {
            info!(region = %controller.region(), "shutdown flag set, stopping ingestion");
            break;
        }

        tokio::select! {
            message = messages.recv() => {
                let Some(message) = message else {
                    debug!(region = %controller.region(), "bus channel closed");
                    break;
                };
                if message.region != controller.region() {
                    warn!(
                        region = %controller.region(),
                        message_region = %message.region,
                        "message addressed to another region, skipping"
                    );
                    continue;
                }

                match RegionEvent::decode(&message.payload) {
                    RegionEvent::WorkUnit { duration_secs } => {
                        let controller = Arc::clone(&controller);
                        let duration = duration_secs.unwrap_or(default_duration_secs);
                        tokio::spawn(async move {
                            if let Err(e) = controller.add_work_unit(duration).await {
                                error!(
                                    region = %controller.region(),
                                    error = %e,
                                    "work unit dropped"
                                );
                            }
                        });
                    }
                    RegionEvent::EndOfPeriod => controller.end_of_period().await,
                    RegionEvent::Shutdown => {
                        info!(region = %controller.region(), "shutdown requested by bus");
                        break;
                    }
                    RegionEvent::Ignored => {
                        debug!(
                            region = %controller.region(),
                            payload = %message.payload,
                            "unrecognized payload ignored"
                        );
                    }
                }
            }
            _ = shutdown.changed() => {
                info!(region = %controller.region(), "shutdown signal received");
                break;
            }
        }
    }

    info!(region = %controller.region(), "region ingestion stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use surge_core::catalog::{CapacityCatalog, InstanceProfile};
    use surgegrid_controller::ControllerSettings;
    use surgegrid_report::{MemorySink, ReportSink};

    fn test_controller() -> (Arc<RegionController>, Arc<MemorySink>) {
        let catalog = CapacityCatalog::new(vec![
            InstanceProfile::new("c8", 2, 3, 5, 0.2859),
            InstanceProfile::new("c16", 3, 7, 10, 0.5719),
        ])
        .unwrap();
        let sink = Arc::new(MemorySink::new());
        let dyn_sink: Arc<dyn ReportSink> = sink.clone() as Arc<dyn ReportSink>;
        let controller = RegionController::new(
            "oregon",
            catalog,
            ControllerSettings {
                time_scale: 1.0,
                average_boot_secs: 11.381333,
            },
            dyn_sink,
        );
        (controller, sink)
    }

    fn message(payload: &str) -> BusMessage {
        BusMessage {
            region: "oregon".to_string(),
            payload: payload.to_string(),
        }
    }

    async fn wait_for_routed(controller: &Arc<RegionController>, expected: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while controller.counters().await.processes_routed < expected {
            assert!(
                Instant::now() < deadline,
                "placements did not settle in time"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dispatches_work_units_and_periods_then_quits() {
        let (controller, sink) = test_controller();
        let (tx, rx) = mpsc::channel(64);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let loop_handle = tokio::spawn(run_region(
            Arc::clone(&controller),
            rx,
            shutdown_rx,
            600.0,
        ));

        for _ in 0..3 {
            tx.send(message("REQUEST")).await.unwrap();
        }
        wait_for_routed(&controller, 3).await;

        tx.send(message("END OF DAY")).await.unwrap();
        tx.send(message("quit")).await.unwrap();
        loop_handle.await.unwrap();

        // The period report captured the three placements, and the quit
        // token ended the loop.
        assert_eq!(controller.counters().await.processes_routed, 0);
        assert!(
            sink.lines()
                .iter()
                .any(|l| l.starts_with("period region=oregon") && l.contains("processes_routed=3"))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_payloads_do_not_place_work() {
        let (controller, _sink) = test_controller();
        let (tx, rx) = mpsc::channel(64);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let loop_handle = tokio::spawn(run_region(
            Arc::clone(&controller),
            rx,
            shutdown_rx,
            600.0,
        ));

        tx.send(message("definitely not a token")).await.unwrap();
        tx.send(message("quit")).await.unwrap();
        loop_handle.await.unwrap();

        assert_eq!(controller.counters().await.processes_routed, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn messages_for_other_regions_are_skipped() {
        let (controller, _sink) = test_controller();
        let (tx, rx) = mpsc::channel(64);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let loop_handle = tokio::spawn(run_region(
            Arc::clone(&controller),
            rx,
            shutdown_rx,
            600.0,
        ));

        tx.send(BusMessage {
            region: "london".to_string(),
            payload: "REQUEST".to_string(),
        })
        .await
        .unwrap();
        tx.send(message("quit")).await.unwrap();
        loop_handle.await.unwrap();

        assert_eq!(controller.counters().await.processes_routed, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn watch_signal_stops_the_loop() {
        let (controller, _sink) = test_controller();
        let (_tx, rx) = mpsc::channel::<BusMessage>(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let loop_handle = tokio::spawn(run_region(controller, rx, shutdown_rx, 600.0));

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), loop_handle)
            .await
            .expect("loop did not stop on shutdown signal")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn closed_channel_stops_the_loop() {
        let (controller, _sink) = test_controller();
        let (tx, rx) = mpsc::channel::<BusMessage>(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let loop_handle = tokio::spawn(run_region(controller, rx, shutdown_rx, 600.0));

        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), loop_handle)
            .await
            .expect("loop did not stop on closed channel")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn work_unit_duration_override_is_used() {
        let (controller, _sink) = test_controller();
        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let loop_handle = tokio::spawn(run_region(
            Arc::clone(&controller),
            rx,
            shutdown_rx,
            600.0,
        ));

        tx.send(message("REQUEST 900")).await.unwrap();
        wait_for_routed(&controller, 1).await;
        tx.send(message("quit")).await.unwrap();
        loop_handle.await.unwrap();

        let servers = controller
            .servers_in(surge_core::types::LoadBucket::Underloaded)
            .await;
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].active_count().await, 1);
    }
}
