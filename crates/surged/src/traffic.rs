//! Synthetic traffic generator.
//!
//! Publishes work-unit payloads for one region following a three-phase
//! day cycle: low traffic through the first third of the simulated day,
//! high traffic through the middle third, low again through the last,
//! then an end-of-day marker before the next day begins. Inter-arrival
//! gaps are drawn uniformly from the configured ranges in simulated
//! seconds and slept in scaled real time.

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use surge_core::config::{SimSettings, TrafficSettings};
use surgegrid_ingest::BusMessage;
use surgegrid_ingest::event::{END_OF_PERIOD_TOKEN, WORK_UNIT_TOKEN};

pub async fn run_generator(
    region: String,
    bus: mpsc::Sender<BusMessage>,
    simulation: SimSettings,
    traffic: TrafficSettings,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(%region, "traffic generator started");

    let time_scale = simulation.time_scale;
    let day_real_secs = simulation.day_length_secs / time_scale;
    let mut day: u64 = 0;

    'days: loop {
        let day_start = Instant::now();
        loop {
            let elapsed = day_start.elapsed().as_secs_f64();
            if elapsed >= day_real_secs {
                break;
            }

            let range = phase_range(elapsed / day_real_secs, &traffic);
            let pause_sim = {
                let mut rng = rand::rng();
                rng.random_range(range[0]..=range[1])
            };
            let pause = Duration::from_secs_f64(pause_sim / time_scale);

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = shutdown.changed() => break 'days,
            }

            let message = BusMessage {
                region: region.clone(),
                payload: WORK_UNIT_TOKEN.to_string(),
            };
            if bus.send(message).await.is_err() {
                debug!(%region, "bus closed, generator stopping");
                break 'days;
            }
        }

        day += 1;
        info!(%region, day, "simulated day complete");
        let marker = BusMessage {
            region: region.clone(),
            payload: END_OF_PERIOD_TOKEN.to_string(),
        };
        if bus.send(marker).await.is_err() {
            break;
        }
    }

    info!(%region, "traffic generator stopped");
}

/// The middle third of the day is the high-traffic phase.
fn phase_range(day_fraction: f64, traffic: &TrafficSettings) -> [f64; 2] {
    if (1.0 / 3.0..2.0 / 3.0).contains(&day_fraction) {
        traffic.high_interarrival_secs
    } else {
        traffic.low_interarrival_secs
    }
}
