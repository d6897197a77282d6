//! Bus message decoding.
//!
//! The bus transport itself is a collaborator; the ingestion loop only
//! sees `{region, payload}` pairs and maps the payload onto the small
//! set of control tokens the simulator understands. Unknown payloads
//! pass through as `Ignored` and are never fatal.

use surge_core::types::RegionName;

/// Payload announcing a new unit of work, optionally followed by an
/// execution duration in simulated seconds ("REQUEST 90").
pub const WORK_UNIT_TOKEN: &str = "REQUEST";

/// Payload closing the current accounting period.
pub const END_OF_PERIOD_TOKEN: &str = "END OF DAY";

/// Payload requesting cooperative shutdown of the region.
pub const SHUTDOWN_TOKEN: &str = "quit";

/// One message consumed from a region's bus topic.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub region: RegionName,
    pub payload: String,
}

/// The control events the ingestion loop dispatches on.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionEvent {
    /// A new work unit, with its own duration when the payload carried one.
    WorkUnit { duration_secs: Option<f64> },
    EndOfPeriod,
    Shutdown,
    /// Unrecognized payload; logged at debug level and skipped.
    Ignored,
}

impl RegionEvent {
    pub fn decode(payload: &str) -> Self {
        let payload = payload.trim();
        if payload == SHUTDOWN_TOKEN {
            return RegionEvent::Shutdown;
        }
        if payload == END_OF_PERIOD_TOKEN {
            return RegionEvent::EndOfPeriod;
        }
        if let Some(rest) = payload.strip_prefix(WORK_UNIT_TOKEN) {
            if rest.is_empty() {
                return RegionEvent::WorkUnit {
                    duration_secs: None,
                };
            }
            // A duration suffix must be separated and positive; anything
            // else is not a work-unit token.
            if let Some(arg) = rest.strip_prefix(' ')
                && let Ok(secs) = arg.trim().parse::<f64>()
                && secs > 0.0
            {
                return RegionEvent::WorkUnit {
                    duration_secs: Some(secs),
                };
            }
        }
        RegionEvent::Ignored
    }
}
