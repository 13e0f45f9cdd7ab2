//! Audit trail: auth and session events become log lines.

use core_runtime::events::{CoreEvent, EventBus, EventSeverity, EventStream};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// Log events from `bus` at or above `min_severity` until the bus closes.
pub fn spawn_audit_log(bus: &EventBus, min_severity: EventSeverity) -> tokio::task::JoinHandle<()> {
    let mut events =
        EventStream::new(bus.subscribe()).filter(move |event| event.severity() >= min_severity);
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => record(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: "bijlagetool::audit", skipped, "Audit log fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn record(event: &CoreEvent) {
    let payload = serde_json::to_string(event).unwrap_or_default();
    match event.severity() {
        EventSeverity::Error => {
            error!(target: "bijlagetool::audit", event = %payload, "{}", event.description())
        }
        EventSeverity::Warning => {
            warn!(target: "bijlagetool::audit", event = %payload, "{}", event.description())
        }
        EventSeverity::Info => {
            info!(target: "bijlagetool::audit", event = %payload, "{}", event.description())
        }
        EventSeverity::Debug => {
            debug!(target: "bijlagetool::audit", event = %payload, "{}", event.description())
        }
    }
}
