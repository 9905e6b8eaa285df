//! The connection stress driver: fan out N independent connection attempts,
//! join all of them, and measure the wall-clock window they ran in.
//!
//! Workers never communicate with each other and their completion order is
//! unspecified. The only guarantee is the join barrier: every launched task
//! has terminated (with an outcome recorded) before the duration is taken.

use crate::engine::outcome::{RunReport, WorkerError, WorkerOutcome};
use crate::engine::worker::{self, CaptureSlot};
use burst_common::Config;
use bytes::Bytes;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;
use tracing::{debug, error, info};

/// Run one full stress pass against the configured endpoint.
///
/// Launches exactly `config.load.connections` workers, waits for all of
/// them, and returns one outcome per worker plus the elapsed duration.
/// A worker's failure is recorded, never propagated; no state outlives the
/// returned report.
pub async fn run(config: &Config) -> RunReport {
    let endpoint: Arc<str> = Arc::from(config.target.endpoint());
    let connect_timeout = Duration::from_millis(config.load.connect_timeout_ms);
    let read_timeout = Duration::from_millis(config.load.read_timeout_ms);
    let count = config.load.connections;
    let capture_enabled = config.features.enable_payload_capture;
    let buffer_bytes = config.features.capture_buffer_bytes;

    // Per-run accumulator; workers insert concurrently, the map is frozen
    // into the report after the join barrier.
    let captured: Arc<DashMap<Bytes, usize>> = Arc::new(DashMap::new());

    info!(
        endpoint = %endpoint,
        connections = count,
        capture = capture_enabled,
        "Starting stress run"
    );

    let started = Instant::now();

    let mut handles = Vec::with_capacity(count);
    for worker_id in 0..count {
        let endpoint = Arc::clone(&endpoint);
        let capture = capture_enabled.then(|| CaptureSlot {
            map: Arc::clone(&captured),
            buffer_bytes,
        });
        handles.push(tokio::spawn(async move {
            worker::run_attempt(worker_id, endpoint, connect_timeout, read_timeout, capture).await
        }));
    }

    let mut outcomes = Vec::with_capacity(count);
    for (worker_id, handle) in handles.into_iter().enumerate() {
        let result = match handle.await {
            Ok(res) => res,
            Err(e) => {
                error!(worker = worker_id, error = %e, "Worker task aborted");
                Err(WorkerError::Join(e))
            }
        };
        if let Err(e) = &result {
            debug!(worker = worker_id, error = %e, "Attempt failed");
        }
        outcomes.push(WorkerOutcome {
            worker: worker_id,
            result,
        });
    }

    let elapsed = started.elapsed();

    // All workers have terminated, so this Arc is normally unique now.
    let captured: HashMap<Bytes, usize> = match Arc::try_unwrap(captured) {
        Ok(map) => map.into_iter().collect(),
        Err(shared) => shared
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect(),
    };

    let report = RunReport {
        launched: count,
        outcomes,
        captured,
        elapsed,
    };

    info!(
        ok = report.succeeded(),
        failed = report.failed(),
        recorded = report.captured.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Stress run complete"
    );

    report
}
