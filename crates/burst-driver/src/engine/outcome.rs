use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use thiserror::Error;

/// Why a single connection attempt failed.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("connect to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },
    #[error("{phase} timed out after {waited:?}")]
    Timeout {
        phase: &'static str,
        waited: Duration,
    },
    #[error("read from {endpoint} failed: {source}")]
    Read {
        endpoint: String,
        source: std::io::Error,
    },
    #[error("worker task aborted: {0}")]
    Join(tokio::task::JoinError),
}

impl WorkerError {
    /// Short class label used when summarizing a run's failures.
    pub fn class(&self) -> &'static str {
        match self {
            WorkerError::Connect { .. } => "connect",
            WorkerError::Timeout { .. } => "timeout",
            WorkerError::Read { .. } => "read",
            WorkerError::Join(_) => "join",
        }
    }
}

/// Terminal state of one worker. `Ok(Some(..))` carries the payload read
/// when capture is enabled; `Ok(None)` is a plain connect-and-close.
#[derive(Debug)]
pub struct WorkerOutcome {
    pub worker: usize,
    pub result: Result<Option<Bytes>, WorkerError>,
}

/// Everything one `run` produced. Holds one outcome per launched worker;
/// nothing in here is shared with any other run.
#[derive(Debug)]
pub struct RunReport {
    pub launched: usize,
    pub outcomes: Vec<WorkerOutcome>,
    /// Payload -> worker index, populated only when capture is enabled.
    pub captured: HashMap<Bytes, usize>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    /// Failure counts grouped by class, in stable order.
    pub fn failure_summary(&self) -> Vec<(&'static str, usize)> {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for outcome in &self.outcomes {
            if let Err(e) = &outcome.result {
                *counts.entry(e.class()).or_default() += 1;
            }
        }
        counts.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn refused(endpoint: &str) -> WorkerError {
        WorkerError::Connect {
            endpoint: endpoint.to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        }
    }

    #[test]
    fn report_counts_successes_and_failures() {
        let report = RunReport {
            launched: 3,
            outcomes: vec![
                WorkerOutcome {
                    worker: 0,
                    result: Ok(None),
                },
                WorkerOutcome {
                    worker: 1,
                    result: Err(refused("127.0.0.1:1231")),
                },
                WorkerOutcome {
                    worker: 2,
                    result: Err(WorkerError::Timeout {
                        phase: "read",
                        waited: Duration::from_millis(200),
                    }),
                },
            ],
            captured: HashMap::new(),
            elapsed: Duration::from_millis(5),
        };

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(
            report.failure_summary(),
            vec![("connect", 1), ("timeout", 1)]
        );
    }

    #[test]
    fn error_classes_are_stable() {
        assert_eq!(refused("x").class(), "connect");
        assert_eq!(
            WorkerError::Timeout {
                phase: "connect",
                waited: Duration::from_secs(1),
            }
            .class(),
            "timeout"
        );
    }

    #[test]
    fn error_display_names_the_endpoint() {
        let msg = refused("127.0.0.1:1231").to_string();
        assert!(msg.contains("127.0.0.1:1231"));
        assert!(msg.contains("refused"));
    }
}
