use crate::engine::outcome::WorkerError;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tracing::debug;

/// Sockets currently open across all in-flight workers.
pub static OPEN_CONNECTIONS: AtomicUsize = AtomicUsize::new(0);

struct OpenConnectionGuard;

impl OpenConnectionGuard {
    fn new() -> Self {
        OPEN_CONNECTIONS.fetch_add(1, Ordering::SeqCst);
        Self
    }
}

impl Drop for OpenConnectionGuard {
    fn drop(&mut self) {
        OPEN_CONNECTIONS.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Shared destination for payloads read by workers in one run.
pub struct CaptureSlot {
    pub map: Arc<DashMap<Bytes, usize>>,
    pub buffer_bytes: usize,
}

/// Read one bounded chunk from the connection with timeout.
async fn read_payload(
    stream: &mut TcpStream,
    buffer_bytes: usize,
    read_timeout: Duration,
    endpoint: &str,
) -> Result<Option<Bytes>, WorkerError> {
    let mut buf = vec![0u8; buffer_bytes];
    match timeout(read_timeout, stream.read(&mut buf)).await {
        Ok(Ok(0)) => Ok(None),
        Ok(Ok(n)) => Ok(Some(Bytes::copy_from_slice(&buf[..n]))),
        Ok(Err(e)) => Err(WorkerError::Read {
            endpoint: endpoint.to_string(),
            source: e,
        }),
        Err(_) => Err(WorkerError::Timeout {
            phase: "read",
            waited: read_timeout,
        }),
    }
}

/// One connection attempt: connect, optionally read-and-record, close.
///
/// The socket is closed by drop on every path; the returned payload (if any)
/// has already been inserted into the run's capture map.
pub async fn run_attempt(
    worker: usize,
    endpoint: Arc<str>,
    connect_timeout: Duration,
    read_timeout: Duration,
    capture: Option<CaptureSlot>,
) -> Result<Option<Bytes>, WorkerError> {
    let stream = match timeout(connect_timeout, TcpStream::connect(endpoint.as_ref())).await {
        Ok(Ok(s)) => s,
        Ok(Err(e)) => {
            return Err(WorkerError::Connect {
                endpoint: endpoint.to_string(),
                source: e,
            })
        }
        Err(_) => {
            return Err(WorkerError::Timeout {
                phase: "connect",
                waited: connect_timeout,
            })
        }
    };

    let _guard = OpenConnectionGuard::new();
    debug!(
        worker,
        open = OPEN_CONNECTIONS.load(Ordering::SeqCst),
        "Connected"
    );

    let Some(slot) = capture else {
        // Default behavior: connect and immediately close.
        return Ok(None);
    };

    let mut stream = stream;
    match read_payload(&mut stream, slot.buffer_bytes, read_timeout, &endpoint).await? {
        Some(payload) => {
            slot.map.insert(payload.clone(), worker);
            debug!(worker, bytes = payload.len(), "Recorded payload");
            Ok(Some(payload))
        }
        None => {
            debug!(worker, "Connection closed before sending a payload");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn attempt_without_capture_connects_and_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let endpoint: Arc<str> = Arc::from(addr.to_string());
        let result = run_attempt(
            0,
            endpoint,
            Duration::from_secs(1),
            Duration::from_secs(1),
            None,
        )
        .await;

        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn attempt_with_capture_records_the_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"conn-0001").await.unwrap();
        });

        let map = Arc::new(DashMap::new());
        let endpoint: Arc<str> = Arc::from(addr.to_string());
        let result = run_attempt(
            7,
            endpoint,
            Duration::from_secs(1),
            Duration::from_secs(1),
            Some(CaptureSlot {
                map: Arc::clone(&map),
                buffer_bytes: 1024,
            }),
        )
        .await;

        let payload = result.unwrap().unwrap();
        assert_eq!(&payload[..], b"conn-0001");
        assert_eq!(*map.get(&payload).unwrap(), 7);
    }

    #[tokio::test]
    async fn refused_connect_is_classified() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint: Arc<str> = Arc::from(addr.to_string());
        let result = run_attempt(
            0,
            endpoint,
            Duration::from_secs(1),
            Duration::from_secs(1),
            None,
        )
        .await;

        assert!(matches!(result, Err(WorkerError::Connect { .. })));
    }
}
