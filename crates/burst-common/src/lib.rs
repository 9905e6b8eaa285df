use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    pub host: String,
    pub port: u16,
}

impl TargetConfig {
    /// Endpoint string in `host:port` form, suitable for `TcpStream::connect`.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1231,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoadConfig {
    /// Number of concurrent connection attempts per run.
    pub connections: usize,
    /// Upper bound on connection establishment, per attempt.
    pub connect_timeout_ms: u64,
    /// Upper bound on the optional payload read, per attempt.
    pub read_timeout_ms: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            connections: 100,
            connect_timeout_ms: 5000,
            read_timeout_ms: 3000,
        }
    }
}

/// Feature toggles for optional driver behavior.
/// The default run is connect-and-close only; payload capture additionally
/// reads one bounded chunk from each connection and records it.
#[derive(Debug, Deserialize, Clone)]
pub struct FeaturesConfig {
    /// Toggle the read-and-record path: read up to `capture_buffer_bytes`
    /// from each successful connection and key the run's capture map by it.
    pub enable_payload_capture: bool,
    /// Size of the single read performed when capture is enabled.
    pub capture_buffer_bytes: usize,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            enable_payload_capture: false,
            capture_buffer_bytes: 1024,
        }
    }
}
