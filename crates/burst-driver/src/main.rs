use burst_common::Config;
use burst_driver::engine::driver;
use std::fs;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const CONFIG_PATH: &str = "config/burst_config.yaml";

fn init_production_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_target(true))
        .init();

    info!("Production structured logging initialized (JSON)");
}

/// Load the YAML config, falling back to the built-in defaults
/// (127.0.0.1:1231, 100 connections) so the tool runs with no setup.
fn load_config() -> Config {
    match fs::read_to_string(CONFIG_PATH) {
        Ok(data) => match serde_yaml::from_str(&data) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = CONFIG_PATH, error = %e, "Malformed config, using defaults");
                Config::default()
            }
        },
        Err(e) => {
            info!(path = CONFIG_PATH, error = %e, "No config file, using defaults");
            Config::default()
        }
    }
}

#[tokio::main]
async fn main() {
    init_production_logging();

    let config = load_config();
    let report = driver::run(&config).await;

    let mut keys: Vec<String> = report
        .captured
        .keys()
        .map(|k| String::from_utf8_lossy(k).into_owned())
        .collect();
    keys.sort();

    println!("{:?}", keys);
    println!(
        "Connections: {} ok, {} failed",
        report.succeeded(),
        report.failed()
    );
    for (class, count) in report.failure_summary() {
        println!("  {}: {}", class, count);
    }
    println!("Time: {:.3}s", report.elapsed.as_secs_f64());
}
