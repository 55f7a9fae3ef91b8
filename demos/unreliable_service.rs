//! Drives a circuit breaker against a service which fails about half of the time.
//!
//! Run with `RUST_LOG=debug cargo run --example unreliable_service` to see every transition.

use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing_subscriber::EnvFilter;

use breakwater::Config;

fn unreliable_service() -> Result<u32, &'static str> {
    if rand::thread_rng().gen_bool(0.5) {
        return Err("service failed");
    }
    Ok(42)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let circuit_breaker = Config::new()
        .failure_threshold(3)
        .recovery_time(Duration::from_secs(5))
        .half_open_max_requests(2)
        .timeout(Duration::from_secs(2))
        .build()
        .expect("valid configuration");

    for _ in 0..10 {
        match circuit_breaker.call(unreliable_service) {
            Ok(Some(result)) => tracing::info!(result, "service request succeeded"),
            Ok(None) => tracing::info!("circuit half open, next request will probe"),
            Err(err) => tracing::error!(error = %err, "service request failed"),
        }

        thread::sleep(Duration::from_secs(1));
    }
}
