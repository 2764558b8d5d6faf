//! Redis adapters - the production hot tier.

mod hot_store;

pub use hot_store::RedisHotStore;

use std::time::Duration;

use redis::aio::MultiplexedConnection;

use crate::domain::foundation::DomainError;

/// Connects to Redis with bounded retries and exponential backoff.
pub async fn connect(url: &str, max_retries: u32) -> Result<MultiplexedConnection, DomainError> {
    let client = redis::Client::open(url)
        .map_err(|e| DomainError::internal(format!("invalid redis url: {}", e)))?;

    let mut attempt = 0;
    loop {
        attempt += 1;
        match client.get_multiplexed_tokio_connection().await {
            Ok(conn) => {
                tracing::info!(attempt, "Redis connected");
                return Ok(conn);
            }
            Err(e) if attempt < max_retries => {
                tracing::warn!(attempt, max_retries, error = %e, "Redis connection failed, retrying");
                tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
            }
            Err(e) => {
                return Err(DomainError::internal(format!(
                    "redis connection failed after {} attempts: {}",
                    attempt, e
                )));
            }
        }
    }
}
