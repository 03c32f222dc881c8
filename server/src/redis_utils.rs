use anyhow::{Context, Result};
use redis::Client;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::time::Duration;

/// Creates a ConnectionManager with the standard reconnect policy.
///
/// The manager reconnects on its own; the leaderboard engine never retries a
/// failed command itself.
pub async fn create_connection_manager(client: Client) -> Result<ConnectionManager> {
    let config = ConnectionManagerConfig::new()
        .set_connection_timeout(Duration::from_secs(30))
        .set_response_timeout(Duration::from_secs(30))
        .set_number_of_retries(10)
        .set_exponent_base(2)
        .set_factor(1000) // delays are base^n seconds
        .set_max_delay(60000);

    ConnectionManager::new_with_config(client, config)
        .await
        .context("Failed to create Redis connection manager with config")
}
