use anyhow::{Context, Result, anyhow};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::window::{DEFAULT_WINDOW_SIZE, UnrankedPolicy, WindowConfig};

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardConfig {
    pub redis_url: String,
    pub window: WindowConfig,
    /// Deadline for one multi-leaderboard read, `None` for no deadline
    pub request_timeout: Option<Duration>,
    /// Users whose score writes are refused
    pub blocked_users: Vec<String>,
    /// MaxMind country database used to fill in missing countries
    pub geoip_db: Option<PathBuf>,
}

impl LeaderboardConfig {
    /// Reads `LEADERBOARD_*` variables, after loading `.env` if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        info!(
            window_size = config.window.size,
            unranked = ?config.window.unranked,
            timeout = ?config.request_timeout,
            blocked_users = config.blocked_users.len(),
            geoip_db = ?config.geoip_db,
            "Loaded leaderboard configuration"
        );
        Ok(config)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let redis_url = match get("LEADERBOARD_REDIS_URL") {
            Some(url) => url,
            None => {
                let host = get("LEADERBOARD_REDIS_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
                let port: u16 = parse(&get, "LEADERBOARD_REDIS_PORT")?.unwrap_or(6379);
                let db: u32 = parse(&get, "LEADERBOARD_REDIS_DB")?.unwrap_or(0);
                let user = get("LEADERBOARD_REDIS_USER");
                let credentials = match (user, get("LEADERBOARD_REDIS_PASS")) {
                    (Some(user), Some(pass)) => format!("{}:{}@", user, pass),
                    (None, Some(pass)) => format!(":{}@", pass),
                    (Some(user), None) => format!("{}@", user),
                    (None, None) => String::new(),
                };
                format!("redis://{}{}:{}/{}", credentials, host, port, db)
            }
        };

        let size: usize = parse(&get, "LEADERBOARD_WINDOW_SIZE")?.unwrap_or(DEFAULT_WINDOW_SIZE);
        if size == 0 {
            return Err(anyhow!("LEADERBOARD_WINDOW_SIZE must be at least 1"));
        }

        let unranked = match get("LEADERBOARD_UNRANKED_VIEWER") {
            Some(raw) => raw
                .parse::<UnrankedPolicy>()
                .map_err(|e| anyhow!(e))
                .context("Invalid LEADERBOARD_UNRANKED_VIEWER")?,
            None => UnrankedPolicy::default(),
        };

        let timeout_ms: u64 =
            parse(&get, "LEADERBOARD_REQUEST_TIMEOUT_MS")?.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        let request_timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));

        let blocked_users = get("LEADERBOARD_BLOCKED_USERS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            redis_url,
            window: WindowConfig { size, unranked },
            request_timeout,
            blocked_users,
            geoip_db: get("LEADERBOARD_GEOIP_DB").map(PathBuf::from),
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid {}: {}", key, raw))
        })
        .transpose()
}
