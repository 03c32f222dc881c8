use chrono::Utc;
use common::{Leaderboard, Score, Scope};
use futures_util::future::try_join_all;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::LeaderboardConfig;
use crate::error::{LeaderboardError, Result};
use crate::geo::{CountryResolver, GeoIpResolver, parse_ip};
use crate::store::{LeaderboardCatalog, LeaderboardStore, RedisStore};
use crate::window::{WindowBuilder, WindowConfig};

/// Storage a service runs on: ranked scores plus leaderboard definitions.
pub trait ServiceStore: LeaderboardStore + LeaderboardCatalog {}

impl<T: LeaderboardStore + LeaderboardCatalog> ServiceStore for T {}

/// Entry point for score writes and windowed reads.
#[derive(Clone)]
pub struct LeaderboardService {
    store: Arc<dyn ServiceStore>,
    window: WindowBuilder,
    request_timeout: Option<Duration>,
    blocked_users: Arc<HashSet<String>>,
    geo: Option<Arc<dyn CountryResolver>>,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn ServiceStore>, window: WindowConfig) -> Self {
        Self {
            store,
            window: WindowBuilder::new(window),
            request_timeout: None,
            blocked_users: Arc::new(HashSet::new()),
            geo: None,
        }
    }

    /// Connects to Redis and applies every setting of `config`.
    pub async fn from_config(config: &LeaderboardConfig) -> anyhow::Result<Self> {
        let store = RedisStore::connect(&config.redis_url).await?;
        let mut service = Self::new(Arc::new(store), config.window.clone())
            .with_request_timeout(config.request_timeout)
            .with_blocked_users(config.blocked_users.iter().cloned());
        if let Some(path) = &config.geoip_db {
            service = service.with_country_resolver(Arc::new(GeoIpResolver::open(path)?));
        }
        info!(window_size = config.window.size, "Leaderboard service ready");
        Ok(service)
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_blocked_users(mut self, users: impl IntoIterator<Item = String>) -> Self {
        self.blocked_users = Arc::new(users.into_iter().collect());
        self
    }

    pub fn with_country_resolver(mut self, resolver: Arc<dyn CountryResolver>) -> Self {
        self.geo = Some(resolver);
        self
    }

    /// Upserts one score for the player in `scope`.
    ///
    /// Game, app and user always come from `scope`, never from the payload.
    pub async fn set_score(&self, scope: &Scope, mut score: Score) -> Result<()> {
        if self.blocked_users.contains(&scope.user_id) {
            warn!(user_id = %scope.user_id, "Refusing score from blocked user");
            return Err(LeaderboardError::BlockedUser(scope.user_id.clone()));
        }
        if score.value.is_nan() {
            return Err(LeaderboardError::InvalidScore {
                leaderboard_id: score.leaderboard_id,
                user_id: scope.user_id.clone(),
            });
        }

        score.scope = scope.clone();
        if score.timestamp == 0 {
            score.timestamp = Utc::now().timestamp();
        }
        if score.country.is_empty() {
            if let Some(country) = self.resolve_country(&score.ip) {
                score.country = country;
            }
        }

        debug!(
            leaderboard_id = %score.leaderboard_id,
            user_id = %scope.user_id,
            value = score.value,
            country = %score.country,
            "Setting score"
        );
        self.store
            .write(&score.leaderboard_id, &score.attributes())
            .await
            .inspect_err(|e| {
                error!(leaderboard_id = %score.leaderboard_id, error = %e, "Failed to set score")
            })
    }

    /// Applies scores in order and stops at the first failure; earlier writes
    /// stay applied.
    pub async fn set_scores(&self, scope: &Scope, scores: Vec<Score>) -> Result<()> {
        let count = scores.len();
        for score in scores {
            self.set_score(scope, score).await?;
        }
        debug!(user_id = %scope.user_id, count, "Finished set scores");
        Ok(())
    }

    /// One window per requested leaderboard, in request order. Any failure
    /// fails the whole call.
    pub async fn list_scores(
        &self,
        scope: &Scope,
        leaderboard_ids: &[String],
    ) -> Result<Vec<Leaderboard>> {
        let work = self.collect_windows(scope, leaderboard_ids);
        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| {
                    warn!(user_id = %scope.user_id, ?limit, "List scores timed out");
                    LeaderboardError::Timeout(limit)
                })?,
            None => work.await,
        }
    }

    /// Like [`list_scores`](Self::list_scores), abandoning outstanding store
    /// round trips as soon as `cancel` fires.
    pub async fn list_scores_until_cancelled(
        &self,
        scope: &Scope,
        leaderboard_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<Leaderboard>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(user_id = %scope.user_id, "List scores cancelled");
                Err(LeaderboardError::Cancelled)
            }
            result = self.list_scores(scope, leaderboard_ids) => result,
        }
    }

    /// Registers a leaderboard for the scope's game and app. Repeating the
    /// call only updates the name.
    pub async fn create_leaderboard(
        &self,
        scope: &Scope,
        leaderboard_id: &str,
        name: &str,
    ) -> Result<()> {
        self.store
            .save_leaderboard(&scope.game_id, &scope.app_id, leaderboard_id, name)
            .await?;
        info!(
            game_id = %scope.game_id,
            app_id = %scope.app_id,
            leaderboard_id,
            "Saved leaderboard"
        );
        Ok(())
    }

    /// Leaderboards defined for the scope's game and app, without entries.
    pub async fn list_leaderboards(&self, scope: &Scope) -> Result<Vec<Leaderboard>> {
        let defined = self
            .store
            .list_leaderboards(&scope.game_id, &scope.app_id)
            .await?;
        Ok(defined
            .into_iter()
            .map(|(id, name)| Leaderboard {
                scope: scope.clone(),
                id,
                name,
                scores: Vec::new(),
            })
            .collect())
    }

    fn collect_windows<'a>(
        &'a self,
        scope: &'a Scope,
        leaderboard_ids: &'a [String],
    ) -> impl Future<Output = Result<Vec<Leaderboard>>> + 'a {
        debug!(user_id = %scope.user_id, leaderboards = ?leaderboard_ids, "List scores");
        try_join_all(leaderboard_ids.iter().map(move |id| async move {
            let scores = self
                .window
                .build(self.store.as_ref(), scope, id)
                .await
                .inspect_err(|e| {
                    error!(leaderboard_id = %id, error = %e, "Failed to build window")
                })?;
            Ok::<_, LeaderboardError>(Leaderboard {
                scope: scope.clone(),
                id: id.clone(),
                name: String::new(),
                scores,
            })
        }))
    }

    fn resolve_country(&self, raw_ip: &str) -> Option<String> {
        let resolver = self.geo.as_ref()?;
        let ip = parse_ip(raw_ip)?;
        resolver.resolve(ip).map(|country| country.to_lowercase())
    }
}
