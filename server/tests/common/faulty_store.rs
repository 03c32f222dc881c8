use async_trait::async_trait;
use ::common::ScoreAttributes;
use leaderboard::Result;
use leaderboard::store::{
    AttributeStore, BatchRequest, BatchResponse, LeaderboardCatalog, LeaderboardStore,
    MemoryStore, ScoreIndex,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Wraps a [`MemoryStore`], optionally delaying every read, failing reads of
/// one leaderboard with a connection error, or dropping a member from the
/// ranking once a number of batches have run.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    pub delay: Option<Duration>,
    pub broken_leaderboard: Option<String>,
    pub vanishing: Option<(String, usize)>,
    batches: AtomicUsize,
}

impl FaultyStore {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn broken(leaderboard_id: &str) -> Self {
        Self {
            broken_leaderboard: Some(leaderboard_id.to_string()),
            ..Default::default()
        }
    }

    /// `member` leaves the ranking right before batch number `after + 1`.
    pub fn vanishing(member: &str, after: usize) -> Self {
        Self {
            vanishing: Some((member.to_string(), after)),
            ..Default::default()
        }
    }

    async fn before_read(&self, leaderboard_id: &str) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.broken_leaderboard.as_deref() == Some(leaderboard_id) {
            let refused =
                redis::RedisError::from((redis::ErrorKind::IoError, "connection refused"));
            return Err(refused.into());
        }
        Ok(())
    }
}

#[async_trait]
impl ScoreIndex for FaultyStore {
    async fn upsert(&self, leaderboard_id: &str, member: &str, value: f64) -> Result<()> {
        self.inner.upsert(leaderboard_id, member, value).await
    }

    async fn rank(&self, leaderboard_id: &str, member: &str) -> Result<Option<u64>> {
        self.before_read(leaderboard_id).await?;
        self.inner.rank(leaderboard_id, member).await
    }

    async fn range_by_rank(
        &self,
        leaderboard_id: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<String>> {
        self.before_read(leaderboard_id).await?;
        self.inner.range_by_rank(leaderboard_id, start, stop).await
    }
}

#[async_trait]
impl AttributeStore for FaultyStore {
    async fn set_attributes(
        &self,
        leaderboard_id: &str,
        attributes: &ScoreAttributes,
    ) -> Result<()> {
        self.inner.set_attributes(leaderboard_id, attributes).await
    }

    async fn get_attributes(
        &self,
        leaderboard_id: &str,
        members: &[String],
    ) -> Result<Vec<Option<ScoreAttributes>>> {
        self.before_read(leaderboard_id).await?;
        self.inner.get_attributes(leaderboard_id, members).await
    }
}

#[async_trait]
impl LeaderboardStore for FaultyStore {
    async fn write(&self, leaderboard_id: &str, attributes: &ScoreAttributes) -> Result<()> {
        self.inner.write(leaderboard_id, attributes).await
    }

    async fn execute(&self, batch: &BatchRequest) -> Result<BatchResponse> {
        self.before_read(batch.leaderboard_id()).await?;
        let done = self.batches.fetch_add(1, Ordering::SeqCst);
        if let Some((member, after)) = &self.vanishing {
            if done == *after {
                self.inner.remove_member(batch.leaderboard_id(), member).await;
            }
        }
        self.inner.execute(batch).await
    }
}

#[async_trait]
impl LeaderboardCatalog for FaultyStore {
    async fn save_leaderboard(
        &self,
        game_id: &str,
        app_id: &str,
        leaderboard_id: &str,
        name: &str,
    ) -> Result<()> {
        self.inner
            .save_leaderboard(game_id, app_id, leaderboard_id, name)
            .await
    }

    async fn list_leaderboards(
        &self,
        game_id: &str,
        app_id: &str,
    ) -> Result<Vec<(String, String)>> {
        self.inner.list_leaderboards(game_id, app_id).await
    }
}
