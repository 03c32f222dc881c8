pub mod batch;
pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use common::ScoreAttributes;

use crate::error::Result;
pub use batch::{BatchRequest, BatchResponse, Lookup, Reply};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Ordered index of (value, member) pairs per leaderboard.
///
/// Members are ordered by value descending, ties by member id ascending.
#[async_trait]
pub trait ScoreIndex: Send + Sync {
    /// Replaces any existing value for `member`.
    async fn upsert(&self, leaderboard_id: &str, member: &str, value: f64) -> Result<()>;

    /// 1-based rank, `None` when the member has no entry.
    async fn rank(&self, leaderboard_id: &str, member: &str) -> Result<Option<u64>>;

    /// Members between zero-based offsets `start..=stop` in rank order.
    async fn range_by_rank(&self, leaderboard_id: &str, start: u64, stop: u64)
    -> Result<Vec<String>>;
}

/// Display attributes per (leaderboard, member).
#[async_trait]
pub trait AttributeStore: Send + Sync {
    async fn set_attributes(
        &self,
        leaderboard_id: &str,
        attributes: &ScoreAttributes,
    ) -> Result<()>;

    /// One slot per requested member, `None` when there is no record.
    async fn get_attributes(
        &self,
        leaderboard_id: &str,
        members: &[String],
    ) -> Result<Vec<Option<ScoreAttributes>>>;
}

#[async_trait]
pub trait LeaderboardStore: ScoreIndex + AttributeStore {
    /// Index upsert and attribute set for one member as one logical write.
    async fn write(&self, leaderboard_id: &str, attributes: &ScoreAttributes) -> Result<()> {
        self.upsert(leaderboard_id, &attributes.user_id, attributes.value)
            .await?;
        self.set_attributes(leaderboard_id, attributes).await
    }

    /// Runs every lookup of `batch`, replies in request order.
    async fn execute(&self, batch: &BatchRequest) -> Result<BatchResponse> {
        let leaderboard_id = batch.leaderboard_id();
        let mut replies = Vec::with_capacity(batch.len());
        for lookup in batch.lookups() {
            let reply = match lookup {
                Lookup::Rank(member) => Reply::Rank(self.rank(leaderboard_id, member).await?),
                Lookup::Range { start, stop } => {
                    Reply::Members(self.range_by_rank(leaderboard_id, *start, *stop).await?)
                }
                Lookup::Attributes(member) => {
                    let mut found = self
                        .get_attributes(leaderboard_id, std::slice::from_ref(member))
                        .await?;
                    Reply::Attributes(found.pop().flatten())
                }
            };
            replies.push(reply);
        }
        Ok(BatchResponse::new(replies))
    }
}

/// Leaderboard definitions per (game, app). Creating is an idempotent upsert.
#[async_trait]
pub trait LeaderboardCatalog: Send + Sync {
    async fn save_leaderboard(
        &self,
        game_id: &str,
        app_id: &str,
        leaderboard_id: &str,
        name: &str,
    ) -> Result<()>;

    /// (id, name) pairs sorted by id.
    async fn list_leaderboards(&self, game_id: &str, app_id: &str)
    -> Result<Vec<(String, String)>>;
}
