use anyhow::Context;
use async_trait::async_trait;
use common::ScoreAttributes;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Value};
use std::collections::HashMap;
use tracing::{debug, info, trace};

use super::{
    AttributeStore, BatchRequest, BatchResponse, LeaderboardCatalog, LeaderboardStore, Lookup,
    Reply, ScoreIndex,
};
use crate::error::Result;
use crate::redis_keys::RedisKeys;
use crate::redis_utils;

/// Leaderboards kept in Redis: one sorted set per leaderboard for the index,
/// one hash per member for the attributes.
///
/// Sorted set scores hold the negated value, so the ascending ZRANK/ZRANGE
/// order is value descending with equal values in ascending member order.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Open a managed connection to `redis_url`
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client =
            Client::open(redis_url).context("Failed to create Redis client for leaderboards")?;
        let conn = redis_utils::create_connection_manager(client)
            .await
            .context("Failed to connect to Redis for leaderboards")?;
        info!("Leaderboard store connected to Redis");
        Ok(Self::new(conn))
    }

    /// Removes a leaderboard's index and every attribute record it references.
    pub async fn drop_leaderboard(&self, leaderboard_id: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let scores_key = RedisKeys::scores(leaderboard_id);
        let members: Vec<String> = conn.zrange(&scores_key, 0, -1).await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        for member in &members {
            pipe.del(RedisKeys::user(leaderboard_id, member)).ignore();
        }
        pipe.del(&scores_key).ignore();
        let _: () = pipe.query_async(&mut conn).await?;

        debug!(leaderboard_id, members = members.len(), "Dropped leaderboard");
        Ok(())
    }
}

fn index_score(value: f64) -> f64 {
    // adding zero folds -0.0 into 0.0
    -value + 0.0
}

fn offset(rank_offset: u64) -> isize {
    isize::try_from(rank_offset).unwrap_or(isize::MAX)
}

fn decode_attributes(value: &Value) -> Result<Option<ScoreAttributes>> {
    let fields: HashMap<String, String> = redis::from_redis_value(value)?;
    Ok(ScoreAttributes::from_fields(&fields)?)
}

#[async_trait]
impl ScoreIndex for RedisStore {
    async fn upsert(&self, leaderboard_id: &str, member: &str, value: f64) -> Result<()> {
        self.conn
            .clone()
            .zadd::<_, _, _, ()>(RedisKeys::scores(leaderboard_id), member, index_score(value))
            .await?;
        Ok(())
    }

    async fn rank(&self, leaderboard_id: &str, member: &str) -> Result<Option<u64>> {
        let rank: Option<u64> = self
            .conn
            .clone()
            .zrank(RedisKeys::scores(leaderboard_id), member)
            .await?;
        Ok(rank.map(|r| r + 1))
    }

    async fn range_by_rank(
        &self,
        leaderboard_id: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<String>> {
        let members: Vec<String> = self
            .conn
            .clone()
            .zrange(RedisKeys::scores(leaderboard_id), offset(start), offset(stop))
            .await?;
        Ok(members)
    }
}

#[async_trait]
impl AttributeStore for RedisStore {
    async fn set_attributes(
        &self,
        leaderboard_id: &str,
        attributes: &ScoreAttributes,
    ) -> Result<()> {
        let fields = attributes.to_fields();
        self.conn
            .clone()
            .hset_multiple::<_, _, _, ()>(
                RedisKeys::user(leaderboard_id, &attributes.user_id),
                fields.as_slice(),
            )
            .await?;
        Ok(())
    }

    async fn get_attributes(
        &self,
        leaderboard_id: &str,
        members: &[String],
    ) -> Result<Vec<Option<ScoreAttributes>>> {
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for member in members {
            pipe.hgetall(RedisKeys::user(leaderboard_id, member));
        }
        let values: Vec<Value> = pipe.query_async(&mut self.conn.clone()).await?;

        values.iter().map(decode_attributes).collect()
    }
}

#[async_trait]
impl LeaderboardStore for RedisStore {
    async fn write(&self, leaderboard_id: &str, attributes: &ScoreAttributes) -> Result<()> {
        let fields = attributes.to_fields();
        trace!(leaderboard_id, user_id = %attributes.user_id, ?fields, "Writing score");

        let mut pipe = redis::pipe();
        pipe.atomic()
            .zadd(
                RedisKeys::scores(leaderboard_id),
                &attributes.user_id,
                index_score(attributes.value),
            )
            .ignore()
            .hset_multiple(
                RedisKeys::user(leaderboard_id, &attributes.user_id),
                fields.as_slice(),
            )
            .ignore();

        let _: () = pipe.query_async(&mut self.conn.clone()).await?;
        Ok(())
    }

    async fn execute(&self, batch: &BatchRequest) -> Result<BatchResponse> {
        if batch.is_empty() {
            return Ok(BatchResponse::default());
        }

        let leaderboard_id = batch.leaderboard_id();
        let scores_key = RedisKeys::scores(leaderboard_id);

        let mut pipe = redis::pipe();
        for lookup in batch.lookups() {
            match lookup {
                Lookup::Rank(member) => {
                    pipe.zrank(&scores_key, member);
                }
                Lookup::Range { start, stop } => {
                    pipe.zrange(&scores_key, offset(*start), offset(*stop));
                }
                Lookup::Attributes(member) => {
                    pipe.hgetall(RedisKeys::user(leaderboard_id, member));
                }
            }
        }

        let values: Vec<Value> = pipe.query_async(&mut self.conn.clone()).await?;
        trace!(leaderboard_id, lookups = batch.len(), "Executed lookup pipeline");

        let replies = batch
            .lookups()
            .iter()
            .zip(values.iter())
            .map(|(lookup, value)| -> Result<Reply> {
                Ok(match lookup {
                    Lookup::Rank(_) => {
                        let rank: Option<u64> = redis::from_redis_value(value)?;
                        Reply::Rank(rank.map(|r| r + 1))
                    }
                    Lookup::Range { .. } => Reply::Members(redis::from_redis_value(value)?),
                    Lookup::Attributes(_) => Reply::Attributes(decode_attributes(value)?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(BatchResponse::new(replies))
    }
}

#[async_trait]
impl LeaderboardCatalog for RedisStore {
    async fn save_leaderboard(
        &self,
        game_id: &str,
        app_id: &str,
        leaderboard_id: &str,
        name: &str,
    ) -> Result<()> {
        self.conn
            .clone()
            .hset::<_, _, _, ()>(RedisKeys::leaderboards(game_id, app_id), leaderboard_id, name)
            .await?;
        Ok(())
    }

    async fn list_leaderboards(
        &self,
        game_id: &str,
        app_id: &str,
    ) -> Result<Vec<(String, String)>> {
        let all: HashMap<String, String> = self
            .conn
            .clone()
            .hgetall(RedisKeys::leaderboards(game_id, app_id))
            .await?;
        let mut leaderboards: Vec<(String, String)> = all.into_iter().collect();
        leaderboards.sort();
        Ok(leaderboards)
    }
}
