use async_trait::async_trait;
use common::ScoreAttributes;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{
    AttributeStore, BatchRequest, BatchResponse, LeaderboardCatalog, LeaderboardStore, Lookup,
    Reply, ScoreIndex,
};
use crate::error::Result;

/// Sort key of the in-process index: value descending, then member ascending.
#[derive(Debug, Clone)]
struct RankKey {
    value: f64,
    member: String,
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .value
            .total_cmp(&self.value)
            .then_with(|| self.member.cmp(&other.member))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankKey {}

#[derive(Debug, Default)]
struct Board {
    values: HashMap<String, f64>,
    // kept sorted, binary searched for rank and insert position
    order: Vec<RankKey>,
    attributes: HashMap<String, ScoreAttributes>,
}

impl Board {
    fn upsert(&mut self, member: &str, value: f64) {
        let value = value + 0.0;
        self.remove(member);
        self.values.insert(member.to_string(), value);

        let key = RankKey {
            value,
            member: member.to_string(),
        };
        let at = self.order.binary_search(&key).unwrap_or_else(|i| i);
        self.order.insert(at, key);
    }

    fn remove(&mut self, member: &str) {
        let Some(value) = self.values.remove(member) else {
            return;
        };
        let key = RankKey {
            value,
            member: member.to_string(),
        };
        if let Ok(i) = self.order.binary_search(&key) {
            self.order.remove(i);
        }
    }

    fn rank(&self, member: &str) -> Option<u64> {
        let value = *self.values.get(member)?;
        let key = RankKey {
            value,
            member: member.to_string(),
        };
        self.order.binary_search(&key).ok().map(|i| i as u64 + 1)
    }

    fn range(&self, start: u64, stop: u64) -> Vec<String> {
        let len = self.order.len() as u64;
        if start >= len || start > stop {
            return Vec::new();
        }
        let stop = stop.min(len - 1);
        self.order[start as usize..=stop as usize]
            .iter()
            .map(|key| key.member.clone())
            .collect()
    }
}

/// In-process leaderboard store.
///
/// Rank and range are O(log n) and O(log n + k); an upsert shifts the sorted
/// index and is O(n).
#[derive(Default)]
pub struct MemoryStore {
    boards: RwLock<HashMap<String, Board>>,
    catalog: RwLock<HashMap<(String, String), BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ranked members in a leaderboard
    pub async fn len(&self, leaderboard_id: &str) -> usize {
        self.boards
            .read()
            .await
            .get(leaderboard_id)
            .map_or(0, |board| board.order.len())
    }

    /// Forgets a member's attribute record but keeps its index entry, like an
    /// evicted attribute key.
    pub async fn remove_attributes(&self, leaderboard_id: &str, member: &str) {
        if let Some(board) = self.boards.write().await.get_mut(leaderboard_id) {
            board.attributes.remove(member);
        }
    }

    /// Takes a member out of the ranking but keeps its attribute record.
    pub async fn remove_member(&self, leaderboard_id: &str, member: &str) {
        if let Some(board) = self.boards.write().await.get_mut(leaderboard_id) {
            board.remove(member);
        }
    }

    pub async fn drop_leaderboard(&self, leaderboard_id: &str) {
        self.boards.write().await.remove(leaderboard_id);
    }
}

#[async_trait]
impl ScoreIndex for MemoryStore {
    async fn upsert(&self, leaderboard_id: &str, member: &str, value: f64) -> Result<()> {
        self.boards
            .write()
            .await
            .entry(leaderboard_id.to_string())
            .or_default()
            .upsert(member, value);
        Ok(())
    }

    async fn rank(&self, leaderboard_id: &str, member: &str) -> Result<Option<u64>> {
        Ok(self
            .boards
            .read()
            .await
            .get(leaderboard_id)
            .and_then(|board| board.rank(member)))
    }

    async fn range_by_rank(
        &self,
        leaderboard_id: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<String>> {
        Ok(self
            .boards
            .read()
            .await
            .get(leaderboard_id)
            .map(|board| board.range(start, stop))
            .unwrap_or_default())
    }
}

#[async_trait]
impl AttributeStore for MemoryStore {
    async fn set_attributes(
        &self,
        leaderboard_id: &str,
        attributes: &ScoreAttributes,
    ) -> Result<()> {
        self.boards
            .write()
            .await
            .entry(leaderboard_id.to_string())
            .or_default()
            .attributes
            .insert(attributes.user_id.clone(), attributes.clone());
        Ok(())
    }

    async fn get_attributes(
        &self,
        leaderboard_id: &str,
        members: &[String],
    ) -> Result<Vec<Option<ScoreAttributes>>> {
        let boards = self.boards.read().await;
        let board = boards.get(leaderboard_id);
        Ok(members
            .iter()
            .map(|member| board.and_then(|b| b.attributes.get(member).cloned()))
            .collect())
    }
}

#[async_trait]
impl LeaderboardStore for MemoryStore {
    async fn write(&self, leaderboard_id: &str, attributes: &ScoreAttributes) -> Result<()> {
        let mut boards = self.boards.write().await;
        let board = boards.entry(leaderboard_id.to_string()).or_default();
        board.upsert(&attributes.user_id, attributes.value);
        board
            .attributes
            .insert(attributes.user_id.clone(), attributes.clone());
        Ok(())
    }

    async fn execute(&self, batch: &BatchRequest) -> Result<BatchResponse> {
        let boards = self.boards.read().await;
        let board = boards.get(batch.leaderboard_id());

        let replies = batch
            .lookups()
            .iter()
            .map(|lookup| match lookup {
                Lookup::Rank(member) => Reply::Rank(board.and_then(|b| b.rank(member))),
                Lookup::Range { start, stop } => Reply::Members(
                    board
                        .map(|b| b.range(*start, *stop))
                        .unwrap_or_default(),
                ),
                Lookup::Attributes(member) => {
                    Reply::Attributes(board.and_then(|b| b.attributes.get(member).cloned()))
                }
            })
            .collect();

        Ok(BatchResponse::new(replies))
    }
}

#[async_trait]
impl LeaderboardCatalog for MemoryStore {
    async fn save_leaderboard(
        &self,
        game_id: &str,
        app_id: &str,
        leaderboard_id: &str,
        name: &str,
    ) -> Result<()> {
        self.catalog
            .write()
            .await
            .entry((game_id.to_string(), app_id.to_string()))
            .or_default()
            .insert(leaderboard_id.to_string(), name.to_string());
        Ok(())
    }

    async fn list_leaderboards(
        &self,
        game_id: &str,
        app_id: &str,
    ) -> Result<Vec<(String, String)>> {
        Ok(self
            .catalog
            .read()
            .await
            .get(&(game_id.to_string(), app_id.to_string()))
            .map(|boards| {
                boards
                    .iter()
                    .map(|(id, name)| (id.clone(), name.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
