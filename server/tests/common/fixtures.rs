use anyhow::Result;
use ::common::{Leaderboard, Score, ScoreKind, Scope};
use leaderboard::store::MemoryStore;
use leaderboard::{LeaderboardService, WindowConfig};
use std::sync::Arc;

pub const GAME_ID: &str = "game-1";
pub const APP_ID: &str = "app-1";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn scope(user_id: &str) -> Scope {
    Scope::new(GAME_ID, APP_ID, user_id)
}

/// A score payload as a client would post it
pub fn score(leaderboard_id: &str, value: f64) -> Score {
    Score {
        leaderboard_id: leaderboard_id.to_string(),
        value,
        name: "player".to_string(),
        ip: "8.8.8.8".to_string(),
        country: "us".to_string(),
        timestamp: 1,
        ..Default::default()
    }
}

pub fn memory_service(window: WindowConfig) -> (Arc<MemoryStore>, LeaderboardService) {
    let store = Arc::new(MemoryStore::new());
    let service = LeaderboardService::new(store.clone(), window);
    (store, service)
}

pub fn window_of(size: usize) -> WindowConfig {
    WindowConfig {
        size,
        ..Default::default()
    }
}

/// Posts `(user, value)` pairs, each as its own player
pub async fn seed(
    service: &LeaderboardService,
    leaderboard_id: &str,
    entries: &[(&str, f64)],
) -> Result<()> {
    for (user_id, value) in entries {
        service
            .set_score(&scope(user_id), score(leaderboard_id, *value))
            .await?;
    }
    Ok(())
}

/// Posts `count` players named `p0001..` where `pN` has value N, so the
/// rank of `pN` is `count + 1 - N`.
pub async fn seed_numbered(
    service: &LeaderboardService,
    leaderboard_id: &str,
    count: usize,
) -> Result<()> {
    for i in 1..=count {
        service
            .set_score(&scope(&numbered(i)), score(leaderboard_id, i as f64))
            .await?;
    }
    Ok(())
}

pub fn numbered(i: usize) -> String {
    format!("p{:04}", i)
}

pub fn user_ids(leaderboard: &Leaderboard) -> Vec<&str> {
    leaderboard
        .scores
        .iter()
        .map(|score| score.scope.user_id.as_str())
        .collect()
}

pub fn positions(leaderboard: &Leaderboard) -> Vec<u64> {
    leaderboard.scores.iter().map(|score| score.position).collect()
}

pub fn kinds(leaderboard: &Leaderboard) -> Vec<ScoreKind> {
    leaderboard.scores.iter().map(|score| score.kind).collect()
}

pub fn assert_strictly_increasing(leaderboard: &Leaderboard) {
    let positions = positions(leaderboard);
    assert!(
        positions.windows(2).all(|pair| pair[0] < pair[1]),
        "positions not strictly increasing: {:?}",
        positions
    );
}
