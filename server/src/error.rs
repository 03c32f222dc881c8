use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LeaderboardError>;

#[derive(Debug, Error)]
pub enum LeaderboardError {
    /// Backing store unreachable or returned an error.
    #[error("store error: {0}")]
    Store(#[from] redis::RedisError),
    #[error("corrupt score attributes: {0}")]
    Attributes(#[from] common::AttributeError),
    #[error("score value for user {user_id} in leaderboard {leaderboard_id} is not a number")]
    InvalidScore {
        leaderboard_id: String,
        user_id: String,
    },
    #[error("user {0} is not allowed to post scores")]
    BlockedUser(String),
    #[error("batch reply {index} was {found}, expected {expected}")]
    UnexpectedReply {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },
    #[error("leaderboard request timed out after {0:?}")]
    Timeout(Duration),
    #[error("leaderboard request cancelled")]
    Cancelled,
}
