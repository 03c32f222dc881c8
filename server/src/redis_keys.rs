pub struct RedisKeys;

impl RedisKeys {
    /// Sorted set ranking members of one leaderboard
    pub fn scores(leaderboard_id: &str) -> String {
        format!("scores:{}", leaderboard_id)
    }

    /// Attribute hash of one member in one leaderboard
    pub fn user(leaderboard_id: &str, user_id: &str) -> String {
        format!("users:{}:{}", leaderboard_id, user_id)
    }

    /// Hash of leaderboard id -> display name for a game/app pair
    pub fn leaderboards(game_id: &str, app_id: &str) -> String {
        format!("leaderboards:{}:{}", game_id, app_id)
    }
}
