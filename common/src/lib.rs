mod leaderboard;
mod scope;
mod score;

pub use leaderboard::Leaderboard;
pub use scope::Scope;
pub use score::{AttributeError, Score, ScoreAttributes, ScoreKind};
