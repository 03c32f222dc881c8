use serde::{Deserialize, Serialize};

use crate::{Score, Scope};

/// A named ranking scoped to a (game, app) pair, e.g. coins or level highscores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    #[serde(flatten)]
    pub scope: Scope,
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub scores: Vec<Score>,
}

impl Leaderboard {
    /// The entry tagged as the requesting player, if present.
    pub fn me(&self) -> Option<&Score> {
        self.scores
            .iter()
            .find(|score| score.kind == crate::ScoreKind::Me)
    }
}
