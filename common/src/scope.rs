use serde::{Deserialize, Serialize};

/// Tenant and player identity attached to requests and entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub game_id: String,
    pub app_id: String,
    pub user_id: String,
}

impl Scope {
    pub fn new(
        game_id: impl Into<String>,
        app_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            app_id: app_id.into(),
            user_id: user_id.into(),
        }
    }

    /// Same game and app, different player
    pub fn with_user(&self, user_id: impl Into<String>) -> Self {
        Self {
            game_id: self.game_id.clone(),
            app_id: self.app_id.clone(),
            user_id: user_id.into(),
        }
    }
}
