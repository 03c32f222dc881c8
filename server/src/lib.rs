pub mod config;
pub mod error;
pub mod geo;
pub mod redis_keys;
pub mod redis_utils;
pub mod service;
pub mod store;
pub mod window;

pub use config::LeaderboardConfig;
pub use error::{LeaderboardError, Result};
pub use service::LeaderboardService;
pub use window::{UnrankedPolicy, WindowBuilder, WindowConfig};
