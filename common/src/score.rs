use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::Scope;

/// Display category of an entry inside one response. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    Top,
    Me,
    #[default]
    Other,
}

/// One player's entry in one leaderboard.
///
/// `position` and `kind` are derived per read and only meaningful in the
/// response they came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    #[serde(flatten)]
    pub scope: Scope,
    pub leaderboard_id: String,
    pub name: String,
    /// Unix seconds when the player posted the score
    pub timestamp: i64,
    pub value: f64,
    #[serde(rename = "type", default)]
    pub kind: ScoreKind,
    #[serde(default)]
    pub position: u64,
    pub ip: String,
    pub country: String,
}

impl Score {
    pub fn user_id(&self) -> &str {
        &self.scope.user_id
    }

    /// Fields written to the attribute store alongside the index upsert.
    pub fn attributes(&self) -> ScoreAttributes {
        ScoreAttributes {
            user_id: self.scope.user_id.clone(),
            name: self.name.clone(),
            country: self.country.clone(),
            ip: self.ip.clone(),
            timestamp: self.timestamp,
            value: self.value,
        }
    }

    /// Rebuilds an entry from a stored record. The player comes from the
    /// record, game and app from the requesting scope.
    pub fn from_attributes(
        scope: &Scope,
        leaderboard_id: &str,
        attributes: ScoreAttributes,
    ) -> Self {
        Self {
            scope: scope.with_user(attributes.user_id),
            leaderboard_id: leaderboard_id.to_string(),
            name: attributes.name,
            timestamp: attributes.timestamp,
            value: attributes.value,
            kind: ScoreKind::Other,
            position: 0,
            ip: attributes.ip,
            country: attributes.country,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum AttributeError {
    #[error("score attribute `{0}` is missing")]
    Missing(&'static str),
    #[error("score attribute `{field}` has invalid value `{value}`")]
    Invalid { field: &'static str, value: String },
}

/// Display attributes stored per (leaderboard, member).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreAttributes {
    pub user_id: String,
    pub name: String,
    pub country: String,
    pub ip: String,
    pub timestamp: i64,
    pub value: f64,
}

impl ScoreAttributes {
    /// Flat field list, in the order it is written to a hash.
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("country", self.country.clone()),
            ("ip", self.ip.clone()),
            ("name", self.name.clone()),
            ("timestamp", self.timestamp.to_string()),
            ("value", self.value.to_string()),
            ("user_id", self.user_id.clone()),
        ]
    }

    /// Parses a stored hash. An empty map means "no record" and yields `None`.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Option<Self>, AttributeError> {
        if fields.is_empty() {
            return Ok(None);
        }

        let text = |field: &'static str| fields.get(field).cloned().unwrap_or_default();

        let user_id = fields
            .get("user_id")
            .filter(|id| !id.is_empty())
            .cloned()
            .ok_or(AttributeError::Missing("user_id"))?;

        let value_raw = fields.get("value").ok_or(AttributeError::Missing("value"))?;
        let value = value_raw.parse::<f64>().map_err(|_| AttributeError::Invalid {
            field: "value",
            value: value_raw.clone(),
        })?;

        let timestamp_raw = fields
            .get("timestamp")
            .ok_or(AttributeError::Missing("timestamp"))?;
        let timestamp = timestamp_raw.parse::<i64>().map_err(|_| AttributeError::Invalid {
            field: "timestamp",
            value: timestamp_raw.clone(),
        })?;

        Ok(Some(Self {
            user_id,
            name: text("name"),
            country: text("country"),
            ip: text("ip"),
            timestamp,
            value,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_fields_parse_back() {
        let attributes = ScoreAttributes {
            user_id: "u-1".to_string(),
            name: "Alice".to_string(),
            country: "by".to_string(),
            ip: "1.1.1.1".to_string(),
            timestamp: 1_650_000_000,
            value: 101.5,
        };
        let fields: HashMap<String, String> = attributes
            .to_fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        assert_eq!(ScoreAttributes::from_fields(&fields).unwrap(), Some(attributes));
    }

    #[test]
    fn test_empty_hash_is_absent() {
        assert_eq!(ScoreAttributes::from_fields(&HashMap::new()).unwrap(), None);
    }

    #[test]
    fn test_optional_text_fields_default_to_empty() {
        let fields = stored(&[("user_id", "u-2"), ("value", "7"), ("timestamp", "0")]);
        let parsed = ScoreAttributes::from_fields(&fields).unwrap().unwrap();
        assert_eq!(parsed.name, "");
        assert_eq!(parsed.country, "");
        assert_eq!(parsed.value, 7.0);
    }

    #[test]
    fn test_bad_numbers_are_reported() {
        let fields = stored(&[("user_id", "u"), ("value", "lots"), ("timestamp", "1")]);
        assert_eq!(
            ScoreAttributes::from_fields(&fields),
            Err(AttributeError::Invalid { field: "value", value: "lots".to_string() })
        );

        let fields = stored(&[("user_id", "u"), ("value", "1")]);
        assert_eq!(
            ScoreAttributes::from_fields(&fields),
            Err(AttributeError::Missing("timestamp"))
        );
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ScoreKind::Top).unwrap(), "\"top\"");
        assert_eq!(serde_json::to_string(&ScoreKind::Me).unwrap(), "\"me\"");
    }

    #[test]
    fn test_score_json_is_flat() {
        let score = Score {
            scope: Scope::new("g", "a", "u"),
            leaderboard_id: "coins".to_string(),
            value: 3.0,
            position: 2,
            kind: ScoreKind::Me,
            ..Default::default()
        };
        let json = serde_json::to_value(&score).unwrap();
        assert_eq!(json["user_id"], "u");
        assert_eq!(json["game_id"], "g");
        assert_eq!(json["type"], "me");
        assert_eq!(json["position"], 2);
    }
}
