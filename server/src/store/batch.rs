//! Batched lookups against one leaderboard.
//!
//! A [`BatchRequest`] is an ordered list of lookups; a [`BatchResponse`] holds
//! one [`Reply`] per lookup in the same order. Stores that can pipeline send
//! the whole batch in a single round trip.

use common::ScoreAttributes;

use crate::error::{LeaderboardError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// 1-based descending rank of a member
    Rank(String),
    /// Members between two zero-based offsets, inclusive
    Range { start: u64, stop: u64 },
    /// Stored display attributes of a member
    Attributes(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Rank(Option<u64>),
    Members(Vec<String>),
    Attributes(Option<ScoreAttributes>),
}

impl Reply {
    fn kind(&self) -> &'static str {
        match self {
            Reply::Rank(_) => "rank",
            Reply::Members(_) => "members",
            Reply::Attributes(_) => "attributes",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchRequest {
    leaderboard_id: String,
    lookups: Vec<Lookup>,
}

impl BatchRequest {
    pub fn new(leaderboard_id: impl Into<String>) -> Self {
        Self {
            leaderboard_id: leaderboard_id.into(),
            lookups: Vec::new(),
        }
    }

    pub fn push(&mut self, lookup: Lookup) -> &mut Self {
        self.lookups.push(lookup);
        self
    }

    pub fn ranks<I, S>(leaderboard_id: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut batch = Self::new(leaderboard_id);
        batch
            .lookups
            .extend(members.into_iter().map(|m| Lookup::Rank(m.into())));
        batch
    }

    pub fn attributes<I, S>(leaderboard_id: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut batch = Self::new(leaderboard_id);
        batch
            .lookups
            .extend(members.into_iter().map(|m| Lookup::Attributes(m.into())));
        batch
    }

    pub fn leaderboard_id(&self) -> &str {
        &self.leaderboard_id
    }

    pub fn lookups(&self) -> &[Lookup] {
        &self.lookups
    }

    pub fn len(&self) -> usize {
        self.lookups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResponse {
    replies: Vec<Reply>,
}

impl BatchResponse {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self { replies }
    }

    pub fn into_replies(self) -> Vec<Reply> {
        self.replies
    }

    pub fn into_ranks(self) -> Result<Vec<Option<u64>>> {
        self.extract("rank", |reply| match reply {
            Reply::Rank(rank) => Ok(rank),
            other => Err(other),
        })
    }

    pub fn into_members(self) -> Result<Vec<Vec<String>>> {
        self.extract("members", |reply| match reply {
            Reply::Members(members) => Ok(members),
            other => Err(other),
        })
    }

    pub fn into_attributes(self) -> Result<Vec<Option<ScoreAttributes>>> {
        self.extract("attributes", |reply| match reply {
            Reply::Attributes(attributes) => Ok(attributes),
            other => Err(other),
        })
    }

    fn extract<T>(
        self,
        expected: &'static str,
        take: impl Fn(Reply) -> std::result::Result<T, Reply>,
    ) -> Result<Vec<T>> {
        self.replies
            .into_iter()
            .enumerate()
            .map(|(index, reply)| {
                take(reply).map_err(|other| LeaderboardError::UnexpectedReply {
                    index,
                    expected,
                    found: other.kind(),
                })
            })
            .collect()
    }
}
