//! Viewer-centred slices of a leaderboard.
//!
//! A window holds at most `size` entries: the global top entry, the viewer,
//! and the viewer's neighbourhood. Every store call touches O(size) members
//! regardless of how large the leaderboard is.

use common::{Score, ScoreKind, Scope};
use std::collections::HashSet;
use tracing::{debug, trace};

use crate::error::Result;
use crate::store::{BatchRequest, LeaderboardStore, Lookup};

pub const DEFAULT_WINDOW_SIZE: usize = 100;

/// Candidates fetched on each side of the viewer, as a multiple of the window
/// size, so that dedup and attribute misses still leave a full window.
const OVERFETCH_FACTOR: u64 = 2;

/// What a viewer without a score gets to see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnrankedPolicy {
    /// Only the global top entry
    #[default]
    TopOnly,
    /// The first `size` ranks
    Head,
}

impl std::str::FromStr for UnrankedPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "top" | "top-only" => Ok(UnrankedPolicy::TopOnly),
            "head" => Ok(UnrankedPolicy::Head),
            other => Err(format!("unknown unranked viewer policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    /// Maximum number of entries in one window
    pub size: usize,
    pub unranked: UnrankedPolicy,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_WINDOW_SIZE,
            unranked: UnrankedPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WindowBuilder {
    config: WindowConfig,
}

impl WindowBuilder {
    pub fn new(config: WindowConfig) -> Self {
        Self { config }
    }

    /// Builds the window of `leaderboard_id` for the player in `viewer`.
    ///
    /// Entries come back sorted by position with `position` and `kind` set.
    /// Members that vanish between the rank and attribute lookups are left
    /// out; only store failures are errors.
    pub async fn build<S>(
        &self,
        store: &S,
        viewer: &Scope,
        leaderboard_id: &str,
    ) -> Result<Vec<Score>>
    where
        S: LeaderboardStore + ?Sized,
    {
        let size = self.config.size;
        if size == 0 {
            return Ok(Vec::new());
        }
        let viewer_id = viewer.user_id.as_str();

        let viewer_rank = store.rank(leaderboard_id, viewer_id).await?;
        debug!(leaderboard_id, user_id = viewer_id, rank = ?viewer_rank, "Viewer rank");

        // Round 1: top member and candidate ids
        let mut ids = BatchRequest::new(leaderboard_id);
        ids.push(Lookup::Range { start: 0, stop: 0 });
        match (viewer_rank, self.config.unranked) {
            (Some(rank), _) => {
                let spread = OVERFETCH_FACTOR * size as u64;
                let offset = rank.saturating_sub(1);
                ids.push(Lookup::Range {
                    start: offset.saturating_sub(spread),
                    stop: offset.saturating_add(spread),
                });
            }
            (None, UnrankedPolicy::Head) => {
                ids.push(Lookup::Range {
                    start: 0,
                    stop: size as u64 - 1,
                });
            }
            (None, UnrankedPolicy::TopOnly) => {}
        }

        let mut ranges = store.execute(&ids).await?.into_members()?.into_iter();
        let Some(top) = ranges.next().and_then(|top| top.into_iter().next()) else {
            debug!(leaderboard_id, "Leaderboard has no entries");
            return Ok(Vec::new());
        };
        let candidates = ranges.next().unwrap_or_default();
        trace!(leaderboard_id, top = %top, candidates = candidates.len(), "Fetched window ids");

        // Viewer and top first, each member once
        let mut members = Vec::with_capacity(candidates.len() + 2);
        let mut seen = HashSet::with_capacity(candidates.len() + 2);
        if viewer_rank.is_some() && seen.insert(viewer_id.to_string()) {
            members.push(viewer_id.to_string());
        }
        for member in std::iter::once(top).chain(candidates) {
            if seen.insert(member.clone()) {
                members.push(member);
            }
        }

        // Round 2: attributes; misses drop out
        let attributes = store
            .execute(&BatchRequest::attributes(leaderboard_id, &members))
            .await?
            .into_attributes()?;
        let entries: Vec<Score> = members
            .iter()
            .zip(attributes)
            .filter_map(|(member, found)| match found {
                Some(attributes) => {
                    Some(Score::from_attributes(viewer, leaderboard_id, attributes))
                }
                None => {
                    trace!(leaderboard_id, member = %member, "No attributes, skipping");
                    None
                }
            })
            .collect();

        // Round 3: current positions of the survivors
        let ranks = store
            .execute(&BatchRequest::ranks(
                leaderboard_id,
                entries.iter().map(|entry| entry.user_id().to_string()),
            ))
            .await?
            .into_ranks()?;
        let mut entries: Vec<Score> = entries
            .into_iter()
            .zip(ranks)
            .filter_map(|(mut entry, rank)| {
                entry.position = rank?;
                Some(entry)
            })
            .collect();

        entries.sort_by_key(|entry| entry.position);
        let entries = centre_on_viewer(entries, viewer_id, size);
        let mut entries = fit_to_size(entries, viewer_id, size);
        tag(&mut entries, viewer_id);

        debug!(leaderboard_id, user_id = viewer_id, entries = entries.len(), "Built window");
        Ok(entries)
    }
}

/// Cuts a sorted list down to the top entry, the viewer and `size - 1`
/// neighbours once the viewer would not survive truncation to `size`.
///
/// Neighbours are taken one better, one worse, alternately; once a side runs
/// out the other side fills the remaining slots. The result can hold
/// `size + 1` entries and is meant to go through [`fit_to_size`].
fn centre_on_viewer(entries: Vec<Score>, viewer_id: &str, size: usize) -> Vec<Score> {
    let Some(me) = entries.iter().position(|entry| entry.user_id() == viewer_id) else {
        return entries;
    };
    if me < size {
        return entries;
    }

    let mut keep = vec![false; entries.len()];
    keep[me] = true;
    keep[0] = true;

    let budget = size.saturating_sub(1);
    let mut neighbours = 0;
    let mut step = 1;
    while neighbours < budget {
        // index 0 is the top entry and is kept regardless
        let better = me.checked_sub(step).filter(|&i| i > 0);
        let worse = Some(me + step).filter(|&i| i < entries.len());
        if better.is_none() && worse.is_none() {
            break;
        }
        for i in [better, worse].into_iter().flatten() {
            if neighbours < budget {
                keep[i] = true;
                neighbours += 1;
            }
        }
        step += 1;
    }

    entries
        .into_iter()
        .zip(keep)
        .filter_map(|(entry, keep)| keep.then_some(entry))
        .collect()
}

/// Keeps the first `size` entries of a sorted list. When that would cut the
/// viewer, the best neighbours after the top entry go instead, so the window
/// stays contiguous up to the viewer.
fn fit_to_size(mut entries: Vec<Score>, viewer_id: &str, size: usize) -> Vec<Score> {
    let viewer = entries
        .iter()
        .position(|entry| entry.user_id() == viewer_id)
        .filter(|&me| me >= size);
    let Some(me) = viewer else {
        entries.truncate(size);
        return entries;
    };

    entries.truncate(me + 1);
    let excess = entries.len() - size;
    // with a single slot the viewer wins over the top entry
    let first = usize::from(size > 1);
    entries.drain(first..first + excess);
    entries
}

/// The viewer's entry is `me` even at rank 1; otherwise rank 1 is `top`.
fn tag(entries: &mut [Score], viewer_id: &str) {
    for entry in entries {
        entry.kind = if entry.user_id() == viewer_id {
            ScoreKind::Me
        } else if entry.position == 1 {
            ScoreKind::Top
        } else {
            ScoreKind::Other
        };
    }
}
