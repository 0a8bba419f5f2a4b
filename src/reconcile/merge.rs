//! Managed-vs-live merge
//!
//! Compares the managed inventory of one environment with the names the
//! cluster reports. Both inputs are sorted and de-duplicated before merging,
//! so the same pair of snapshots always produces the same rows and sequence
//! numbers.

use crate::domain::{InventoryEntry, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How a name relates to the managed inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Remark {
    /// Live on the cluster, not managed
    Added,
    /// Live and managed
    InSync,
    /// Managed, no longer live
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedRow {
    /// Dense, zero-based position in the unpaged view
    pub sequence: usize,
    pub name: String,
    pub remark: Remark,
    /// Owning team; `None` for unmanaged names
    pub team_id: Option<TeamId>,
}

fn matches_search(name: &str, search: Option<&str>) -> bool {
    search.map_or(true, |s| s.is_empty() || name.contains(s))
}

/// Merge the two snapshots into ADDED rows, then in-sync rows, then DELETED rows
pub fn merge(managed: &[InventoryEntry], live: &[String], search: Option<&str>) -> Vec<MergedRow> {
    // first entry per name wins; ids break ties deterministically
    let mut owners: BTreeMap<&str, (i32, TeamId)> = BTreeMap::new();
    for entry in managed.iter().filter(|e| matches_search(&e.name, search)) {
        owners
            .entry(entry.name.as_str())
            .and_modify(|slot| {
                if entry.id < slot.0 {
                    *slot = (entry.id, entry.team_id);
                }
            })
            .or_insert((entry.id, entry.team_id));
    }

    let live: BTreeSet<&str> = live
        .iter()
        .map(String::as_str)
        .filter(|name| matches_search(name, search))
        .collect();

    let added = live
        .iter()
        .filter(|name| !owners.contains_key(*name))
        .map(|name| (*name, Remark::Added, None));

    let in_sync = owners
        .iter()
        .filter(|(name, _)| live.contains(*name))
        .map(|(name, (_, team))| (*name, Remark::InSync, Some(*team)));

    let deleted = owners
        .iter()
        .filter(|(name, _)| !live.contains(*name))
        .map(|(name, (_, team))| (*name, Remark::Deleted, Some(*team)));

    added
        .chain(in_sync)
        .chain(deleted)
        .enumerate()
        .map(|(sequence, (name, remark, team_id))| MergedRow {
            sequence,
            name: name.to_string(),
            remark,
            team_id,
        })
        .collect()
}
