//! Ordered, keyed snapshots of a list and the minimal diff between two of them.
//!
//! Rows are keyed by [`ArticleId`]. A diff is expressed as removals (old
//! indices), insertions (new indices), moves and reloads, the shape a
//! table-style presentation layer applies in one batch. Surviving rows on the
//! longest increasing subsequence of old positions stay put; every other
//! survivor becomes a move, so the number of moves is minimal.

use crate::api::{Article, ArticleId, ListId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One row operation of a [`SnapshotDiff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowChange {
    /// Row removed from old index `at`.
    Remove { id: ArticleId, at: usize },
    /// Row inserted at new index `at`.
    Insert { id: ArticleId, at: usize },
    /// Surviving row moved from old index `from` to new index `to`.
    Move {
        id: ArticleId,
        from: usize,
        to: usize,
    },
    /// Surviving row at new index `at` whose displayed content changed.
    Reload { id: ArticleId, at: usize },
}

/// Batch of row changes turning one ordered snapshot into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub changes: Vec<RowChange>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn count(&self, pred: impl Fn(&RowChange) -> bool) -> usize {
        self.changes.iter().filter(|c| pred(c)).count()
    }

    /// Applies the batch to `old` and returns the resulting order.
    ///
    /// Removed and moved rows leave their old positions; inserted and moved
    /// rows take their new positions; the remaining rows fill the gaps in
    /// their original relative order.
    pub fn apply(&self, old: &[ArticleId]) -> Vec<ArticleId> {
        let mut leaving: HashSet<usize> = HashSet::new();
        let mut placed: Vec<(usize, ArticleId)> = Vec::new();

        for change in &self.changes {
            match *change {
                RowChange::Remove { at, .. } => {
                    leaving.insert(at);
                }
                RowChange::Insert { id, at } => placed.push((at, id)),
                RowChange::Move { id, from, to } => {
                    leaving.insert(from);
                    placed.push((to, id));
                }
                RowChange::Reload { .. } => {}
            }
        }

        let mut staying = old
            .iter()
            .enumerate()
            .filter(|(i, _)| !leaving.contains(i))
            .map(|(_, id)| *id);

        let len = old.len() - leaving.len() + placed.len();
        let mut slots: Vec<Option<ArticleId>> = vec![None; len];
        for (at, id) in placed {
            if let Some(slot) = slots.get_mut(at) {
                *slot = Some(id);
            }
        }

        slots
            .into_iter()
            .filter_map(|slot| slot.or_else(|| staying.next()))
            .collect()
    }
}

/// Minimal diff from `old` to `new`.
///
/// `new` must not contain duplicate ids; see [`ListSnapshotEngine::diff_and_apply`].
pub fn diff(old: &[Arc<Article>], new: &[Arc<Article>]) -> SnapshotDiff {
    let old_pos: HashMap<ArticleId, usize> =
        old.iter().enumerate().map(|(i, a)| (a.id, i)).collect();
    let new_ids: HashSet<ArticleId> = new.iter().map(|a| a.id).collect();

    let mut changes = Vec::new();

    for (at, article) in old.iter().enumerate() {
        if !new_ids.contains(&article.id) {
            changes.push(RowChange::Remove { id: article.id, at });
        }
    }

    // (new index, old index) of every surviving row, in new order
    let mut survivors: Vec<(usize, usize)> = Vec::new();
    for (at, article) in new.iter().enumerate() {
        match old_pos.get(&article.id) {
            Some(&from) => survivors.push((at, from)),
            None => changes.push(RowChange::Insert { id: article.id, at }),
        }
    }

    let old_order: Vec<usize> = survivors.iter().map(|&(_, from)| from).collect();
    let stable: HashSet<usize> = longest_increasing_subsequence(&old_order)
        .into_iter()
        .collect();

    for (k, &(to, from)) in survivors.iter().enumerate() {
        if !stable.contains(&k) {
            changes.push(RowChange::Move {
                id: new[to].id,
                from,
                to,
            });
        }
    }

    for &(to, from) in &survivors {
        if !old[from].same_content(&new[to]) {
            changes.push(RowChange::Reload { id: new[to].id, at: to });
        }
    }

    SnapshotDiff { changes }
}

/// Indices (into `seq`) of one longest strictly increasing subsequence.
fn longest_increasing_subsequence(seq: &[usize]) -> Vec<usize> {
    // tails[k]: index in seq of the smallest tail of an increasing run of length k+1
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];

    for (i, &value) in seq.iter().enumerate() {
        let k = tails.partition_point(|&t| seq[t] < value);
        if k > 0 {
            prev[i] = Some(tails[k - 1]);
        }
        if k == tails.len() {
            tails.push(i);
        } else {
            tails[k] = i;
        }
    }

    let mut out = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        out.push(i);
        cursor = prev[i];
    }
    out.reverse();
    out
}

// ============================================================================
// Engine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Idle,
    Loading,
    Applying,
}

/// Holds the rendered snapshot of one list and applies new collections to it.
///
/// All mutation goes through `&mut self`, so a second apply for the same
/// list cannot start while one is running.
#[derive(Debug)]
pub struct ListSnapshotEngine {
    list: ListId,
    rows: Vec<Arc<Article>>,
    phase: EnginePhase,
}

impl ListSnapshotEngine {
    pub fn new(list: ListId) -> Self {
        Self {
            list,
            rows: Vec::new(),
            phase: EnginePhase::Idle,
        }
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Marks the start of a fetch for this list.
    pub fn begin_loading(&mut self) {
        self.phase = EnginePhase::Loading;
    }

    /// Returns to `Idle` without touching the snapshot (fetch failed).
    pub fn abort_loading(&mut self) {
        self.phase = EnginePhase::Idle;
    }

    /// Replaces the snapshot with `incoming` and returns the diff from the
    /// previous one.
    ///
    /// Later duplicates of an id in `incoming` are dropped.
    pub fn diff_and_apply(&mut self, incoming: &[Arc<Article>]) -> SnapshotDiff {
        self.phase = EnginePhase::Applying;

        let mut seen = HashSet::with_capacity(incoming.len());
        let next: Vec<Arc<Article>> = incoming
            .iter()
            .filter(|a| {
                let first = seen.insert(a.id);
                if !first {
                    tracing::warn!(list = %self.list, article_id = %a.id, "Dropping duplicate article id");
                }
                first
            })
            .cloned()
            .collect();

        let diff = diff(&self.rows, &next);
        tracing::debug!(
            list = %self.list,
            rows = next.len(),
            changes = diff.changes.len(),
            "Applied snapshot"
        );

        self.rows = next;
        self.phase = EnginePhase::Idle;
        diff
    }

    pub fn ids(&self) -> Vec<ArticleId> {
        self.rows.iter().map(|a| a.id).collect()
    }

    pub fn articles(&self) -> &[Arc<Article>] {
        &self.rows
    }

    pub fn article(&self, id: ArticleId) -> Option<Arc<Article>> {
        self.rows.iter().find(|a| a.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
