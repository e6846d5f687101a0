//! Depth-bounded, heuristic-ordered depth-first path search.
//!
//! The traversal keeps an explicit stack of frames instead of recursing. Each
//! frame is a page on the current path together with its ranked candidates
//! and a cursor into them. Pushing a frame enters a page; popping one
//! backtracks and removes the page from `visited`, so the page may be entered
//! again later through a different parent.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::OnceCell;

use super::{GraphExpander, HeuristicEvaluator};
use crate::graph::GraphStore;
use crate::{Result, WikipathError};

/// Limits for one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Deepest page index a path may reach; a path has at most `max_depth + 1` pages.
    pub max_depth: usize,
    /// How many ranked successors of each page are explored.
    pub top_n: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_depth: 6,
            top_n: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Pages from start to goal, inclusive.
    Found(Vec<String>),
    /// No path within the depth limit.
    NotFound,
}

impl SearchOutcome {
    pub fn path(&self) -> Option<&[String]> {
        match self {
            SearchOutcome::Found(path) => Some(path),
            SearchOutcome::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }
}

/// Counters collected during one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub pages_entered: usize,
    pub expansions: usize,
    pub failed_expansions: usize,
    pub backtracks: usize,
    pub depth_cutoffs: usize,
}

#[derive(Debug, Clone)]
pub struct SearchReport {
    pub outcome: SearchOutcome,
    pub stats: SearchStats,
}

struct Frame {
    title: String,
    candidates: Vec<String>,
    next: usize,
}

#[derive(Default)]
struct SearchState {
    visited: HashSet<String>,
    path: Vec<String>,
    frames: Vec<Frame>,
}

impl SearchState {
    fn enter(&mut self, title: &str) {
        self.visited.insert(title.to_string());
        self.path.push(title.to_string());
    }

    /// Undo `enter` for the page at the end of the path.
    fn leave(&mut self) {
        if let Some(title) = self.path.pop() {
            self.visited.remove(&title);
        }
    }

    /// Drop the top frame and its page.
    fn backtrack(&mut self) {
        if let Some(frame) = self.frames.pop() {
            debug_assert_eq!(self.path.last(), Some(&frame.title));
            log::debug!("Backtracking from {}", frame.title);
            self.leave();
        }
    }

    /// Next unvisited candidate of the top frame, advancing its cursor.
    /// `None` when the frame is exhausted or there are no frames.
    fn next_candidate(&mut self) -> Option<String> {
        let frame = self.frames.last_mut()?;
        while let Some(candidate) = frame.candidates.get(frame.next) {
            frame.next += 1;
            if !self.visited.contains(candidate) {
                return Some(candidate.clone());
            }
        }
        None
    }
}

enum Step {
    Found,
    Pushed,
    DeadEnd,
}

/// Searches for a path between two pages, expanding the graph as it goes.
pub struct SearchEngine<'a> {
    expander: GraphExpander<'a>,
    evaluator: HeuristicEvaluator<'a>,
    store: &'a dyn GraphStore,
    options: SearchOptions,
}

impl<'a> SearchEngine<'a> {
    pub fn new(
        expander: GraphExpander<'a>,
        evaluator: HeuristicEvaluator<'a>,
        store: &'a dyn GraphStore,
        options: SearchOptions,
    ) -> Self {
        Self {
            expander,
            evaluator,
            store,
            options,
        }
    }

    /// Find a path from `start` to `goal` (both canonical titles).
    ///
    /// Per-page failures (missing pages, embeddings that cannot be computed)
    /// only prune the search. The only error is failing to embed the goal,
    /// since nothing can be ranked without it.
    pub async fn search(&self, start: &str, goal: &str) -> Result<SearchReport> {
        let started = Instant::now();
        log::info!(
            "Searching {} -> {} (max_depth={}, top_n={})",
            start,
            goal,
            self.options.max_depth,
            self.options.top_n
        );

        let mut state = SearchState::default();
        let mut stats = SearchStats::default();
        let goal_vec = OnceCell::new();

        // The start page is recorded even if the search never ranks it.
        if let Err(e) = self.expander.expand(start).await {
            log::warn!("Initial expansion failed: {}", e);
        }

        let mut step = self
            .enter(start, 0, goal, &goal_vec, &mut state, &mut stats)
            .await?;

        while !matches!(step, Step::Found) {
            if state.frames.is_empty() {
                break;
            }
            step = match state.next_candidate() {
                Some(candidate) => {
                    let depth = state.frames.len();
                    self.enter(&candidate, depth, goal, &goal_vec, &mut state, &mut stats)
                        .await?
                }
                None => {
                    state.backtrack();
                    stats.backtracks += 1;
                    Step::DeadEnd
                }
            };
        }

        let outcome = match step {
            Step::Found => SearchOutcome::Found(state.path),
            _ => SearchOutcome::NotFound,
        };

        match &outcome {
            SearchOutcome::Found(path) => log::info!(
                "Found a path of {} steps in {:?}: {}",
                path.len() - 1,
                started.elapsed(),
                path.join(" -> ")
            ),
            SearchOutcome::NotFound => log::info!(
                "No path within depth {} after {:?}",
                self.options.max_depth,
                started.elapsed()
            ),
        }

        Ok(SearchReport { outcome, stats })
    }

    /// Enter `title` at `depth`: check the goal, expand, rank, and push a frame.
    async fn enter(
        &self,
        title: &str,
        depth: usize,
        goal: &str,
        goal_vec: &OnceCell<Arc<Vec<f32>>>,
        state: &mut SearchState,
        stats: &mut SearchStats,
    ) -> Result<Step> {
        if depth > self.options.max_depth {
            stats.depth_cutoffs += 1;
            return Ok(Step::DeadEnd);
        }

        state.enter(title);
        stats.pages_entered += 1;

        if title == goal {
            return Ok(Step::Found);
        }

        let successors = match self.successors(title).await {
            Ok(successors) => {
                stats.expansions += 1;
                successors
            }
            Err(e) => {
                log::warn!("{}", e);
                stats.failed_expansions += 1;
                Vec::new()
            }
        };

        if successors.is_empty() {
            state.leave();
            stats.backtracks += 1;
            return Ok(Step::DeadEnd);
        }

        let goal_vec = goal_vec
            .get_or_try_init(|| self.evaluator.embedding(goal))
            .await
            .map_err(|e| WikipathError::Embedding(format!("Cannot embed goal {}: {}", goal, e)))?;

        let ranked = self
            .evaluator
            .rank(&successors, goal_vec, self.options.top_n)
            .await;
        log::debug!(
            "{} at depth {}: {} of {} successors kept",
            title,
            depth,
            ranked.len(),
            successors.len()
        );

        state.frames.push(Frame {
            title: title.to_string(),
            candidates: ranked.into_iter().map(|s| s.title).collect(),
            next: 0,
        });
        Ok(Step::Pushed)
    }

    /// Expand `title`, then read its successors back from the store, which
    /// may hold links recorded by earlier expansions as well.
    async fn successors(&self, title: &str) -> Result<Vec<String>> {
        self.expander.expand(title).await?;
        self.store
            .list_successors(title)
            .await
            .map_err(|e| WikipathError::expansion(title, e))
    }
}
