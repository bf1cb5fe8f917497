use std::collections::HashMap;

use tracing::debug;

use super::{SearchResult, search};
use crate::render::{Generation, RenderTree};
use crate::scheduler::{Scheduler, TimerKind, TimerToken};
use crate::stream::WordStream;

/// Quiet period before typed input is searched.
pub const DEBOUNCE_MS: u64 = 300;

/// State of an open search panel: debounced input and a per-query cache.
///
/// The cache lives until [`close`](Self::close) or until results are asked
/// for against a different render generation.
#[derive(Debug, Default)]
pub struct SearchSession {
    cache: HashMap<String, Vec<SearchResult>>,
    generation: Option<Generation>,
    pending: Option<(TimerToken, String)>,
    query: String,
    results: Vec<SearchResult>,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record typed input. The search runs once [`DEBOUNCE_MS`] pass without
    /// further input.
    pub fn input<S: Scheduler + ?Sized>(&mut self, query: &str, scheduler: &mut S) {
        self.cancel_pending(scheduler);
        let query = query.trim();
        if query.is_empty() {
            self.query.clear();
            self.results.clear();
            return;
        }
        let token = scheduler.schedule(DEBOUNCE_MS, TimerKind::SearchDebounce);
        self.pending = Some((token, query.to_string()));
    }

    /// Run the debounced search if `token` is the pending one.
    pub fn on_timer(
        &mut self,
        token: TimerToken,
        tree: &RenderTree,
        stream: &WordStream,
    ) -> Option<&[SearchResult]> {
        if self.pending.as_ref().map(|(t, _)| *t) != Some(token) {
            return None;
        }
        let (_, query) = self.pending.take()?;
        Some(self.search(&query, tree, stream))
    }

    /// Search immediately, answering from the cache when possible.
    pub fn search(&mut self, query: &str, tree: &RenderTree, stream: &WordStream) -> &[SearchResult] {
        if self.generation != Some(tree.generation()) {
            if !self.cache.is_empty() {
                debug!(entries = self.cache.len(), "dropping search cache for new render");
            }
            self.cache.clear();
            self.generation = Some(tree.generation());
        }

        let query = query.trim();
        self.query = query.to_string();
        self.results = match self.cache.get(query) {
            Some(cached) => {
                debug!(query, "search cache hit");
                cached.clone()
            }
            None => {
                let results = search(tree, stream, query);
                self.cache.insert(query.to_string(), results.clone());
                results
            }
        };
        &self.results
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }

    /// Close the panel: drop pending input and forget every cached query.
    pub fn close<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        self.cancel_pending(scheduler);
        self.cache.clear();
        self.generation = None;
        self.query.clear();
        self.results.clear();
    }

    fn cancel_pending<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if let Some((token, _)) = self.pending.take() {
            scheduler.cancel(token);
        }
    }
}
