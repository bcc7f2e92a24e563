// src/crawl/frontier.rs
// =============================================================================
// Crawl bookkeeping owned by the dispatcher.
//
// - visited:     every URL that has ever become a job
// - pending:     jobs discovered but not yet handed to the worker pool
// - outstanding: jobs created whose outcome has not arrived yet, whether
//                still pending or already in the pool
//
// outstanding goes up when a job is created and down when its outcome
// arrives (or when it is abandoned). A page's children are created before
// its own outcome is counted, so the counter reaches 0 only once, when the
// crawl has nothing left.
//
// Nothing here is shared between tasks. The dispatcher is the only owner,
// so none of it needs a lock.
//
// Rust concepts:
// - HashSet: O(1) "have we seen this URL?"
// - VecDeque: FIFO for breadth-first order
// =============================================================================

use std::collections::{HashSet, VecDeque};

use tracing::error;

use super::job::{Job, JobId};
use crate::sitemap::PageRecord;

pub struct Frontier {
    max_depth: u32,
    visited: HashSet<String>,
    pending: VecDeque<Job>,
    outstanding: usize,
    next_id: u64,
}

impl Frontier {
    pub fn new(max_depth: u32) -> Self {
        Self {
            max_depth,
            visited: HashSet::new(),
            pending: VecDeque::new(),
            outstanding: 0,
            next_id: 0,
        }
    }

    /// Queues the seed at depth 1
    pub fn seed(&mut self, url: &str) -> bool {
        self.discover(url, 1)
    }

    // Queues the unseen links of a fetched page at the next depth
    //
    // Call before outcome_received() for the same page.
    // Pages at max_depth (or deeper) have no children.
    // Returns how many new jobs were queued.
    pub fn expand(&mut self, record: &PageRecord) -> usize {
        if record.depth >= self.max_depth {
            return 0;
        }

        let depth = record.depth + 1;
        record
            .links
            .iter()
            .filter(|link| self.discover(link, depth))
            .count()
    }

    // Marks `url` as visited and queues a job for it, unless it was
    // already visited (the first discovery wins)
    fn discover(&mut self, url: &str, depth: u32) -> bool {
        if !self.visited.insert(url.to_string()) {
            return false;
        }

        let id = JobId(self.next_id);
        self.next_id += 1;
        self.pending.push_back(Job::new(id, url, depth));
        self.outstanding += 1;
        true
    }

    /// The next job to hand to the pool, in discovery order
    pub fn next_job(&mut self) -> Option<Job> {
        self.pending.pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Call for every outcome received from the pool
    pub fn outcome_received(&mut self) {
        match self.outstanding.checked_sub(1) {
            Some(outstanding) => self.outstanding = outstanding,
            None => error!("received an outcome with no outstanding jobs"),
        }
    }

    // Every job created has produced its outcome: the crawl has nothing left
    pub fn is_exhausted(&self) -> bool {
        self.outstanding == 0
    }

    /// Drops every pending job (used on cancellation); returns how many
    pub fn abandon_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.outstanding = self.outstanding.saturating_sub(dropped);
        dropped
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Number of distinct URLs discovered so far
    pub fn found(&self) -> usize {
        self.visited.len()
    }
}
