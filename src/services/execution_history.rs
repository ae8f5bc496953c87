//! Bounded record of past attempts, used for adaptive strategy selection.

use chrono::Utc;
use std::collections::VecDeque;
use std::time::Duration;

use crate::domain::models::{AttemptOutcome, HistoryEntry, TaskSignature};

/// Ring buffer of attempt outcomes. Oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct ExecutionHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    next_sequence: u64,
}

impl Default for ExecutionHistory {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ExecutionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_sequence: 0,
        }
    }

    /// Record an attempt and return its sequence number.
    pub fn record(
        &mut self,
        signature: TaskSignature,
        strategy: &str,
        outcome: AttemptOutcome,
        duration: Duration,
    ) -> u64 {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.push_back(HistoryEntry {
            sequence,
            signature,
            strategy: strategy.to_string(),
            outcome,
            duration,
            recorded_at: Utc::now(),
        });
        sequence
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    fn matching<'a>(
        &'a self,
        signature: TaskSignature,
        strategy: &'a str,
    ) -> impl Iterator<Item = &'a HistoryEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.signature == signature && e.strategy == strategy)
            .filter(|e| e.outcome != AttemptOutcome::Cancelled)
    }

    /// Success rate of `strategy` on tasks with this signature, or `None`
    /// without samples. Cancelled attempts are not counted.
    pub fn success_rate(&self, signature: TaskSignature, strategy: &str) -> Option<f64> {
        let (total, successes) = self
            .matching(signature, strategy)
            .fold((0usize, 0usize), |(total, ok), e| {
                (total + 1, ok + usize::from(e.outcome.is_success()))
            });
        (total > 0).then(|| successes as f64 / total as f64)
    }

    /// Sequence number of the most recent success, if any.
    pub fn last_success(&self, signature: TaskSignature, strategy: &str) -> Option<u64> {
        self.matching(signature, strategy)
            .filter(|e| e.outcome.is_success())
            .map(|e| e.sequence)
            .max()
    }
}
