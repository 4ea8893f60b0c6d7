//! Per-request stats.
//!
//! Owned by the task running a single consolidation or retrieval; never
//! shared across requests. Plain counters, mutated directly by the
//! owning task — no atomics needed since nothing else touches this.

/// Call/retry counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub llm_calls: u32,
    pub llm_retries: u32,
    pub graph_reads: u32,
    pub graph_writes: u32,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_llm_call(&mut self) {
        self.llm_calls += 1;
    }

    pub fn record_llm_retry(&mut self) {
        self.llm_retries += 1;
    }

    pub fn record_graph_read(&mut self) {
        self.graph_reads += 1;
    }

    pub fn record_graph_write(&mut self) {
        self.graph_writes += 1;
    }

    /// Fold another run's counters into this one, for joining
    /// concurrent sub-tasks that each tracked their own stats.
    pub fn merge(&mut self, other: RunStats) {
        self.llm_calls += other.llm_calls;
        self.llm_retries += other.llm_retries;
        self.graph_reads += other.graph_reads;
        self.graph_writes += other.graph_writes;
    }
}
