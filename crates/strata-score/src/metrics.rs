//! # Score Metrics
//!
//! Counts how often each published score occurs and renders the tally in
//! Prometheus text exposition format.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Mutex;

/// Sink told about every published score.
pub trait ScoreMetrics: Send + Sync {
    /// Count one occurrence of `score`. Fire-and-forget.
    fn record_score_occurrence(&self, score: i32);
}

/// In-process histogram of published scores.
#[derive(Debug, Default)]
pub struct ScoreHistogram {
    counts: Mutex<BTreeMap<i32, u64>>,
}

impl ScoreHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, score: i32) -> u64 {
        self.lock().get(&score).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.lock().values().sum()
    }

    /// Copy of the per-score counts, lowest score first.
    pub fn snapshot(&self) -> BTreeMap<i32, u64> {
        self.lock().clone()
    }

    /// Render the histogram as Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let counts = self.snapshot();
        let mut out = String::with_capacity(256 + counts.len() * 48);

        writeln!(
            out,
            "# HELP strata_link_score_count Polls that published each link score."
        )
        .unwrap();
        writeln!(out, "# TYPE strata_link_score_count counter").unwrap();
        for (score, n) in &counts {
            writeln!(out, "strata_link_score_count{{score=\"{score}\"}} {n}").unwrap();
        }

        writeln!(
            out,
            "# HELP strata_link_score_polls_total Total scored polls."
        )
        .unwrap();
        writeln!(out, "# TYPE strata_link_score_polls_total counter").unwrap();
        writeln!(
            out,
            "strata_link_score_polls_total {}",
            counts.values().sum::<u64>()
        )
        .unwrap();

        out
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<i32, u64>> {
        self.counts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ScoreMetrics for ScoreHistogram {
    fn record_score_occurrence(&self, score: i32) {
        *self.lock().entry(score).or_insert(0) += 1;
    }
}
