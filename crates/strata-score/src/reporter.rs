//! # Score Reporter
//!
//! Per-poll orchestration: run the scoring strategies, clamp and publish the
//! authoritative score, record the poll in the history log, and cache a
//! short report of the last result.
//!
//! ```text
//! NoReport ──evaluate──▶ HasReport ──evaluate──▶ HasReport
//!    ▲                       │
//!    └────────reset──────────┘   (session id advances on this edge only)
//! ```
//!
//! `evaluate` is driven by a single poller. The history log is the only
//! state shared with other threads; use [`ScoreReporter::dumper`] to hand a
//! dump handle to a diagnostic caller.

use std::io;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::clock::Clock;
use crate::config::ScoreConfig;
use crate::history::{HistoryLog, HistoryRecord, HISTORY_HEADER};
use crate::measurement::{ConsumerContext, LinkMeasurement};
use crate::metrics::ScoreMetrics;
use crate::scoring::{CandidateScores, ScoringSet};

/// Tag a dump-request router uses to select this reporter's history.
pub const DUMP_ARG: &str = "LinkScoreReport";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReportState {
    NoReport,
    HasReport(String),
}

pub struct ScoreReporter {
    config: ScoreConfig,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn ScoreMetrics>,
    strategies: ScoringSet,
    history: Arc<HistoryLog>,
    report: ReportState,
    session_id: u64,
    verbose: bool,
}

impl ScoreReporter {
    /// A negative `max_score` is raised to 0 so clamping always has a valid range.
    pub fn new(
        mut config: ScoreConfig,
        clock: Arc<dyn Clock>,
        metrics: Arc<dyn ScoreMetrics>,
    ) -> Self {
        if config.max_score < 0 {
            warn!(max_score = config.max_score, "negative score ceiling, using 0");
            config.max_score = 0;
        }
        let strategies = ScoringSet::new(&config.scoring);
        let history = Arc::new(HistoryLog::new(config.history_capacity));
        Self {
            config,
            clock,
            metrics,
            strategies,
            history,
            report: ReportState::NoReport,
            session_id: 0,
            verbose: false,
        }
    }

    pub fn strategies(&self) -> &ScoringSet {
        &self.strategies
    }

    /// Identifier of the current connection session.
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Forget the last report and restart every strategy.
    ///
    /// The session id advances only if a report was held, so back-to-back
    /// resets count as one session boundary.
    pub fn reset(&mut self) {
        if let ReportState::HasReport(_) = self.report {
            self.session_id += 1;
        }
        self.report = ReportState::NoReport;
        self.strategies.reset();
        if self.verbose {
            debug!(session = self.session_id, "score report reset");
        }
    }

    /// Whether a poll has completed since the last reset.
    pub fn is_last_report_valid(&self) -> bool {
        matches!(self.report, ReportState::HasReport(_))
    }

    /// Short text of the last report; empty after a reset.
    pub fn last_report(&self) -> &str {
        match &self.report {
            ReportState::HasReport(text) => text,
            ReportState::NoReport => "",
        }
    }

    pub fn set_verbose_logging(&mut self, enabled: bool) {
        self.verbose = enabled;
    }

    /// Score one poll and publish the result.
    ///
    /// The consumer is notified only when the clamped score differs from
    /// the score it already knows. A history line that cannot be formatted
    /// is dropped and logged; nothing else about the poll is affected.
    pub fn evaluate(&mut self, measurement: &LinkMeasurement, mut ctx: ConsumerContext<'_>) {
        let millis = self.clock.wall_clock_millis();
        let consumer_id = ctx.consumer_id();

        self.strategies.update(measurement, millis);
        let scores = self.strategies.compute();
        let score = scores.authoritative().clamp(0, self.config.max_score);

        if score != *ctx.known_score {
            if self.verbose {
                debug!(
                    score,
                    previous = *ctx.known_score,
                    consumer_id,
                    "report new link score"
                );
            }
            *ctx.known_score = score;
            if let Some(consumer) = ctx.consumer.as_deref_mut() {
                consumer.notify_score(score);
            }
        }

        self.log_link_metrics(measurement, millis, consumer_id, scores);

        self.report = ReportState::HasReport(format!("score={score}"));
        self.metrics.record_score_occurrence(score);
    }

    fn log_link_metrics(
        &self,
        measurement: &LinkMeasurement,
        millis: i64,
        consumer_id: u32,
        scores: CandidateScores,
    ) {
        if millis < self.config.min_plausible_wall_clock_ms {
            return;
        }
        let record = HistoryRecord {
            timestamp_ms: millis,
            session_id: self.session_id,
            consumer_id,
            measurement: *measurement,
            filtered_rssi: self.strategies.velocity.filtered_rssi(),
            rssi_threshold: self.strategies.velocity.adjusted_rssi_threshold(),
            scores,
        };
        match record.format_line() {
            Ok(line) => self.history.append(line),
            Err(e) => error!(error = %e, timestamp_ms = millis, "history record format problem"),
        }
    }

    /// Write the header and every retained history line, oldest first.
    pub fn dump<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<()> {
        self.dumper().dump(sink)
    }

    /// A handle that can dump this reporter's history from another thread.
    pub fn dumper(&self) -> HistoryDumper {
        HistoryDumper {
            history: Arc::clone(&self.history),
        }
    }
}

/// Shared, read-only access to a reporter's history.
#[derive(Debug, Clone)]
pub struct HistoryDumper {
    history: Arc<HistoryLog>,
}

impl HistoryDumper {
    pub fn dump<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<()> {
        writeln!(sink, "{HISTORY_HEADER}")?;
        self.history.snapshot_and_clear(sink)
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::measurement::ScoreConsumer;
    use crate::metrics::ScoreHistogram;

    const T0: i64 = 1_500_000_000_000;

    #[derive(Default)]
    struct RecordingConsumer {
        notified: Vec<i32>,
    }

    impl ScoreConsumer for RecordingConsumer {
        fn id(&self) -> u32 {
            7
        }
        fn notify_score(&mut self, score: i32) {
            self.notified.push(score);
        }
    }

    fn reporter(clock: &Arc<ManualClock>) -> (ScoreReporter, Arc<ScoreHistogram>) {
        let metrics = Arc::new(ScoreHistogram::new());
        let r = ScoreReporter::new(ScoreConfig::default(), clock.clone(), metrics.clone());
        (r, metrics)
    }

    fn at(rssi_dbm: i32) -> LinkMeasurement {
        LinkMeasurement {
            rssi_dbm,
            frequency_mhz: 5180,
            ..LinkMeasurement::default()
        }
    }

    fn dump_lines(r: &ScoreReporter) -> Vec<String> {
        let mut out = Vec::new();
        r.dump(&mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn starts_without_report() {
        let clock = Arc::new(ManualClock::new(T0));
        let (r, _) = reporter(&clock);
        assert!(!r.is_last_report_valid());
        assert_eq!(r.last_report(), "");
        assert_eq!(r.session_id(), 0);
    }

    #[test]
    fn evaluate_sets_report() {
        let clock = Arc::new(ManualClock::new(T0));
        let (mut r, metrics) = reporter(&clock);
        let mut known = 0;
        r.evaluate(&at(-70), ConsumerContext::detached(&mut known));

        assert!(r.is_last_report_valid());
        assert_eq!(r.last_report(), "score=60");
        assert_eq!(known, 60);
        assert_eq!(metrics.count(60), 1);
    }

    #[test]
    fn reset_advances_session_once() {
        let clock = Arc::new(ManualClock::new(T0));
        let (mut r, _) = reporter(&clock);
        let mut known = 0;

        r.reset();
        assert_eq!(r.session_id(), 0);

        r.evaluate(&at(-70), ConsumerContext::detached(&mut known));
        r.reset();
        assert_eq!(r.session_id(), 1);
        assert!(!r.is_last_report_valid());
        assert_eq!(r.last_report(), "");

        r.reset();
        assert_eq!(r.session_id(), 1);
    }

    #[test]
    fn reset_restarts_strategies() {
        let clock = Arc::new(ManualClock::new(T0));
        let (mut r, _) = reporter(&clock);
        let mut known = 0;
        r.evaluate(&at(-40), ConsumerContext::detached(&mut known));
        assert!(r.strategies().velocity.filtered_rssi() > -41.0);

        r.reset();
        assert_eq!(r.strategies().compute().velocity, crate::scoring::TRANSITION_SCORE + 1);
    }

    #[test]
    fn session_id_is_recorded_in_history() {
        let clock = Arc::new(ManualClock::new(T0));
        let (mut r, _) = reporter(&clock);
        let mut known = 0;

        r.evaluate(&at(-70), ConsumerContext::detached(&mut known));
        r.reset();
        clock.advance(3_000);
        r.evaluate(&at(-70), ConsumerContext::detached(&mut known));

        let lines = dump_lines(&r);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].split(',').nth(1), Some("0"));
        assert_eq!(lines[2].split(',').nth(1), Some("1"));
    }

    #[test]
    fn consumer_id_is_recorded_in_history() {
        let clock = Arc::new(ManualClock::new(T0));
        let (mut r, _) = reporter(&clock);
        let mut known = 0;
        let mut consumer = RecordingConsumer::default();

        r.evaluate(&at(-70), ConsumerContext::new(&mut known, &mut consumer));
        clock.advance(3_000);
        r.evaluate(&at(-70), ConsumerContext::detached(&mut known));

        let lines = dump_lines(&r);
        assert_eq!(lines[1].split(',').nth(2), Some("7"));
        assert_eq!(lines[2].split(',').nth(2), Some("0"));
    }

    #[test]
    fn negative_score_clamps_to_zero() {
        let clock = Arc::new(ManualClock::new(T0));
        let (mut r, _) = reporter(&clock);
        let mut known = 30;
        let mut consumer = RecordingConsumer::default();

        // -140 dBm scores far below zero
        r.evaluate(&at(-140), ConsumerContext::new(&mut known, &mut consumer));
        assert_eq!(known, 0);
        assert_eq!(consumer.notified, vec![0]);
        assert_eq!(r.last_report(), "score=0");
    }

    #[test]
    fn negative_ceiling_publishes_zero() {
        let clock = Arc::new(ManualClock::new(T0));
        let metrics = Arc::new(ScoreHistogram::new());
        let mut r = ScoreReporter::new(
            ScoreConfig {
                max_score: -1,
                ..ScoreConfig::default()
            },
            clock.clone(),
            metrics.clone(),
        );
        let mut known = 5;
        let mut consumer = RecordingConsumer::default();

        r.evaluate(&at(-60), ConsumerContext::new(&mut known, &mut consumer));

        assert_eq!(known, 0);
        assert_eq!(consumer.notified, vec![0]);
        assert_eq!(r.last_report(), "score=0");
        assert_eq!(metrics.count(0), 1);
    }

    #[test]
    fn format_fault_drops_record_only() {
        let clock = Arc::new(ManualClock::new(i64::MAX));
        let (mut r, metrics) = reporter(&clock);
        let mut known = 0;
        let mut consumer = RecordingConsumer::default();

        r.evaluate(&at(-70), ConsumerContext::new(&mut known, &mut consumer));

        assert_eq!(consumer.notified, vec![60]);
        assert_eq!(r.last_report(), "score=60");
        assert_eq!(metrics.total(), 1);
        assert_eq!(dump_lines(&r), vec![HISTORY_HEADER.to_string()]);
    }

    #[test]
    fn verbose_logging_does_not_change_results() {
        let clock = Arc::new(ManualClock::new(T0));
        let (mut quiet, _) = reporter(&clock);
        let (mut loud, _) = reporter(&clock);
        loud.set_verbose_logging(true);

        let (mut k1, mut k2) = (0, 0);
        for rssi in [-60, -75, -90, -90] {
            quiet.evaluate(&at(rssi), ConsumerContext::detached(&mut k1));
            loud.evaluate(&at(rssi), ConsumerContext::detached(&mut k2));
            clock.advance(3_000);
        }
        loud.reset();
        quiet.reset();

        assert_eq!(k1, k2);
        assert_eq!(dump_lines(&quiet), dump_lines(&loud));
        assert_eq!(quiet.session_id(), loud.session_id());
    }

    #[test]
    fn dumper_shares_live_history() {
        let clock = Arc::new(ManualClock::new(T0));
        let (mut r, _) = reporter(&clock);
        let dumper = r.dumper();
        assert!(dumper.is_empty());

        let mut known = 0;
        r.evaluate(&at(-70), ConsumerContext::detached(&mut known));
        assert_eq!(dumper.len(), 1);
    }
}
