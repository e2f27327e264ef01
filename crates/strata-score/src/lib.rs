//! # Strata Link Score
//!
//! Periodic link-quality scoring for a connected wireless session.
//!
//! Each poll feeds a [`LinkMeasurement`](measurement::LinkMeasurement) to the
//! [`ScoreReporter`](reporter::ScoreReporter), which runs every scoring
//! strategy, clamps the authoritative score, publishes transitions to the
//! consumer and keeps a bounded CSV history for diagnostic dumps.

pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod measurement;
pub mod metrics;
pub mod reporter;
pub mod scoring;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ScoreConfig, ScoringParams};
pub use error::{ConfigError, RecordError};
pub use history::{HistoryLog, HistoryRecord, HISTORY_HEADER};
pub use measurement::{ConsumerContext, LinkMeasurement, ScoreConsumer};
pub use metrics::{ScoreHistogram, ScoreMetrics};
pub use reporter::{HistoryDumper, ScoreReporter, DUMP_ARG};
