//! # Link Metrics History
//!
//! Bounded, thread-safe log of CSV lines, one per poll, kept for diagnostic
//! dumps. The poller appends; a diagnostic caller snapshots. Both go through
//! a single mutex and neither ever sees a half-written line.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::io;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::RecordError;
use crate::measurement::LinkMeasurement;
use crate::scoring::CandidateScores;

/// Column names, in record order.
pub const HISTORY_HEADER: &str = "time,session,netid,rssi,filtered_rssi,rssi_threshold,\
freq,linkspeed,tx_good,tx_retry,tx_bad,rx_pps,s1,s2";

const TIMESTAMP_FORMAT: &str = "%m-%d %H:%M:%S%.3f";

/// Inputs and outputs of one poll, ready to be rendered as a history line.
#[derive(Debug, Clone, Copy)]
pub struct HistoryRecord {
    pub timestamp_ms: i64,
    pub session_id: u64,
    pub consumer_id: u32,
    pub measurement: LinkMeasurement,
    pub filtered_rssi: f64,
    pub rssi_threshold: f64,
    pub scores: CandidateScores,
}

impl HistoryRecord {
    /// Render as one comma-separated line. Decimal points are always `.`.
    pub fn format_line(&self) -> Result<String, RecordError> {
        let time = DateTime::<Utc>::from_timestamp_millis(self.timestamp_ms)
            .ok_or(RecordError::TimestampOutOfRange(self.timestamp_ms))?;
        let m = &self.measurement;

        let mut line = String::with_capacity(128);
        write!(
            line,
            "{},{},{},{:.1},{:.1},{:.1},{},{},{:.2},{:.2},{:.2},{:.2},{},{}",
            time.format(TIMESTAMP_FORMAT),
            self.session_id,
            self.consumer_id,
            f64::from(m.rssi_dbm),
            self.filtered_rssi,
            self.rssi_threshold,
            m.frequency_mhz,
            m.link_speed_mbps,
            m.tx_success_rate,
            m.tx_retries_rate,
            m.tx_bad_rate,
            m.rx_success_rate,
            self.scores.aggressive,
            self.scores.velocity,
        )?;
        Ok(line)
    }
}

/// Fixed-capacity FIFO of formatted history lines.
#[derive(Debug)]
pub struct HistoryLog {
    capacity: usize,
    lines: Mutex<VecDeque<String>>,
}

impl HistoryLog {
    /// `capacity` is clamped to at least one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Add a line at the tail, evicting the oldest lines beyond capacity.
    pub fn append(&self, line: String) {
        let mut lines = self.lock();
        lines.push_back(line);
        while lines.len() > self.capacity {
            lines.pop_front();
        }
    }

    /// Copy of the current lines, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    /// Copy the current lines under the lock, then write them to `sink`
    /// oldest first after the lock is released. The copy is discarded
    /// afterwards; the live log is left as it was.
    pub fn snapshot_and_clear<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<()> {
        let mut copy = self.snapshot();
        for line in &copy {
            writeln!(sink, "{line}")?;
        }
        copy.clear();
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        // Lines are pushed whole, so a poisoned deque is still consistent.
        self.lines.lock().unwrap_or_else(|e| e.into_inner())
    }
}
