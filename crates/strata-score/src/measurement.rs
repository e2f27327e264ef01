use serde::{Deserialize, Serialize};

/// Snapshot of a connected link's state, taken once per poll.
///
/// Rates are packets per second averaged by the driver over the last
/// polling interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkMeasurement {
    /// Received signal strength in dBm.
    pub rssi_dbm: i32,
    /// Channel centre frequency in MHz.
    pub frequency_mhz: u32,
    /// Negotiated link speed in Mbps.
    pub link_speed_mbps: u32,
    pub tx_success_rate: f64,
    pub tx_retries_rate: f64,
    pub tx_bad_rate: f64,
    pub rx_success_rate: f64,
}

impl Default for LinkMeasurement {
    fn default() -> Self {
        Self {
            rssi_dbm: -127,
            frequency_mhz: 5000,
            link_speed_mbps: 0,
            tx_success_rate: 0.0,
            tx_retries_rate: 0.0,
            tx_bad_rate: 0.0,
            rx_success_rate: 0.0,
        }
    }
}

impl LinkMeasurement {
    pub fn is_24ghz(&self) -> bool {
        crate::config::is_24ghz(self.frequency_mhz)
    }

    /// Fraction of transmit attempts that went through first time, or
    /// `None` when nothing was sent.
    pub fn tx_success_probability(&self) -> Option<f64> {
        let attempts = self.tx_success_rate + self.tx_bad_rate + self.tx_retries_rate;
        if attempts > 0.0 {
            Some(self.tx_success_rate / attempts)
        } else {
            None
        }
    }
}

/// Downstream party that is told about score changes.
pub trait ScoreConsumer {
    /// Identifier recorded in the history (`netid` column).
    fn id(&self) -> u32;
    /// Deliver a new score. Fire-and-forget.
    fn notify_score(&mut self, score: i32);
}

/// Per-poll view of the consumer.
///
/// `known_score` is the score the consumer last heard about. It belongs to
/// the connection, so it exists even when no consumer is attached.
pub struct ConsumerContext<'a> {
    pub known_score: &'a mut i32,
    pub consumer: Option<&'a mut dyn ScoreConsumer>,
}

impl<'a> ConsumerContext<'a> {
    pub fn new(known_score: &'a mut i32, consumer: &'a mut dyn ScoreConsumer) -> Self {
        Self {
            known_score,
            consumer: Some(consumer),
        }
    }

    pub fn detached(known_score: &'a mut i32) -> Self {
        Self {
            known_score,
            consumer: None,
        }
    }

    /// 0 when no consumer is attached.
    pub fn consumer_id(&self) -> u32 {
        self.consumer.as_ref().map_or(0, |c| c.id())
    }
}
