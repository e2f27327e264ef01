use crate::config::ScoringParams;
use crate::measurement::LinkMeasurement;
use crate::scoring::{ConnectedScore, TRANSITION_SCORE};

/// Scores the raw RSSI of the latest sample against the band's exit
/// threshold, two points per dB, with no smoothing.
#[derive(Debug, Clone)]
pub struct AggressiveScore {
    params: ScoringParams,
    frequency_mhz: u32,
    rssi_dbm: Option<i32>,
}

impl AggressiveScore {
    pub fn new(params: ScoringParams) -> Self {
        Self {
            params,
            frequency_mhz: 5000,
            rssi_dbm: None,
        }
    }
}

impl ConnectedScore for AggressiveScore {
    fn update(&mut self, measurement: &LinkMeasurement, _millis: i64) {
        self.frequency_mhz = measurement.frequency_mhz;
        self.rssi_dbm = Some(measurement.rssi_dbm);
    }

    fn compute_score(&self) -> i32 {
        match self.rssi_dbm {
            Some(rssi) => {
                let bad = self.params.exit_rssi(self.frequency_mhz);
                rssi.saturating_sub(bad)
                    .saturating_mul(2)
                    .saturating_add(TRANSITION_SCORE)
            }
            None => TRANSITION_SCORE + 1,
        }
    }

    fn reset(&mut self) {
        self.frequency_mhz = 5000;
        self.rssi_dbm = None;
    }
}
