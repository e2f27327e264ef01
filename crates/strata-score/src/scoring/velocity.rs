//! # Velocity-Based Score
//!
//! Tracks RSSI and its rate of change with a Kalman filter and scores the
//! RSSI forecast `horizon_seconds` ahead against an exit threshold that
//! adapts to how well the link is actually carrying traffic.

use crate::config::ScoringParams;
use crate::measurement::LinkMeasurement;
use crate::scoring::kalman::{KalmanConfig, KalmanFilter};
use crate::scoring::{ConnectedScore, TRANSITION_SCORE};

/// Threshold adaptation stops once the adjustment has gone below this (dB).
const MAX_THRESHOLD_DROP_DB: f64 = -7.0;
/// Step applied to the threshold each time adaptation fires (dB).
const THRESHOLD_STEP_DB: f64 = 0.5;
/// Only adapt while RSSI is closer than this to the threshold (dB).
const ADAPT_MARGIN_DB: f64 = 2.0;
/// Only adapt while RSSI is this steady (dB/s).
const STEADY_RATE_DB_PER_S: f64 = 0.2;
/// Minimum first-attempt tx success probability for the link to count as working.
const MIN_TX_SUCCESS_PROBABILITY: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct VelocityScore {
    params: ScoringParams,
    filter: KalmanFilter,
    frequency_mhz: u32,
    /// Wall-clock time of the last filtered sample; 0 when the filter must restart.
    last_millis: i64,
    filtered_rssi: f64,
    rssi_rate: f64,
    threshold_adjustment: f64,
}

impl VelocityScore {
    pub fn new(params: ScoringParams) -> Self {
        let filter = KalmanFilter::new(&KalmanConfig::from(&params));
        Self {
            params,
            filter,
            frequency_mhz: 5000,
            last_millis: 0,
            filtered_rssi: 0.0,
            rssi_rate: 0.0,
            threshold_adjustment: 0.0,
        }
    }

    /// Kalman-smoothed RSSI in dBm.
    pub fn filtered_rssi(&self) -> f64 {
        self.filtered_rssi
    }

    /// Estimated RSSI rate of change in dB/s.
    pub fn rssi_rate(&self) -> f64 {
        self.rssi_rate
    }

    /// Band exit threshold plus the learned adjustment, in dBm.
    pub fn adjusted_rssi_threshold(&self) -> f64 {
        f64::from(self.params.exit_rssi(self.frequency_mhz)) + self.threshold_adjustment
    }

    fn update_rssi(&mut self, rssi_dbm: i32, millis: i64) {
        if millis <= 0 {
            return;
        }
        let rssi = f64::from(rssi_dbm);
        if self.last_millis <= 0 || millis < self.last_millis || !self.filter.is_initialized() {
            self.filter.initialize(rssi);
        } else {
            let dt = (millis - self.last_millis) as f64 * 0.001;
            self.filter.update(rssi, dt);
        }
        self.last_millis = millis;
        self.filtered_rssi = self.filter.value();
        self.rssi_rate = self.filter.velocity();
    }

    /// Lower the exit threshold while the link keeps delivering traffic
    /// at a steady, marginal RSSI.
    fn adjust_threshold(&mut self, measurement: &LinkMeasurement) {
        if self.threshold_adjustment < MAX_THRESHOLD_DROP_DB {
            return;
        }
        if self.filtered_rssi >= self.adjusted_rssi_threshold() + ADAPT_MARGIN_DB {
            return;
        }
        if self.rssi_rate.abs() >= STEADY_RATE_DB_PER_S {
            return;
        }
        let min_pps = self.params.min_pps_for_success;
        if measurement.tx_success_rate < min_pps || measurement.rx_success_rate < min_pps {
            return;
        }
        if let Some(p) = measurement.tx_success_probability() {
            if p > MIN_TX_SUCCESS_PROBABILITY {
                self.threshold_adjustment -= THRESHOLD_STEP_DB;
            }
        }
    }
}

impl ConnectedScore for VelocityScore {
    fn update(&mut self, measurement: &LinkMeasurement, millis: i64) {
        if measurement.frequency_mhz != self.frequency_mhz {
            // Probably roamed. Restart the filter, keep the threshold.
            self.last_millis = 0;
            self.frequency_mhz = measurement.frequency_mhz;
        }
        self.update_rssi(measurement.rssi_dbm, millis);
        self.adjust_threshold(measurement);
    }

    fn compute_score(&self) -> i32 {
        if !self.filter.is_initialized() {
            return TRANSITION_SCORE + 1;
        }
        let bad = self.adjusted_rssi_threshold();
        let filtered = self.filter.value();
        // Never forecast an improvement.
        let forecast = self
            .filter
            .predict_ahead(self.params.horizon_seconds)
            .min(filtered);
        ((forecast.round() - bad) as i32).saturating_add(TRANSITION_SCORE)
    }

    fn reset(&mut self) {
        self.filter.reset();
        self.filtered_rssi = 0.0;
        self.rssi_rate = 0.0;
        self.last_millis = 0;
        self.threshold_adjustment = 0.0;
    }
}
