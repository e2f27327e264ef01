//! # Kalman Filter: RSSI Trend Estimation
//!
//! Two-state Kalman filter over `[value, velocity]` with a variable time
//! step. Process noise follows a constant-acceleration model, so the
//! filter trusts its velocity less the longer the gap between samples.

use crate::config::ScoringParams;

/// Tuning for a [`KalmanFilter`].
#[derive(Debug, Clone, Copy)]
pub struct KalmanConfig {
    /// Standard deviation of the modelled acceleration (units/s²).
    pub accel_std_dev: f64,
    /// Standard deviation of a single measurement.
    pub measurement_std_dev: f64,
}

impl From<&ScoringParams> for KalmanConfig {
    fn from(params: &ScoringParams) -> Self {
        KalmanConfig {
            accel_std_dev: params.accel_std_dev,
            measurement_std_dev: params.rssi_std_dev_db,
        }
    }
}

/// A two-state Kalman filter: [value, velocity per second].
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    // ─── State ───
    x: f64,
    v: f64,

    // ─── Covariance P (2×2 symmetric) ───
    p00: f64,
    p01: f64,
    p11: f64,

    // ─── Tuning ───
    accel_var: f64,
    r: f64,

    initialized: bool,
}

impl KalmanFilter {
    pub fn new(config: &KalmanConfig) -> Self {
        KalmanFilter {
            x: 0.0,
            v: 0.0,
            p00: 0.0,
            p01: 0.0,
            p11: 0.0,
            accel_var: config.accel_std_dev * config.accel_std_dev,
            r: config.measurement_std_dev * config.measurement_std_dev,
            initialized: false,
        }
    }

    pub fn value(&self) -> f64 {
        self.x
    }

    /// Estimated rate of change per second.
    pub fn velocity(&self) -> f64 {
        self.v
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Start over from a single measurement with zero velocity.
    ///
    /// The value variance is set to (3σ)² of the measurement noise; the
    /// velocity is taken as known-zero until later samples say otherwise.
    pub fn initialize(&mut self, measurement: f64) {
        self.x = measurement;
        self.v = 0.0;
        self.p00 = 9.0 * self.r;
        self.p01 = 0.0;
        self.p11 = 0.0;
        self.initialized = true;
    }

    /// Advance the state by `dt` seconds.
    pub fn predict(&mut self, dt: f64) {
        self.x += self.v * dt;

        // P' = F*P*F' + Q
        // F = [[1, dt], [0, 1]], Q = G*G'*σa², G = [dt²/2, dt]
        let dt2 = dt * dt;
        let q00 = 0.25 * dt2 * dt2 * self.accel_var;
        let q01 = 0.5 * dt2 * dt * self.accel_var;
        let q11 = dt2 * self.accel_var;

        let new_p00 = self.p00 + 2.0 * dt * self.p01 + dt2 * self.p11 + q00;
        let new_p01 = self.p01 + dt * self.p11 + q01;
        let new_p11 = self.p11 + q11;

        self.p00 = new_p00;
        self.p01 = new_p01;
        self.p11 = new_p11;
    }

    /// Advance by `dt` seconds, then incorporate a new measurement.
    pub fn update(&mut self, measurement: f64, dt: f64) {
        if !self.initialized {
            self.initialize(measurement);
            return;
        }

        self.predict(dt);

        let y = measurement - self.x;
        let s = self.p00 + self.r;
        let k0 = self.p00 / s;
        let k1 = self.p01 / s;

        self.x += k0 * y;
        self.v += k1 * y;

        // P = (I - K*H)*P
        let new_p00 = self.p00 - k0 * self.p00;
        let new_p01 = self.p01 - k0 * self.p01;
        let new_p11 = self.p11 - k1 * self.p01;

        self.p00 = new_p00;
        self.p01 = new_p01;
        self.p11 = new_p11;
    }

    /// Value `seconds` from now, without modifying state.
    pub fn predict_ahead(&self, seconds: f64) -> f64 {
        self.x + self.v * seconds
    }

    pub fn reset(&mut self) {
        self.x = 0.0;
        self.v = 0.0;
        self.p00 = 0.0;
        self.p01 = 0.0;
        self.p11 = 0.0;
        self.initialized = false;
    }
}
