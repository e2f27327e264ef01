use serde::Deserialize;

use crate::error::ConfigError;

pub const CONFIG_VERSION: u32 = 1;

/// Platform score ceiling. Published scores never exceed this.
pub const DEFAULT_MAX_SCORE: i32 = 60;

/// 3 hours of history at one poll every 3 seconds.
pub const DEFAULT_HISTORY_CAPACITY: usize = 3600;

/// 2017-03-20 UTC. Wall clocks reading earlier than this are not trusted
/// for history timestamps.
pub const DEFAULT_MIN_PLAUSIBLE_WALL_CLOCK_MS: i64 = 1_490_000_000_000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoreConfigInput {
    pub version: u32,
    pub max_score: Option<i32>,
    pub history_capacity: Option<usize>,
    pub min_plausible_wall_clock_ms: Option<i64>,
    pub scoring: ScoringParamsInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoringParamsInput {
    pub exit_rssi_24ghz: Option<i32>,
    pub exit_rssi_5ghz: Option<i32>,
    pub horizon_seconds: Option<f64>,
    pub rssi_std_dev_db: Option<f64>,
    pub accel_std_dev: Option<f64>,
    pub min_pps_for_success: Option<f64>,
}

/// Signal thresholds and filter tuning shared by the scoring strategies.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringParams {
    /// RSSI (dBm) below which a 2.4 GHz link should be abandoned.
    pub exit_rssi_24ghz: i32,
    /// RSSI (dBm) below which a 5 GHz link should be abandoned.
    pub exit_rssi_5ghz: i32,
    /// How far ahead the velocity strategy forecasts RSSI.
    pub horizon_seconds: f64,
    /// Standard deviation of a single RSSI sample in dB.
    pub rssi_std_dev_db: f64,
    /// Standard deviation of the modelled RSSI acceleration (dB/s²).
    pub accel_std_dev: f64,
    /// Minimum packets/s in each direction before the loss rate is trusted.
    pub min_pps_for_success: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            exit_rssi_24ghz: -83,
            exit_rssi_5ghz: -80,
            horizon_seconds: 15.0,
            rssi_std_dev_db: 2.0,
            accel_std_dev: 0.02,
            min_pps_for_success: 2.0,
        }
    }
}

impl ScoringParams {
    pub fn exit_rssi(&self, frequency_mhz: u32) -> i32 {
        if is_24ghz(frequency_mhz) {
            self.exit_rssi_24ghz
        } else {
            self.exit_rssi_5ghz
        }
    }
}

pub(crate) fn is_24ghz(frequency_mhz: u32) -> bool {
    frequency_mhz < 5000
}

#[derive(Debug, Clone)]
pub struct ScoreConfig {
    pub version: u32,
    pub max_score: i32,
    pub history_capacity: usize,
    pub min_plausible_wall_clock_ms: i64,
    pub scoring: ScoringParams,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            max_score: DEFAULT_MAX_SCORE,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            min_plausible_wall_clock_ms: DEFAULT_MIN_PLAUSIBLE_WALL_CLOCK_MS,
            scoring: ScoringParams::default(),
        }
    }
}

impl ScoringParamsInput {
    fn resolve(self) -> ScoringParams {
        let d = ScoringParams::default();
        ScoringParams {
            exit_rssi_24ghz: self.exit_rssi_24ghz.unwrap_or(d.exit_rssi_24ghz),
            exit_rssi_5ghz: self.exit_rssi_5ghz.unwrap_or(d.exit_rssi_5ghz),
            horizon_seconds: self
                .horizon_seconds
                .filter(|h| h.is_finite() && *h >= 0.0)
                .unwrap_or(d.horizon_seconds),
            rssi_std_dev_db: self
                .rssi_std_dev_db
                .filter(|s| s.is_finite() && *s > 0.0)
                .unwrap_or(d.rssi_std_dev_db),
            accel_std_dev: self
                .accel_std_dev
                .filter(|s| s.is_finite() && *s >= 0.0)
                .unwrap_or(d.accel_std_dev),
            min_pps_for_success: self
                .min_pps_for_success
                .filter(|p| p.is_finite())
                .unwrap_or(d.min_pps_for_success),
        }
    }
}

impl ScoreConfigInput {
    pub fn resolve(self) -> Result<ScoreConfig, ConfigError> {
        let version = if self.version == 0 {
            CONFIG_VERSION
        } else {
            self.version
        };
        if version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion(version));
        }

        let max_score = self.max_score.unwrap_or(DEFAULT_MAX_SCORE);
        if max_score < 0 {
            return Err(ConfigError::NegativeMaxScore(max_score));
        }

        let history_capacity = self.history_capacity.unwrap_or(DEFAULT_HISTORY_CAPACITY);
        if history_capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }

        Ok(ScoreConfig {
            version,
            max_score,
            history_capacity,
            min_plausible_wall_clock_ms: self
                .min_plausible_wall_clock_ms
                .unwrap_or(DEFAULT_MIN_PLAUSIBLE_WALL_CLOCK_MS),
            scoring: self.scoring.resolve(),
        })
    }
}

impl ScoreConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        if input.trim().is_empty() {
            return Ok(ScoreConfig::default());
        }
        let parsed: ScoreConfigInput = toml::from_str(input)?;
        parsed.resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_default() {
        let cfg = ScoreConfig::from_toml_str("  \n").unwrap();
        assert_eq!(cfg.version, CONFIG_VERSION);
        assert_eq!(cfg.max_score, 60);
        assert_eq!(cfg.history_capacity, 3600);
        assert_eq!(cfg.min_plausible_wall_clock_ms, 1_490_000_000_000);
        assert_eq!(cfg.scoring, ScoringParams::default());
    }

    #[test]
    fn parse_toml_config_basic() {
        let toml = r#"
            version = 1
            max_score = 100
            history_capacity = 5
            min_plausible_wall_clock_ms = 0

            [scoring]
            exit_rssi_5ghz = -75
            horizon_seconds = 10.0
        "#;

        let cfg = ScoreConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.max_score, 100);
        assert_eq!(cfg.history_capacity, 5);
        assert_eq!(cfg.min_plausible_wall_clock_ms, 0);
        assert_eq!(cfg.scoring.exit_rssi_5ghz, -75);
        assert_eq!(cfg.scoring.exit_rssi_24ghz, -83);
        assert!((cfg.scoring.horizon_seconds - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_unknown_version() {
        let err = ScoreConfig::from_toml_str("version = 7").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion(7)));
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = ScoreConfig::from_toml_str("history_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCapacity));
    }

    #[test]
    fn rejects_negative_ceiling() {
        let err = ScoreConfig::from_toml_str("max_score = -1").unwrap_err();
        assert!(matches!(err, ConfigError::NegativeMaxScore(-1)));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let err = ScoreConfig::from_toml_str("max_score = = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn bad_filter_tuning_falls_back_to_defaults() {
        let toml = r#"
            [scoring]
            rssi_std_dev_db = -1.0
            horizon_seconds = -3.0
        "#;
        let cfg = ScoreConfig::from_toml_str(toml).unwrap();
        assert!((cfg.scoring.rssi_std_dev_db - 2.0).abs() < f64::EPSILON);
        assert!((cfg.scoring.horizon_seconds - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn band_thresholds() {
        let p = ScoringParams::default();
        assert_eq!(p.exit_rssi(2412), -83);
        assert_eq!(p.exit_rssi(5180), -80);
        assert_eq!(p.exit_rssi(4999), -83);
        assert_eq!(p.exit_rssi(5000), -80);
    }
}
