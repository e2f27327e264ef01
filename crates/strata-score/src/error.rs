use thiserror::Error;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unsupported config version {0}")]
    UnsupportedVersion(u32),
    #[error("history capacity must be at least 1")]
    InvalidCapacity,
    #[error("max score must not be negative, got {0}")]
    NegativeMaxScore(i32),
}

/// Failure to render one history line. The record is dropped, the poll is not.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("timestamp {0} ms is not representable")]
    TimestampOutOfRange(i64),
    #[error("record formatting failed")]
    Format(#[from] std::fmt::Error),
}
