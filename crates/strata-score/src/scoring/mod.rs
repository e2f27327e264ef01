//! Connected-link scoring strategies.
//!
//! Every poll runs each strategy on the same measurement. The set is closed:
//! [`VelocityScore`] is authoritative and is what gets published, while
//! [`AggressiveScore`] is only recorded in the history for comparison.

pub mod aggressive;
pub mod kalman;
pub mod velocity;

pub use aggressive::AggressiveScore;
pub use velocity::VelocityScore;

use crate::config::ScoringParams;
use crate::measurement::LinkMeasurement;

/// Score at which the link sits exactly on its exit threshold. Anything
/// below this tells the consumer another network may be preferable.
pub const TRANSITION_SCORE: i32 = 50;

/// A stateful algorithm that turns successive link measurements into a
/// candidate score.
pub trait ConnectedScore {
    /// Ingest one measurement taken at wall-clock `millis`.
    fn update(&mut self, measurement: &LinkMeasurement, millis: i64);
    /// Score for the current state. Not clamped.
    fn compute_score(&self) -> i32;
    /// Forget everything learned about the current connection.
    fn reset(&mut self);
}

/// Outputs of every strategy for one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateScores {
    pub aggressive: i32,
    pub velocity: i32,
}

impl CandidateScores {
    /// The score that gets published.
    pub fn authoritative(&self) -> i32 {
        self.velocity
    }
}

/// The fixed pair of strategies owned by a reporter.
#[derive(Debug, Clone)]
pub struct ScoringSet {
    pub aggressive: AggressiveScore,
    pub velocity: VelocityScore,
}

impl ScoringSet {
    pub fn new(params: &ScoringParams) -> Self {
        Self {
            aggressive: AggressiveScore::new(params.clone()),
            velocity: VelocityScore::new(params.clone()),
        }
    }

    pub fn update(&mut self, measurement: &LinkMeasurement, millis: i64) {
        self.aggressive.update(measurement, millis);
        self.velocity.update(measurement, millis);
    }

    pub fn compute(&self) -> CandidateScores {
        CandidateScores {
            aggressive: self.aggressive.compute_score(),
            velocity: self.velocity.compute_score(),
        }
    }

    pub fn reset(&mut self) {
        self.aggressive.reset();
        self.velocity.reset();
    }
}
