/// Detector strategies
///
/// Each detector implements the same contract so the coordinator can drive
/// them interchangeably and isolate their failures.

pub mod coverage;
pub mod emphasis;
pub mod repetition;

use crate::error::Result;
use crate::model::ImportantPoint;
use crate::timing::WordTiming;

pub use coverage::CoverageChecker;
pub use emphasis::EmphasisDetector;
pub use repetition::RepetitionTracker;

/// Uniform capability shared by every detection strategy
///
/// `analyze` receives the full transcript plus the current point list and
/// returns the updated list. Detectors keep only their own scan cursors
/// between calls; the point store belongs to the coordinator.
pub trait Detector {
    /// Human-readable name used in failure logs
    fn name(&self) -> &'static str;

    /// Scan new transcript content and fold detections into `points`
    fn analyze(
        &mut self,
        transcript: &str,
        now: f64,
        points: Vec<ImportantPoint>,
        timings: Option<&[WordTiming]>,
    ) -> Result<Vec<ImportantPoint>>;

    /// Clear all internal state at a session boundary
    fn reset(&mut self);
}
