/// Important-point coordinator
///
/// Composes the detectors, deduplicates and merges their output, runs
/// coverage checking, and owns the canonical point store for the session.

use crate::detectors::{coverage, CoverageChecker, Detector, EmphasisDetector, RepetitionTracker};
use crate::error::{AnalysisError, Result};
use crate::model::{BookmarkRef, CoverageType, DetectionMethod, ImportantPoint, PointStats};
use crate::text;
use crate::timing::{validate_timings, WordTiming};
use log::warn;

// Shared key terms over the smaller set at or past this ratio means one point
const SIGNIFICANT_OVERLAP: f64 = 0.70;

/// Default confidence floor for high-priority missed points
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.75;

/// Coordinator for important-point detection
pub struct ImportantPointAnalyzer {
    points: Vec<ImportantPoint>,
    repetition: RepetitionTracker,
    emphasis: EmphasisDetector,
    coverage: CoverageChecker,
    last_analysis_time: f64,
}

impl ImportantPointAnalyzer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            points: Vec::new(),
            repetition: RepetitionTracker::new(),
            emphasis: EmphasisDetector::new()?,
            coverage: CoverageChecker::new(),
            last_analysis_time: 0.0,
        })
    }

    /// Run the full detection pass over the current session state
    ///
    /// Detectors compose sequentially: the emphasis detector sees the points
    /// the repetition tracker produced this call.
    pub fn analyze(
        &mut self,
        transcript: &str,
        notes: &str,
        bookmarks: &[BookmarkRef],
        now: f64,
        timings: Option<&[WordTiming]>,
    ) -> &[ImportantPoint] {
        // Bad timing data downgrades to fallback timestamps rather than
        // corrupting binary-search results
        let timings = match timings {
            Some(t) => match validate_timings(t) {
                Ok(()) => Some(t),
                Err(e) => {
                    warn!("ignoring word timings: {}", e);
                    None
                }
            },
            None => None,
        };

        let current = std::mem::take(&mut self.points);
        let after_repetition =
            run_detector(&mut self.repetition, transcript, now, current, timings);
        let after_emphasis =
            run_detector(&mut self.emphasis, transcript, now, after_repetition, timings);

        let mut merged = dedup_and_merge(after_emphasis);
        self.coverage.check_coverage(&mut merged, notes, bookmarks, now);
        sort_points(&mut merged);

        self.points = merged;
        self.last_analysis_time = now;

        &self.points
    }

    /// All points, exam-first then confidence descending
    pub fn all_points(&self) -> &[ImportantPoint] {
        &self.points
    }

    /// Points not yet reflected in notes or bookmarks
    pub fn missed_points(&self) -> Vec<&ImportantPoint> {
        self.points.iter().filter(|p| !p.is_covered).collect()
    }

    /// Points already reflected in notes or bookmarks
    pub fn covered_points(&self) -> Vec<&ImportantPoint> {
        self.points.iter().filter(|p| p.is_covered).collect()
    }

    /// Missed points at or above the confidence floor, exam-first
    pub fn high_priority_missed_points(&self, min_confidence: f64) -> Vec<&ImportantPoint> {
        // The store is already exam-first/confidence-descending; filtering
        // preserves that order
        self.points
            .iter()
            .filter(|p| !p.is_covered && p.confidence >= min_confidence)
            .collect()
    }

    /// Aggregate stats for the UI
    pub fn stats(&self) -> PointStats {
        let total = self.points.len();
        let covered = self.points.iter().filter(|p| p.is_covered).count();
        let count_method = |m: DetectionMethod| {
            self.points
                .iter()
                .filter(|p| p.detection_method == m)
                .count()
        };
        let average_confidence = if total == 0 {
            0.0
        } else {
            self.points.iter().map(|p| p.confidence).sum::<f64>() / total as f64
        };

        PointStats {
            total,
            covered,
            missed: total - covered,
            exam_count: count_method(DetectionMethod::Exam),
            emphasis_count: count_method(DetectionMethod::Emphasis),
            repetition_count: count_method(DetectionMethod::Repetition),
            average_confidence,
        }
    }

    /// Manually mark a point as covered, e.g. when the user acts on a
    /// suggestion
    ///
    /// A differing pre-existing coverage type promotes to Both. Always
    /// refreshes the check timestamp.
    pub fn mark_as_covered(
        &mut self,
        id: &str,
        coverage_type: CoverageType,
        now: f64,
    ) -> Result<()> {
        let point = self
            .points
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AnalysisError::PointNotFound(id.to_string()))?;

        point.is_covered = true;
        point.coverage_type = coverage::combine(point.coverage_type, coverage_type);
        point.last_checked_at = now;

        Ok(())
    }

    pub fn last_analysis_time(&self) -> f64 {
        self.last_analysis_time
    }

    /// Clear the point store and every detector's session state
    pub fn reset(&mut self) {
        self.points.clear();
        self.repetition.reset();
        self.emphasis.reset();
        self.coverage.reset();
        self.last_analysis_time = 0.0;
    }
}

/// Invoke one detector inside an isolated failure boundary
///
/// A failing detector is logged and the prior point list survives, so one
/// misbehaving strategy cannot blank the session's points.
fn run_detector(
    detector: &mut dyn Detector,
    transcript: &str,
    now: f64,
    points: Vec<ImportantPoint>,
    timings: Option<&[WordTiming]>,
) -> Vec<ImportantPoint> {
    let fallback = points.clone();

    match detector.analyze(transcript, now, points, timings) {
        Ok(updated) => updated,
        Err(e) => {
            warn!(
                "detector '{}' failed, keeping prior points: {}",
                detector.name(),
                e
            );
            fallback
        }
    }
}

/// True when two points describe the same concept
fn has_significant_overlap(a: &ImportantPoint, b: &ImportantPoint) -> bool {
    if a.normalized_text == b.normalized_text {
        return true;
    }

    text::term_overlap_ratio(&a.key_terms, &b.key_terms) >= SIGNIFICANT_OVERLAP
}

/// Merge a lower-ranked source point into an accepted one
fn merge_points(existing: &mut ImportantPoint, source: ImportantPoint) {
    existing.confidence = existing.confidence.max(source.confidence);

    if source.detection_method.is_exam() && !existing.detection_method.is_exam() {
        existing.detection_method = DetectionMethod::Exam;
        existing.text = source.text;
        existing.normalized_text = source.normalized_text;
    }

    existing.merge_occurrences(&source.occurrences);
    existing.repetition_count = existing.repetition_count.max(source.repetition_count);
    existing.key_terms.extend(source.key_terms);
}

/// Collapse near-duplicate candidates into unique points
pub(crate) fn dedup_and_merge(mut candidates: Vec<ImportantPoint>) -> Vec<ImportantPoint> {
    sort_points(&mut candidates);

    let mut unique: Vec<ImportantPoint> = Vec::new();
    for candidate in candidates {
        match unique
            .iter_mut()
            .find(|u| has_significant_overlap(u, &candidate))
        {
            Some(existing) => merge_points(existing, candidate),
            None => unique.push(candidate),
        }
    }

    unique
}

/// Exam-method points first, then confidence descending
fn sort_points(points: &mut [ImportantPoint]) {
    points.sort_by(|a, b| {
        b.detection_method
            .is_exam()
            .cmp(&a.detection_method.is_exam())
            .then(b.confidence.partial_cmp(&a.confidence).unwrap())
    });
}
