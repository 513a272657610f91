/// Coverage checking for detected points
///
/// Determines whether a point's content was later reflected in the user's
/// notes or captured by a bookmark. Re-running can only add coverage, never
/// revoke it.

use crate::model::{BookmarkRef, CoverageType, ImportantPoint};
use crate::text;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

// Share of a point's key terms that must appear in the notes
const NOTES_TERM_RATIO: f64 = 0.60;

// A bookmark within this many seconds of an occurrence covers the point
const BOOKMARK_WINDOW_SECONDS: f64 = 30.0;

// Minimum skim score per pattern character for a label match
const LABEL_SCORE_PER_CHAR: i64 = 2;

/// Checks detected points against notes and bookmarks
pub struct CoverageChecker {
    matcher: SkimMatcherV2,
}

impl CoverageChecker {
    pub fn new() -> Self {
        Self {
            matcher: SkimMatcherV2::default(),
        }
    }

    /// Mark points whose content shows up in notes or near a bookmark
    ///
    /// Idempotent: a covered point can only gain the other coverage type
    /// (promoting to Both); coverage is never revoked.
    pub fn check_coverage(
        &self,
        points: &mut [ImportantPoint],
        notes: &str,
        bookmarks: &[BookmarkRef],
        now: f64,
    ) {
        let normalized_notes = text::normalize(notes);
        let note_terms = text::key_terms(notes);

        for point in points.iter_mut() {
            let in_notes = self.matches_notes(point, &normalized_notes, &note_terms);
            let in_bookmarks = self.matches_bookmark(point, bookmarks);

            let found = match (in_notes, in_bookmarks) {
                (true, true) => Some(CoverageType::Both),
                (true, false) => Some(CoverageType::Notes),
                (false, true) => Some(CoverageType::Bookmark),
                (false, false) => None,
            };

            if let Some(coverage) = found {
                point.coverage_type = combine(point.coverage_type, coverage);
                point.is_covered = true;
            }
            point.last_checked_at = now;
        }
    }

    /// Clear any internal state at a session boundary
    ///
    /// The checker is stateless apart from the matcher; kept for the
    /// coordinator's reset sweep.
    pub fn reset(&mut self) {}

    fn matches_notes(
        &self,
        point: &ImportantPoint,
        normalized_notes: &str,
        note_terms: &std::collections::HashSet<String>,
    ) -> bool {
        if normalized_notes.is_empty() {
            return false;
        }

        if normalized_notes.contains(&point.normalized_text) {
            return true;
        }

        if point.key_terms.is_empty() {
            return false;
        }

        let present = point
            .key_terms
            .iter()
            .filter(|t| note_terms.contains(*t))
            .count();

        present as f64 / point.key_terms.len() as f64 >= NOTES_TERM_RATIO
    }

    fn matches_bookmark(&self, point: &ImportantPoint, bookmarks: &[BookmarkRef]) -> bool {
        bookmarks.iter().any(|bookmark| {
            let near_occurrence = point
                .occurrences
                .iter()
                .any(|&t| (t - bookmark.time_seconds).abs() <= BOOKMARK_WINDOW_SECONDS);
            if near_occurrence {
                return true;
            }

            match &bookmark.label {
                Some(label) if !label.is_empty() => {
                    let threshold = LABEL_SCORE_PER_CHAR * label.len() as i64;
                    self.matcher
                        .fuzzy_match(&point.text, label)
                        .is_some_and(|score| score >= threshold)
                }
                _ => false,
            }
        })
    }
}

impl Default for CoverageChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Promote coverage; never downgrade
pub(crate) fn combine(existing: CoverageType, found: CoverageType) -> CoverageType {
    match (existing, found) {
        (CoverageType::None, f) => f,
        (CoverageType::Both, _) => CoverageType::Both,
        (e, f) if e == f => e,
        // Differing non-empty types means both sources have now matched
        _ => CoverageType::Both,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DetectionMethod;

    fn point(text: &str, occurrence: f64) -> ImportantPoint {
        ImportantPoint {
            id: "point-1".to_string(),
            text: text.to_string(),
            normalized_text: text::normalize(text),
            key_terms: text::key_terms(text),
            detection_method: DetectionMethod::Emphasis,
            first_occurrence: occurrence,
            occurrences: vec![occurrence],
            repetition_count: 1,
            confidence: 0.85,
            is_covered: false,
            coverage_type: CoverageType::None,
            last_checked_at: 0.0,
        }
    }

    #[test]
    fn test_notes_substring_coverage() {
        let checker = CoverageChecker::new();
        let mut points = vec![point("mitochondria produce ATP", 100.0)];

        checker.check_coverage(
            &mut points,
            "Remember: Mitochondria produce ATP in the matrix",
            &[],
            200.0,
        );

        assert!(points[0].is_covered);
        assert_eq!(points[0].coverage_type, CoverageType::Notes);
        assert_eq!(points[0].last_checked_at, 200.0);
    }

    #[test]
    fn test_notes_key_term_coverage() {
        let checker = CoverageChecker::new();
        let mut points = vec![point("enzymes lower activation energy", 50.0)];

        // Different phrasing, same terms
        checker.check_coverage(
            &mut points,
            "activation energy goes down because of enzymes",
            &[],
            60.0,
        );

        assert!(points[0].is_covered);
        assert_eq!(points[0].coverage_type, CoverageType::Notes);
    }

    #[test]
    fn test_bookmark_time_window_coverage() {
        let checker = CoverageChecker::new();
        let mut points = vec![point("osmosis moves water across membranes", 120.0)];

        let bookmarks = vec![BookmarkRef {
            id: "bm-1".to_string(),
            time_seconds: 135.0,
            label: None,
        }];

        checker.check_coverage(&mut points, "", &bookmarks, 150.0);

        assert!(points[0].is_covered);
        assert_eq!(points[0].coverage_type, CoverageType::Bookmark);
    }

    #[test]
    fn test_far_bookmark_does_not_cover() {
        let checker = CoverageChecker::new();
        let mut points = vec![point("osmosis moves water across membranes", 120.0)];

        let bookmarks = vec![BookmarkRef {
            id: "bm-1".to_string(),
            time_seconds: 400.0,
            label: None,
        }];

        checker.check_coverage(&mut points, "", &bookmarks, 150.0);

        assert!(!points[0].is_covered);
        assert_eq!(points[0].coverage_type, CoverageType::None);
    }

    #[test]
    fn test_bookmark_label_fuzzy_coverage() {
        let checker = CoverageChecker::new();
        let mut points = vec![point("glycolysis happens in the cytoplasm", 80.0)];

        let bookmarks = vec![BookmarkRef {
            id: "bm-1".to_string(),
            time_seconds: 900.0,
            label: Some("glycolysis".to_string()),
        }];

        checker.check_coverage(&mut points, "", &bookmarks, 100.0);

        assert!(points[0].is_covered);
        assert_eq!(points[0].coverage_type, CoverageType::Bookmark);
    }

    #[test]
    fn test_both_sources_promote_to_both() {
        let checker = CoverageChecker::new();
        let mut points = vec![point("mitochondria produce ATP", 100.0)];

        // First pass: notes only
        checker.check_coverage(&mut points, "mitochondria produce ATP", &[], 110.0);
        assert_eq!(points[0].coverage_type, CoverageType::Notes);

        // Second pass adds a bookmark: promoted, not replaced
        let bookmarks = vec![BookmarkRef {
            id: "bm-1".to_string(),
            time_seconds: 95.0,
            label: None,
        }];
        checker.check_coverage(&mut points, "mitochondria produce ATP", &bookmarks, 120.0);

        assert_eq!(points[0].coverage_type, CoverageType::Both);
    }

    #[test]
    fn test_coverage_never_revoked() {
        let checker = CoverageChecker::new();
        let mut points = vec![point("mitochondria produce ATP", 100.0)];

        checker.check_coverage(&mut points, "mitochondria produce ATP", &[], 110.0);
        assert!(points[0].is_covered);

        // Notes emptied afterwards: the point stays covered
        checker.check_coverage(&mut points, "", &[], 120.0);

        assert!(points[0].is_covered);
        assert_eq!(points[0].coverage_type, CoverageType::Notes);
    }
}
