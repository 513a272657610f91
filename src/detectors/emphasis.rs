// Finds explicitly emphasized statements in the transcript
//
// Like when the lecturer says "this will be on the exam" or "the key point
// is...". Those sentences matter more than the rest.

use crate::detectors::Detector;
use crate::error::Result;
use crate::model::{CoverageType, DetectionMethod, ImportantPoint, MAX_CONFIDENCE};
use crate::text;
use crate::timing::{resolve_timestamp, WordTiming};
use log::debug;
use regex::Regex;

// Extracted content shorter than this is noise, not a point
const MIN_CONTENT_LENGTH: usize = 10;

// Two matches in the same call sharing this much word overlap are duplicates
const INTRA_CALL_OVERLAP: f64 = 0.60;

// A match this similar to an existing emphasis/exam point is dropped
const CROSS_CALL_OVERLAP: f64 = 0.60;

// Confidence boost when a match repeats an existing point verbatim
const EXACT_MATCH_BOOST: f64 = 0.05;

/// Pattern group kinds, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternKind {
    Exam,
    Explicit,
    RepetitionMarker,
    Structural,
}

impl PatternKind {
    fn detection_method(&self) -> DetectionMethod {
        match self {
            PatternKind::Exam => DetectionMethod::Exam,
            _ => DetectionMethod::Emphasis,
        }
    }
}

/// One entry of the pattern catalog
struct EmphasisPattern {
    regex: Regex,
    kind: PatternKind,
    base_confidence: f64,
}

/// A match waiting for dedup and merge
struct EmphasisMatch {
    content: String,
    normalized: String,
    key_terms: std::collections::HashSet<String>,
    kind: PatternKind,
    confidence: f64,
    timestamp: f64,
}

/// Regex/pattern-based detector for emphasis, exam cues, structural markers
/// and repetition markers
///
/// Keeps a strictly forward-only scan cursor: each call scans only transcript
/// content it has not seen before.
pub struct EmphasisDetector {
    patterns: Vec<EmphasisPattern>,
    processed_length: usize,
    next_id: u64,
}

impl EmphasisDetector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            patterns: build_catalog()?,
            processed_length: 0,
            next_id: 0,
        })
    }

    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("emphasis-{}", self.next_id)
    }

    /// Confidence = base + length bonus + key-term bonus, capped
    fn score(base: f64, content: &str, key_term_count: usize) -> f64 {
        let length_bonus = (content.len() as f64 / 1000.0).min(0.05);
        let term_bonus = (0.005 * key_term_count as f64).min(0.03);

        (base + length_bonus + term_bonus).min(MAX_CONFIDENCE)
    }

    /// Collect raw matches from the unseen slice of the transcript
    fn collect_matches(
        &self,
        slice: &str,
        slice_offset: usize,
        now: f64,
        timings: Option<&[WordTiming]>,
    ) -> Vec<EmphasisMatch> {
        let mut matches = Vec::new();

        for pattern in &self.patterns {
            for caps in pattern.regex.captures_iter(slice) {
                let whole = caps.get(0).unwrap();
                let raw = caps.get(1).map(|m| m.as_str()).unwrap_or(whole.as_str());
                let content = text::trim_content(raw);

                if content.len() < MIN_CONTENT_LENGTH {
                    debug!(
                        "emphasis: skipping short content {:?} ({} chars)",
                        content,
                        content.len()
                    );
                    continue;
                }

                let key_terms = text::key_terms(content);
                let confidence = Self::score(pattern.base_confidence, content, key_terms.len());
                let timestamp = resolve_timestamp(timings, slice_offset + whole.start(), now);

                matches.push(EmphasisMatch {
                    content: content.to_string(),
                    normalized: text::normalize(content),
                    key_terms,
                    kind: pattern.kind,
                    confidence,
                    timestamp,
                });
            }
        }

        matches
    }

    /// Keep a match only if its word overlap with every already-kept match
    /// stays below the threshold
    fn dedup_within_call(mut matches: Vec<EmphasisMatch>) -> Vec<EmphasisMatch> {
        matches.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());

        let mut kept: Vec<EmphasisMatch> = Vec::new();
        for candidate in matches {
            let duplicate = kept.iter().any(|k| {
                text::word_overlap_ratio(&candidate.content, &k.content) >= INTRA_CALL_OVERLAP
            });
            if !duplicate {
                kept.push(candidate);
            }
        }

        kept
    }

    /// Fold kept matches into the existing point list
    ///
    /// Exact normalized repeats boost the existing point. A near-duplicate of
    /// any existing emphasis/exam point is dropped without boosting it, an
    /// asymmetry the rest of the pipeline expects.
    fn merge_into_points(
        &mut self,
        matches: Vec<EmphasisMatch>,
        mut points: Vec<ImportantPoint>,
        now: f64,
    ) -> Vec<ImportantPoint> {
        for m in matches {
            let existing = points.iter_mut().find(|p| {
                matches!(
                    p.detection_method,
                    DetectionMethod::Emphasis | DetectionMethod::Exam
                ) && p.normalized_text == m.normalized
            });

            if let Some(point) = existing {
                point.boost_confidence(EXACT_MATCH_BOOST);
                point.record_occurrence(m.timestamp);
                continue;
            }

            let near_duplicate = points.iter().any(|p| {
                matches!(
                    p.detection_method,
                    DetectionMethod::Emphasis | DetectionMethod::Exam
                ) && text::term_overlap_ratio(&p.key_terms, &m.key_terms) >= CROSS_CALL_OVERLAP
            });
            if near_duplicate {
                debug!("emphasis: dropping near-duplicate match {:?}", m.content);
                continue;
            }

            points.push(ImportantPoint {
                id: self.allocate_id(),
                text: m.content,
                normalized_text: m.normalized,
                key_terms: m.key_terms,
                detection_method: m.kind.detection_method(),
                first_occurrence: m.timestamp,
                occurrences: vec![m.timestamp],
                repetition_count: 1,
                confidence: m.confidence,
                is_covered: false,
                coverage_type: CoverageType::None,
                last_checked_at: now,
            });
        }

        points
    }
}

impl Detector for EmphasisDetector {
    fn name(&self) -> &'static str {
        "emphasis"
    }

    fn analyze(
        &mut self,
        transcript: &str,
        now: f64,
        points: Vec<ImportantPoint>,
        timings: Option<&[WordTiming]>,
    ) -> Result<Vec<ImportantPoint>> {
        // The transcript is append-only by contract. If the caller shrank it
        // anyway, the clamp scans nothing new; the cursor never rewinds.
        let mut start = self.processed_length.min(transcript.len());
        while start > 0 && !transcript.is_char_boundary(start) {
            start -= 1;
        }

        let slice = &transcript[start..];
        let matches = self.collect_matches(slice, start, now, timings);
        let kept = Self::dedup_within_call(matches);
        let updated = self.merge_into_points(kept, points, now);

        self.processed_length = transcript.len();

        Ok(updated)
    }

    fn reset(&mut self) {
        self.processed_length = 0;
        self.next_id = 0;
    }
}

/// Ordered pattern catalog, highest-priority groups first
fn build_catalog() -> Result<Vec<EmphasisPattern>> {
    let table: &[(&str, PatternKind, f64)] = &[
        // Exam cues
        (
            r"(?i)this (?:will|is going to) be on the (?:exam|test|final|quiz)[:,]?\s*([^.!?\n]+)",
            PatternKind::Exam,
            0.92,
        ),
        (
            r"(?i)(?:on|for) the (?:exam|test|final),? (?:you(?:'ll| will)? need to know|remember)[:,]?\s*([^.!?\n]+)",
            PatternKind::Exam,
            0.91,
        ),
        (
            r"(?i)(?:a )?(?:typical|common|classic) (?:exam|test) question (?:is|asks)[:,]?\s*([^.!?\n]+)",
            PatternKind::Exam,
            0.90,
        ),
        (
            r"(?i)remember this for the (?:exam|test|final)[:,]?\s*([^.!?\n]+)",
            PatternKind::Exam,
            0.90,
        ),
        // Explicit emphasis
        (
            r"(?i)(?:this|that) is (?:really |very |super |extremely )?important[:,]?\s*([^.!?\n]+)",
            PatternKind::Explicit,
            0.85,
        ),
        (
            r"(?i)pay (?:close )?attention(?: here| to this)?[:,]?\s*([^.!?\n]+)",
            PatternKind::Explicit,
            0.85,
        ),
        (
            r"(?i)(?:the )?key (?:point|idea|thing|takeaway)(?: here)? is(?: that)?[:,]?\s*([^.!?\n]+)",
            PatternKind::Explicit,
            0.85,
        ),
        (
            r"(?i)make sure (?:you|to) (?:know|remember|understand)(?: that)?[:,]?\s*([^.!?\n]+)",
            PatternKind::Explicit,
            0.85,
        ),
        (
            r"(?i)don'?t forget(?: that)?[:,]?\s*([^.!?\n]+)",
            PatternKind::Explicit,
            0.85,
        ),
        (
            r"(?i)write (?:this|that) down[:,]?\s*([^.!?\n]+)",
            PatternKind::Explicit,
            0.85,
        ),
        // Repetition markers
        (
            r"(?i)(?:as|like) i (?:said|mentioned)(?: before| earlier)?[:,]?\s*([^.!?\n]+)",
            PatternKind::RepetitionMarker,
            0.82,
        ),
        (
            r"(?i)i'?ll say (?:it|this) again[:,]?\s*([^.!?\n]+)",
            PatternKind::RepetitionMarker,
            0.81,
        ),
        (
            r"(?i)(?:once again|to repeat)[:,]?\s*([^.!?\n]+)",
            PatternKind::RepetitionMarker,
            0.80,
        ),
        // Structural markers
        (
            r"(?i)(?:in summary|to summarize|in conclusion|to conclude)[:,]?\s*([^.!?\n]+)",
            PatternKind::Structural,
            0.78,
        ),
        (
            r"(?i)the (?:main|central|most important) (?:idea|concept|point)(?: here)? is(?: that)?[:,]?\s*([^.!?\n]+)",
            PatternKind::Structural,
            0.77,
        ),
        (
            r"(?i)(?:in other words|which means|that means)[:,]?\s*([^.!?\n]+)",
            PatternKind::Structural,
            0.75,
        ),
    ];

    table
        .iter()
        .map(|(pattern, kind, base)| {
            Ok(EmphasisPattern {
                regex: Regex::new(pattern)?,
                kind: *kind,
                base_confidence: *base,
            })
        })
        .collect()
}
