// Tracks concepts the speaker keeps coming back to
//
// A phrase mentioned three times across a session usually matters, even when
// nobody says "this is important" out loud.

use crate::detectors::Detector;
use crate::error::Result;
use crate::model::{CoverageType, DetectionMethod, ImportantPoint};
use crate::text;
use crate::timing::{resolve_timestamp, WordTiming};
use std::collections::HashMap;

// Mentions needed before a phrase becomes a point
const REPETITION_THRESHOLD: usize = 3;

// Confidence at exactly the threshold
const BASE_CONFIDENCE: f64 = 0.55;

// Confidence gained per mention past the threshold
const PER_MENTION_BONUS: f64 = 0.08;

// Repetition alone never gets more confident than this
const CONFIDENCE_CEILING: f64 = 0.90;

// Single tokens must be at least this long to count as a concept
const MIN_SINGLE_TOKEN_LENGTH: usize = 6;

// Tokens shorter than this break a content run
const MIN_RUN_TOKEN_LENGTH: usize = 3;

/// Session-wide mention bookkeeping for one phrase
struct PhraseStat {
    /// First-seen casing, used as the point text
    display: String,
    count: usize,
    occurrences: Vec<f64>,
}

/// Detects concepts mentioned repeatedly across the transcript
///
/// Same contract as the emphasis detector: forward-only cursor, mention
/// counts survive across calls for the whole session.
pub struct RepetitionTracker {
    processed_length: usize,
    counts: HashMap<String, PhraseStat>,
    next_id: u64,
}

impl RepetitionTracker {
    pub fn new() -> Self {
        Self {
            processed_length: 0,
            counts: HashMap::new(),
            next_id: 0,
        }
    }

    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("repetition-{}", self.next_id)
    }

    fn confidence_for(count: usize) -> f64 {
        let extra = count.saturating_sub(REPETITION_THRESHOLD) as f64;
        (BASE_CONFIDENCE + PER_MENTION_BONUS * extra).min(CONFIDENCE_CEILING)
    }

    /// Count phrase candidates in the unseen slice
    fn record_mentions(
        &mut self,
        slice: &str,
        slice_offset: usize,
        now: f64,
        timings: Option<&[WordTiming]>,
    ) {
        for candidate in extract_candidates(slice) {
            let timestamp =
                resolve_timestamp(timings, slice_offset + candidate.offset, now);

            let stat = self
                .counts
                .entry(candidate.normalized)
                .or_insert_with(|| PhraseStat {
                    display: candidate.display,
                    count: 0,
                    occurrences: Vec::new(),
                });

            stat.count += 1;
            stat.occurrences.push(timestamp);
        }
    }

    /// Emit or update points for every phrase past the threshold
    fn emit_points(&mut self, mut points: Vec<ImportantPoint>, now: f64) -> Vec<ImportantPoint> {
        // Ids must come from &mut self, so collect the ready phrases first
        let ready: Vec<(String, String, usize, Vec<f64>)> = self
            .counts
            .iter()
            .filter(|(_, stat)| stat.count >= REPETITION_THRESHOLD)
            .map(|(phrase, stat)| {
                (
                    phrase.clone(),
                    stat.display.clone(),
                    stat.count,
                    stat.occurrences.clone(),
                )
            })
            .collect();

        for (phrase, display, count, occurrences) in ready {
            let confidence = Self::confidence_for(count);

            if let Some(point) = points.iter_mut().find(|p| {
                p.detection_method == DetectionMethod::Repetition && p.normalized_text == phrase
            }) {
                point.repetition_count = point.repetition_count.max(count);
                point.confidence = point.confidence.max(confidence);
                point.merge_occurrences(&occurrences);
                continue;
            }

            let mut point = ImportantPoint {
                id: self.allocate_id(),
                text: display,
                normalized_text: phrase,
                key_terms: Default::default(),
                detection_method: DetectionMethod::Repetition,
                first_occurrence: 0.0,
                occurrences: Vec::new(),
                repetition_count: count,
                confidence,
                is_covered: false,
                coverage_type: CoverageType::None,
                last_checked_at: now,
            };
            point.key_terms = text::key_terms(&point.text);
            point.merge_occurrences(&occurrences);
            if let Some(&first) = point.occurrences.first() {
                point.first_occurrence = first;
            }
            points.push(point);
        }

        points
    }
}

impl Default for RepetitionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for RepetitionTracker {
    fn name(&self) -> &'static str {
        "repetition"
    }

    fn analyze(
        &mut self,
        transcript: &str,
        now: f64,
        points: Vec<ImportantPoint>,
        timings: Option<&[WordTiming]>,
    ) -> Result<Vec<ImportantPoint>> {
        let mut start = self.processed_length.min(transcript.len());
        while start > 0 && !transcript.is_char_boundary(start) {
            start -= 1;
        }

        let slice = &transcript[start..];
        self.record_mentions(slice, start, now, timings);
        let updated = self.emit_points(points, now);

        self.processed_length = transcript.len();

        Ok(updated)
    }

    fn reset(&mut self) {
        self.processed_length = 0;
        self.counts.clear();
        self.next_id = 0;
    }
}

/// A phrase candidate with its byte offset in the scanned slice
struct Candidate {
    normalized: String,
    display: String,
    offset: usize,
}

/// A token with its byte span in the scanned slice
struct Token {
    start: usize,
    end: usize,
}

/// Extract candidate concept phrases from text
///
/// Runs of consecutive content tokens (stop words, short tokens and numbers
/// break a run, as does sentence punctuation) yield bigrams and trigrams,
/// plus long single tokens. Near-duplicate phrasings are reconciled later by
/// the coordinator's merge, not here.
fn extract_candidates(slice: &str) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for run in content_runs(slice) {
        for size in [3, 2] {
            if run.len() < size {
                continue;
            }
            for window in run.windows(size) {
                let start = window[0].start;
                let end = window[size - 1].end;
                let display = slice[start..end].to_string();
                candidates.push(Candidate {
                    normalized: text::normalize(&display),
                    display,
                    offset: start,
                });
            }
        }

        for token in &run {
            if token.end - token.start >= MIN_SINGLE_TOKEN_LENGTH {
                let display = slice[token.start..token.end].to_string();
                candidates.push(Candidate {
                    normalized: text::normalize(&display),
                    display,
                    offset: token.start,
                });
            }
        }
    }

    candidates
}

/// Split text into runs of consecutive content tokens
fn content_runs(slice: &str) -> Vec<Vec<Token>> {
    let mut runs = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut word_start: Option<usize> = None;
    let mut gap_has_break = false;

    let close_word = |current: &mut Vec<Token>,
                          runs: &mut Vec<Vec<Token>>,
                          gap_has_break: &mut bool,
                          start: usize,
                          end: usize| {
        let word = slice[start..end].to_lowercase();
        if *gap_has_break && !current.is_empty() {
            runs.push(std::mem::take(current));
        }
        *gap_has_break = false;

        let is_content = word.len() >= MIN_RUN_TOKEN_LENGTH
            && !text::is_stop_word(&word)
            && !word.chars().all(|c| c.is_numeric());

        if is_content {
            current.push(Token { start, end });
        } else if !current.is_empty() {
            runs.push(std::mem::take(current));
        }
    };

    for (i, c) in slice.char_indices() {
        let is_word_char = c.is_alphanumeric() || c == '\'' || c == '-';
        match (is_word_char, word_start) {
            (true, None) => word_start = Some(i),
            (false, Some(start)) => {
                close_word(&mut current, &mut runs, &mut gap_has_break, start, i);
                word_start = None;
                if matches!(c, '.' | '!' | '?' | ',' | ';' | ':') {
                    gap_has_break = true;
                }
            }
            (false, None) => {
                if matches!(c, '.' | '!' | '?' | ',' | ';' | ':') {
                    gap_has_break = true;
                }
            }
            _ => {}
        }
    }
    if let Some(start) = word_start {
        close_word(&mut current, &mut runs, &mut gap_has_break, start, slice.len());
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_repeated_three_times_becomes_point() {
        let mut tracker = RepetitionTracker::new();
        let transcript = "So cellular respiration starts here. Later, cellular respiration \
                          continues. Finally cellular respiration wraps up.";

        let points = tracker.analyze(transcript, 120.0, Vec::new(), None).unwrap();

        let point = points
            .iter()
            .find(|p| p.normalized_text == "cellular respiration")
            .expect("repeated phrase should become a point");
        assert_eq!(point.detection_method, DetectionMethod::Repetition);
        assert!(point.repetition_count >= 3);
        assert!(point.confidence >= BASE_CONFIDENCE);
    }

    #[test]
    fn test_two_mentions_not_enough() {
        let mut tracker = RepetitionTracker::new();
        let transcript = "Cellular respiration starts. Then cellular respiration ends.";

        let points = tracker.analyze(transcript, 60.0, Vec::new(), None).unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn test_counts_accumulate_across_calls() {
        let mut tracker = RepetitionTracker::new();
        let part_one = "Cellular respiration starts. Then cellular respiration continues.";
        let points = tracker.analyze(part_one, 60.0, Vec::new(), None).unwrap();
        assert!(points.is_empty());

        let part_two = format!("{} And cellular respiration again.", part_one);
        let points = tracker.analyze(&part_two, 120.0, points, None).unwrap();

        let point = points
            .iter()
            .find(|p| p.normalized_text == "cellular respiration")
            .expect("third mention crosses the threshold");
        assert_eq!(point.repetition_count, 3);
    }

    #[test]
    fn test_confidence_grows_with_mentions() {
        assert!(RepetitionTracker::confidence_for(4) > RepetitionTracker::confidence_for(3));
        assert!(RepetitionTracker::confidence_for(50) <= CONFIDENCE_CEILING);
    }

    #[test]
    fn test_existing_point_updated_not_duplicated() {
        let mut tracker = RepetitionTracker::new();
        let three = "Krebs cycle one. Krebs cycle two. Krebs cycle three.";
        let points = tracker.analyze(three, 60.0, Vec::new(), None).unwrap();
        let count_before = points
            .iter()
            .filter(|p| p.normalized_text == "krebs cycle")
            .count();
        assert_eq!(count_before, 1);
        let confidence_before = points[0].confidence;

        let four = format!("{} Krebs cycle four.", three);
        let points = tracker.analyze(&four, 90.0, points, None).unwrap();

        let matching: Vec<_> = points
            .iter()
            .filter(|p| p.normalized_text == "krebs cycle")
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].repetition_count, 4);
        assert!(matching[0].confidence >= confidence_before);
    }

    #[test]
    fn test_long_single_token_tracked() {
        let mut tracker = RepetitionTracker::new();
        let transcript = "Mitochondria here. Mitochondria there. Mitochondria everywhere.";

        let points = tracker.analyze(transcript, 30.0, Vec::new(), None).unwrap();

        assert!(points.iter().any(|p| p.normalized_text == "mitochondria"));
    }

    #[test]
    fn test_stop_words_break_runs() {
        let runs = content_runs("osmosis is the movement of water");
        // "is", "the", "of" break runs; content tokens stand alone
        assert!(runs.iter().all(|run| run.len() <= 2));
    }

    #[test]
    fn test_occurrences_sorted_dedup() {
        let mut tracker = RepetitionTracker::new();
        // All three mentions land in one call with no timing data: they all
        // resolve to the fallback time and collapse to one occurrence.
        let transcript = "Entropy rises. Entropy rises. Entropy rises again.";
        let points = tracker.analyze(transcript, 42.0, Vec::new(), None).unwrap();

        let point = points
            .iter()
            .find(|p| p.normalized_text == "entropy")
            .unwrap();
        assert_eq!(point.occurrences, vec![42.0]);
        assert!(point.repetition_count >= 3);
    }

    #[test]
    fn test_reset_clears_session_counts() {
        let mut tracker = RepetitionTracker::new();
        let transcript = "Entropy one. Entropy two. Entropy three.";
        let points = tracker.analyze(transcript, 30.0, Vec::new(), None).unwrap();
        assert!(!points.is_empty());

        tracker.reset();

        let points = tracker
            .analyze("Entropy once more.", 10.0, Vec::new(), None)
            .unwrap();
        assert!(points.is_empty());
    }
}
