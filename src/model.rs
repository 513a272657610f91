/// Data models for the analysis pipeline
///
/// All UI-facing types derive serde for the rendering boundary.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Hard ceiling for every confidence value in the pipeline
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Which strategy produced a point
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Repetition,
    Emphasis,
    Exam,
}

impl DetectionMethod {
    pub fn is_exam(&self) -> bool {
        matches!(self, DetectionMethod::Exam)
    }
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DetectionMethod::Repetition => "repetition",
            DetectionMethod::Emphasis => "emphasis",
            DetectionMethod::Exam => "exam",
        };
        write!(f, "{}", s)
    }
}

/// Whether a point's content was later reflected in notes and/or a bookmark
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CoverageType {
    Notes,
    Bookmark,
    Both,
    None,
}

/// A detected noteworthy transcript excerpt with confidence and provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportantPoint {
    /// Unique within the session, from a monotonic counter
    pub id: String,
    pub text: String,
    pub normalized_text: String,
    /// Significant tokens, stop words removed
    pub key_terms: HashSet<String>,
    pub detection_method: DetectionMethod,
    /// Seconds into the session
    pub first_occurrence: f64,
    /// Ascending, deduplicated seconds
    pub occurrences: Vec<f64>,
    pub repetition_count: usize,
    /// In [0, 0.95]; never decreases across merges
    pub confidence: f64,
    pub is_covered: bool,
    pub coverage_type: CoverageType,
    pub last_checked_at: f64,
}

impl ImportantPoint {
    /// Append a timestamp, preserving the sorted/deduplicated invariant
    pub fn record_occurrence(&mut self, at: f64) {
        if self.occurrences.iter().any(|&t| t == at) {
            return;
        }
        self.occurrences.push(at);
        self.occurrences.sort_by(|a, b| a.partial_cmp(b).unwrap());
        if let Some(&first) = self.occurrences.first() {
            self.first_occurrence = first;
        }
    }

    /// Merge another point's occurrences, keeping the invariant
    pub fn merge_occurrences(&mut self, other: &[f64]) {
        for &t in other {
            self.record_occurrence(t);
        }
    }

    /// Raise confidence by `amount`, never past the cap and never downward
    pub fn boost_confidence(&mut self, amount: f64) {
        self.confidence = (self.confidence + amount).min(MAX_CONFIDENCE);
    }
}

/// A bookmark handed over by the bookmark-manager collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkRef {
    pub id: String,
    /// Seconds into the session
    pub time_seconds: f64,
    pub label: Option<String>,
}

/// Words-per-minute bucket for the transcript
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentDensity {
    Low,
    Medium,
    High,
}

/// Rough signal quality of the transcription
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionQuality {
    Poor,
    Fair,
    Good,
}

/// Stateless whole-transcript snapshot, recomputed fully on every update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentInsights {
    pub topic_counts: HashMap<String, usize>,
    /// Top topics by mention count, highest first
    pub dominant_topics: Vec<String>,
    pub question_count: usize,
    pub confusion_count: usize,
    pub word_count: usize,
    pub sentence_count: usize,
    pub duration_minutes: f64,
    pub density: ContentDensity,
    pub transcription_quality: TranscriptionQuality,
    pub has_notes: bool,
    pub notes_word_count: usize,
}

impl ContentInsights {
    /// Serialize for the UI boundary
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Recommendation signal kinds derived from insights and the point store
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Confusion,
    NotesGap,
    Milestone,
    TopicEmphasis,
    Subtopic,
    TopicDensity,
    Duration,
    QuestionRich,
    LargeContent,
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TriggerType::Confusion => "confusion",
            TriggerType::NotesGap => "notes_gap",
            TriggerType::Milestone => "milestone",
            TriggerType::TopicEmphasis => "topic_emphasis",
            TriggerType::Subtopic => "subtopic",
            TriggerType::TopicDensity => "topic_density",
            TriggerType::Duration => "duration",
            TriggerType::QuestionRich => "question_rich",
            TriggerType::LargeContent => "large_content",
        };
        write!(f, "{}", s)
    }
}

/// Actions a suggestion can ask the user to take
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionAction {
    Summary,
    Quiz,
    Eli5,
    Concept,
    Bookmark,
    Review,
    Break,
    Notes,
}

impl std::fmt::Display for SuggestionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SuggestionAction::Summary => "summary",
            SuggestionAction::Quiz => "quiz",
            SuggestionAction::Eli5 => "eli5",
            SuggestionAction::Concept => "concept",
            SuggestionAction::Bookmark => "bookmark",
            SuggestionAction::Review => "review",
            SuggestionAction::Break => "break",
            SuggestionAction::Notes => "notes",
        };
        write!(f, "{}", s)
    }
}

/// Suggestion policy mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Passive, low-priority suggestions while recording
    Recording,
    /// Active, full-priority-range suggestions while studying
    Study,
}

/// Ephemeral recommendation signal; regenerated on every call, never stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionTrigger {
    pub trigger_type: TriggerType,
    pub confidence: f64,
    pub reason: String,
    pub suggested_action: SuggestionAction,
    pub mode: SessionMode,
    pub context: serde_json::Value,
}

/// Display priority for a suggestion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionPriority {
    Low,
    Medium,
    High,
}

impl SuggestionPriority {
    /// Rank for sorting, highest first
    pub fn rank(&self) -> u8 {
        match self {
            SuggestionPriority::High => 2,
            SuggestionPriority::Medium => 1,
            SuggestionPriority::Low => 0,
        }
    }
}

/// User-facing, ranked, dismissible wrapper around a trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartSuggestion {
    /// `{type}-{action}-{generation}`; the base id drops the counter suffix
    pub id: String,
    pub title: String,
    pub description: String,
    pub action: SuggestionAction,
    pub confidence: f64,
    pub priority: SuggestionPriority,
    pub icon: String,
    pub command: Option<String>,
    pub dismissible: bool,
    /// Seconds into the session at generation time
    pub timestamp: f64,
    pub mode: SessionMode,
}

impl SmartSuggestion {
    /// Identity independent of the per-generation counter suffix
    pub fn base_id(&self) -> String {
        match self.id.rsplit_once('-') {
            Some((base, suffix)) if suffix.chars().all(|c| c.is_ascii_digit()) => base.to_string(),
            _ => self.id.clone(),
        }
    }
}

/// Aggregate view of the point store for the UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointStats {
    pub total: usize,
    pub covered: usize,
    pub missed: usize,
    pub exam_count: usize,
    pub emphasis_count: usize,
    pub repetition_count: usize,
    pub average_confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_point() -> ImportantPoint {
        ImportantPoint {
            id: "point-1".to_string(),
            text: "Mitochondria produce ATP".to_string(),
            normalized_text: "mitochondria produce atp".to_string(),
            key_terms: ["mitochondria", "produce", "atp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            detection_method: DetectionMethod::Emphasis,
            first_occurrence: 12.0,
            occurrences: vec![12.0],
            repetition_count: 1,
            confidence: 0.85,
            is_covered: false,
            coverage_type: CoverageType::None,
            last_checked_at: 0.0,
        }
    }

    #[test]
    fn test_record_occurrence_keeps_sorted_dedup() {
        let mut point = sample_point();
        point.record_occurrence(5.0);
        point.record_occurrence(20.0);
        point.record_occurrence(12.0); // duplicate

        assert_eq!(point.occurrences, vec![5.0, 12.0, 20.0]);
        assert_eq!(point.first_occurrence, 5.0);
    }

    #[test]
    fn test_boost_confidence_caps() {
        let mut point = sample_point();
        point.boost_confidence(0.05);
        assert!((point.confidence - 0.90).abs() < 1e-9);

        point.boost_confidence(0.5);
        assert_eq!(point.confidence, MAX_CONFIDENCE);
    }

    #[test]
    fn test_suggestion_base_id() {
        let suggestion = SmartSuggestion {
            id: "confusion-eli5-14".to_string(),
            title: String::new(),
            description: String::new(),
            action: SuggestionAction::Eli5,
            confidence: 0.8,
            priority: SuggestionPriority::Low,
            icon: String::new(),
            command: None,
            dismissible: true,
            timestamp: 0.0,
            mode: SessionMode::Study,
        };
        assert_eq!(suggestion.base_id(), "confusion-eli5");
    }

    #[test]
    fn test_serde_round_trip() {
        let point = sample_point();
        let json = serde_json::to_string(&point).unwrap();
        assert!(json.contains("\"emphasis\""));

        let back: ImportantPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, point.id);
        assert_eq!(back.detection_method, DetectionMethod::Emphasis);
    }
}
