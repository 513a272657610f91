/// Whole-transcript content analysis and trigger derivation
///
/// Recomputes content metrics on every update, drives the important-point
/// analyzer, and derives mode-specific suggestion triggers from both.

use crate::analyzer::{ImportantPointAnalyzer, DEFAULT_MIN_CONFIDENCE};
use crate::error::Result;
use crate::model::{
    BookmarkRef, ContentDensity, ContentInsights, CoverageType, ImportantPoint, PointStats,
    SessionMode, SuggestionAction, SuggestionTrigger, TranscriptionQuality, TriggerType,
};
use crate::text;
use crate::timing::{validate_timings, WordTiming};
use crate::topics::{TopicAnalyzer, TopicPayload};
use log::{debug, warn};
use regex::Regex;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Words-per-minute cutoffs for the density buckets
const DENSITY_MEDIUM_WPM: f64 = 50.0;
const DENSITY_HIGH_WPM: f64 = 100.0;

// Confusion mentions before the recording-mode trigger fires
const RECORDING_CONFUSION_THRESHOLD: usize = 2;

// Transcript length before the notes-gap rule applies
const NOTES_GAP_WORD_FLOOR: usize = 200;

// Notes shorter than this share of the transcript count as a gap
const NOTES_GAP_RATIO: f64 = 0.10;

// Point-derived triggers surfaced per call
const MAX_POINT_TRIGGERS: usize = 2;

// Study-mode rule thresholds
const STUDY_DURATION_MINUTES: f64 = 25.0;
const STUDY_QUESTION_THRESHOLD: usize = 3;
const STUDY_LARGE_CONTENT_WORDS: usize = 800;

/// Known topic vocabularies, scanned with one regex per topic
const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "biology",
        &[
            "cell", "dna", "protein", "enzyme", "organism", "photosynthesis", "mitochondria",
            "evolution", "osmosis", "glucose",
        ],
    ),
    (
        "chemistry",
        &[
            "molecule", "reaction", "acid", "base", "electron", "compound", "bond", "atom", "ion",
        ],
    ),
    (
        "physics",
        &[
            "force", "energy", "velocity", "momentum", "gravity", "quantum", "wave", "particle",
        ],
    ),
    (
        "math",
        &[
            "equation", "derivative", "integral", "matrix", "theorem", "vector", "probability",
        ],
    ),
    (
        "history",
        &[
            "war", "revolution", "empire", "treaty", "century", "dynasty", "independence",
        ],
    ),
    (
        "computer science",
        &[
            "algorithm", "database", "compiler", "network", "software", "variable", "recursion",
        ],
    ),
    (
        "economics",
        &[
            "market", "inflation", "supply", "demand", "capital", "trade", "monetary",
        ],
    ),
    (
        "psychology",
        &[
            "behavior", "cognitive", "memory", "perception", "conditioning", "neuron",
        ],
    ),
];

/// Phrases signalling the speaker or listener is lost
const CONFUSION_PATTERN: &str = r"(?i)(?:i'?m (?:lost|confused)|i don'?t (?:understand|get it|follow)|doesn'?t make (?:any )?sense|what does that mean|wait,? what|not sure i understand|confusing|hard to follow)";

/// Orchestrator: content metrics, point analysis, suggestion triggers
pub struct ContentAnalyzer {
    transcript: String,
    notes: String,
    bookmarks: Vec<BookmarkRef>,
    word_timings: Option<Vec<WordTiming>>,
    point_analyzer: ImportantPointAnalyzer,
    last_analysis: Option<ContentInsights>,
    topic_analyzer: Option<Arc<dyn TopicAnalyzer>>,
    ai_request_in_flight: Arc<AtomicBool>,
    topic_patterns: Vec<(String, Regex)>,
    confusion_pattern: Regex,
}

impl ContentAnalyzer {
    pub fn new() -> Result<Self> {
        let topic_patterns = TOPIC_KEYWORDS
            .iter()
            .map(|(topic, terms)| {
                let pattern = format!(r"(?i)\b(?:{})\b", terms.join("|"));
                Ok((topic.to_string(), Regex::new(&pattern)?))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            transcript: String::new(),
            notes: String::new(),
            bookmarks: Vec::new(),
            word_timings: None,
            point_analyzer: ImportantPointAnalyzer::new()?,
            last_analysis: None,
            topic_analyzer: None,
            ai_request_in_flight: Arc::new(AtomicBool::new(false)),
            topic_patterns,
            confusion_pattern: Regex::new(CONFUSION_PATTERN)?,
        })
    }

    /// Attach the AI topic-analysis collaborator
    pub fn with_topic_analyzer(mut self, analyzer: Arc<dyn TopicAnalyzer>) -> Self {
        self.topic_analyzer = Some(analyzer);
        self
    }

    /// Reset everything for a fresh session
    pub fn start_session(&mut self) {
        self.transcript.clear();
        self.notes.clear();
        self.bookmarks.clear();
        self.word_timings = None;
        self.last_analysis = None;
        self.point_analyzer.reset();
        self.ai_request_in_flight.store(false, Ordering::SeqCst);
        if let Some(analyzer) = &self.topic_analyzer {
            analyzer.reset();
        }
    }

    /// Ingest the current transcript and notes and re-analyze
    ///
    /// Absent inputs coerce to empty strings. `now` is seconds since the
    /// session started.
    pub fn update_content(&mut self, transcription: Option<&str>, notes: Option<&str>, now: f64) {
        self.transcript = transcription.unwrap_or("").to_string();
        self.notes = notes.unwrap_or("").to_string();

        let insights = self.compute_insights(now);
        let word_count = insights.word_count;
        let dominant_topics = insights.dominant_topics.clone();
        self.last_analysis = Some(insights);

        self.point_analyzer.analyze(
            &self.transcript,
            &self.notes,
            &self.bookmarks,
            now,
            self.word_timings.as_deref(),
        );

        self.maybe_request_topic_analysis(word_count, dominant_topics);
    }

    /// Replace the bookmark set supplied by the bookmark manager
    pub fn set_bookmarks(&mut self, bookmarks: Vec<BookmarkRef>) {
        self.bookmarks = bookmarks;
    }

    /// Replace word-level timing data from the speech-to-text provider
    pub fn set_word_timings(&mut self, timings: Vec<WordTiming>) -> Result<()> {
        validate_timings(&timings)?;
        self.word_timings = Some(timings);
        Ok(())
    }

    /// The insights computed by the most recent update
    pub fn insights(&self) -> Option<&ContentInsights> {
        self.last_analysis.as_ref()
    }

    /// All detected points, exam-first then confidence descending
    pub fn all_points(&self) -> &[ImportantPoint] {
        self.point_analyzer.all_points()
    }

    /// Points not yet reflected in notes or bookmarks
    pub fn missed_points(&self) -> Vec<&ImportantPoint> {
        self.point_analyzer.missed_points()
    }

    /// Missed points above the default confidence floor
    pub fn high_priority_missed_points(&self) -> Vec<&ImportantPoint> {
        self.point_analyzer
            .high_priority_missed_points(DEFAULT_MIN_CONFIDENCE)
    }

    /// Aggregate point stats for the UI
    pub fn stats(&self) -> PointStats {
        self.point_analyzer.stats()
    }

    /// Mark a point covered on the user's behalf
    pub fn mark_point_covered(
        &mut self,
        id: &str,
        coverage_type: CoverageType,
        now: f64,
    ) -> Result<()> {
        self.point_analyzer.mark_as_covered(id, coverage_type, now)
    }

    /// Derive mode-specific triggers from the last insights and the point
    /// store, sorted by confidence descending (ties keep discovery order)
    pub fn get_suggestion_triggers(&self, mode: SessionMode) -> Vec<SuggestionTrigger> {
        let insights = match &self.last_analysis {
            Some(i) => i,
            None => return Vec::new(),
        };

        let mut triggers = match mode {
            SessionMode::Recording => self.recording_triggers(insights),
            SessionMode::Study => self.study_triggers(insights),
        };

        triggers.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());
        triggers
    }

    fn compute_insights(&self, now: f64) -> ContentInsights {
        let word_count = self.transcript.split_whitespace().count();
        let sentence_count = text::sentence_count(&self.transcript);
        let duration_minutes = (now / 60.0).max(0.0);

        let mut topic_counts = std::collections::HashMap::new();
        for (topic, pattern) in &self.topic_patterns {
            let count = pattern.find_iter(&self.transcript).count();
            if count > 0 {
                topic_counts.insert(topic.clone(), count);
            }
        }

        let mut ranked: Vec<(&String, &usize)> = topic_counts.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        let dominant_topics: Vec<String> = ranked.iter().take(3).map(|(t, _)| (*t).clone()).collect();

        let question_count = self.transcript.matches('?').count();
        let confusion_count = self.confusion_pattern.find_iter(&self.transcript).count();

        let density = if duration_minutes <= 0.0 {
            ContentDensity::Low
        } else {
            let wpm = word_count as f64 / duration_minutes;
            if wpm < DENSITY_MEDIUM_WPM {
                ContentDensity::Low
            } else if wpm < DENSITY_HIGH_WPM {
                ContentDensity::Medium
            } else {
                ContentDensity::High
            }
        };

        ContentInsights {
            topic_counts,
            dominant_topics,
            question_count,
            confusion_count,
            word_count,
            sentence_count,
            duration_minutes,
            density,
            transcription_quality: transcription_quality(&self.transcript),
            has_notes: !self.notes.trim().is_empty(),
            notes_word_count: self.notes.split_whitespace().count(),
        }
    }

    /// Fire the AI request if the collaborator wants one and none is in
    /// flight
    ///
    /// The spawned task owns its clones; success and failure both clear the
    /// guard and neither touches the synchronous path.
    fn maybe_request_topic_analysis(&self, word_count: usize, dominant_topics: Vec<String>) {
        let analyzer = match &self.topic_analyzer {
            Some(a) => Arc::clone(a),
            None => return,
        };

        if !analyzer.should_trigger_analysis(word_count) {
            return;
        }

        if self.ai_request_in_flight.swap(true, Ordering::SeqCst) {
            debug!("topic analysis already in flight, skipping");
            return;
        }

        let guard = Arc::clone(&self.ai_request_in_flight);
        let payload = TopicPayload {
            transcript: self.transcript.clone(),
            word_count,
            dominant_topics,
        };

        tokio::spawn(async move {
            if let Err(e) = analyzer.analyze(payload).await {
                warn!("topic analysis failed: {:#}", e);
            }
            guard.store(false, Ordering::SeqCst);
        });
    }

    fn recording_triggers(&self, insights: &ContentInsights) -> Vec<SuggestionTrigger> {
        let mut triggers = Vec::new();

        if insights.confusion_count >= RECORDING_CONFUSION_THRESHOLD {
            triggers.push(SuggestionTrigger {
                trigger_type: TriggerType::Confusion,
                confidence: confusion_confidence(insights.confusion_count),
                reason: format!(
                    "Heard {} moments of confusion so far",
                    insights.confusion_count
                ),
                suggested_action: SuggestionAction::Eli5,
                mode: SessionMode::Recording,
                context: json!({ "confusion_count": insights.confusion_count }),
            });
        }

        if insights.word_count >= NOTES_GAP_WORD_FLOOR
            && (insights.notes_word_count as f64)
                < insights.word_count as f64 * NOTES_GAP_RATIO
        {
            triggers.push(SuggestionTrigger {
                trigger_type: TriggerType::NotesGap,
                confidence: 0.70,
                reason: "Your notes are falling behind the lecture".to_string(),
                suggested_action: SuggestionAction::Notes,
                mode: SessionMode::Recording,
                context: json!({
                    "transcript_words": insights.word_count,
                    "notes_words": insights.notes_word_count,
                }),
            });
        }

        if (5.0..6.0).contains(&insights.duration_minutes) {
            triggers.push(SuggestionTrigger {
                trigger_type: TriggerType::Milestone,
                confidence: 0.65,
                reason: "Five minutes in".to_string(),
                suggested_action: SuggestionAction::Bookmark,
                mode: SessionMode::Recording,
                context: json!({ "milestone_minutes": 5 }),
            });
        } else if (10.0..11.0).contains(&insights.duration_minutes) {
            triggers.push(SuggestionTrigger {
                trigger_type: TriggerType::Milestone,
                confidence: 0.70,
                reason: "Ten minutes in".to_string(),
                suggested_action: SuggestionAction::Summary,
                mode: SessionMode::Recording,
                context: json!({ "milestone_minutes": 10 }),
            });
        }

        triggers.extend(self.point_triggers());
        triggers
    }

    /// Point-derived triggers: AI subtopics when available, rule-based
    /// missed points as fallback or padding
    fn point_triggers(&self) -> Vec<SuggestionTrigger> {
        let mut triggers = Vec::new();

        if let Some(analyzer) = self
            .topic_analyzer
            .as_ref()
            .filter(|a| a.has_analysis())
        {
            for subtopic in analyzer
                .subtopic_suggestions()
                .into_iter()
                .take(MAX_POINT_TRIGGERS)
            {
                analyzer.mark_subtopic_suggested(&subtopic.topic);
                triggers.push(SuggestionTrigger {
                    trigger_type: TriggerType::Subtopic,
                    confidence: subtopic.confidence,
                    reason: subtopic.reason,
                    suggested_action: SuggestionAction::Concept,
                    mode: SessionMode::Recording,
                    context: json!({ "subtopic": subtopic.topic }),
                });
            }

            if triggers.len() < MAX_POINT_TRIGGERS {
                let missed: Vec<ImportantPoint> = self
                    .point_analyzer
                    .high_priority_missed_points(DEFAULT_MIN_CONFIDENCE)
                    .into_iter()
                    .cloned()
                    .collect();
                let filtered = analyzer.filter_against_main_topic(missed);
                let room = MAX_POINT_TRIGGERS - triggers.len();
                triggers.extend(
                    filtered
                        .iter()
                        .take(room)
                        .map(|p| missed_point_trigger(p, SessionMode::Recording)),
                );
            }
        } else {
            triggers.extend(
                self.point_analyzer
                    .high_priority_missed_points(DEFAULT_MIN_CONFIDENCE)
                    .into_iter()
                    .take(MAX_POINT_TRIGGERS)
                    .map(|p| missed_point_trigger(p, SessionMode::Recording)),
            );
        }

        triggers
    }

    fn study_triggers(&self, insights: &ContentInsights) -> Vec<SuggestionTrigger> {
        let mut triggers = Vec::new();

        if insights.density == ContentDensity::High {
            if let Some(topic) = insights.dominant_topics.first() {
                triggers.push(SuggestionTrigger {
                    trigger_type: TriggerType::TopicDensity,
                    confidence: 0.70,
                    reason: format!("Dense {} content, worth testing yourself", topic),
                    suggested_action: SuggestionAction::Quiz,
                    mode: SessionMode::Study,
                    context: json!({ "topic": topic }),
                });
            }
        }

        if insights.confusion_count >= 1 {
            triggers.push(SuggestionTrigger {
                trigger_type: TriggerType::Confusion,
                confidence: confusion_confidence(insights.confusion_count),
                reason: "Some of this didn't land the first time".to_string(),
                suggested_action: SuggestionAction::Eli5,
                mode: SessionMode::Study,
                context: json!({ "confusion_count": insights.confusion_count }),
            });
        }

        if insights.duration_minutes >= STUDY_DURATION_MINUTES {
            triggers.push(SuggestionTrigger {
                trigger_type: TriggerType::Duration,
                confidence: 0.75,
                reason: "Long session, a recap would stick better".to_string(),
                suggested_action: SuggestionAction::Break,
                mode: SessionMode::Study,
                context: json!({ "duration_minutes": insights.duration_minutes }),
            });
        }

        if insights.question_count >= STUDY_QUESTION_THRESHOLD {
            triggers.push(SuggestionTrigger {
                trigger_type: TriggerType::QuestionRich,
                confidence: 0.72,
                reason: format!("{} open questions in this material", insights.question_count),
                suggested_action: SuggestionAction::Quiz,
                mode: SessionMode::Study,
                context: json!({ "question_count": insights.question_count }),
            });
        }

        if insights.word_count >= STUDY_LARGE_CONTENT_WORDS {
            triggers.push(SuggestionTrigger {
                trigger_type: TriggerType::LargeContent,
                confidence: 0.68,
                reason: "A lot of material here to condense".to_string(),
                suggested_action: SuggestionAction::Summary,
                mode: SessionMode::Study,
                context: json!({ "word_count": insights.word_count }),
            });
        }

        if insights.word_count >= NOTES_GAP_WORD_FLOOR
            && (insights.notes_word_count as f64)
                < insights.word_count as f64 * NOTES_GAP_RATIO
        {
            triggers.push(SuggestionTrigger {
                trigger_type: TriggerType::NotesGap,
                confidence: 0.66,
                reason: "Barely any notes for this much material".to_string(),
                suggested_action: SuggestionAction::Notes,
                mode: SessionMode::Study,
                context: json!({ "notes_words": insights.notes_word_count }),
            });
        }

        triggers
    }
}

fn confusion_confidence(count: usize) -> f64 {
    (0.6 + 0.1 * count as f64).min(0.95)
}

fn missed_point_trigger(point: &ImportantPoint, mode: SessionMode) -> SuggestionTrigger {
    SuggestionTrigger {
        trigger_type: TriggerType::TopicEmphasis,
        confidence: point.confidence,
        reason: format!("\"{}\" sounded important but isn't in your notes", point.text),
        suggested_action: SuggestionAction::Bookmark,
        mode,
        context: json!({ "point_id": point.id }),
    }
}

/// Cheap signal-quality heuristic over the transcript tokens
fn transcription_quality(transcript: &str) -> TranscriptionQuality {
    let tokens = text::tokenize(transcript);
    if tokens.is_empty() {
        return TranscriptionQuality::Poor;
    }

    let fragments = tokens.iter().filter(|t| t.len() <= 2).count();
    let fragment_ratio = fragments as f64 / tokens.len() as f64;
    let mean_length =
        tokens.iter().map(|t| t.len()).sum::<usize>() as f64 / tokens.len() as f64;

    if fragment_ratio > 0.4 {
        TranscriptionQuality::Poor
    } else if mean_length >= 4.0 {
        TranscriptionQuality::Good
    } else {
        TranscriptionQuality::Fair
    }
}
