/// Smart suggestion engine
///
/// Converts triggers into ranked, cooldown-respecting, user-dismissible
/// suggestions, and parses simple command phrases.

use crate::content::ContentAnalyzer;
use crate::model::{
    SessionMode, SmartSuggestion, SuggestionAction, SuggestionPriority, SuggestionTrigger,
    TriggerType,
};
use std::collections::{HashMap, HashSet};

// Mode-dependent confidence floors for presenting a trigger
const RECORDING_CONFIDENCE_FLOOR: f64 = 0.65;
const STUDY_CONFIDENCE_FLOOR: f64 = 0.60;

// Nothing is presentable this soon after the last mark_shown
const GLOBAL_COOLDOWN_SECONDS: f64 = 120.0;

// A shown suggestion may resurface only past this age and at or below this
// confidence
const RESUGGEST_AFTER_SECONDS: f64 = 600.0;
const RESUGGEST_MAX_CONFIDENCE: f64 = 0.85;

/// Per-engine suggestion bookkeeping, keyed by base id
///
/// Mutated only by the explicit mark_* calls, never by get_suggestions.
#[derive(Debug, Default)]
struct SuggestionState {
    shown: HashSet<String>,
    /// When each base id was first shown; drives the resuggestion window
    first_shown_at: HashMap<String, f64>,
    dismissed: HashSet<String>,
    accepted: HashSet<String>,
    last_suggestion_time: Option<f64>,
}

/// Converts triggers into user-facing suggestions
pub struct SmartSuggestionEngine {
    state: SuggestionState,
    generation: u64,
}

impl SmartSuggestionEngine {
    pub fn new() -> Self {
        Self {
            state: SuggestionState::default(),
            generation: 0,
        }
    }

    /// Generate ranked suggestions for the current content state
    ///
    /// Reads the analyzer's triggers; never mutates shown/dismissed state or
    /// the cooldown stamp.
    pub fn get_suggestions(
        &mut self,
        content: &ContentAnalyzer,
        mode: SessionMode,
        now: f64,
    ) -> Vec<SmartSuggestion> {
        if let Some(last) = self.state.last_suggestion_time {
            if now - last < GLOBAL_COOLDOWN_SECONDS {
                return Vec::new();
            }
        }

        let floor = match mode {
            SessionMode::Recording => RECORDING_CONFIDENCE_FLOOR,
            SessionMode::Study => STUDY_CONFIDENCE_FLOOR,
        };

        let mut suggestions: Vec<SmartSuggestion> = content
            .get_suggestion_triggers(mode)
            .into_iter()
            .filter(|t| t.confidence >= floor)
            .map(|t| self.build_suggestion(&t, mode, now))
            .collect();

        suggestions.retain(|s| self.presentable(s, now));
        suggestions.sort_by(|a, b| {
            b.priority
                .rank()
                .cmp(&a.priority.rank())
                .then(b.confidence.partial_cmp(&a.confidence).unwrap())
        });

        suggestions
    }

    /// Record that the UI displayed a suggestion
    ///
    /// Stamps the global cooldown and, for a first showing, the resuggestion
    /// clock.
    pub fn mark_shown(&mut self, id: &str, now: f64) {
        let base = base_id_of(id);
        self.state.first_shown_at.entry(base.clone()).or_insert(now);
        self.state.shown.insert(base);
        self.state.last_suggestion_time = Some(now);
    }

    /// Record that the user dismissed a suggestion
    pub fn mark_dismissed(&mut self, id: &str) {
        self.state.dismissed.insert(base_id_of(id));
    }

    /// Record that the user accepted a suggestion; accepted implies
    /// dismissed so it is not offered again
    pub fn mark_accepted(&mut self, id: &str) {
        let base = base_id_of(id);
        self.state.accepted.insert(base.clone());
        self.state.dismissed.insert(base);
    }

    /// Whether the user accepted this suggestion at some point
    pub fn is_accepted(&self, id: &str) -> bool {
        self.state.accepted.contains(&base_id_of(id))
    }

    /// Clear all suggestion state at a session boundary
    pub fn reset(&mut self) {
        self.state = SuggestionState::default();
        self.generation = 0;
    }

    /// Match a free-text phrase against the fixed command table
    ///
    /// Case-insensitive substring match, first entry wins. The returned
    /// suggestion is not dismissible; the user asked for it.
    pub fn parse_natural_language_command(
        &mut self,
        input: &str,
        mode: SessionMode,
        now: f64,
    ) -> Option<SmartSuggestion> {
        let lowered = input.to_lowercase();

        let action = COMMAND_PHRASES
            .iter()
            .find(|(phrase, _)| lowered.contains(phrase))
            .map(|(_, action)| *action)?;

        let action = canonical_action(action);
        let entry = action_entry(action);
        self.generation += 1;

        Some(SmartSuggestion {
            id: format!("command-{}-{}", action, self.generation),
            title: entry.title.to_string(),
            description: entry.description.to_string(),
            action,
            confidence: 1.0,
            priority: SuggestionPriority::High,
            icon: entry.icon.to_string(),
            command: Some(entry.command.to_string()),
            dismissible: false,
            timestamp: now,
            mode,
        })
    }

    fn build_suggestion(
        &mut self,
        trigger: &SuggestionTrigger,
        mode: SessionMode,
        now: f64,
    ) -> SmartSuggestion {
        let action = canonical_action(trigger.suggested_action);
        let entry = action_entry(action);
        self.generation += 1;

        SmartSuggestion {
            id: format!("{}-{}-{}", trigger.trigger_type, action, self.generation),
            title: entry.title.to_string(),
            description: trigger.reason.clone(),
            action,
            confidence: trigger.confidence,
            priority: priority_for(mode, trigger),
            icon: entry.icon.to_string(),
            command: Some(entry.command.to_string()),
            dismissible: true,
            timestamp: now,
            mode,
        }
    }

    fn presentable(&self, suggestion: &SmartSuggestion, now: f64) -> bool {
        let base = suggestion.base_id();

        if self.state.dismissed.contains(&base) {
            return false;
        }

        if self.state.shown.contains(&base) {
            return self.should_resuggest(&base, suggestion.confidence, now);
        }

        true
    }

    /// A shown suggestion resurfaces only at modest confidence and after the
    /// window has elapsed since it was first shown
    fn should_resuggest(&self, base_id: &str, confidence: f64, now: f64) -> bool {
        if confidence > RESUGGEST_MAX_CONFIDENCE {
            return false;
        }

        self.state
            .first_shown_at
            .get(base_id)
            .is_some_and(|&shown_at| now - shown_at >= RESUGGEST_AFTER_SECONDS)
    }
}

impl Default for SmartSuggestionEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed UI copy per action
struct ActionEntry {
    title: &'static str,
    description: &'static str,
    icon: &'static str,
    command: &'static str,
}

fn action_entry(action: SuggestionAction) -> ActionEntry {
    match action {
        SuggestionAction::Summary => ActionEntry {
            title: "Summarize so far",
            description: "Condense the session into a short summary",
            icon: "📝",
            command: "/summary",
        },
        SuggestionAction::Quiz => ActionEntry {
            title: "Quiz yourself",
            description: "Turn this material into practice questions",
            icon: "❓",
            command: "/quiz",
        },
        SuggestionAction::Eli5 => ActionEntry {
            title: "Get a simpler explanation",
            description: "Re-explain the confusing part in plain terms",
            icon: "💡",
            command: "/eli5",
        },
        SuggestionAction::Concept => ActionEntry {
            title: "Capture the concept",
            description: "Add the key concept to your notes",
            icon: "📌",
            command: "/note",
        },
        SuggestionAction::Bookmark => ActionEntry {
            title: "Drop a bookmark",
            description: "Mark this moment to revisit later",
            icon: "🔖",
            command: "/bookmark",
        },
        SuggestionAction::Review => ActionEntry {
            title: "Review key points",
            description: "Walk back through what mattered most",
            icon: "🔁",
            command: "/review",
        },
        // Remapped before lookup; unreachable through the public path
        SuggestionAction::Break => action_entry(SuggestionAction::Summary),
        SuggestionAction::Notes => action_entry(SuggestionAction::Concept),
    }
}

/// Two trigger actions remap to a different underlying action
fn canonical_action(action: SuggestionAction) -> SuggestionAction {
    match action {
        SuggestionAction::Break => SuggestionAction::Summary,
        SuggestionAction::Notes => SuggestionAction::Concept,
        other => other,
    }
}

fn priority_for(mode: SessionMode, trigger: &SuggestionTrigger) -> SuggestionPriority {
    match mode {
        SessionMode::Recording => {
            let emphatic = matches!(
                trigger.trigger_type,
                TriggerType::Confusion | TriggerType::TopicEmphasis
            );
            if emphatic && trigger.confidence > 0.8 {
                SuggestionPriority::Medium
            } else {
                SuggestionPriority::Low
            }
        }
        SessionMode::Study => {
            let urgent = (trigger.trigger_type == TriggerType::Confusion
                && trigger.confidence > 0.8)
                || (trigger.trigger_type == TriggerType::Duration && trigger.confidence > 0.7);
            if urgent || trigger.confidence > 0.85 {
                SuggestionPriority::High
            } else if trigger.confidence > 0.7 {
                SuggestionPriority::Medium
            } else {
                SuggestionPriority::Low
            }
        }
    }
}

/// Identity without the per-generation counter suffix
fn base_id_of(id: &str) -> String {
    match id.rsplit_once('-') {
        Some((base, suffix)) if suffix.chars().all(|c| c.is_ascii_digit()) => base.to_string(),
        _ => id.to_string(),
    }
}

/// Ordered phrase table for the command parser; first match wins
const COMMAND_PHRASES: &[(&str, SuggestionAction)] = &[
    ("summarize", SuggestionAction::Summary),
    ("summary", SuggestionAction::Summary),
    ("quiz me", SuggestionAction::Quiz),
    ("test me", SuggestionAction::Quiz),
    ("quiz", SuggestionAction::Quiz),
    ("explain it simply", SuggestionAction::Eli5),
    ("explain", SuggestionAction::Eli5),
    ("eli5", SuggestionAction::Eli5),
    ("bookmark", SuggestionAction::Bookmark),
    ("mark this", SuggestionAction::Bookmark),
    ("note this", SuggestionAction::Notes),
    ("take a note", SuggestionAction::Notes),
    ("review", SuggestionAction::Review),
];

#[cfg(test)]
mod tests {
    use super::*;

    // Notes-gap recording trigger: 250 transcript words, near-empty notes,
    // confidence 0.70 (resuggestable)
    fn notes_gap_analyzer() -> ContentAnalyzer {
        let mut content = ContentAnalyzer::new().unwrap();
        let transcript = vec!["word"; 250].join(" ");
        content.update_content(Some(&transcript), Some("tiny"), 300.0);
        content
    }

    // High-confidence exam point plus heavy confusion, for priority tests
    fn busy_analyzer() -> ContentAnalyzer {
        let mut content = ContentAnalyzer::new().unwrap();
        let transcript = "I'm lost. This is confusing. What does that mean? \
                          This will be on the exam: water is a polar molecule.";
        content.update_content(Some(transcript), None, 30.0 * 60.0);
        content
    }

    #[test]
    fn test_recording_never_high_priority() {
        let content = busy_analyzer();
        let mut engine = SmartSuggestionEngine::new();

        let suggestions = engine.get_suggestions(&content, SessionMode::Recording, 1800.0);

        assert!(!suggestions.is_empty());
        assert!(suggestions
            .iter()
            .all(|s| s.priority != SuggestionPriority::High));
    }

    #[test]
    fn test_recording_emphatic_triggers_rank_medium() {
        let content = busy_analyzer();
        let mut engine = SmartSuggestionEngine::new();

        let suggestions = engine.get_suggestions(&content, SessionMode::Recording, 1800.0);

        // Confusion (0.9) and the exam point (0.95) both clear the 0.8 bar
        let mediums = suggestions
            .iter()
            .filter(|s| s.priority == SuggestionPriority::Medium)
            .count();
        assert!(mediums >= 2);
    }

    #[test]
    fn test_study_priority_policy() {
        let content = busy_analyzer();
        let mut engine = SmartSuggestionEngine::new();

        let suggestions = engine.get_suggestions(&content, SessionMode::Study, 1800.0);

        // Confusion at 0.9 and the 25-minute duration rule at 0.75 are both
        // urgent in study mode
        let highs: Vec<_> = suggestions
            .iter()
            .filter(|s| s.priority == SuggestionPriority::High)
            .collect();
        assert!(highs.len() >= 2);

        // Priority outranks confidence in the final order
        for pair in suggestions.windows(2) {
            assert!(pair[0].priority.rank() >= pair[1].priority.rank());
        }
    }

    #[test]
    fn test_action_remaps() {
        let content = busy_analyzer();
        let mut engine = SmartSuggestionEngine::new();

        let suggestions = engine.get_suggestions(&content, SessionMode::Study, 1800.0);

        // The duration trigger asks for Break, the notes-gap trigger for
        // Notes; neither survives the remap table
        assert!(suggestions
            .iter()
            .all(|s| s.action != SuggestionAction::Break && s.action != SuggestionAction::Notes));
        assert!(suggestions
            .iter()
            .any(|s| s.action == SuggestionAction::Summary));
    }

    #[test]
    fn test_confidence_floor_by_mode() {
        let content = notes_gap_analyzer();
        let mut engine = SmartSuggestionEngine::new();

        // Notes gap is 0.70 recording / 0.66 study: above both floors
        assert!(!engine
            .get_suggestions(&content, SessionMode::Recording, 300.0)
            .is_empty());
        assert!(!engine
            .get_suggestions(&content, SessionMode::Study, 300.0)
            .is_empty());
    }

    #[test]
    fn test_get_suggestions_does_not_stamp_cooldown() {
        let content = notes_gap_analyzer();
        let mut engine = SmartSuggestionEngine::new();

        // Repeated calls with no mark_shown keep yielding suggestions
        assert!(!engine
            .get_suggestions(&content, SessionMode::Recording, 300.0)
            .is_empty());
        assert!(!engine
            .get_suggestions(&content, SessionMode::Recording, 301.0)
            .is_empty());
    }

    #[test]
    fn test_global_cooldown_after_mark_shown() {
        let content = busy_analyzer();
        let mut engine = SmartSuggestionEngine::new();

        let suggestions = engine.get_suggestions(&content, SessionMode::Recording, 1800.0);
        engine.mark_shown(&suggestions[0].id, 1800.0);

        // Inside the two-minute window nothing is presentable at all
        assert!(engine
            .get_suggestions(&content, SessionMode::Recording, 1860.0)
            .is_empty());

        // Past the window, other suggestions flow again
        assert!(!engine
            .get_suggestions(&content, SessionMode::Recording, 1980.0)
            .is_empty());
    }

    #[test]
    fn test_dismissed_suggestion_excluded() {
        let content = busy_analyzer();
        let mut engine = SmartSuggestionEngine::new();

        let suggestions = engine.get_suggestions(&content, SessionMode::Recording, 1800.0);
        let victim = suggestions[0].clone();
        engine.mark_dismissed(&victim.id);

        let after = engine.get_suggestions(&content, SessionMode::Recording, 1801.0);
        assert!(after.iter().all(|s| s.base_id() != victim.base_id()));
    }

    #[test]
    fn test_accepted_implies_dismissed() {
        let content = busy_analyzer();
        let mut engine = SmartSuggestionEngine::new();

        let suggestions = engine.get_suggestions(&content, SessionMode::Recording, 1800.0);
        let victim = suggestions[0].clone();
        engine.mark_accepted(&victim.id);

        assert!(engine.is_accepted(&victim.id));
        let after = engine.get_suggestions(&content, SessionMode::Recording, 1801.0);
        assert!(after.iter().all(|s| s.base_id() != victim.base_id()));
    }

    #[test]
    fn test_shown_suggestion_hidden_before_window() {
        let content = notes_gap_analyzer();
        let mut engine = SmartSuggestionEngine::new();

        let suggestions = engine.get_suggestions(&content, SessionMode::Recording, 300.0);
        let shown = suggestions[0].clone();
        assert!(shown.confidence <= RESUGGEST_MAX_CONFIDENCE);
        engine.mark_shown(&shown.id, 300.0);

        // Nine minutes later: past the cooldown, still inside the
        // resuggestion window
        let after = engine.get_suggestions(&content, SessionMode::Recording, 300.0 + 540.0);
        assert!(after.iter().all(|s| s.base_id() != shown.base_id()));
    }

    // The resuggestion window counts from when the user first saw the
    // suggestion, not from the generation timestamp of the current call.
    #[test]
    fn test_shown_suggestion_resurfaces_after_window() {
        let content = notes_gap_analyzer();
        let mut engine = SmartSuggestionEngine::new();

        let suggestions = engine.get_suggestions(&content, SessionMode::Recording, 300.0);
        let shown = suggestions[0].clone();
        engine.mark_shown(&shown.id, 300.0);

        // Eleven minutes after first showing
        let after = engine.get_suggestions(&content, SessionMode::Recording, 300.0 + 660.0);
        assert!(after.iter().any(|s| s.base_id() == shown.base_id()));
    }

    #[test]
    fn test_high_confidence_suggestion_never_resurfaces() {
        let content = busy_analyzer();
        let mut engine = SmartSuggestionEngine::new();

        let suggestions = engine.get_suggestions(&content, SessionMode::Recording, 1800.0);
        let exam = suggestions
            .iter()
            .find(|s| s.confidence > RESUGGEST_MAX_CONFIDENCE)
            .expect("exam point trigger exceeds the resuggest cap")
            .clone();
        engine.mark_shown(&exam.id, 1800.0);

        // Well past the window, still hidden: confidence is too high
        let after = engine.get_suggestions(&content, SessionMode::Recording, 1800.0 + 8000.0);
        assert!(after.iter().all(|s| s.base_id() != exam.base_id()));
    }

    #[test]
    fn test_reset_clears_suggestion_state() {
        let content = busy_analyzer();
        let mut engine = SmartSuggestionEngine::new();

        let suggestions = engine.get_suggestions(&content, SessionMode::Recording, 1800.0);
        engine.mark_shown(&suggestions[0].id, 1800.0);
        engine.mark_dismissed(&suggestions[0].id);

        engine.reset();

        // Cooldown and dismissal both gone
        let after = engine.get_suggestions(&content, SessionMode::Recording, 1801.0);
        assert!(!after.is_empty());
    }

    #[test]
    fn test_parse_command_first_match_wins() {
        let mut engine = SmartSuggestionEngine::new();

        // "summarize" sits before "quiz" in the table
        let suggestion = engine
            .parse_natural_language_command(
                "can you summarize this before the quiz",
                SessionMode::Study,
                100.0,
            )
            .unwrap();
        assert_eq!(suggestion.action, SuggestionAction::Summary);
    }

    #[test]
    fn test_parse_command_case_insensitive() {
        let mut engine = SmartSuggestionEngine::new();

        let suggestion = engine
            .parse_natural_language_command("QUIZ ME on this chapter", SessionMode::Study, 100.0)
            .unwrap();
        assert_eq!(suggestion.action, SuggestionAction::Quiz);
        assert_eq!(suggestion.confidence, 1.0);
        assert!(!suggestion.dismissible);
    }

    #[test]
    fn test_parse_command_remaps_notes() {
        let mut engine = SmartSuggestionEngine::new();

        let suggestion = engine
            .parse_natural_language_command("note this down please", SessionMode::Study, 100.0)
            .unwrap();
        assert_eq!(suggestion.action, SuggestionAction::Concept);
    }

    #[test]
    fn test_parse_command_no_match() {
        let mut engine = SmartSuggestionEngine::new();

        assert!(engine
            .parse_natural_language_command("what a nice day", SessionMode::Study, 100.0)
            .is_none());
    }

    #[test]
    fn test_base_id_of() {
        assert_eq!(base_id_of("confusion-eli5-14"), "confusion-eli5");
        assert_eq!(base_id_of("weird"), "weird");
        assert_eq!(base_id_of("no-suffix-here"), "no-suffix-here");
    }
}
