/// AI topic-analysis collaborator boundary
///
/// The embedding application may plug in an analyzer that proposes
/// higher-quality subtopic suggestions asynchronously. This crate ships only
/// the seam; implementations live outside.

use crate::model::ImportantPoint;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the collaborator receives for one analysis request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicPayload {
    pub transcript: String,
    pub word_count: usize,
    pub dominant_topics: Vec<String>,
}

/// A subtopic the collaborator proposes covering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtopicSuggestion {
    pub topic: String,
    pub reason: String,
    pub confidence: f64,
}

/// Asynchronous topic-analysis collaborator
///
/// `analyze` is invoked fire-and-forget by the content analyzer behind a
/// single-flight guard; errors are logged and swallowed there. All other
/// methods are synchronous reads of whatever the collaborator has computed
/// so far, so implementations carry their own interior mutability.
#[async_trait]
pub trait TopicAnalyzer: Send + Sync {
    /// Whether the transcript has grown enough to warrant a new request
    fn should_trigger_analysis(&self, word_count: usize) -> bool;

    /// Run one analysis over the payload
    async fn analyze(&self, payload: TopicPayload) -> anyhow::Result<()>;

    /// Whether any analysis result is available yet
    fn has_analysis(&self) -> bool;

    /// Subtopics not yet surfaced to the user
    fn subtopic_suggestions(&self) -> Vec<SubtopicSuggestion>;

    /// Drop points that stray from the session's main topic
    fn filter_against_main_topic(&self, points: Vec<ImportantPoint>) -> Vec<ImportantPoint>;

    /// Record that a subtopic was surfaced, so it is not proposed again
    fn mark_subtopic_suggested(&self, topic: &str);

    /// Clear collaborator state at a session boundary
    fn reset(&self);
}
