/// lectern library
///
/// Incremental important-point detection and smart suggestions for live
/// recording and study sessions.

pub mod analyzer;
pub mod content;
pub mod detectors;
pub mod error;
pub mod model;
pub mod suggestions;
pub mod text;
pub mod timing;
pub mod topics;

// Re-exports for convenience
pub use analyzer::ImportantPointAnalyzer;
pub use content::ContentAnalyzer;
pub use error::{AnalysisError, Result};
pub use model::{
    BookmarkRef, ContentInsights, CoverageType, DetectionMethod, ImportantPoint, PointStats,
    SessionMode, SmartSuggestion, SuggestionPriority, SuggestionTrigger,
};
pub use suggestions::SmartSuggestionEngine;
pub use timing::WordTiming;
pub use topics::{SubtopicSuggestion, TopicAnalyzer, TopicPayload};
