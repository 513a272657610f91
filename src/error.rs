/// Error types for lectern
///
/// This module defines all possible errors that can occur in the analysis
/// pipeline. Uses thiserror for ergonomic error handling.

use thiserror::Error;

/// Main error type for lectern operations
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Pattern catalog failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A detector failed mid-analysis
    #[error("Detector '{name}' failed: {message}")]
    Detector { name: String, message: String },

    /// Word timings violated the sorted-by-char_start precondition
    #[error("Word timings not sorted by char_start at index {0}")]
    UnsortedTimings(usize),

    /// Point id not present in the session store
    #[error("Point not found: {0}")]
    PointNotFound(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Result type alias for lectern operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    /// Convert AnalysisError to a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Pattern(e) => {
                format!("Pattern catalog failed to build. Details: {}", e)
            }
            AnalysisError::Serialization(e) => {
                format!("Data format error: {}", e)
            }
            AnalysisError::Detector { name, message } => {
                format!("Detector '{}' failed: {}", name, message)
            }
            AnalysisError::UnsortedTimings(idx) => {
                format!("Word timing data is out of order (around word {})", idx)
            }
            AnalysisError::PointNotFound(id) => {
                format!("Point '{}' not found in this session", id)
            }
            AnalysisError::Generic(msg) => msg.clone(),
        }
    }
}
