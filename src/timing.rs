/// Word-level timing data from the speech-to-text provider
///
/// Maps byte offsets in the transcript back to playback timestamps.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Timing for a single transcribed word
///
/// `char_start`/`char_end` are byte offsets into the transcript string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    /// Playback time of the word, in seconds
    pub start: f64,
    pub char_start: usize,
    pub char_end: usize,
}

/// Validate the sorted-by-char_start precondition
///
/// # Returns
/// * `Err(UnsortedTimings)` with the index of the first violation
pub fn validate_timings(timings: &[WordTiming]) -> Result<()> {
    for (i, pair) in timings.windows(2).enumerate() {
        if pair[1].char_start < pair[0].char_start {
            return Err(AnalysisError::UnsortedTimings(i + 1));
        }
    }
    Ok(())
}

/// Resolve a transcript byte offset to a playback timestamp
///
/// Binary-searches `timings` (sorted by `char_start`) for the word whose span
/// contains the offset. A position between words resolves to the nearest
/// preceding word's start. With no usable timing data, `fallback` is returned.
pub fn resolve_timestamp(timings: Option<&[WordTiming]>, offset: usize, fallback: f64) -> f64 {
    let timings = match timings {
        Some(t) if !t.is_empty() => t,
        _ => return fallback,
    };

    // First word starting after the offset; everything before idx starts at
    // or before it.
    let idx = timings.partition_point(|t| t.char_start <= offset);

    if idx == 0 {
        // Offset precedes the first timed word
        return fallback;
    }

    timings[idx - 1].start
}
