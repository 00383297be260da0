//! Offset-nearest topic attachment.
//!
//! Upstream topic boundaries are approximate, so a chunk is simply tagged
//! with the topic whose `start_offset` lies closest to the chunk's own
//! start. This never errors; a missing topic list degrades to a synthetic
//! "General" label.

use mnemo_core::types::Topic;

pub const GENERAL_TOPIC: &str = "General";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicLabel {
    pub topic: String,
    pub subtopic: String,
}

/// Pick the topic minimizing `|topic.start_offset - chunk_start_offset|`.
/// Ties resolve to the earliest topic in input order. The subtopic is the
/// chosen topic's first listed subtopic, or empty.
pub fn locate(chunk_start_offset: usize, topics: &[Topic]) -> TopicLabel {
    let mut best: Option<(&Topic, usize)> = None;
    for topic in topics {
        let dist = topic.start_offset.abs_diff(chunk_start_offset);
        // Strict less-than keeps the earliest topic on ties.
        if best.map(|(_, d)| dist < d).unwrap_or(true) {
            best = Some((topic, dist));
        }
    }
    match best {
        Some((topic, _)) => TopicLabel {
            topic: topic.name.clone(),
            subtopic: topic.subtopics.first().cloned().unwrap_or_default(),
        },
        None => TopicLabel {
            topic: GENERAL_TOPIC.to_string(),
            subtopic: String::new(),
        },
    }
}
