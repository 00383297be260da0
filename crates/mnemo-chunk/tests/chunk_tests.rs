use mnemo_chunk::{chunk_id, locate, split};
use mnemo_core::types::Topic;

fn topic(name: &str, start_offset: usize) -> Topic {
    Topic {
        name: name.to_string(),
        subtopics: vec![],
        key_points: vec![],
        start_offset,
    }
}

#[test]
fn empty_and_whitespace_input_yield_no_chunks() {
    assert!(split("", 100, 20).is_empty());
    assert!(split("   \n\t  ", 100, 20).is_empty());
}

#[test]
fn zero_target_size_degrades_to_empty() {
    assert!(split("some words here", 0, 0).is_empty());
}

#[test]
fn short_text_is_a_single_chunk() {
    let chunks = split("alpha beta gamma", 100, 20);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "alpha beta gamma");
    assert_eq!(chunks[0].start_offset, 0);
}

#[test]
fn single_oversized_token_is_still_emitted() {
    let long = "x".repeat(50);
    let chunks = split(&long, 10, 0);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, long);
}

#[test]
fn deterministic_for_identical_input() {
    let text = "one two three four five six seven eight nine ten";
    assert_eq!(split(text, 20, 10), split(text, 20, 10));
}

#[test]
fn non_final_chunks_respect_the_budget() {
    let text = (0..200)
        .map(|i| format!("w{i}"))
        .collect::<Vec<_>>()
        .join(" ");
    let target = 40;
    let chunks = split(&text, target, 0);
    assert!(chunks.len() > 1);
    // A non-final chunk may exceed the budget by at most one token's length.
    for chunk in &chunks[..chunks.len() - 1] {
        let longest = chunk.text.split_whitespace().map(str::len).max().unwrap_or(0);
        assert!(chunk.text.len() <= target + longest + 1, "{}", chunk.text);
    }
}

#[test]
fn overlap_seeds_the_tail_of_the_previous_chunk() {
    let text = (0..60)
        .map(|i| format!("tok{i}"))
        .collect::<Vec<_>>()
        .join(" ");
    let overlap = 30; // 30 / 10 = 3 seeded tokens
    let chunks = split(&text, 60, overlap);
    assert!(chunks.len() > 1);
    for pair in chunks.windows(2) {
        let prev: Vec<&str> = pair[0].text.split_whitespace().collect();
        let next: Vec<&str> = pair[1].text.split_whitespace().collect();
        // The seed is capped strictly below the previous chunk's size.
        let seeded = 3.min(prev.len().saturating_sub(1));
        assert_eq!(&prev[prev.len() - seeded..], &next[..seeded]);
    }
}

#[test]
fn near_budget_overlap_with_long_tokens_still_advances() {
    // Long tokens with an overlap just under the chunk budget: the seeded
    // tail must stay strictly smaller than the emitted chunk, or chunks
    // would re-absorb themselves and grow without bound.
    let text = (0..40)
        .map(|i| format!("{i:0>19}"))
        .collect::<Vec<_>>()
        .join(" ");
    let target = 100;
    let chunks = split(&text, target, 99);
    assert!(chunks.len() > 1);
    for chunk in &chunks[..chunks.len() - 1] {
        let longest = chunk.text.split_whitespace().map(str::len).max().unwrap_or(0);
        assert!(chunk.text.len() <= target + longest + 1, "{}", chunk.text);
    }
    // Every chunk starts strictly later in the source than the one before.
    for pair in chunks.windows(2) {
        assert!(pair[1].start_offset > pair[0].start_offset);
    }
    // No token is lost along the way.
    let last_token = chunks.last().and_then(|c| c.text.split_whitespace().last());
    assert_eq!(last_token, text.split_whitespace().last());
}

#[test]
fn concatenation_minus_overlap_reconstructs_the_token_sequence() {
    let text = "the quick brown fox jumps over the lazy dog again and again \
                until the very end of this deliberately longish sentence";
    let overlap = 20; // 2 seeded tokens
    let chunks = split(text, 30, overlap);
    assert!(chunks.len() > 1);

    let mut rebuilt: Vec<String> = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let tokens: Vec<&str> = chunk.text.split_whitespace().collect();
        let skip = if i == 0 {
            0
        } else {
            let prev_count = chunks[i - 1].text.split_whitespace().count();
            (overlap / 10).min(prev_count.saturating_sub(1))
        };
        rebuilt.extend(tokens[skip..].iter().map(|t| t.to_string()));
    }
    let original: Vec<String> = text.split_whitespace().map(str::to_string).collect();
    assert_eq!(rebuilt, original);
}

#[test]
fn start_offsets_point_at_source_tokens() {
    let text = "aaa bbb ccc ddd eee fff";
    let chunks = split(text, 8, 0);
    for chunk in &chunks {
        let first = chunk.text.split_whitespace().next().expect("non-empty");
        assert!(text[chunk.start_offset..].starts_with(first));
    }
}

#[test]
fn locate_picks_the_nearest_topic() {
    let topics = vec![topic("a", 0), topic("b", 100), topic("c", 300)];
    assert_eq!(locate(150, &topics).topic, "b");
    assert_eq!(locate(0, &topics).topic, "a");
    assert_eq!(locate(5000, &topics).topic, "c");
}

#[test]
fn locate_breaks_ties_toward_the_earliest_topic() {
    let topics = vec![topic("first", 100), topic("second", 200)];
    // 150 is equidistant from both.
    assert_eq!(locate(150, &topics).topic, "first");
}

#[test]
fn locate_degrades_to_general_without_topics() {
    let label = locate(42, &[]);
    assert_eq!(label.topic, "General");
    assert_eq!(label.subtopic, "");
}

#[test]
fn locate_returns_the_first_subtopic() {
    let t = Topic {
        name: "Biology".to_string(),
        subtopics: vec!["Cells".to_string(), "Genetics".to_string()],
        key_points: vec![],
        start_offset: 10,
    };
    let label = locate(12, &[t]);
    assert_eq!(label.subtopic, "Cells");
}

#[test]
fn chunk_ids_are_deterministic_and_distinct() {
    let a = chunk_id("same text", "doc.txt", 0);
    let b = chunk_id("same text", "doc.txt", 0);
    let c = chunk_id("same text", "doc.txt", 1);
    let d = chunk_id("same text", "other.txt", 0);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(a, d);
}
