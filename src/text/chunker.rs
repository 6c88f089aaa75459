//! Sentence-aware text chunking
//!
//! Long input text is cut into chunks that fit a word budget while keeping
//! sentence boundaries intact, so downstream models receive natural prosodic
//! units. A caller-supplied split rule bypasses the budget entirely and cuts
//! on a literal pattern instead.

/// Maximum number of words accumulated into one chunk.
pub const WORD_BUDGET: usize = 200;

/// Characters that terminate a sentence.
const SENTENCE_ENDINGS: &[char] = &['.', '!', '?'];

/// Split text into chunks ready for synthesis.
///
/// With `split_rule` set, the text is cut on every literal occurrence of the
/// pattern and each piece is trimmed; blank pieces are dropped and the word
/// budget does not apply. Without a rule, the text is cut into sentences and
/// the sentences are packed greedily into chunks of at most [`WORD_BUDGET`]
/// words. A single sentence longer than the budget is kept whole.
pub fn chunk_text(text: &str, split_rule: Option<&str>) -> Vec<String> {
    match split_rule {
        Some(rule) if !rule.is_empty() => text
            .split(rule)
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(String::from)
            .collect(),
        _ => chunk_by_sentences(text),
    }
}

/// Split text into sentences on `.` `!` `?` followed by whitespace.
///
/// The terminator stays attached to its sentence. Each sentence is trimmed
/// and blank sentences are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if SENTENCE_ENDINGS.contains(&c)
            && chars.peek().is_some_and(|next| next.is_whitespace())
        {
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
            push_trimmed(&mut sentences, &current);
            current.clear();
        }
    }
    push_trimmed(&mut sentences, &current);
    sentences
}

/// Count the whitespace-separated words in a sentence.
pub fn word_count(sentence: &str) -> usize {
    sentence.split_whitespace().count()
}

fn chunk_by_sentences(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_words = 0usize;

    for sentence in split_sentences(text) {
        let words = word_count(&sentence);
        if current_words + words > WORD_BUDGET && !current.is_empty() {
            chunks.push(current.join(" "));
            current = vec![sentence];
            current_words = words;
        } else {
            current.push(sentence);
            current_words += words;
        }
    }
    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}

fn push_trimmed(sentences: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence_of(words: usize, tag: usize) -> String {
        let mut s = vec![format!("s{tag}")];
        s.extend((1..words).map(|i| format!("w{i}")));
        let mut joined = s.join(" ");
        joined.push('.');
        joined
    }

    #[test]
    fn test_split_sentences_basic() {
        let sentences = split_sentences("Hello there. How are you? Fine!");
        assert_eq!(sentences, vec!["Hello there.", "How are you?", "Fine!"]);
    }

    #[test]
    fn test_split_sentences_keeps_terminator_attached() {
        let sentences = split_sentences("One. Two.");
        assert!(sentences.iter().all(|s| s.ends_with('.')));
    }

    #[test]
    fn test_split_sentences_collapses_whitespace_runs() {
        let sentences = split_sentences("First.   \n\n  Second.");
        assert_eq!(sentences, vec!["First.", "Second."]);
    }

    #[test]
    fn test_split_sentences_no_terminator() {
        let sentences = split_sentences("no punctuation at all");
        assert_eq!(sentences, vec!["no punctuation at all"]);
    }

    #[test]
    fn test_split_sentences_empty_input() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   \n  ").is_empty());
    }

    #[test]
    fn test_split_sentences_consecutive_terminators() {
        let sentences = split_sentences("Really!? Yes.");
        assert_eq!(sentences, vec!["Really!?", "Yes."]);
    }

    #[test]
    fn test_chunks_respect_word_budget() {
        // 10 sentences of 50 words each: packed 4 per chunk (200 words), then
        // the budget forces a new chunk.
        let text: String = (0..10)
            .map(|i| sentence_of(50, i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunk_text(&text, None);
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks[..2] {
            assert_eq!(word_count(chunk), 200);
        }
        assert_eq!(word_count(&chunks[2]), 100);
    }

    #[test]
    fn test_budget_boundary_is_exclusive() {
        // Exactly 200 words fits in one chunk; 201 forces a split.
        let text = format!("{} {}", sentence_of(100, 0), sentence_of(100, 1));
        assert_eq!(chunk_text(&text, None).len(), 1);

        let text = format!("{} {}", sentence_of(100, 0), sentence_of(101, 1));
        assert_eq!(chunk_text(&text, None).len(), 2);
    }

    #[test]
    fn test_oversized_sentence_kept_whole() {
        let giant = sentence_of(420, 0);
        let chunks = chunk_text(&giant, None);
        assert_eq!(chunks.len(), 1);
        assert_eq!(word_count(&chunks[0]), 420);
    }

    #[test]
    fn test_oversized_sentence_between_normal_ones() {
        let text = format!(
            "{} {} {}",
            sentence_of(10, 0),
            sentence_of(300, 1),
            sentence_of(10, 2)
        );
        let chunks = chunk_text(&text, None);
        // The giant sentence closes the first chunk and lands alone in the
        // second; the trailing small sentence opens a third.
        assert_eq!(chunks.len(), 3);
        assert_eq!(word_count(&chunks[1]), 300);
    }

    #[test]
    fn test_chunks_joined_with_single_space() {
        let chunks = chunk_text("One. Two. Three.", None);
        assert_eq!(chunks, vec!["One. Two. Three."]);
    }

    #[test]
    fn test_multi_chunk_reassembly_preserves_text() {
        // 6 sentences of 60 words each force several chunks; joining the
        // chunks back with single spaces reproduces the input exactly.
        let text: String = (0..6)
            .map(|i| sentence_of(60, i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunk_text(&text, None);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_custom_rule_splits_literally() {
        let chunks = chunk_text("alpha|beta|gamma", Some("|"));
        assert_eq!(chunks, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_custom_rule_trims_and_drops_blanks() {
        let chunks = chunk_text("  alpha  ||   || beta ", Some("|"));
        assert_eq!(chunks, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_custom_rule_ignores_word_budget() {
        // 600 words with no rule match stays a single chunk.
        let words: Vec<String> = (0..600).map(|i| format!("w{i}")).collect();
        let text = words.join(" ");
        let chunks = chunk_text(&text, Some("@@"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(word_count(&chunks[0]), 600);
    }

    #[test]
    fn test_custom_rule_multichar_pattern() {
        let chunks = chunk_text("first<br>second<br>third", Some("<br>"));
        assert_eq!(chunks, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_empty_custom_rule_falls_back_to_sentences() {
        let chunks = chunk_text("One. Two.", Some(""));
        assert_eq!(chunks, vec!["One. Two."]);
    }

    #[test]
    fn test_blank_input_yields_no_chunks() {
        assert!(chunk_text("", None).is_empty());
        assert!(chunk_text("\n\n  ", None).is_empty());
        assert!(chunk_text("   ", Some("|")).is_empty());
    }
}
