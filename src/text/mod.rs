//! Text processing modules
//!
//! - Sentence-aware chunking with a word budget
//! - Input shaping helpers for plain-text sources

mod chunker;

pub use chunker::{chunk_text, split_sentences, word_count, WORD_BUDGET};

/// Replace single newlines with spaces while keeping paragraph breaks.
///
/// Plain-text sources often hard-wrap lines mid-sentence; reading those
/// newlines as pauses produces choppy audio. A run of two or more newlines
/// is a paragraph break and is kept as-is.
pub fn join_wrapped_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\n' {
            out.push(c);
            continue;
        }
        let mut run = 1;
        while chars.peek() == Some(&'\n') {
            chars.next();
            run += 1;
        }
        if run == 1 {
            out.push(' ');
        } else {
            for _ in 0..run {
                out.push('\n');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_newlines_become_spaces() {
        assert_eq!(join_wrapped_lines("one\ntwo\nthree"), "one two three");
    }

    #[test]
    fn test_paragraph_breaks_preserved() {
        assert_eq!(join_wrapped_lines("para one\n\npara two"), "para one\n\npara two");
        assert_eq!(join_wrapped_lines("a\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn test_mixed_wrapping() {
        let input = "line one\nline two\n\nline three\nline four";
        assert_eq!(join_wrapped_lines(input), "line one line two\n\nline three line four");
    }

    #[test]
    fn test_no_newlines_passthrough() {
        assert_eq!(join_wrapped_lines("plain text"), "plain text");
    }
}
