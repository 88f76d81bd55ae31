// Span alignment for extractive question answering
//
// The generator is prompted to quote from the supplied context, but nothing
// forces it to. Alignment maps whatever it produced back onto the context so
// the caller always receives a verbatim span: first by exact match, then by
// ASCII-case-insensitive match, then by picking the context sentence with the
// highest word overlap.

use std::collections::HashSet;

/// Locate `generated` inside `context` and return the matching span.
///
/// Returns `None` when the context shares nothing with the generation.
pub fn align_to_context<'a>(context: &'a str, generated: &str) -> Option<&'a str> {
    let needle = strip_quotes(generated.trim());
    if needle.is_empty() || context.is_empty() {
        return None;
    }

    if let Some(pos) = context.find(needle) {
        return Some(&context[pos..pos + needle.len()]);
    }

    if let Some(span) = find_ignore_ascii_case(context, needle) {
        return Some(span);
    }

    best_overlap_sentence(context, needle)
}

/// Quotation marks the generator tends to wrap answers in
fn strip_quotes(text: &str) -> &str {
    text.trim_matches(|c| matches!(c, '"' | '\'' | '\u{201c}' | '\u{201d}' | '\u{2018}' | '\u{2019}'))
        .trim()
}

/// Byte-window search that folds ASCII case only.
///
/// A window can only match if non-ASCII bytes are byte-identical, so a match
/// always starts and ends on UTF-8 character boundaries and slicing is safe.
fn find_ignore_ascii_case<'a>(context: &'a str, needle: &str) -> Option<&'a str> {
    let haystack = context.as_bytes();
    let target = needle.as_bytes();
    if target.is_empty() || target.len() > haystack.len() {
        return None;
    }

    haystack
        .windows(target.len())
        .position(|window| window.eq_ignore_ascii_case(target))
        .map(|pos| &context[pos..pos + target.len()])
}

/// Sentence of `context` sharing the most words with `generated`
fn best_overlap_sentence<'a>(context: &'a str, generated: &str) -> Option<&'a str> {
    let generated_words = word_set(generated);
    if generated_words.is_empty() {
        return None;
    }

    let mut best: Option<&str> = None;
    let mut best_score = 0usize;

    for sentence in context.split_inclusive(['.', '!', '?']) {
        let trimmed = sentence.trim();
        if trimmed.is_empty() {
            continue;
        }
        let score = word_set(trimmed)
            .intersection(&generated_words)
            .count();
        if score > best_score {
            best_score = score;
            best = Some(trimmed);
        }
    }

    best
}

fn word_set(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
        .collect()
}
