//! Small text helpers shared by the classifier, the consistency engine and
//! the aggregator.
//!
//! Word boundaries are Unicode aware; matching itself is exact, so callers
//! lowercase their input first when they want case-insensitive matching.

/// Find `needle` in `haystack` at word boundaries, returning its byte offset.
///
/// A word boundary is the start/end of the string or a non-alphanumeric char,
/// so "thor" matches in "ask thor, now" but not in "ask thorin", and "edain"
/// does not match inside "dúnedain".
pub fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }

    let is_boundary = |c: Option<char>| c.map_or(true, |c| !c.is_alphanumeric());
    let mut start = 0;

    while let Some(offset) = haystack[start..].find(needle) {
        let i = start + offset;
        let end = i + needle.len();
        let left_ok = is_boundary(haystack[..i].chars().next_back());
        let right_ok = is_boundary(haystack[end..].chars().next());
        if left_ok && right_ok {
            return Some(i);
        }
        // Step past the first char of this hit; keep on a char boundary.
        start = i + haystack[i..].chars().next().map_or(1, char::len_utf8);
        if start >= haystack.len() {
            break;
        }
    }

    None
}

/// Check if `haystack` contains `needle` at word boundaries.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    find_word(haystack, needle).is_some()
}

/// Split prose into sentences, keeping the terminating punctuation.
///
/// Trailing text without a terminator becomes its own sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let is_terminator = |c: char| matches!(c, '.' | '!' | '?');
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        if is_terminator(ch) {
            // Runs like "..." or "?!" end a single sentence.
            while let Some(&next) = chars.peek() {
                if !is_terminator(next) {
                    break;
                }
                current.push(next);
                chars.next();
            }
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }

    sentences
}

/// Turn a fragment like "attack misses" into "Attack misses."
pub fn as_sentence(fragment: &str) -> String {
    let trimmed = fragment.trim();
    let mut chars = trimmed.chars();
    let mut out = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => return String::new(),
    };
    if !out.ends_with(['.', '!', '?']) {
        out.push('.');
    }
    out
}

/// Lowercase and collapse internal whitespace.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
