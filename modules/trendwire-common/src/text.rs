//! Title normalization and keyword helpers shared by collectors, dedup and scoring.

/// Lower-case and collapse runs of whitespace.
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Leading `max_chars` characters of the normalized title. Dedup matches
/// existing trends whose normalized title contains this fragment.
pub fn title_fragment(title: &str, max_chars: usize) -> String {
    normalize_title(title).chars().take(max_chars).collect()
}

/// Naive keyword pull: lower-cased words longer than three characters,
/// surrounding punctuation trimmed, first five kept.
pub fn extract_keywords(title: &str) -> Vec<String> {
    title
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| ".,!?\":;[]()'".contains(c)))
        .filter(|w| w.chars().count() > 3)
        .map(str::to_string)
        .take(5)
        .collect()
}

/// Keywords from `keywords` that occur (substring, case-insensitive) in `text`.
pub fn matching_keywords<'a>(text: &str, keywords: &'a [String]) -> Vec<&'a str> {
    let lower = text.to_lowercase();
    keywords
        .iter()
        .filter(|k| !k.is_empty() && lower.contains(&k.to_lowercase()))
        .map(String::as_str)
        .collect()
}
