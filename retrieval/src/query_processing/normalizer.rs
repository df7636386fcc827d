use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([.,!?;:])").unwrap());
static TRAILING_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s.,!?;:]+$").unwrap());
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());

/// Filler words stripped from the edges of conversational queries.
const STOPWORDS: &[&str] = &[
    "tell", "me", "about", "what", "is", "are", "the", "a", "an", "please", "can", "you", "could",
    "would", "how", "why", "when", "where", "which", "who", "whom", "whose", "explain", "describe",
];

/// Lightweight query normalization. Lowercases, collapses whitespace, and
/// trims trailing punctuation. Entity substrings (section numbers, GO
/// numbers, years) are only case-folded, never rewritten.
///
/// Idempotent: `normalize(normalize(q)) == normalize(q)`.
pub fn normalize(query: &str) -> String {
    let lowered = query.to_lowercase();
    let collapsed = WHITESPACE.replace_all(&lowered, " ");
    let no_dangling = SPACE_BEFORE_PUNCT.replace_all(collapsed.trim(), "$1");
    TRAILING_PUNCT.replace(&no_dangling, "").into_owned()
}

/// Strip filler words from the start and end of a query, preserving the
/// middle. Used for keyword-oriented downstream stages only.
pub fn remove_filler(query: &str) -> String {
    let words: Vec<&str> = query.split_whitespace().collect();
    let mut start = 0;
    let mut end = words.len();
    while start < end && STOPWORDS.contains(&words[start]) {
        start += 1;
    }
    while end > start && STOPWORDS.contains(&words[end - 1]) {
        end -= 1;
    }
    words[start..end].join(" ")
}

/// Aggressive cleanup for BM25 tokenization: normalize, strip filler, drop
/// punctuation.
pub fn clean_for_keywords(query: &str) -> String {
    let normalized = normalize(query);
    let stripped = remove_filler(&normalized);
    let no_punct = NON_WORD.replace_all(&stripped, " ");
    WHITESPACE.replace_all(no_punct.trim(), " ").into_owned()
}

/// Tokens for keyword scoring.
pub fn keyword_tokens(query: &str) -> Vec<String> {
    clean_for_keywords(query)
        .split_whitespace()
        .map(|t| t.to_string())
        .collect()
}
