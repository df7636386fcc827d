/// BM25 scoring over in-flight candidate contents.
///
/// There is no persisted text index here: the candidate set is at most
/// `top_k` chunks already returned by dense search, so term statistics are
/// computed on the fly with fixed corpus priors.
const K1: f32 = 1.2;
const B: f32 = 0.75;
const ASSUMED_CORPUS_SIZE: f32 = 1000.0;
const ASSUMED_DOC_FREQUENCY: f32 = 1.0;

pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// BM25 score of `content` for `query_terms`, with the standard k1/b
/// saturation and length normalization against `avg_doc_len`.
pub fn score(query_terms: &[String], content: &str, avg_doc_len: f32) -> f32 {
    if query_terms.is_empty() || content.is_empty() {
        return 0.0;
    }

    let doc_tokens = tokenize(content);
    let doc_len = doc_tokens.len() as f32;
    if doc_len == 0.0 {
        return 0.0;
    }
    let avg_dl = if avg_doc_len > 0.0 { avg_doc_len } else { 100.0 };

    let idf = ((ASSUMED_CORPUS_SIZE - ASSUMED_DOC_FREQUENCY + 0.5)
        / (ASSUMED_DOC_FREQUENCY + 0.5)
        + 1.0)
        .ln();

    let mut total = 0.0;
    for term in query_terms {
        let tf = doc_tokens.iter().filter(|t| *t == term).count() as f32;
        if tf == 0.0 {
            continue;
        }
        total += idf * (tf * (K1 + 1.0)) / (tf + K1 * (1.0 - B + B * doc_len / avg_dl));
    }
    total
}

/// Max-normalized BM25 scores for a batch of contents, in [0, 1]. Used for
/// fusion with dense scores, which live on the same scale.
pub fn normalized_scores(query_terms: &[String], contents: &[&str]) -> Vec<f32> {
    if contents.is_empty() {
        return Vec::new();
    }
    let avg_len = contents
        .iter()
        .map(|c| tokenize(c).len() as f32)
        .sum::<f32>()
        / contents.len() as f32;

    let raw: Vec<f32> = contents
        .iter()
        .map(|c| score(query_terms, c, avg_len))
        .collect();
    let max = raw.iter().cloned().fold(0.0_f32, f32::max);
    if max <= 0.0 {
        return vec![0.0; contents.len()];
    }
    raw.into_iter().map(|s| s / max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(s: &str) -> Vec<String> {
        tokenize(s)
    }

    #[test]
    fn matching_terms_score_positive() {
        let s = score(&terms("nadu nedu toilets"), "nadu nedu phase one covers toilets", 10.0);
        assert!(s > 0.0);
        assert_eq!(score(&terms("nadu nedu"), "unrelated text entirely", 10.0), 0.0);
    }

    #[test]
    fn term_frequency_saturates() {
        let once = score(&terms("toilet"), "toilet construction", 10.0);
        let many = score(&terms("toilet"), "toilet toilet toilet toilet construction", 10.0);
        assert!(many > once);
        assert!(many < once * 5.0);
    }

    #[test]
    fn longer_documents_are_penalized() {
        let short = score(&terms("toilet"), "toilet plan", 10.0);
        let padded = "toilet plan with many additional words describing procurement \
                      schedules and unrelated administrative matters at length";
        let long = score(&terms("toilet"), padded, 10.0);
        assert!(short > long);
    }

    #[test]
    fn normalized_scores_peak_at_one() {
        let contents = vec![
            "nadu nedu toilet construction guidelines",
            "nadu nedu overview",
            "completely unrelated statistics",
        ];
        let scores = normalized_scores(&terms("nadu nedu toilet"), &contents);
        assert_eq!(scores.len(), 3);
        let max = scores.iter().cloned().fold(0.0_f32, f32::max);
        assert!((max - 1.0).abs() < 1e-6);
        assert_eq!(scores[2], 0.0);
    }

    #[test]
    fn empty_inputs_are_zero() {
        assert_eq!(score(&[], "text", 10.0), 0.0);
        assert_eq!(score(&terms("q"), "", 10.0), 0.0);
        assert!(normalized_scores(&terms("q"), &[]).is_empty());
    }
}
