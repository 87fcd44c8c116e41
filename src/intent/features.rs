use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Lowercased word unigrams plus adjacent bigrams ("clear", "clear everything").
pub(super) fn extract_terms(text: &str) -> Vec<String> {
    static WORD_RE: OnceLock<Regex> = OnceLock::new();
    let re = WORD_RE.get_or_init(|| Regex::new(r"[a-z0-9']+").expect("word regex should compile"));

    let lowered = text.to_lowercase();
    let words: Vec<&str> = re.find_iter(&lowered).map(|m| m.as_str()).collect();
    let mut terms: Vec<String> = words.iter().map(|w| (*w).to_string()).collect();
    terms.extend(words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    terms
}

/// Raw term counts for one document.
pub(super) fn term_counts(text: &str) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for term in extract_terms(text) {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}

/// Smoothed inverse document frequency.
pub(super) fn smoothed_idf(documents: usize, document_frequency: usize) -> f32 {
    let n = documents as f32;
    let df = document_frequency as f32;
    ((1.0 + n) / (1.0 + df)).ln() + 1.0
}

/// Scale a sparse vector to unit length in place. Zero vectors stay zero.
pub(super) fn l2_normalize(vector: &mut [(usize, f32)]) {
    let norm = vector.iter().map(|(_, v)| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for (_, value) in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Numerically stable softmax.
pub(super) fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        let uniform = 1.0 / scores.len().max(1) as f32;
        return vec![uniform; scores.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}
