//! Term extraction and BM25 ranking

use std::collections::HashMap;

const K1: f32 = 1.2;
const B: f32 = 0.75;

/// Weight of a query term that also appears in the chunk's path
const PATH_BOOST: f32 = 0.5;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "how",
    "in", "is", "it", "of", "on", "or", "the", "this", "that", "to", "what", "where", "which",
    "who", "why", "with",
];

/// Lower-cased identifier terms of `text`
///
/// Compound identifiers contribute both the whole word and its parts:
/// `parse_args` yields `parse_args`, `parse`, `args`; `HttpClient` yields
/// `httpclient`, `http`, `client`.
#[must_use]
pub fn terms(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for word in text.split(|c: char| !(c.is_alphanumeric() || c == '_')) {
        if word.is_empty() {
            continue;
        }
        push_term(&mut out, word.to_lowercase());

        let parts = split_identifier(word);
        if parts.len() > 1 {
            for part in parts {
                push_term(&mut out, part);
            }
        }
    }
    out
}

fn push_term(out: &mut Vec<String>, term: String) {
    if term.chars().count() < 2
        || term.chars().all(|c| c.is_ascii_digit() || c == '_')
        || STOPWORDS.contains(&term.as_str())
    {
        return;
    }
    out.push(term);
}

fn split_identifier(word: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in word.chars() {
        if c == '_' {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Term frequencies for a document
#[must_use]
pub fn term_frequencies(text: &str) -> HashMap<String, u32> {
    let mut tf = HashMap::new();
    for term in terms(text) {
        *tf.entry(term).or_insert(0) += 1;
    }
    tf
}

/// Corpus-level statistics needed by BM25
#[derive(Debug, Clone, Default)]
pub struct CorpusStats {
    /// Number of documents containing each term
    pub doc_freq: HashMap<String, usize>,
    /// Number of documents
    pub docs: usize,
    /// Mean document length in terms
    pub avg_len: f32,
}

impl CorpusStats {
    /// Inverse document frequency of a term
    #[must_use]
    pub fn idf(&self, term: &str) -> f32 {
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f32;
        let n = self.docs as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// BM25 score of one document for the given query terms
    #[must_use]
    pub fn score(
        &self,
        query: &[String],
        doc_terms: &HashMap<String, u32>,
        doc_len: u32,
        path_terms: &[String],
    ) -> f32 {
        let avg = if self.avg_len > 0.0 { self.avg_len } else { 1.0 };
        let norm = K1 * (1.0 - B + B * doc_len as f32 / avg);

        query
            .iter()
            .map(|term| {
                let idf = self.idf(term);
                let tf = doc_terms.get(term).copied().unwrap_or(0) as f32;
                let body = if tf > 0.0 {
                    idf * tf * (K1 + 1.0) / (tf + norm)
                } else {
                    0.0
                };
                let path = if path_terms.contains(term) {
                    PATH_BOOST * idf
                } else {
                    0.0
                };
                body + path
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_split_identifiers() {
        let t = terms("fn parse_args(HttpClient) -> u8");
        assert!(t.contains(&"parse_args".to_string()));
        assert!(t.contains(&"parse".to_string()));
        assert!(t.contains(&"args".to_string()));
        assert!(t.contains(&"httpclient".to_string()));
        assert!(t.contains(&"http".to_string()));
        assert!(t.contains(&"client".to_string()));
        assert!(t.contains(&"fn".to_string()));
    }

    #[test]
    fn test_terms_drop_stopwords_and_numbers() {
        let t = terms("what does main.py do? 42");
        assert_eq!(t, vec!["main".to_string(), "py".to_string()]);
    }

    #[test]
    fn test_bm25_prefers_matching_document() {
        let a = term_frequencies("def parse(): return tokens");
        let b = term_frequencies("def render(): return html");
        let mut stats = CorpusStats {
            docs: 2,
            avg_len: 4.0,
            ..Default::default()
        };
        for doc in [&a, &b] {
            for term in doc.keys() {
                *stats.doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
        }

        let query = terms("parse tokens");
        let score_a = stats.score(&query, &a, 4, &[]);
        let score_b = stats.score(&query, &b, 4, &[]);
        assert!(score_a > score_b);
        assert_eq!(score_b, 0.0);
    }
}
