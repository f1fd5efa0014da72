//! Resume summarization collaborator.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AiError {
    /// The service timed out, rate-limited, or returned 5xx. Retryable.
    #[error("summarization service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The input cannot be summarized (empty/garbage document). Permanent.
    #[error("invalid summarization input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AiError {
    /// Whether a caller should retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_))
    }
}

/// Text summarization capability (external black box).
///
/// Implementations wrap a remote model endpoint with its own availability and
/// latency characteristics; call sites must bound calls with a timeout and
/// treat expiry as [`AiError::ServiceUnavailable`].
pub trait Summarizer: Send + Sync {
    fn summarize(&self, text: &str) -> Result<String, AiError>;
}

/// Deterministic extractive summarizer for dev/tests.
///
/// Model: score each sentence by the document-wide frequency of its words and
/// keep the top `max_sentences` in original order. Same input, same output —
/// which is what the write-once-then-idempotent persistence contract needs
/// from a local stand-in.
#[derive(Debug, Clone)]
pub struct ExtractiveSummarizer {
    max_sentences: usize,
}

impl ExtractiveSummarizer {
    pub fn new() -> Self {
        Self { max_sentences: 3 }
    }

    pub fn with_max_sentences(mut self, max_sentences: usize) -> Self {
        self.max_sentences = max_sentences.max(1);
        self
    }
}

impl Default for ExtractiveSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Summarizer for ExtractiveSummarizer {
    fn summarize(&self, text: &str) -> Result<String, AiError> {
        let sentences: Vec<&str> = text
            .split(['.', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if sentences.is_empty() {
            return Err(AiError::InvalidInput("document has no content".to_string()));
        }

        if sentences.len() <= self.max_sentences {
            return Ok(sentences.join(". "));
        }

        let mut freq: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for word in words(text) {
            *freq.entry(word).or_insert(0) += 1;
        }

        let mut scored: Vec<(usize, f64)> = sentences
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let ws: Vec<String> = words(s).collect();
                if ws.is_empty() {
                    return (i, 0.0);
                }
                let total: usize = ws.iter().map(|w| freq.get(w).copied().unwrap_or(0)).sum();
                (i, total as f64 / ws.len() as f64)
            })
            .collect();

        // Highest score first; ties broken by position so output is stable.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
        let mut keep: Vec<usize> = scored.iter().take(self.max_sentences).map(|(i, _)| *i).collect();
        keep.sort_unstable();

        Ok(keep
            .into_iter()
            .map(|i| sentences[i])
            .collect::<Vec<_>>()
            .join(". "))
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(|w| w.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "Senior Rust engineer with ten years of backend experience. \
        Built distributed job schedulers and event pipelines in Rust. \
        Enjoys hiking. \
        Led a team of five engineers shipping Rust services. \
        Occasional conference speaker.";

    #[test]
    fn summary_is_deterministic() {
        let s = ExtractiveSummarizer::new();
        let a = s.summarize(RESUME).unwrap();
        let b = s.summarize(RESUME).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn summary_keeps_high_signal_sentences() {
        let s = ExtractiveSummarizer::new().with_max_sentences(2);
        let out = s.summarize(RESUME).unwrap();
        assert!(out.to_lowercase().contains("rust"));
        assert!(!out.contains("hiking"));
    }

    #[test]
    fn empty_document_is_invalid_input() {
        let s = ExtractiveSummarizer::new();
        let err = s.summarize("   \n  ").unwrap_err();
        assert!(matches!(err, AiError::InvalidInput(_)));
        assert!(!err.is_transient());
    }
}
