//! Application fit ranking.
//!
//! A deterministic lexical model: how well does the applicant's resume (AI
//! summary included when available) cover the vocabulary of the listing?
//! Same inputs always produce the same score, so recomputation is a safe
//! overwrite.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Fuzzy-match threshold: tokens at least this similar count as a hit.
const FUZZY_THRESHOLD: f64 = 0.92;

/// What the score was computed from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBasis {
    /// Summary and document text were both available.
    WithSummary,
    /// The AI summary was absent; structured fields only.
    StructuredOnly,
}

/// The listing side of the comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingProfile {
    pub title: String,
    pub description: String,
}

/// The applicant side of the comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeProfile {
    pub document_text: String,
    pub summary: Option<String>,
}

/// Ranking output. `score` is in [0, 100]; `confidence` in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankScore {
    pub score: f64,
    pub confidence: f64,
    pub basis: RankBasis,
    pub explanation: String,
}

/// Compute the fit score between a listing and a resume.
///
/// Never fails and never produces a negative or non-finite score: an absent
/// summary degrades to the structured-field fallback with reduced
/// confidence, and empty inputs bottom out at zero.
pub fn rank_application(listing: &ListingProfile, resume: &ResumeProfile) -> RankScore {
    let keywords = tokens(&format!("{} {}", listing.title, listing.description));

    let (resume_text, basis, confidence): (String, RankBasis, f64) = match &resume.summary {
        Some(summary) => (
            format!("{summary} {}", resume.document_text),
            RankBasis::WithSummary,
            0.9,
        ),
        None => (resume.document_text.clone(), RankBasis::StructuredOnly, 0.5),
    };
    let candidate = tokens(&resume_text);

    if keywords.is_empty() || candidate.is_empty() {
        return RankScore {
            score: 0.0,
            confidence: confidence.min(0.3),
            basis,
            explanation: "insufficient text on one side of the comparison".to_string(),
        };
    }

    let mut covered = 0.0;
    for keyword in &keywords {
        let best = candidate
            .iter()
            .map(|token| {
                if token == keyword {
                    1.0
                } else {
                    strsim::jaro_winkler(keyword, token)
                }
            })
            .fold(0.0_f64, f64::max);

        if best >= FUZZY_THRESHOLD {
            covered += best;
        }
    }

    let coverage = covered / keywords.len() as f64;
    let score = (coverage * 100.0).clamp(0.0, 100.0);

    RankScore {
        score,
        confidence,
        basis,
        explanation: format!(
            "matched {:.1} of {} listing terms ({:?})",
            covered,
            keywords.len(),
            basis
        ),
    }
}

/// Lowercased vocabulary, short/stop words dropped. BTreeSet keeps iteration
/// order stable so scoring is deterministic.
fn tokens(text: &str) -> BTreeSet<String> {
    const STOP: &[&str] = &[
        "and", "the", "for", "with", "our", "you", "your", "are", "will", "who", "this", "that",
    ];
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.len() > 2 && !STOP.contains(&w.as_str()))
        .collect()
}
