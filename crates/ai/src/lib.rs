//! `hireboard-ai`
//!
//! **Responsibility:** AI collaborator boundary.
//!
//! This crate is intentionally **not** part of the domain model:
//! - It must not depend on directory entities or mutate domain state.
//! - It exposes the external collaborators as traits ([`Summarizer`],
//!   [`DocumentFetcher`]) plus deterministic local implementations for
//!   dev/tests.
//! - Ranking is a pure function over plain text profiles; callers decide
//!   what to persist.

pub mod document;
pub mod ranking;
pub mod summary;

pub use document::{DocumentError, DocumentFetcher, InMemoryDocuments};
pub use ranking::{rank_application, ListingProfile, RankBasis, RankScore, ResumeProfile};
pub use summary::{AiError, ExtractiveSummarizer, Summarizer};
