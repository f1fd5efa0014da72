//! Application ranking function.
//!
//! Triggered by `app/application.submitted`. Scores how well the applicant's
//! resume covers the listing's vocabulary and writes the score back onto the
//! application row. The model is deterministic, so recomputation is a safe
//! overwrite; an applicant without an AI summary (or without any resume) is
//! ranked immediately on what is available rather than queued to wait.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use hireboard_ai::{rank_application, DocumentFetcher, ListingProfile, RankScore, ResumeProfile};
use hireboard_core::{ApplicationId, ListingId, UserId};
use hireboard_directory::{DirectoryStore, JobListingApplication};
use hireboard_events::{names, Event, Function, StepContext, StepError, Trigger};

use crate::{parse_payload, store_step_err};

#[derive(Debug, Deserialize)]
struct ApplicationSubmittedPayload {
    application_id: ApplicationId,
    listing_id: ListingId,
    user_id: UserId,
}

/// Computes and persists a fit score for a submitted application.
pub struct RankApplication {
    store: Arc<dyn DirectoryStore>,
    documents: Arc<dyn DocumentFetcher>,
}

impl RankApplication {
    pub fn new(store: Arc<dyn DirectoryStore>, documents: Arc<dyn DocumentFetcher>) -> Self {
        Self { store, documents }
    }
}

impl Function for RankApplication {
    fn slug(&self) -> &'static str {
        "rank-application"
    }

    fn trigger(&self) -> Trigger {
        Trigger::event(names::APPLICATION_SUBMITTED)
    }

    fn run(&self, step: &mut StepContext, event: &Event) -> Result<(), StepError> {
        let payload: ApplicationSubmittedPayload = parse_payload(event)?;

        // Sync the application row; upsert keeps an existing rank intact.
        self.store
            .upsert_application(JobListingApplication::new(
                payload.application_id,
                payload.listing_id,
                payload.user_id,
            ))
            .map_err(store_step_err)?;

        let store = self.store.clone();
        let documents = self.documents.clone();
        let score: RankScore = step.run("rank-application", move || {
            let listing = store
                .get_listing(payload.listing_id)
                .map_err(store_step_err)?
                .ok_or_else(|| {
                    StepError::fatal(format!("listing {} not found", payload.listing_id))
                })?;

            // Absent resume, document, or summary degrades the inputs; none
            // of them fails the ranking.
            let resume = store
                .resume_for_user(payload.user_id)
                .map_err(store_step_err)?;
            let profile = match resume {
                Some(resume) => {
                    let document_text = match documents.fetch(&resume.document_ref) {
                        Ok(text) => text,
                        Err(e) if e.is_transient() => {
                            return Err(StepError::retryable(e.to_string()));
                        }
                        Err(e) => {
                            debug!(resume = %resume.id, error = %e, "ranking without document text");
                            String::new()
                        }
                    };
                    ResumeProfile {
                        document_text,
                        summary: resume.summary,
                    }
                }
                None => {
                    debug!(user = %payload.user_id, "ranking without a resume on file");
                    ResumeProfile {
                        document_text: String::new(),
                        summary: None,
                    }
                }
            };

            let score = rank_application(
                &ListingProfile {
                    title: listing.title,
                    description: listing.description,
                },
                &profile,
            );

            store
                .set_application_rank(payload.application_id, score.score)
                .map_err(store_step_err)?;
            info!(
                application = %payload.application_id,
                score = score.score,
                basis = ?score.basis,
                "application ranked"
            );
            Ok(score)
        })?;

        debug!(confidence = score.confidence, "ranking complete");
        Ok(())
    }
}
