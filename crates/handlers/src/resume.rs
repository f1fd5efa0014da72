//! Resume summarization function.
//!
//! Triggered by `app/resume.uploaded`. The resume row itself is synced with a
//! plain upsert (cheap, idempotent, preserves an existing summary); the
//! expensive pipeline runs as three durable steps so a failure late in the
//! chain never repeats the earlier external calls:
//!
//! 1. `fetch-document` — load the uploaded text
//! 2. `summarize` — call the summarization service, memoize the result
//! 3. `persist-summary` — conditional write onto the resume row

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use hireboard_ai::{AiError, DocumentError, DocumentFetcher, Summarizer};
use hireboard_core::{ResumeId, UserId};
use hireboard_directory::{DirectoryStore, Resume};
use hireboard_events::{names, Event, Function, StepContext, StepError, Trigger};

use crate::{parse_payload, store_step_err};

#[derive(Debug, Deserialize)]
struct ResumeUploadedPayload {
    resume_id: ResumeId,
    user_id: UserId,
    document_ref: String,
}

fn document_step_err(err: DocumentError) -> StepError {
    if err.is_transient() {
        StepError::retryable(err.to_string())
    } else {
        StepError::fatal(err.to_string())
    }
}

fn ai_step_err(err: AiError) -> StepError {
    if err.is_transient() {
        StepError::retryable(err.to_string())
    } else {
        StepError::fatal(err.to_string())
    }
}

/// Summarizes an uploaded resume and persists the summary.
pub struct ResumeSummarize {
    store: Arc<dyn DirectoryStore>,
    documents: Arc<dyn DocumentFetcher>,
    summarizer: Arc<dyn Summarizer>,
}

impl ResumeSummarize {
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        documents: Arc<dyn DocumentFetcher>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            store,
            documents,
            summarizer,
        }
    }
}

impl Function for ResumeSummarize {
    fn slug(&self) -> &'static str {
        "summarize-resume"
    }

    fn trigger(&self) -> Trigger {
        Trigger::event(names::RESUME_UPLOADED)
    }

    fn run(&self, step: &mut StepContext, event: &Event) -> Result<(), StepError> {
        let payload: ResumeUploadedPayload = parse_payload(event)?;

        // Sync the row first so the summary has somewhere to land. Upsert
        // keeps an already-computed summary intact on redelivery.
        self.store
            .upsert_resume(Resume::new(
                payload.resume_id,
                payload.user_id,
                payload.document_ref.clone(),
            ))
            .map_err(store_step_err)?;

        let documents = self.documents.clone();
        let document_ref = payload.document_ref.clone();
        let text: String = step.run("fetch-document", move || {
            documents.fetch(&document_ref).map_err(document_step_err)
        })?;

        let summarizer = self.summarizer.clone();
        let summary: String = step.run("summarize", move || {
            summarizer.summarize(&text).map_err(ai_step_err)
        })?;

        let store = self.store.clone();
        let resume_id = payload.resume_id;
        step.run("persist-summary", move || {
            store
                .set_resume_summary(resume_id, summary)
                .map_err(store_step_err)?;
            info!(resume = %resume_id, "resume summary persisted");
            Ok(())
        })?;

        Ok(())
    }
}
