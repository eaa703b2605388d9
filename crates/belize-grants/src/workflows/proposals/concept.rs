use std::sync::Arc;

use tracing::warn;

use super::blueprint::WizardBlueprint;
use super::context::ApplicantContext;
use super::controller::{SubmissionOutcome, WizardController, WizardError};
use super::domain::{Attachment, Draft};
use super::drafts::{DraftCache, DraftCacheError, CONCEPT_PAPER_DRAFT_KEY};
use super::repository::ProposalRepository;

/// Single-page concept form: local "save as draft" plus one-shot submission.
pub struct ConceptPaperForm<R, C> {
    controller: WizardController<R>,
    cache: Arc<C>,
    key: String,
}

impl<R, C> ConceptPaperForm<R, C>
where
    R: ProposalRepository + 'static,
    C: DraftCache,
{
    pub fn new(repository: Arc<R>, cache: Arc<C>) -> Self {
        Self::with_key(repository, cache, CONCEPT_PAPER_DRAFT_KEY)
    }

    pub fn with_key(repository: Arc<R>, cache: Arc<C>, key: impl Into<String>) -> Self {
        Self {
            controller: WizardController::new(WizardBlueprint::concept_paper(), repository),
            cache,
            key: key.into(),
        }
    }

    pub fn save_as_draft(&self, draft: &Draft) -> Result<(), DraftCacheError> {
        self.cache.save(&self.key, draft)
    }

    pub fn load_draft(&self) -> Result<Option<Draft>, DraftCacheError> {
        self.cache.load(&self.key)
    }

    /// Saved draft with profile values filled into any blank applicant fields.
    pub fn load_prefilled(&self, context: &ApplicantContext) -> Result<Draft, DraftCacheError> {
        let mut draft = self.load_draft()?.unwrap_or_default();
        context.prefill(&mut draft);
        Ok(draft)
    }

    /// Validate and submit the form. The local draft is cleared only after a
    /// fully successful submission.
    pub async fn submit(
        &self,
        values: Draft,
        attachments: Vec<Attachment>,
    ) -> Result<SubmissionOutcome, WizardError> {
        self.controller.advance(values).await?;
        let outcome = self.controller.submit(attachments).await?;

        if let SubmissionOutcome::Submitted { application_id } = &outcome {
            if let Err(err) = self.cache.clear(&self.key) {
                warn!(%application_id, error = %err, "concept paper submitted but local draft was not cleared");
            }
        }

        Ok(outcome)
    }
}
