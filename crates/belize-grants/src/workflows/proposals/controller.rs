use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::blueprint::WizardBlueprint;
use super::context::ApplicantContext;
use super::domain::{ApplicationId, Attachment, Draft, WizardState};
use super::repository::{ProgressUpdate, ProposalRepository, RepositoryError, SubmissionPayload};
use super::validation::ValidatorRegistry;

/// Drives one applicant through a blueprint's steps.
///
/// State sits behind a `tokio` mutex that is only ever acquired with
/// `try_lock`: while a save or submission is awaiting the backend, every other
/// mutating call is turned away with [`WizardError::Busy`] instead of queueing.
pub struct WizardController<R> {
    blueprint: Arc<WizardBlueprint>,
    validators: Arc<ValidatorRegistry>,
    repository: Arc<R>,
    state: Mutex<WizardState>,
}

/// Result of a successful `advance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepAdvance {
    pub application_id: ApplicationId,
    pub completed_step: usize,
    pub current_step: usize,
    pub ready_to_submit: bool,
}

/// Result of a submission the backend accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// Everything reached the CRM; the wizard has been reset.
    Submitted { application_id: ApplicationId },
    /// The record reached the CRM but a follow-up step failed. The draft is
    /// kept so the applicant can retry.
    Degraded {
        application_id: ApplicationId,
        message: String,
    },
}

impl SubmissionOutcome {
    pub fn application_id(&self) -> &ApplicationId {
        match self {
            SubmissionOutcome::Submitted { application_id }
            | SubmissionOutcome::Degraded { application_id, .. } => application_id,
        }
    }
}

impl<R> WizardController<R>
where
    R: ProposalRepository + 'static,
{
    pub fn new(blueprint: WizardBlueprint, repository: Arc<R>) -> Self {
        let validators = ValidatorRegistry::for_blueprint(&blueprint);
        Self::with_validators(blueprint, validators, repository)
    }

    pub fn with_validators(
        blueprint: WizardBlueprint,
        validators: ValidatorRegistry,
        repository: Arc<R>,
    ) -> Self {
        Self::resume(blueprint, validators, repository, WizardState::default())
    }

    /// Continue a session from previously saved state.
    ///
    /// Steps outside the blueprint are discarded and the current step is
    /// clamped into range.
    pub fn resume(
        blueprint: WizardBlueprint,
        validators: ValidatorRegistry,
        repository: Arc<R>,
        mut state: WizardState,
    ) -> Self {
        let step_count = blueprint.step_count().max(1);
        state.current_step = state.current_step.clamp(1, step_count);
        state
            .completed_steps
            .retain(|step| (1..=step_count).contains(step));

        Self {
            blueprint: Arc::new(blueprint),
            validators: Arc::new(validators),
            repository,
            state: Mutex::new(state),
        }
    }

    pub fn blueprint(&self) -> &WizardBlueprint {
        &self.blueprint
    }

    /// Copy of the current state; waits for any in-flight operation to finish.
    pub async fn snapshot(&self) -> WizardState {
        self.state.lock().await.clone()
    }

    /// Validate the current step against `values` merged over the draft and,
    /// on success, record the step as completed and persist progress.
    ///
    /// When persistence fails the merged draft and completed step are kept
    /// but the wizard stays on the same step.
    pub async fn advance(&self, values: Draft) -> Result<StepAdvance, WizardError> {
        let mut state = self.begin()?;
        let step = state.current_step;
        let candidate = state.draft.merged(&values);

        let validation = self.validators.validate(step, &candidate);
        if !validation.valid {
            debug!(step, invalid = validation.errors.len(), "step validation failed");
            return Err(WizardError::Validation {
                step,
                errors: validation.errors,
            });
        }

        state.draft = candidate;
        state.completed_steps.insert(step);

        let step_count = self.blueprint.step_count();
        let next_step = if step < step_count { step + 1 } else { step };
        let application_id = self.persist(&mut state, next_step).await?;
        state.current_step = next_step;

        info!(
            kind = ?self.blueprint.kind(),
            %application_id,
            completed = step,
            current = next_step,
            "proposal step completed"
        );

        Ok(StepAdvance {
            application_id,
            completed_step: step,
            current_step: next_step,
            ready_to_submit: self.missing_steps(&state).is_empty(),
        })
    }

    /// Jump to an already reached step. Returns `false` (and changes nothing)
    /// when the step is out of reach or another operation is in flight.
    pub fn go_to(&self, step: usize) -> bool {
        let Ok(mut state) = self.state.try_lock() else {
            return false;
        };
        if step == 0 || step > self.blueprint.step_count() || step > state.furthest_reachable() {
            return false;
        }
        state.current_step = step;
        true
    }

    /// Persist the draft with `values` merged in, without validating and
    /// without moving between steps.
    pub async fn save_draft(&self, values: Draft) -> Result<ApplicationId, WizardError> {
        let mut state = self.begin()?;
        state.draft.merge(&values);
        let current_step = state.current_step;
        let application_id = self.persist(&mut state, current_step).await?;
        debug!(%application_id, current_step, "proposal draft saved");
        Ok(application_id)
    }

    /// Fill empty applicant fields from the signed-in user's profile.
    ///
    /// Returns `false` when another operation is in flight.
    pub fn prefill(&self, context: &ApplicantContext) -> bool {
        let Ok(mut state) = self.state.try_lock() else {
            return false;
        };
        context.prefill(&mut state.draft);
        true
    }

    /// Hand the full draft and attachments to the backend once every step is
    /// completed and still valid against the merged draft. A step that no
    /// longer validates loses its completed mark and is reported as a
    /// validation error.
    pub async fn submit(
        &self,
        attachments: Vec<Attachment>,
    ) -> Result<SubmissionOutcome, WizardError> {
        let mut state = self.begin()?;

        let missing = self.missing_steps(&state);
        if !missing.is_empty() {
            return Err(WizardError::IncompleteSteps { missing });
        }

        // Completed steps are rechecked against the draft as it stands now.
        for step in 1..=self.blueprint.step_count() {
            let validation = self.validators.validate(step, &state.draft);
            if !validation.valid {
                state.completed_steps.remove(&step);
                debug!(
                    step,
                    invalid = validation.errors.len(),
                    "completed step no longer valid"
                );
                return Err(WizardError::Validation {
                    step,
                    errors: validation.errors,
                });
            }
        }

        let application_id = match state.application_id.clone() {
            Some(id) => id,
            None => {
                let current_step = state.current_step;
                self.persist(&mut state, current_step).await?
            }
        };

        let payload = SubmissionPayload {
            draft: state.draft.clone(),
            attachments,
        };
        let receipt = self
            .repository
            .submit_record(&application_id, &payload)
            .await
            .map_err(|err| {
                warn!(%application_id, error = %err, "proposal submission failed");
                SubmissionError::Transport(err)
            })?;

        if receipt.success {
            *state = WizardState::default();
            info!(%application_id, kind = ?self.blueprint.kind(), "proposal submitted");
            return Ok(SubmissionOutcome::Submitted { application_id });
        }

        if let Some(message) = receipt.degradation_message() {
            warn!(%application_id, %message, "proposal submitted with integration warnings");
            return Ok(SubmissionOutcome::Degraded {
                application_id,
                message: message.to_string(),
            });
        }

        warn!(%application_id, "proposal submission rejected");
        Err(SubmissionError::Rejected.into())
    }

    fn begin(&self) -> Result<MutexGuard<'_, WizardState>, WizardError> {
        self.state.try_lock().map_err(|_| WizardError::Busy)
    }

    fn missing_steps(&self, state: &WizardState) -> Vec<usize> {
        (1..=self.blueprint.step_count())
            .filter(|step| !state.is_completed(*step))
            .collect()
    }

    async fn persist(
        &self,
        state: &mut WizardState,
        current_step: usize,
    ) -> Result<ApplicationId, WizardError> {
        let progress = ProgressUpdate::from_state(state, current_step);

        match state.application_id.clone() {
            Some(id) => {
                self.repository
                    .update_record(&id, &progress)
                    .await
                    .map_err(|err| persistence_failure(Some(&id), err))?;
                Ok(id)
            }
            None => {
                let id = self
                    .repository
                    .create_record(&progress)
                    .await
                    .map_err(|err| persistence_failure(None, err))?;
                state.application_id = Some(id.clone());
                Ok(id)
            }
        }
    }
}

fn persistence_failure(id: Option<&ApplicationId>, err: RepositoryError) -> WizardError {
    match id {
        Some(id) => warn!(application_id = %id, error = %err, "failed to update proposal record"),
        None => warn!(error = %err, "failed to create proposal record"),
    }
    WizardError::Persistence(err)
}

/// Error raised by wizard operations. None of these are fatal; the caller may retry.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("step {step} has {} invalid field(s)", .errors.len())]
    Validation {
        step: usize,
        errors: BTreeMap<String, String>,
    },
    #[error("another save or submission is still in progress")]
    Busy,
    #[error("could not save progress: {0}")]
    Persistence(#[source] RepositoryError),
    #[error("steps {missing:?} must be completed before submitting")]
    IncompleteSteps { missing: Vec<usize> },
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// Terminal submission failure; the draft is retained.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("submission was rejected by the CRM")]
    Rejected,
    #[error("submission failed: {0}")]
    Transport(#[source] RepositoryError),
}
