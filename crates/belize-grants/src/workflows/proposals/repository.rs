use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{ApplicationId, Attachment, Draft, WizardState};

/// Progress persisted on every save: where the applicant is and what they entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub current_step: usize,
    pub completed_steps: BTreeSet<usize>,
    pub draft: Draft,
}

impl ProgressUpdate {
    pub(crate) fn from_state(state: &WizardState, current_step: usize) -> Self {
        Self {
            current_step,
            completed_steps: state.completed_steps.clone(),
            draft: state.draft.clone(),
        }
    }
}

/// Everything handed to the CRM on final submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub draft: Draft,
    pub attachments: Vec<Attachment>,
}

/// Backend acknowledgement of a submission.
///
/// `success = false` with a message means the core record was accepted but a
/// follow-up step (typically an attachment upload) did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SubmissionReceipt {
    pub fn accepted() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }

    pub fn rejected() -> Self {
        Self {
            success: false,
            message: None,
        }
    }

    pub(crate) fn degradation_message(&self) -> Option<&str> {
        if self.success {
            return None;
        }
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
    }
}

/// Backend holding proposal records and relaying submissions to the CRM.
#[async_trait]
pub trait ProposalRepository: Send + Sync {
    async fn create_record(&self, progress: &ProgressUpdate)
        -> Result<ApplicationId, RepositoryError>;
    async fn update_record(
        &self,
        id: &ApplicationId,
        progress: &ProgressUpdate,
    ) -> Result<(), RepositoryError>;
    async fn submit_record(
        &self,
        id: &ApplicationId,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, RepositoryError>;
}

/// Error enumeration for backend failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("request rejected by server: {0}")]
    Rejected(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}
