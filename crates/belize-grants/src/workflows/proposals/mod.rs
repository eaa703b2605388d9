//! Multi-step proposal wizards (concept paper, GAP, community proposals).
//!
//! A [`WizardController`] walks one applicant through a [`WizardBlueprint`],
//! gating each step on its validators and saving progress through a
//! [`ProposalRepository`]. Backend, CRM and profile lookups are consumed
//! through traits so they can be swapped for in-memory doubles.

pub mod blueprint;
pub mod concept;
pub mod context;
pub mod controller;
pub mod domain;
pub mod drafts;
pub mod repository;
pub mod router;
pub mod validation;

#[cfg(test)]
mod tests;

pub use blueprint::{
    AwardFieldMap, FieldKind, FieldSpec, ProposalKind, StepDefinition, WizardBlueprint,
};
pub use concept::ConceptPaperForm;
pub use context::{ApplicantContext, ApplicantContextProvider, UserDataService};
pub use controller::{
    StepAdvance, SubmissionError, SubmissionOutcome, WizardController, WizardError,
};
pub use domain::{ApplicationId, Attachment, Draft, FieldValue, WizardState};
pub use drafts::{
    DraftCache, DraftCacheError, FileDraftCache, MemoryDraftCache, CONCEPT_PAPER_DRAFT_KEY,
};
pub use repository::{
    ProgressUpdate, ProposalRepository, RepositoryError, SubmissionPayload, SubmissionReceipt,
};
pub use router::{
    proposal_router, AttachmentUpload, ProfileProvider, ProposalSessions, SessionId, SessionView,
};
pub use validation::{
    AwardRulesValidator, FieldRulesValidator, StepValidation, StepValidator, ValidatorRegistry,
};
