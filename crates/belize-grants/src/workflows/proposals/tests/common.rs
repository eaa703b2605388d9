use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;
use tokio::sync::Notify;

use crate::workflows::proposals::context::{ApplicantContext, UserDataService};
use crate::workflows::proposals::domain::{ApplicationId, Draft, FieldValue};
use crate::workflows::proposals::repository::{
    ProgressUpdate, ProposalRepository, RepositoryError, SubmissionPayload, SubmissionReceipt,
};

/// Records every call and answers submissions with a configurable receipt.
pub(super) struct MemoryRepository {
    sequence: AtomicU64,
    pub(super) creates: Mutex<Vec<ProgressUpdate>>,
    pub(super) updates: Mutex<Vec<(ApplicationId, ProgressUpdate)>>,
    pub(super) submissions: Mutex<Vec<(ApplicationId, SubmissionPayload)>>,
    receipt: Mutex<Result<SubmissionReceipt, RepositoryError>>,
    failing_updates: Mutex<bool>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self {
            sequence: AtomicU64::new(1),
            creates: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
            receipt: Mutex::new(Ok(SubmissionReceipt::accepted())),
            failing_updates: Mutex::new(false),
        }
    }
}

impl MemoryRepository {
    pub(super) fn answering(receipt: Result<SubmissionReceipt, RepositoryError>) -> Self {
        let repository = Self::default();
        repository.set_receipt(receipt);
        repository
    }

    pub(super) fn set_receipt(&self, receipt: Result<SubmissionReceipt, RepositoryError>) {
        *self.receipt.lock().expect("receipt mutex poisoned") = receipt;
    }

    pub(super) fn fail_updates(&self, failing: bool) {
        *self.failing_updates.lock().expect("flag mutex poisoned") = failing;
    }

    pub(super) fn create_count(&self) -> usize {
        self.creates.lock().expect("creates mutex poisoned").len()
    }

    pub(super) fn update_ids(&self) -> Vec<ApplicationId> {
        self.updates
            .lock()
            .expect("updates mutex poisoned")
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub(super) fn last_update(&self) -> Option<ProgressUpdate> {
        self.updates
            .lock()
            .expect("updates mutex poisoned")
            .last()
            .map(|(_, progress)| progress.clone())
    }

    pub(super) fn submission_count(&self) -> usize {
        self.submissions
            .lock()
            .expect("submissions mutex poisoned")
            .len()
    }
}

#[async_trait]
impl ProposalRepository for MemoryRepository {
    async fn create_record(
        &self,
        progress: &ProgressUpdate,
    ) -> Result<ApplicationId, RepositoryError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.creates
            .lock()
            .expect("creates mutex poisoned")
            .push(progress.clone());
        Ok(ApplicationId(format!("BF-{id:06}")))
    }

    async fn update_record(
        &self,
        id: &ApplicationId,
        progress: &ProgressUpdate,
    ) -> Result<(), RepositoryError> {
        if *self.failing_updates.lock().expect("flag mutex poisoned") {
            return Err(RepositoryError::Unavailable("crm timeout".to_string()));
        }
        self.updates
            .lock()
            .expect("updates mutex poisoned")
            .push((id.clone(), progress.clone()));
        Ok(())
    }

    async fn submit_record(
        &self,
        id: &ApplicationId,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, RepositoryError> {
        self.submissions
            .lock()
            .expect("submissions mutex poisoned")
            .push((id.clone(), payload.clone()));
        self.receipt.lock().expect("receipt mutex poisoned").clone()
    }
}

pub(super) struct UnavailableRepository;

#[async_trait]
impl ProposalRepository for UnavailableRepository {
    async fn create_record(
        &self,
        _progress: &ProgressUpdate,
    ) -> Result<ApplicationId, RepositoryError> {
        Err(RepositoryError::Unavailable("backend offline".to_string()))
    }

    async fn update_record(
        &self,
        _id: &ApplicationId,
        _progress: &ProgressUpdate,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("backend offline".to_string()))
    }

    async fn submit_record(
        &self,
        _id: &ApplicationId,
        _payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, RepositoryError> {
        Err(RepositoryError::Unavailable("backend offline".to_string()))
    }
}

/// Holds `create_record` open until the test releases it.
#[derive(Default)]
pub(super) struct GatedRepository {
    pub(super) entered: Notify,
    pub(super) release: Notify,
    creates: AtomicUsize,
}

impl GatedRepository {
    pub(super) fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProposalRepository for GatedRepository {
    async fn create_record(
        &self,
        _progress: &ProgressUpdate,
    ) -> Result<ApplicationId, RepositoryError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(ApplicationId("BF-GATED".to_string()))
    }

    async fn update_record(
        &self,
        _id: &ApplicationId,
        _progress: &ProgressUpdate,
    ) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn submit_record(
        &self,
        _id: &ApplicationId,
        _payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, RepositoryError> {
        Ok(SubmissionReceipt::accepted())
    }
}

/// Profile service that counts fetches and can be switched to a new profile.
pub(super) struct StaticProfiles {
    pub(super) profile: Mutex<ApplicantContext>,
    pub(super) fetches: AtomicUsize,
}

impl StaticProfiles {
    pub(super) fn new(profile: ApplicantContext) -> Arc<Self> {
        Arc::new(Self {
            profile: Mutex::new(profile),
            fetches: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl UserDataService for StaticProfiles {
    async fn fetch_profile(&self) -> Result<ApplicantContext, RepositoryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.profile.lock().expect("profile mutex poisoned").clone())
    }
}

pub(super) fn applicant() -> ApplicantContext {
    ApplicantContext {
        organization_name: "Toledo Cacao Growers".to_string(),
        contact_name: "Marisol Coc".to_string(),
        contact_email: "marisol@toledocacao.bz".to_string(),
        contact_phone: Some("+501 722-0101".to_string()),
        district: Some("Toledo".to_string()),
    }
}

fn text(value: &str) -> FieldValue {
    FieldValue::text(value)
}

pub(super) fn gap_organization() -> Draft {
    Draft::new()
        .with("organization_name", text("Toledo Cacao Growers"))
        .with("contact_name", text("Marisol Coc"))
        .with("contact_email", text("marisol@toledocacao.bz"))
        .with("district", text("Toledo"))
}

pub(super) fn gap_project() -> Draft {
    Draft::new()
        .with("project_title", text("Shade-grown cacao nursery"))
        .with("award_category", text("Medium Grants"))
        .with("project_duration_months", FieldValue::Number(18.0))
        .with("project_summary", text("Nursery for 20,000 cacao seedlings."))
}

pub(super) fn gap_budget() -> Draft {
    Draft::new()
        .with("requested_amount", FieldValue::Number(90_000.0))
        .with("co_financing_amount", FieldValue::Number(10_000.0))
}

pub(super) fn gap_declaration() -> Draft {
    Draft::new().with("declaration_accepted", FieldValue::Flag(true))
}

pub(super) fn gap_steps() -> Vec<Draft> {
    vec![
        gap_organization(),
        gap_project(),
        gap_budget(),
        gap_declaration(),
    ]
}

pub(super) fn concept_values() -> Draft {
    Draft::new()
        .with("organization_name", text("Belize River Keepers"))
        .with("contact_email", text("info@riverkeepers.bz"))
        .with("project_title", text("Riparian buffer restoration"))
        .with("award_category", text("Small Grants"))
        .with("problem_statement", text("Bank erosion along the Belize River."))
        .with("proposed_solution", text("Replant native buffers on 12 km of bank."))
        .with("requested_amount", text("BZD 25,000"))
        .with("project_duration_months", FieldValue::Number(12.0))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
