use async_trait::async_trait;
use belize_grants::workflows::awards::AwardCategory;
use belize_grants::workflows::proposals::{
    ApplicantContext, ApplicationId, ProgressUpdate, ProposalRepository, RepositoryError,
    SubmissionPayload, SubmissionReceipt, UserDataService,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredProposal {
    pub(crate) progress: ProgressUpdate,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) submitted_at: Option<DateTime<Utc>>,
    pub(crate) attachment_count: usize,
}

/// Stand-in for the portal backend: keeps records in memory and accepts
/// submissions, reporting attachments it could not store as a partial success.
#[derive(Clone)]
pub(crate) struct InMemoryProposalRepository {
    sequence: Arc<AtomicU64>,
    records: Arc<Mutex<HashMap<ApplicationId, StoredProposal>>>,
}

impl Default for InMemoryProposalRepository {
    fn default() -> Self {
        Self {
            sequence: Arc::new(AtomicU64::new(1)),
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl InMemoryProposalRepository {
    pub(crate) fn fetch(&self, id: &ApplicationId) -> Option<StoredProposal> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .cloned()
    }
}

#[async_trait]
impl ProposalRepository for InMemoryProposalRepository {
    async fn create_record(
        &self,
        progress: &ProgressUpdate,
    ) -> Result<ApplicationId, RepositoryError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        let application_id = ApplicationId(format!("BF-{id:06}"));
        let record = StoredProposal {
            progress: progress.clone(),
            updated_at: Utc::now(),
            submitted_at: None,
            attachment_count: 0,
        };
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .insert(application_id.clone(), record);
        debug!(%application_id, "proposal record created");
        Ok(application_id)
    }

    async fn update_record(
        &self,
        id: &ApplicationId,
        progress: &ProgressUpdate,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if record.submitted_at.is_some() {
            return Err(RepositoryError::Rejected(format!(
                "proposal {id} has already been submitted"
            )));
        }
        record.progress = progress.clone();
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn submit_record(
        &self,
        id: &ApplicationId,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;

        let (stored, empty): (Vec<_>, Vec<_>) = payload
            .attachments
            .iter()
            .partition(|attachment| !attachment.content.is_empty());

        record.progress.draft = payload.draft.clone();
        record.attachment_count = stored.len();
        record.updated_at = Utc::now();

        if empty.is_empty() {
            record.submitted_at = Some(record.updated_at);
            return Ok(SubmissionReceipt::accepted());
        }

        let names: Vec<_> = empty
            .iter()
            .map(|attachment| attachment.file_name.as_str())
            .collect();
        Ok(SubmissionReceipt::degraded(format!(
            "Proposal saved but these attachments were empty and not uploaded: {}",
            names.join(", ")
        )))
    }
}

/// Stand-in for the portal's user-data endpoint: serves one applicant
/// profile, typically read from a JSON file at startup.
pub(crate) struct InMemoryUserDataService {
    profile: ApplicantContext,
}

impl InMemoryUserDataService {
    pub(crate) fn new(profile: ApplicantContext) -> Self {
        Self { profile }
    }

    pub(crate) fn from_reader(reader: impl Read) -> Result<Self, std::io::Error> {
        let profile: ApplicantContext = serde_json::from_reader(reader)?;
        Ok(Self::new(profile))
    }
}

#[async_trait]
impl UserDataService for InMemoryUserDataService {
    async fn fetch_profile(&self) -> Result<ApplicantContext, RepositoryError> {
        if self.profile.contact_email.trim().is_empty() {
            return Err(RepositoryError::Unavailable(
                "applicant profile has no contact email".to_string(),
            ));
        }
        Ok(self.profile.clone())
    }
}

/// clap value parser accepting category labels or short names ("medium").
pub(crate) fn parse_category(raw: &str) -> Result<AwardCategory, String> {
    AwardCategory::parse(raw).ok_or_else(|| {
        let options: Vec<_> = AwardCategory::ordered()
            .iter()
            .map(|category| category.label())
            .collect();
        format!("unknown award category '{raw}' (expected one of: {})", options.join(", "))
    })
}
