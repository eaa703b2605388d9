use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::domain::{Draft, FieldValue};
use super::repository::RepositoryError;

/// Read-only profile of the signed-in applicant, used to prefill forms.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplicantContext {
    pub organization_name: String,
    pub contact_name: String,
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
}

impl ApplicantContext {
    /// Copy profile values into fields the applicant has not filled in.
    pub fn prefill(&self, draft: &mut Draft) {
        let entries = [
            ("organization_name", Some(&self.organization_name)),
            ("contact_name", Some(&self.contact_name)),
            ("contact_email", Some(&self.contact_email)),
            ("contact_phone", self.contact_phone.as_ref()),
            ("district", self.district.as_ref()),
        ];

        for (field, value) in entries {
            if let Some(value) = value.filter(|value| !value.trim().is_empty()) {
                draft.fill_missing(field, FieldValue::text(value.clone()));
            }
        }
    }
}

/// Source of the applicant profile (the portal's user-data endpoint).
#[async_trait]
pub trait UserDataService: Send + Sync {
    async fn fetch_profile(&self) -> Result<ApplicantContext, RepositoryError>;
}

/// Caches the applicant profile after the first fetch; `refresh` reloads it.
pub struct ApplicantContextProvider<U: ?Sized> {
    service: Arc<U>,
    current: RwLock<Option<Arc<ApplicantContext>>>,
}

impl<U> ApplicantContextProvider<U>
where
    U: UserDataService + ?Sized,
{
    pub fn new(service: Arc<U>) -> Self {
        Self {
            service,
            current: RwLock::new(None),
        }
    }

    pub async fn current(&self) -> Result<Arc<ApplicantContext>, RepositoryError> {
        if let Some(context) = self.current.read().await.as_ref() {
            return Ok(context.clone());
        }
        self.refresh().await
    }

    pub async fn refresh(&self) -> Result<Arc<ApplicantContext>, RepositoryError> {
        let context = Arc::new(self.service.fetch_profile().await?);
        *self.current.write().await = Some(context.clone());
        Ok(context)
    }
}
