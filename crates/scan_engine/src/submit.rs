use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use scan_core::{ItemDescriptor, JobHandle, JobId, JobStatus, OwnerId};
use scan_logging::{scan_error, scan_info, scan_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{JobRepository, PersistError};

#[derive(Debug, Clone)]
pub struct SubmitSettings {
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for SubmitSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8787/market-analysis/jobs".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("select at least one vehicle to analyze")]
    Validation,
    #[error("market analysis request failed: {0}")]
    Submission(String),
    #[error("could not record the analysis job: {0}")]
    Persistence(#[from] PersistError),
}

/// The external analysis service. One call per batch.
#[async_trait::async_trait]
pub trait AnalysisService: Send + Sync {
    async fn request_analysis(
        &self,
        job_id: &JobId,
        items: &[ItemDescriptor],
    ) -> Result<(), SubmitError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisRequest<'a> {
    job_id: &'a JobId,
    items: &'a [ItemDescriptor],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Accepted {
    job_id: String,
}

#[derive(Deserialize)]
struct Rejected {
    message: String,
}

#[derive(Debug, Clone)]
pub struct ReqwestAnalysisService {
    endpoint: Url,
    client: reqwest::Client,
}

impl ReqwestAnalysisService {
    pub fn new(settings: &SubmitSettings) -> Result<Self, SubmitError> {
        let endpoint = Url::parse(&settings.endpoint).map_err(|err| {
            SubmitError::Submission(format!("invalid endpoint {}: {err}", settings.endpoint))
        })?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| SubmitError::Submission(err.to_string()))?;
        Ok(Self { endpoint, client })
    }
}

#[async_trait::async_trait]
impl AnalysisService for ReqwestAnalysisService {
    async fn request_analysis(
        &self,
        job_id: &JobId,
        items: &[ItemDescriptor],
    ) -> Result<(), SubmitError> {
        let body = serde_json::to_vec(&AnalysisRequest { job_id, items })
            .map_err(|err| SubmitError::Submission(err.to_string()))?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Rejected>(&bytes)
                .map(|rejected| rejected.message)
                .ok()
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| status.to_string());
            return Err(SubmitError::Submission(message));
        }

        let accepted: Accepted = serde_json::from_slice(&bytes).map_err(|err| {
            SubmitError::Submission(format!("unexpected acceptance body: {err}"))
        })?;
        if accepted.job_id != job_id.as_str() {
            return Err(SubmitError::Submission(format!(
                "service acknowledged job {} instead of {}",
                accepted.job_id, job_id
            )));
        }
        Ok(())
    }
}

fn map_reqwest_error(err: reqwest::Error) -> SubmitError {
    if err.is_timeout() {
        return SubmitError::Submission("analysis service timed out".to_string());
    }
    if err.is_connect() {
        return SubmitError::Submission("analysis service unreachable".to_string());
    }
    SubmitError::Submission(err.to_string())
}

/// Records the job, then hands the batch to the analysis service.
#[derive(Clone)]
pub struct JobRequestSubmitter {
    service: Arc<dyn AnalysisService>,
    repository: Arc<dyn JobRepository>,
}

impl JobRequestSubmitter {
    pub fn new(service: Arc<dyn AnalysisService>, repository: Arc<dyn JobRepository>) -> Self {
        Self {
            service,
            repository,
        }
    }

    pub async fn submit(
        &self,
        owner: &OwnerId,
        items: Vec<ItemDescriptor>,
    ) -> Result<JobHandle, SubmitError> {
        if items.is_empty() {
            return Err(SubmitError::Validation);
        }

        let job_id = self.repository.create_job(owner, &items).await?;
        if let Err(err) = self.service.request_analysis(&job_id, &items).await {
            scan_warn!("Analysis request for job {} failed: {}", job_id, err);
            // A rejected batch must not linger as pending.
            if let Err(mark_err) = self
                .repository
                .update_job_status(&job_id, JobStatus::Failed, Some(err.to_string()))
                .await
            {
                scan_error!("Could not mark job {} as failed: {}", job_id, mark_err);
            }
            return Err(err);
        }

        scan_info!("Submitted job {} with {} item(s)", job_id, items.len());
        Ok(JobHandle { job_id, items })
    }
}
