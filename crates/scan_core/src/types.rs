use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque job identifier issued by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the user who owns a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    PartiallyFailed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::PartiallyFailed | JobStatus::Failed
        )
    }

    /// Forward-only transition rule. Terminal states accept nothing.
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        match self {
            JobStatus::Pending => next != JobStatus::Pending,
            JobStatus::Processing => next.is_terminal(),
            JobStatus::Completed | JobStatus::PartiallyFailed | JobStatus::Failed => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::PartiallyFailed => "partially_failed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Processing,
    Success,
    Error,
    NoDataFound,
}

impl ItemStatus {
    /// True once the external worker is done with the item, whatever the outcome.
    pub fn is_resolved(self) -> bool {
        matches!(
            self,
            ItemStatus::Success | ItemStatus::Error | ItemStatus::NoDataFound
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Processing => "processing",
            ItemStatus::Success => "success",
            ItemStatus::Error => "error",
            ItemStatus::NoDataFound => "no_data_found",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One vehicle in a batch, with the attributes needed to render its row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDescriptor {
    pub item_id: String,
    pub make: String,
    pub model: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub mileage: Option<u32>,
    #[serde(default)]
    pub trim: Option<String>,
}

impl ItemDescriptor {
    pub fn new(item_id: impl Into<String>, make: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            make: make.into(),
            model: model.into(),
            year: None,
            mileage: None,
            trim: None,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_mileage(mut self, mileage: u32) -> Self {
        self.mileage = Some(mileage);
        self
    }

    pub fn with_trim(mut self, trim: impl Into<String>) -> Self {
        self.trim = Some(trim.into());
        self
    }

    /// "Make Model", trimmed; empty when both are blank.
    pub fn make_model(&self) -> String {
        format!("{} {}", self.make.trim(), self.model.trim())
            .trim()
            .to_string()
    }

    pub fn display_name(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        if let Some(year) = self.year {
            parts.push(year.to_string());
        }
        let make_model = self.make_model();
        if !make_model.is_empty() {
            parts.push(make_model);
        }
        if let Some(trim) = self.trim.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            parts.push(trim.to_string());
        }
        if parts.is_empty() {
            self.item_id.clone()
        } else {
            parts.join(" ")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparableRecord {
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub mileage: Option<u32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceMetrics {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    pub comparable_count: u32,
    pub currency: String,
    pub source: String,
    #[serde(default)]
    pub retrieved_at: Option<String>,
}

/// Success payload for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAnalysis {
    pub metrics: PriceMetrics,
    #[serde(default)]
    pub comparables: Vec<ComparableRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub job_id: JobId,
    pub item_id: String,
    pub status: ItemStatus,
    #[serde(default)]
    pub analysis: Option<MarketAnalysis>,
    #[serde(default)]
    pub error_detail: Option<String>,
}

impl ItemResult {
    pub fn pending(job_id: JobId, item_id: impl Into<String>) -> Self {
        Self::bare(job_id, item_id, ItemStatus::Pending)
    }

    pub fn processing(job_id: JobId, item_id: impl Into<String>) -> Self {
        Self::bare(job_id, item_id, ItemStatus::Processing)
    }

    pub fn success(job_id: JobId, item_id: impl Into<String>, analysis: MarketAnalysis) -> Self {
        Self {
            analysis: Some(analysis),
            ..Self::bare(job_id, item_id, ItemStatus::Success)
        }
    }

    pub fn error(job_id: JobId, item_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            error_detail: Some(detail.into()),
            ..Self::bare(job_id, item_id, ItemStatus::Error)
        }
    }

    pub fn no_data(job_id: JobId, item_id: impl Into<String>) -> Self {
        Self::bare(job_id, item_id, ItemStatus::NoDataFound)
    }

    fn bare(job_id: JobId, item_id: impl Into<String>, status: ItemStatus) -> Self {
        Self {
            job_id,
            item_id: item_id.into(),
            status,
            analysis: None,
            error_detail: None,
        }
    }

    /// Drops fields that do not belong to the result's status: the payload
    /// lives only on `success`, the error detail only on `error`.
    pub fn normalized(mut self) -> Self {
        if self.status != ItemStatus::Success {
            self.analysis = None;
        }
        if self.status != ItemStatus::Error {
            self.error_detail = None;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    pub id: JobId,
    pub owner_id: OwnerId,
    pub created_at: String,
    pub updated_at: String,
    pub status: JobStatus,
    pub items: Vec<ItemDescriptor>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// History listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJobSummary {
    pub id: JobId,
    pub status: JobStatus,
    pub created_at: String,
    pub updated_at: String,
    pub item_count: usize,
    pub preview_items: Vec<ItemDescriptor>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Number of descriptors a [`BatchJobSummary`] carries for labelling.
pub const SUMMARY_PREVIEW_ITEMS: usize = 3;

impl BatchJobSummary {
    pub fn from_job(job: &BatchJob) -> Self {
        Self {
            id: job.id.clone(),
            status: job.status,
            created_at: job.created_at.clone(),
            updated_at: job.updated_at.clone(),
            item_count: job.items.len(),
            preview_items: job.items.iter().take(SUMMARY_PREVIEW_ITEMS).cloned().collect(),
            error_message: job.error_message.clone(),
        }
    }
}

/// Returned by a successful submission; seeds the live store before any
/// result arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: JobId,
    pub items: Vec<ItemDescriptor>,
}
