use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use scan_core::{
    BatchJob, BatchJobSummary, ItemDescriptor, ItemResult, JobId, JobStatus, OwnerId,
};
use scan_logging::{scan_debug, scan_info, scan_warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::decode::decode_result;
use crate::feed::{ChangeFeed, ChangeKind, FeedEvent};
use crate::{utc_now, AtomicFileWriter, Clock, PersistError, RawItemResult};

const JOBS_DIR: &str = "jobs";
const JOB_FILE_EXT: &str = "json";

/// Which terminal jobs a history listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryFilter {
    /// completed, partially_failed and failed.
    #[default]
    Terminal,
    /// Only this status. A non-terminal status matches nothing.
    Status(JobStatus),
}

impl HistoryFilter {
    fn matches(self, status: JobStatus) -> bool {
        status.is_terminal()
            && match self {
                HistoryFilter::Terminal => true,
                HistoryFilter::Status(wanted) => wanted == status,
            }
    }
}

/// Durable job and result records.
#[async_trait::async_trait]
pub trait JobRepository: Send + Sync {
    /// Inserts a `pending` job and returns its identifier.
    async fn create_job(
        &self,
        owner: &OwnerId,
        items: &[ItemDescriptor],
    ) -> Result<JobId, PersistError>;

    /// Loads a job owned by `owner`. Someone else's job is `NotFound`.
    async fn load_job(&self, job_id: &JobId, owner: &OwnerId) -> Result<BatchJob, PersistError>;

    /// All results recorded so far, in requested-item order. Empty when none.
    async fn load_results(&self, job_id: &JobId) -> Result<Vec<ItemResult>, PersistError>;

    /// Terminal jobs for `owner`, newest first.
    async fn list_jobs_for_owner(
        &self,
        owner: &OwnerId,
        filter: HistoryFilter,
        limit: usize,
    ) -> Result<Vec<BatchJobSummary>, PersistError>;

    /// Worker-side status write. Regressions are ignored.
    async fn update_job_status(
        &self,
        job_id: &JobId,
        status: JobStatus,
        error_message: Option<String>,
    ) -> Result<(), PersistError>;

    /// Worker-side result write, keyed by (job, item).
    async fn upsert_result(&self, job_id: &JobId, result: RawItemResult)
        -> Result<(), PersistError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobDocument {
    job: BatchJob,
    #[serde(default)]
    results: BTreeMap<String, StoredResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredResult {
    #[serde(flatten)]
    raw: RawItemResult,
    updated_at: String,
}

/// Synchronous file access; every call runs on the blocking pool.
#[derive(Debug, Clone)]
struct JobFiles {
    writer: AtomicFileWriter,
}

impl JobFiles {
    fn new(root: &Path) -> Self {
        Self {
            writer: AtomicFileWriter::new(root.join(JOBS_DIR)),
        }
    }

    fn filename(job_id: &JobId) -> Option<String> {
        let id = job_id.as_str();
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        safe.then(|| format!("{id}.{JOB_FILE_EXT}"))
    }

    fn read(&self, job_id: &JobId) -> Result<JobDocument, PersistError> {
        let filename = Self::filename(job_id).ok_or(PersistError::NotFound)?;
        let text = match fs::read_to_string(self.writer.dir().join(filename)) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(PersistError::NotFound)
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&text)?)
    }

    fn write(&self, doc: &JobDocument) -> Result<(), PersistError> {
        let filename = Self::filename(&doc.job.id).ok_or(PersistError::NotFound)?;
        let content = serde_json::to_string_pretty(doc)?;
        self.writer.write(&filename, &content)?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<JobDocument>, PersistError> {
        let dir = self.writer.dir();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut docs = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(JOB_FILE_EXT) {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(PersistError::from)
                .and_then(|text| serde_json::from_str::<JobDocument>(&text).map_err(Into::into));
            match parsed {
                Ok(doc) => docs.push(doc),
                Err(err) => scan_warn!("Skipping unreadable job record {:?}: {}", path, err),
            }
        }
        Ok(docs)
    }
}

async fn blocking<T, F>(task: F) -> Result<T, PersistError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PersistError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| PersistError::Io(io::Error::other(err)))?
}

/// One JSON document per job under `{root}/jobs/`, written atomically.
/// Writes are serialized and published to the change feed when one is attached.
#[derive(Clone)]
pub struct FileJobRepository {
    root: PathBuf,
    files: JobFiles,
    write_lock: Arc<Mutex<()>>,
    feed: Option<ChangeFeed>,
    clock: Clock,
}

impl FileJobRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            files: JobFiles::new(&root),
            root,
            write_lock: Arc::new(Mutex::new(())),
            feed: None,
            clock: Arc::new(utc_now),
        }
    }

    pub fn with_feed(mut self, feed: ChangeFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read(&self, job_id: &JobId) -> Result<JobDocument, PersistError> {
        let files = self.files.clone();
        let job_id = job_id.clone();
        blocking(move || files.read(&job_id)).await
    }

    async fn write(&self, doc: JobDocument) -> Result<JobDocument, PersistError> {
        let files = self.files.clone();
        blocking(move || files.write(&doc).map(|()| doc)).await
    }

    async fn publish(&self, event: FeedEvent) {
        if let Some(feed) = &self.feed {
            feed.publish(event).await;
        }
    }
}

#[async_trait::async_trait]
impl JobRepository for FileJobRepository {
    async fn create_job(
        &self,
        owner: &OwnerId,
        items: &[ItemDescriptor],
    ) -> Result<JobId, PersistError> {
        let now = (self.clock)();
        let job = BatchJob {
            id: JobId::new(uuid::Uuid::new_v4().to_string()),
            owner_id: owner.clone(),
            created_at: now.clone(),
            updated_at: now,
            status: JobStatus::Pending,
            items: items.to_vec(),
            error_message: None,
        };
        let job_id = job.id.clone();

        let _guard = self.write_lock.lock().await;
        self.write(JobDocument {
            job,
            results: BTreeMap::new(),
        })
        .await?;
        scan_info!(
            "Created job {} for owner {} with {} item(s)",
            job_id,
            owner,
            items.len()
        );
        Ok(job_id)
    }

    async fn load_job(&self, job_id: &JobId, owner: &OwnerId) -> Result<BatchJob, PersistError> {
        let doc = self.read(job_id).await?;
        if &doc.job.owner_id != owner {
            scan_debug!("Job {} requested by non-owner {}", job_id, owner);
            return Err(PersistError::NotFound);
        }
        Ok(doc.job)
    }

    async fn load_results(&self, job_id: &JobId) -> Result<Vec<ItemResult>, PersistError> {
        let doc = match self.read(job_id).await {
            Ok(doc) => doc,
            Err(PersistError::NotFound) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let results = doc
            .job
            .items
            .iter()
            .filter_map(|item| doc.results.get(&item.item_id))
            .map(|stored| decode_result(job_id, &stored.raw))
            .collect();
        Ok(results)
    }

    async fn list_jobs_for_owner(
        &self,
        owner: &OwnerId,
        filter: HistoryFilter,
        limit: usize,
    ) -> Result<Vec<BatchJobSummary>, PersistError> {
        let files = self.files.clone();
        let docs = blocking(move || files.read_all()).await?;

        let mut jobs: Vec<BatchJob> = docs
            .into_iter()
            .map(|doc| doc.job)
            .filter(|job| &job.owner_id == owner && filter.matches(job.status))
            .collect();
        jobs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(jobs
            .iter()
            .take(limit)
            .map(BatchJobSummary::from_job)
            .collect())
    }

    async fn update_job_status(
        &self,
        job_id: &JobId,
        status: JobStatus,
        error_message: Option<String>,
    ) -> Result<(), PersistError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read(job_id).await?;
        let current = doc.job.status;
        if current == status && (current.is_terminal() || error_message == doc.job.error_message)
        {
            scan_debug!("Job {} already {}; nothing to write", job_id, status);
            return Ok(());
        }
        if current != status && !current.can_advance_to(status) {
            scan_warn!(
                "Refusing status regression for job {}: {} -> {}",
                job_id,
                current,
                status
            );
            return Ok(());
        }

        doc.job.status = status;
        doc.job.error_message = match status {
            JobStatus::Failed | JobStatus::PartiallyFailed => error_message.clone(),
            _ => None,
        };
        doc.job.updated_at = (self.clock)();
        let doc = self.write(doc).await?;

        self.publish(FeedEvent::Job {
            job_id: job_id.clone(),
            status,
            error_message: doc.job.error_message,
        })
        .await;
        Ok(())
    }

    async fn upsert_result(
        &self,
        job_id: &JobId,
        result: RawItemResult,
    ) -> Result<(), PersistError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read(job_id).await?;
        if !doc.job.items.iter().any(|item| item.item_id == result.item_id) {
            return Err(PersistError::UnknownItem {
                job_id: job_id.to_string(),
                item_id: result.item_id,
            });
        }

        let now = (self.clock)();
        let kind = if doc.results.contains_key(&result.item_id) {
            ChangeKind::Update
        } else {
            ChangeKind::Insert
        };
        doc.results.insert(
            result.item_id.clone(),
            StoredResult {
                raw: result.clone(),
                updated_at: now.clone(),
            },
        );
        doc.job.updated_at = now;
        self.write(doc).await?;

        self.publish(FeedEvent::Result {
            job_id: job_id.clone(),
            kind,
            result,
        })
        .await;
        Ok(())
    }
}
