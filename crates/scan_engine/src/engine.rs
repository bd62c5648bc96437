use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;

use scan_core::{ItemDescriptor, JobId, OwnerId};
use scan_logging::{scan_debug, scan_warn};
use thiserror::Error;

use crate::bridge::{ChannelEventSink, EventSink, LiveUpdateBridge};
use crate::feed::{ChangeFeed, PushTransport};
use crate::{
    ensure_data_dir, AnalysisService, EngineEvent, FileJobRepository, HistoryFilter,
    JobRepository, JobRequestSubmitter, PersistError, ReqwestAnalysisService, SubmitError,
    SubmitSettings, SubscriptionError,
};

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub owner_id: OwnerId,
    pub data_dir: PathBuf,
    pub submit: SubmitSettings,
    pub history_limit: usize,
}

impl EngineConfig {
    pub fn default_with_data_dir(owner_id: OwnerId, data_dir: PathBuf) -> Self {
        Self {
            owner_id,
            data_dir,
            submit: SubmitSettings::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("could not start engine runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// The collaborators an engine runs against.
#[derive(Clone)]
pub struct EngineParts {
    pub owner_id: OwnerId,
    pub service: Arc<dyn AnalysisService>,
    pub repository: Arc<dyn JobRepository>,
    pub transport: Arc<dyn PushTransport>,
    pub history_limit: usize,
}

impl EngineParts {
    /// HTTP analysis service, file repository under `data_dir`, and an
    /// in-process change feed shared by the repository and the bridge.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        ensure_data_dir(&config.data_dir)?;
        let feed = ChangeFeed::new();
        let repository = FileJobRepository::new(config.data_dir.clone()).with_feed(feed.clone());
        Ok(Self {
            owner_id: config.owner_id.clone(),
            service: Arc::new(ReqwestAnalysisService::new(&config.submit)?),
            repository: Arc::new(repository),
            transport: Arc::new(feed),
            history_limit: config.history_limit,
        })
    }
}

enum EngineCommand {
    Submit { items: Vec<ItemDescriptor> },
    Subscribe { job_id: JobId },
    Unsubscribe,
    Resume { job_id: JobId },
    ListHistory,
    OpenHistory { job_id: JobId },
}

/// Runs IO on a dedicated thread with its own tokio runtime. Commands go in
/// through [`EngineHandle`]'s methods; results come back as [`EngineEvent`]s.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        Self::with_parts(EngineParts::from_config(config)?)
    }

    pub fn with_parts(parts: EngineParts) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink::new(event_tx));
            let ctx = Arc::new(CommandContext {
                owner_id: parts.owner_id.clone(),
                submitter: JobRequestSubmitter::new(parts.service, parts.repository.clone()),
                repository: parts.repository,
                history_limit: parts.history_limit,
                sink: sink.clone(),
            });
            let mut bridge = LiveUpdateBridge::new(parts.transport, sink.clone());

            while let Ok(command) = cmd_rx.recv() {
                match command {
                    // The bridge is stateful, so subscription changes are applied in order.
                    EngineCommand::Subscribe { job_id } => {
                        let opened = runtime.block_on(async {
                            let pending = bridge.open(&job_id).await?;
                            sink.emit(EngineEvent::SubscriptionOpened {
                                job_id: job_id.clone(),
                            });
                            // Writes that landed before the channels opened; later
                            // ones are already buffered behind this snapshot.
                            ctx.catch_up(&job_id).await;
                            Ok::<_, SubscriptionError>(bridge.start(pending))
                        });
                        if let Err(err) = opened {
                            scan_warn!("Subscription for job {} failed: {}", job_id, err);
                            sink.emit(EngineEvent::Disconnected {
                                job_id,
                                reason: err.to_string(),
                            });
                        }
                    }
                    EngineCommand::Unsubscribe => bridge.unsubscribe(),
                    command => {
                        let ctx = ctx.clone();
                        runtime.spawn(async move {
                            ctx.handle(command).await;
                        });
                    }
                }
            }
            scan_debug!("Engine command channel closed; shutting down");
            bridge.unsubscribe();
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn submit(&self, items: Vec<ItemDescriptor>) {
        self.send(EngineCommand::Submit { items });
    }

    pub fn subscribe(&self, job_id: JobId) {
        self.send(EngineCommand::Subscribe { job_id });
    }

    pub fn unsubscribe(&self) {
        self.send(EngineCommand::Unsubscribe);
    }

    pub fn resume(&self, job_id: JobId) {
        self.send(EngineCommand::Resume { job_id });
    }

    pub fn list_history(&self) {
        self.send(EngineCommand::ListHistory);
    }

    pub fn open_history(&self, job_id: JobId) {
        self.send(EngineCommand::OpenHistory { job_id });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }
}

struct CommandContext {
    owner_id: OwnerId,
    submitter: JobRequestSubmitter,
    repository: Arc<dyn JobRepository>,
    history_limit: usize,
    sink: Arc<dyn EventSink>,
}

impl CommandContext {
    async fn handle(&self, command: EngineCommand) {
        let event = match command {
            EngineCommand::Submit { items } => {
                match self.submitter.submit(&self.owner_id, items).await {
                    Ok(handle) => EngineEvent::Submitted(handle),
                    Err(err) => EngineEvent::SubmitFailed {
                        message: err.to_string(),
                    },
                }
            }
            EngineCommand::Resume { job_id } => match self.load(&job_id).await {
                Ok((job, results)) => EngineEvent::Resumed { job, results },
                Err(PersistError::NotFound) => EngineEvent::ResumeNotFound { job_id },
                Err(err) => EngineEvent::ResumeFailed {
                    job_id,
                    message: err.to_string(),
                },
            },
            EngineCommand::ListHistory => match self
                .repository
                .list_jobs_for_owner(&self.owner_id, HistoryFilter::Terminal, self.history_limit)
                .await
            {
                Ok(summaries) => EngineEvent::HistoryListed(summaries),
                Err(err) => EngineEvent::HistoryFailed {
                    message: err.to_string(),
                },
            },
            EngineCommand::OpenHistory { job_id } => match self.load(&job_id).await {
                Ok((job, results)) => EngineEvent::HistoryOpened { job, results },
                Err(err) => EngineEvent::HistoryOpenFailed {
                    job_id,
                    message: err.to_string(),
                },
            },
            EngineCommand::Subscribe { .. } | EngineCommand::Unsubscribe => return,
        };
        self.sink.emit(event);
    }

    /// Replays the stored state of a job being subscribed to.
    async fn catch_up(&self, job_id: &JobId) {
        match self.load(job_id).await {
            Ok((job, results)) => {
                self.sink.emit(EngineEvent::JobChanged {
                    job_id: job.id,
                    status: job.status,
                    error_message: job.error_message,
                });
                for result in results {
                    self.sink.emit(EngineEvent::ItemChanged(result));
                }
            }
            Err(err) => scan_debug!("No catch-up for job {}: {}", job_id, err),
        }
    }

    async fn load(
        &self,
        job_id: &JobId,
    ) -> Result<(scan_core::BatchJob, Vec<scan_core::ItemResult>), PersistError> {
        let job = self.repository.load_job(job_id, &self.owner_id).await?;
        let results = self.repository.load_results(job_id).await?;
        Ok((job, results))
    }
}
