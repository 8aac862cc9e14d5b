use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use zpup_core::{
    decide, update, BatchPhase, BatchReport, BatchState, Effect, ErrorKind, Msg, SizeDecision,
    StopPolicy, TaskId, UploadError, UploadFailure, UploadResult, UploadTask,
};
use zpup_logging::{zpup_debug, zpup_info, zpup_warn};

use crate::{
    build_client, ByteProgress, EngineError, FfmpegSplitter, LandingPageResolver,
    MultipartTransport, ProgressSink, ServerResolver, Splitter, UploadEvent, UploadSettings,
    UploadTransport,
};

/// Result of size checks and splitting: what will be uploaded and what never will.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Expansion {
    pub tasks: Vec<UploadTask>,
    pub rejected: Vec<UploadFailure>,
}

/// Cloneable handle for requesting a stop from outside the run loop.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<Option<StopPolicy>>>,
}

impl StopHandle {
    /// Requests a stop. An immediate request is never downgraded by a later graceful one.
    pub fn stop(&self, policy: StopPolicy) {
        self.tx.send_modify(|current| {
            *current = match (*current, policy) {
                (Some(StopPolicy::Immediate), _) => Some(StopPolicy::Immediate),
                (_, policy) => Some(policy),
            };
        });
    }

    pub fn requested(&self) -> Option<StopPolicy> {
        *self.tx.borrow()
    }
}

/// Owns the shared HTTP client and the upload components for a sequence of batches.
pub struct Orchestrator {
    settings: UploadSettings,
    resolver: Arc<dyn ServerResolver>,
    transport: Arc<dyn UploadTransport>,
    splitter: Arc<dyn Splitter>,
    stop_tx: Arc<watch::Sender<Option<StopPolicy>>>,
    next_task_id: AtomicU64,
}

impl Orchestrator {
    /// Builds the production stack: one reqwest client shared by the landing
    /// page resolver and the multipart transport, plus the ffmpeg splitter.
    pub fn new(settings: UploadSettings) -> Result<Self, EngineError> {
        settings.validate()?;
        let client = build_client(&settings)?;
        let resolver = Arc::new(LandingPageResolver::new(client.clone(), &settings));
        let transport = Arc::new(MultipartTransport::new(client, &settings));
        let splitter = Arc::new(FfmpegSplitter::new(settings.splitter.clone()));
        Self::with_components(settings, resolver, transport, splitter)
    }

    /// Builds an orchestrator around caller-supplied components.
    pub fn with_components(
        settings: UploadSettings,
        resolver: Arc<dyn ServerResolver>,
        transport: Arc<dyn UploadTransport>,
        splitter: Arc<dyn Splitter>,
    ) -> Result<Self, EngineError> {
        settings.validate()?;
        let (stop_tx, _) = watch::channel(None);
        Ok(Self {
            settings,
            resolver,
            transport,
            splitter,
            stop_tx: Arc::new(stop_tx),
            next_task_id: AtomicU64::new(1),
        })
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    /// Expands `files` and uploads the result. An immediate stop while
    /// splitting abandons the expansion and reports every input as not attempted.
    pub async fn upload(
        &mut self,
        files: Vec<PathBuf>,
        sink: Arc<dyn ProgressSink>,
    ) -> BatchReport {
        sink.emit(UploadEvent::PhaseChanged(BatchPhase::Expanding));
        let mut stop_rx = self.stop_tx.subscribe();
        let expansion = tokio::select! {
            expansion = self.expand(&files) => expansion,
            _ = wait_for_immediate(&mut stop_rx) => {
                zpup_warn!("Stopped while preparing files; nothing will be uploaded");
                Expansion {
                    tasks: files.into_iter().map(|path| self.new_task(path, 0)).collect(),
                    rejected: Vec::new(),
                }
            }
        };
        self.run(expansion, sink).await
    }

    /// Applies the size policy to every file, splitting oversized videos.
    pub async fn expand(&self, files: &[PathBuf]) -> Expansion {
        let mut expansion = Expansion::default();
        for path in files {
            let size = match regular_file_size(path).await {
                Ok(size) => size,
                Err(err) => {
                    zpup_warn!("Skipping {}: {}", path.display(), err);
                    expansion.rejected.push(UploadFailure::new(path.clone(), err));
                    continue;
                }
            };

            match decide(path, size, self.settings.size_limit, self.settings.split_videos) {
                SizeDecision::Accept => expansion.tasks.push(self.new_task(path.clone(), size)),
                SizeDecision::Reject(reason) => {
                    zpup_warn!("Rejecting {}: {}", path.display(), reason);
                    expansion.rejected.push(UploadFailure::new(
                        path.clone(),
                        UploadError::new(ErrorKind::TooLarge, reason),
                    ));
                }
                SizeDecision::SplitRequired(part_count) => {
                    zpup_info!("Splitting video {} into {} parts", path.display(), part_count);
                    match self.splitter.split(path, part_count).await {
                        Ok(parts) => self.add_parts(parts, &mut expansion).await,
                        Err(err) => {
                            zpup_warn!("Could not split {}: {}", path.display(), err);
                            expansion.rejected.push(UploadFailure::new(path.clone(), err));
                        }
                    }
                }
            }
        }
        expansion
    }

    /// Split parts are uploaded only if they fit on their own.
    async fn add_parts(&self, parts: Vec<PathBuf>, expansion: &mut Expansion) {
        for part in parts {
            let outcome = match regular_file_size(&part).await {
                Ok(size) => match decide(&part, size, self.settings.size_limit, false) {
                    SizeDecision::Accept => Ok(size),
                    SizeDecision::Reject(reason) => {
                        Err(UploadError::new(ErrorKind::TooLarge, reason))
                    }
                    SizeDecision::SplitRequired(_) => Err(UploadError::new(
                        ErrorKind::TooLarge,
                        "split part still exceeds the size limit",
                    )),
                },
                Err(err) => Err(err),
            };
            match outcome {
                Ok(size) => expansion.tasks.push(self.new_task(part, size)),
                Err(err) => expansion.rejected.push(UploadFailure::new(part, err)),
            }
        }
    }

    fn new_task(&self, path: PathBuf, size: u64) -> UploadTask {
        let id = TaskId(self.next_task_id.fetch_add(1, Ordering::Relaxed));
        UploadTask::new(id, path, size)
    }

    /// Dispatches `expansion` over the worker pool and collects every result.
    pub async fn run(&mut self, expansion: Expansion, sink: Arc<dyn ProgressSink>) -> BatchReport {
        let mut stop_rx = self.stop_tx.subscribe();
        let mut batch = BatchRun::new(self, sink);

        batch.apply(Msg::ExpansionStarted);
        let early_stop = *stop_rx.borrow_and_update();
        if let Some(policy) = early_stop {
            batch.apply(Msg::StopRequested(policy));
        }
        zpup_info!(
            "Uploading {} files ({} rejected before upload)",
            expansion.tasks.len(),
            expansion.rejected.len()
        );
        batch.apply(Msg::FilesExpanded {
            tasks: expansion.tasks,
            rejected: expansion.rejected,
        });

        let mut stop_open = true;
        while !batch.state.is_done() {
            tokio::select! {
                changed = stop_rx.changed(), if stop_open => match changed {
                    Ok(()) => {
                        let requested = *stop_rx.borrow_and_update();
                        if let Some(policy) = requested {
                            zpup_warn!("Stop requested ({:?})", policy);
                            batch.apply(Msg::StopRequested(policy));
                        }
                    }
                    Err(_) => stop_open = false,
                },
                joined = batch.tasks.join_next_with_id(), if !batch.tasks.is_empty() => {
                    if let Some(joined) = joined {
                        batch.collect(joined);
                    }
                }
                else => break,
            }
        }

        let report = batch.finish().await;
        self.stop_tx.send_replace(None);
        report
    }

    /// Releases the components and, with them, the shared client's connections.
    pub fn shutdown(self) {
        zpup_debug!("Shutting down orchestrator");
        drop(self);
    }
}

type TaskOutput = (TaskId, UploadResult);

/// Per-run state: the batch state machine plus the tasks it has dispatched.
struct BatchRun {
    state: BatchState,
    last_phase: BatchPhase,
    tasks: JoinSet<TaskOutput>,
    spawned: HashMap<tokio::task::Id, (TaskId, PathBuf)>,
    cancel: CancellationToken,
    sink: Arc<dyn ProgressSink>,
    resolver: Arc<dyn ServerResolver>,
    transport: Arc<dyn UploadTransport>,
    retries: u32,
    retry_delay: Duration,
}

impl BatchRun {
    fn new(orchestrator: &Orchestrator, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            state: BatchState::new(orchestrator.settings.concurrency),
            last_phase: BatchPhase::Idle,
            tasks: JoinSet::new(),
            spawned: HashMap::new(),
            cancel: CancellationToken::new(),
            sink,
            resolver: orchestrator.resolver.clone(),
            transport: orchestrator.transport.clone(),
            retries: orchestrator.settings.retries,
            retry_delay: orchestrator.settings.retry_delay,
        }
    }

    fn apply(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;

        let phase = self.state.phase();
        if phase != self.last_phase {
            zpup_debug!("Batch phase {:?} -> {:?}", self.last_phase, phase);
            // Expanding is announced by the caller before the (slow) expansion runs.
            if phase != BatchPhase::Expanding {
                self.sink.emit(UploadEvent::PhaseChanged(phase));
            }
            self.last_phase = phase;
        }

        for effect in effects {
            match effect {
                Effect::Dispatch(task) => self.spawn(task),
                Effect::AbortInFlight => {
                    zpup_warn!("Aborting {} in-flight uploads", self.state.in_flight_count());
                    self.cancel.cancel();
                }
                Effect::Teardown => zpup_debug!("Batch settled; tearing down worker pool"),
            }
        }
    }

    fn spawn(&mut self, task: UploadTask) {
        self.sink.emit(UploadEvent::TaskStarted {
            task_id: task.id(),
            display_name: task.display_name().to_string(),
            total_bytes: task.size(),
        });
        zpup_debug!("Dispatching {} {}", task.id(), task.path().display());

        let key = (task.id(), task.path().to_path_buf());
        let worker = TaskWorker {
            resolver: self.resolver.clone(),
            transport: self.transport.clone(),
            sink: self.sink.clone(),
            retries: self.retries,
            retry_delay: self.retry_delay,
        };
        let cancel = self.cancel.clone();
        let handle = self.tasks.spawn(async move { worker.run(task, cancel).await });
        self.spawned.insert(handle.id(), key);
    }

    fn collect(&mut self, joined: Result<(tokio::task::Id, TaskOutput), tokio::task::JoinError>) {
        let (task_id, result) = match joined {
            Ok((id, outcome)) => {
                self.spawned.remove(&id);
                outcome
            }
            Err(err) => {
                let Some((task_id, path)) = self.spawned.remove(&err.id()) else {
                    zpup_warn!("Result for unknown upload task: {}", err);
                    return;
                };
                let kind = if err.is_cancelled() {
                    ErrorKind::Cancelled
                } else {
                    ErrorKind::TransportError
                };
                let error = UploadError::new(kind, format!("upload task ended abnormally: {err}"));
                (task_id, UploadResult::Failure(UploadFailure::new(path, error)))
            }
        };

        match &result {
            UploadResult::Success { path, share_url } => {
                zpup_info!("{} uploaded to {}", path.display(), share_url);
            }
            UploadResult::Failure(failure) => {
                zpup_warn!(
                    "{} failed ({}): {}",
                    failure.path.display(),
                    failure.kind,
                    failure.message
                );
            }
        }
        self.sink.emit(UploadEvent::TaskFinished {
            task_id,
            result: result.clone(),
        });
        self.apply(Msg::TaskFinished { task_id, result });
    }

    /// Runs on every exit from the loop, including one that never settled.
    async fn finish(mut self) -> BatchReport {
        self.cancel.cancel();
        self.tasks.shutdown().await;
        let report = self.state.into_report();
        zpup_info!(
            "Batch done: {} uploaded, {} failed, {} not attempted",
            report.uploaded.len(),
            report.failures.len(),
            report.not_attempted.len()
        );
        report
    }
}

/// Everything one spawned upload needs, moved into the task.
struct TaskWorker {
    resolver: Arc<dyn ServerResolver>,
    transport: Arc<dyn UploadTransport>,
    sink: Arc<dyn ProgressSink>,
    retries: u32,
    retry_delay: Duration,
}

impl TaskWorker {
    async fn run(self, task: UploadTask, cancel: CancellationToken) -> TaskOutput {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(UploadError::new(
                ErrorKind::Cancelled,
                "stopped before the upload finished",
            )),
            outcome = self.attempt_with_retries(&task) => outcome,
        };
        (task.id(), UploadResult::from_outcome(task.path().to_path_buf(), outcome))
    }

    async fn attempt_with_retries(&self, task: &UploadTask) -> Result<String, UploadError> {
        let mut attempt = 1;
        loop {
            match self.attempt(task).await {
                Ok(url) => return Ok(url),
                Err(err) if err.kind.is_retryable() && attempt <= self.retries => {
                    zpup_warn!(
                        "{} attempt {} failed, retrying: {}",
                        task.display_name(),
                        attempt,
                        err
                    );
                    self.sink.emit(UploadEvent::Retrying {
                        task_id: task.id(),
                        attempt: attempt + 1,
                        reason: err.to_string(),
                    });
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One resolve-then-upload round; the server is resolved again on every attempt.
    async fn attempt(&self, task: &UploadTask) -> Result<String, UploadError> {
        let server = self.resolver.resolve().await?;
        let progress = progress_reporter(self.sink.clone(), task);
        self.transport.upload(task.path(), &server, progress).await
    }
}

fn progress_reporter(sink: Arc<dyn ProgressSink>, task: &UploadTask) -> ByteProgress {
    let task_id = task.id();
    let total_bytes = task.size();
    Arc::new(move |bytes_sent| {
        sink.emit(UploadEvent::Progress {
            task_id,
            bytes_sent,
            total_bytes,
        })
    })
}

async fn regular_file_size(path: &Path) -> Result<u64, UploadError> {
    let meta = tokio::fs::metadata(path).await.map_err(|err| {
        UploadError::new(ErrorKind::FileUnreadable, format!("{}: {err}", path.display()))
    })?;
    if !meta.is_file() {
        return Err(UploadError::new(
            ErrorKind::FileUnreadable,
            format!("{} is not a regular file", path.display()),
        ));
    }
    Ok(meta.len())
}

async fn wait_for_immediate(rx: &mut watch::Receiver<Option<StopPolicy>>) {
    if rx
        .wait_for(|policy| *policy == Some(StopPolicy::Immediate))
        .await
        .is_err()
    {
        std::future::pending::<()>().await;
    }
}
