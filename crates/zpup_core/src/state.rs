use std::collections::{BTreeMap, VecDeque};

use crate::{BatchReport, StopPolicy, TaskId, UploadFailure, UploadResult, UploadTask};

/// Uploads allowed in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPhase {
    #[default]
    Idle,
    Expanding,
    Dispatching,
    Draining,
    Cancelling,
    Done,
}

/// Bookkeeping for one batch run. Only `update` mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchState {
    phase: BatchPhase,
    concurrency: usize,
    pending: VecDeque<UploadTask>,
    in_flight: BTreeMap<TaskId, UploadTask>,
    dispatched: usize,
    stop: Option<StopPolicy>,
    report: BatchReport,
}

impl Default for BatchState {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl BatchState {
    /// `concurrency` is clamped to at least one worker.
    pub fn new(concurrency: usize) -> Self {
        Self {
            phase: BatchPhase::Idle,
            concurrency: concurrency.max(1),
            pending: VecDeque::new(),
            in_flight: BTreeMap::new(),
            dispatched: 0,
            stop: None,
            report: BatchReport::default(),
        }
    }

    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == BatchPhase::Done
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn in_flight(&self) -> impl Iterator<Item = &UploadTask> {
        self.in_flight.values()
    }

    pub fn dispatched_count(&self) -> usize {
        self.dispatched
    }

    pub fn stop_policy(&self) -> Option<StopPolicy> {
        self.stop
    }

    pub fn report(&self) -> &BatchReport {
        &self.report
    }

    pub fn into_report(self) -> BatchReport {
        self.report
    }

    pub(crate) fn begin_expansion(&mut self) {
        self.phase = BatchPhase::Expanding;
    }

    pub(crate) fn load(&mut self, tasks: Vec<UploadTask>, rejected: Vec<UploadFailure>) {
        self.report.failures.extend(rejected);
        self.pending.extend(tasks);
        self.phase = BatchPhase::Dispatching;
        if self.stop.is_some() {
            self.drop_pending();
        }
    }

    /// Moves queued tasks into flight until the concurrency bound is reached.
    pub(crate) fn take_dispatchable(&mut self) -> Vec<UploadTask> {
        if !matches!(self.phase, BatchPhase::Dispatching | BatchPhase::Draining) {
            return Vec::new();
        }
        let mut started = Vec::new();
        while self.in_flight.len() < self.concurrency {
            let Some(task) = self.pending.pop_front() else {
                break;
            };
            self.in_flight.insert(task.id(), task.clone());
            self.dispatched += 1;
            started.push(task);
        }
        if self.pending.is_empty() {
            self.phase = BatchPhase::Draining;
        }
        started
    }

    /// Records a result; returns false for a task that is not in flight.
    pub(crate) fn complete(&mut self, task_id: TaskId, result: UploadResult) -> bool {
        if self.in_flight.remove(&task_id).is_none() {
            return false;
        }
        match result {
            UploadResult::Success { path, share_url } => {
                self.report.uploaded.insert(path, share_url);
            }
            UploadResult::Failure(failure) => self.report.failures.push(failure),
        }
        true
    }

    pub(crate) fn record_stop(&mut self, policy: StopPolicy) {
        // Immediate wins over Finish; a later Finish never downgrades.
        self.stop = match (self.stop, policy) {
            (Some(StopPolicy::Immediate), _) => Some(StopPolicy::Immediate),
            (_, policy) => Some(policy),
        };
    }

    pub(crate) fn drop_pending(&mut self) {
        self.report
            .not_attempted
            .extend(self.pending.drain(..).map(|task| task.path().to_path_buf()));
        self.phase = BatchPhase::Cancelling;
    }

    /// Enters `Done` once nothing is queued or in flight.
    pub(crate) fn settle(&mut self) -> bool {
        let active = matches!(
            self.phase,
            BatchPhase::Dispatching | BatchPhase::Draining | BatchPhase::Cancelling
        );
        if active && self.pending.is_empty() && self.in_flight.is_empty() {
            self.phase = BatchPhase::Done;
            return true;
        }
        false
    }
}
