/// Background job lifecycle and streaming fan-out.
///
/// The coordinator owns the job map and the subscriber list under one async
/// lock. Every mutating operation broadcasts exactly one event; subscribers
/// receive a `JobsState` snapshot first, and each has a bounded queue that
/// drops the subscriber (never blocks the mutator) on overflow.
use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// Per-subscriber queue depth before a slow consumer is dropped.
const SUBSCRIBER_BUFFER: usize = 256;

/// Terminal jobs retained before the oldest are pruned.
const MAX_RETAINED_JOBS: usize = 200;

// ============================================================================
// JOB MODEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Programming,
    Scoring,
    Sync,
    AiGeneration,
    Preview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One display step of a job's structured progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressStep {
    pub id: String,
    pub label: String,
    pub status: StepStatus,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ProgressStep {
    pub fn pending(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            status: StepStatus::Pending,
            detail: None,
        }
    }
}

/// Optional fine-grained progress fields set alongside a progress update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressFields {
    pub best_score: Option<f64>,
    pub current_iteration: Option<u32>,
    pub total_iterations: Option<u32>,
    pub total_content: Option<usize>,
    pub programs_count: Option<usize>,
    pub best_iteration: Option<u32>,
    pub phase: Option<String>,
}

/// A background job owned by the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub title: String,
    /// 0-100.
    pub progress: f64,
    pub current_step: String,
    #[serde(default)]
    pub best_score: Option<f64>,
    #[serde(default)]
    pub current_iteration: Option<u32>,
    #[serde(default)]
    pub total_iterations: Option<u32>,
    #[serde(default)]
    pub total_content: Option<usize>,
    #[serde(default)]
    pub programs_count: Option<usize>,
    #[serde(default)]
    pub best_iteration: Option<u32>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub steps: Vec<ProgressStep>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub profile_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

// ============================================================================
// EVENTS
// ============================================================================

/// Events streamed to subscribers. The snapshot is always the first event a
/// subscriber sees; each mutating operation broadcasts exactly one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    JobsState { jobs: Vec<Job> },
    JobCreated { job: Job },
    JobStarted { job: Job },
    JobProgress { job: Job },
    JobCompleted { job: Job },
    JobFailed { job: Job },
    JobCancelled { job: Job },
}

// ============================================================================
// COORDINATOR
// ============================================================================

#[derive(Default)]
struct CoordinatorState {
    jobs: HashMap<String, Job>,
    subscribers: Vec<mpsc::Sender<JobEvent>>,
}

impl CoordinatorState {
    /// Non-blocking fan-out; subscribers with full or closed queues are
    /// dropped so a stalled consumer can never block a mutator.
    fn broadcast(&mut self, event: JobEvent) {
        self.subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("dropping slow job subscriber (queue full)");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    fn prune_terminal(&mut self) {
        let terminal = self
            .jobs
            .values()
            .filter(|j| j.status.is_terminal())
            .count();
        if terminal <= MAX_RETAINED_JOBS {
            return;
        }
        let mut terminal_jobs: Vec<(String, DateTime<Utc>)> = self
            .jobs
            .values()
            .filter(|j| j.status.is_terminal())
            .map(|j| (j.id.clone(), j.created_at))
            .collect();
        terminal_jobs.sort_by_key(|(_, created)| *created);
        for (id, _) in terminal_jobs
            .into_iter()
            .take(terminal - MAX_RETAINED_JOBS)
        {
            self.jobs.remove(&id);
        }
    }
}

/// Owns background jobs and fans their lifecycle out to streaming
/// subscribers.
#[derive(Default)]
pub struct JobCoordinator {
    state: Mutex<CoordinatorState>,
}

impl JobCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pending job and broadcast `job_created`.
    pub async fn create_job(
        &self,
        kind: JobKind,
        title: &str,
        channel_id: Option<String>,
        profile_id: Option<String>,
        total_iterations: Option<u32>,
    ) -> String {
        let job = Job {
            id: Uuid::new_v4().to_string(),
            kind,
            status: JobStatus::Pending,
            title: title.to_string(),
            progress: 0.0,
            current_step: String::new(),
            best_score: None,
            current_iteration: None,
            total_iterations,
            total_content: None,
            programs_count: None,
            best_iteration: None,
            phase: None,
            steps: Vec::new(),
            channel_id,
            profile_id,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
            result: None,
        };
        let id = job.id.clone();

        let mut state = self.state.lock().await;
        state.jobs.insert(id.clone(), job.clone());
        state.prune_terminal();
        state.broadcast(JobEvent::JobCreated { job });
        tracing::info!(job_id = %id, %title, "created job");
        id
    }

    pub async fn start_job(&self, job_id: &str) {
        let mut state = self.state.lock().await;
        if let Some(job) = state.jobs.get_mut(job_id) {
            job.status = JobStatus::Running;
            job.started_at = Some(Utc::now());
            let job = job.clone();
            state.broadcast(JobEvent::JobStarted { job });
            tracing::info!(%job_id, "started job");
        }
    }

    /// Update progress and broadcast `job_progress`.
    pub async fn update_progress(
        &self,
        job_id: &str,
        progress: f64,
        current_step: &str,
        fields: ProgressFields,
    ) {
        let mut state = self.state.lock().await;
        if let Some(job) = state.jobs.get_mut(job_id) {
            job.progress = progress.clamp(0.0, 100.0);
            if !current_step.is_empty() {
                job.current_step = current_step.to_string();
            }
            if fields.best_score.is_some() {
                job.best_score = fields.best_score;
            }
            if fields.current_iteration.is_some() {
                job.current_iteration = fields.current_iteration;
            }
            if fields.total_iterations.is_some() {
                job.total_iterations = fields.total_iterations;
            }
            if fields.total_content.is_some() {
                job.total_content = fields.total_content;
            }
            if fields.programs_count.is_some() {
                job.programs_count = fields.programs_count;
            }
            if fields.best_iteration.is_some() {
                job.best_iteration = fields.best_iteration;
            }
            if fields.phase.is_some() {
                job.phase = fields.phase;
            }
            let job = job.clone();
            state.broadcast(JobEvent::JobProgress { job });
        }
    }

    /// Replace the job's step list and broadcast `job_progress`.
    pub async fn set_steps(&self, job_id: &str, steps: Vec<ProgressStep>) {
        let mut state = self.state.lock().await;
        if let Some(job) = state.jobs.get_mut(job_id) {
            job.steps = steps;
            let job = job.clone();
            state.broadcast(JobEvent::JobProgress { job });
        }
    }

    /// Update one step's status and broadcast `job_progress`.
    pub async fn update_step_status(
        &self,
        job_id: &str,
        step_id: &str,
        status: StepStatus,
        detail: Option<String>,
    ) {
        let mut state = self.state.lock().await;
        if let Some(job) = state.jobs.get_mut(job_id) {
            if let Some(step) = job.steps.iter_mut().find(|s| s.id == step_id) {
                step.status = status;
                if detail.is_some() {
                    step.detail = detail;
                }
            }
            let job = job.clone();
            state.broadcast(JobEvent::JobProgress { job });
        }
    }

    pub async fn complete_job(
        &self,
        job_id: &str,
        result: Option<serde_json::Value>,
        best_score: Option<f64>,
    ) {
        let mut state = self.state.lock().await;
        if let Some(job) = state.jobs.get_mut(job_id) {
            job.status = JobStatus::Completed;
            job.progress = 100.0;
            job.completed_at = Some(Utc::now());
            if result.is_some() {
                job.result = result;
            }
            if best_score.is_some() {
                job.best_score = best_score;
            }
            let job = job.clone();
            state.broadcast(JobEvent::JobCompleted { job });
            tracing::info!(%job_id, "completed job");
        }
    }

    pub async fn fail_job(&self, job_id: &str, error_message: &str) {
        let mut state = self.state.lock().await;
        if let Some(job) = state.jobs.get_mut(job_id) {
            job.status = JobStatus::Failed;
            job.completed_at = Some(Utc::now());
            job.error_message = Some(error_message.to_string());
            let job = job.clone();
            state.broadcast(JobEvent::JobFailed { job });
            tracing::error!(%job_id, %error_message, "failed job");
        }
    }

    /// Cancel a pending/running job. Returns false when the job is missing
    /// or already terminal.
    pub async fn cancel_job(&self, job_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(job) = state.jobs.get_mut(job_id) else {
            return false;
        };
        if !job.status.is_active() {
            return false;
        }
        job.status = JobStatus::Cancelled;
        job.completed_at = Some(Utc::now());
        let job = job.clone();
        state.broadcast(JobEvent::JobCancelled { job });
        tracing::info!(%job_id, "cancelled job");
        true
    }

    pub async fn get_job(&self, job_id: &str) -> Option<Job> {
        self.state.lock().await.jobs.get(job_id).cloned()
    }

    pub async fn active_jobs(&self) -> Vec<Job> {
        self.state
            .lock()
            .await
            .jobs
            .values()
            .filter(|j| j.status.is_active())
            .cloned()
            .collect()
    }

    pub async fn recent_jobs(&self, limit: usize) -> Vec<Job> {
        let state = self.state.lock().await;
        let mut jobs: Vec<Job> = state.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        jobs
    }

    /// Remove all terminal jobs and broadcast a fresh snapshot.
    pub async fn clear_terminal(&self) -> usize {
        let mut state = self.state.lock().await;
        let before = state.jobs.len();
        state.jobs.retain(|_, job| !job.status.is_terminal());
        let removed = before - state.jobs.len();
        if removed > 0 {
            tracing::info!(removed, "cleared terminal jobs");
        }
        let jobs = state.jobs.values().cloned().collect();
        state.broadcast(JobEvent::JobsState { jobs });
        removed
    }

    /// Remove terminal jobs older than `hours`.
    pub async fn cleanup_older(&self, hours: i64) -> usize {
        let cutoff = Utc::now() - Duration::hours(hours);
        let mut state = self.state.lock().await;
        let before = state.jobs.len();
        state
            .jobs
            .retain(|_, job| match job.completed_at {
                Some(completed) => completed >= cutoff,
                None => true,
            });
        let removed = before - state.jobs.len();
        if removed > 0 {
            tracing::info!(removed, "cleaned up old jobs");
        }
        removed
    }

    /// Subscribe to the event stream. The current `jobs_state` snapshot is
    /// queued before the subscriber is registered, under the same lock the
    /// mutators take, so no later event can be observed ahead of it.
    pub async fn subscribe(&self) -> mpsc::Receiver<JobEvent> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let mut state = self.state.lock().await;
        let snapshot = JobEvent::JobsState {
            jobs: state.jobs.values().cloned().collect(),
        };
        // Capacity is fresh, the send cannot fail
        let _ = tx.try_send(snapshot);
        state.subscribers.push(tx);
        tracing::debug!(
            subscribers = state.subscribers.len(),
            "job subscriber attached"
        );
        rx
    }

    pub async fn subscriber_count(&self) -> usize {
        self.state.lock().await.subscribers.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================
