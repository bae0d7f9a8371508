//! Worker pool and submission surface.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use uuid::Uuid;

use zkserve_core::ModelId;
use zkserve_pipeline::ProofPipeline;

use crate::job::{Job, JobError, JobKind, JobOutput};

/// Orchestrator sizing.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Number of worker tasks consuming the queue.
    pub workers: usize,
    /// Bound of the shared job queue; submissions past it apply
    /// backpressure rather than growing without limit.
    pub queue_depth: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_depth: 64,
        }
    }
}

/// A submitted job's reply envelope.
struct QueuedJob {
    job_id: Uuid,
    job: Job,
    reply: oneshot::Sender<Result<JobOutput, JobError>>,
}

/// Handle to a submitted job. Await the result with [`JobHandle::wait`].
pub struct JobHandle {
    job_id: Uuid,
    rx: oneshot::Receiver<Result<JobOutput, JobError>>,
}

impl JobHandle {
    /// The job's identifier, for logs and timeout reports.
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Block until the job reports a result, or until `timeout` elapses.
    ///
    /// On timeout the job is *not* cancelled: it runs to completion in the
    /// background and the worker logs the discarded result. The handle is
    /// consumed either way, so a result can never be claimed twice.
    pub async fn wait(self, timeout: Duration) -> Result<JobOutput, JobError> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(JobError::WorkerLost),
            Err(_) => Err(JobError::TimedOut {
                job_id: self.job_id,
                waited: timeout,
            }),
        }
    }
}

/// Per-model job locks. Jobs for the same model serialize on the model's
/// async mutex; the table itself is guarded by a short-lived sync lock.
#[derive(Default)]
struct ModelLocks {
    table: parking_lot::Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ModelLocks {
    fn for_model(&self, model: &ModelId) -> Arc<AsyncMutex<()>> {
        let mut table = self.table.lock();
        table
            .entry(model.as_str().to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

/// The job orchestrator: submission surface plus its worker pool.
///
/// Dropping the orchestrator closes the queue; workers finish their current
/// jobs and exit.
#[derive(Clone)]
pub struct Orchestrator {
    tx: mpsc::Sender<QueuedJob>,
}

impl Orchestrator {
    /// Spawn the worker pool over a pipeline.
    pub fn new(pipeline: Arc<ProofPipeline>, config: OrchestratorConfig) -> Self {
        let (tx, rx) = mpsc::channel::<QueuedJob>(config.queue_depth.max(1));
        let rx = Arc::new(AsyncMutex::new(rx));
        let locks = Arc::new(ModelLocks::default());

        for worker in 0..config.workers.max(1) {
            let rx = Arc::clone(&rx);
            let pipeline = Arc::clone(&pipeline);
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                worker_loop(worker, rx, pipeline, locks).await;
            });
        }

        Self { tx }
    }

    /// Enqueue a job, returning a handle to await its result.
    ///
    /// # Errors
    ///
    /// [`JobError::QueueClosed`] if the orchestrator is shutting down.
    pub async fn submit(&self, job: Job) -> Result<JobHandle, JobError> {
        let job_id = Uuid::new_v4();
        let (reply, rx) = oneshot::channel();
        tracing::debug!(%job_id, model = %job.model, kind = job.kind.name(), "job submitted");
        self.tx
            .send(QueuedJob { job_id, job, reply })
            .await
            .map_err(|_| JobError::QueueClosed)?;
        Ok(JobHandle { job_id, rx })
    }

    /// Submit a job and block on its result — the request handler's
    /// synchronous-looking contract.
    pub async fn run(&self, job: Job, timeout: Duration) -> Result<JobOutput, JobError> {
        self.submit(job).await?.wait(timeout).await
    }
}

/// One worker: pull a job, serialize on its model, execute on the blocking
/// pool, report back. Job failures never kill the worker.
async fn worker_loop(
    worker: usize,
    rx: Arc<AsyncMutex<mpsc::Receiver<QueuedJob>>>,
    pipeline: Arc<ProofPipeline>,
    locks: Arc<ModelLocks>,
) {
    loop {
        // Hold the receiver lock only while pulling one job.
        let queued = { rx.lock().await.recv().await };
        let Some(QueuedJob { job_id, job, reply }) = queued else {
            tracing::debug!(worker, "queue closed, worker exiting");
            break;
        };

        let model_lock = locks.for_model(&job.model);
        let _guard = model_lock.lock().await;

        let kind = job.kind.name();
        let model = job.model.clone();
        let result = execute(Arc::clone(&pipeline), job).await;

        match &result {
            Ok(_) => tracing::debug!(worker, %job_id, %model, kind, "job completed"),
            Err(e) => tracing::warn!(worker, %job_id, %model, kind, error = %e, "job failed"),
        }

        if reply.send(result).is_err() {
            // The caller's wait timed out and the handle is gone. The work
            // is already applied; only the report is dropped.
            tracing::warn!(worker, %job_id, %model, kind, "caller gone, result discarded");
        }
    }
}

/// Run one job's stage logic on the blocking pool.
async fn execute(pipeline: Arc<ProofPipeline>, job: Job) -> Result<JobOutput, JobError> {
    let join = tokio::task::spawn_blocking(move || execute_blocking(&pipeline, job)).await;
    match join {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "stage task did not complete");
            Err(JobError::WorkerLost)
        }
    }
}

fn execute_blocking(pipeline: &ProofPipeline, job: Job) -> Result<JobOutput, JobError> {
    let model = job.model;
    match job.kind {
        JobKind::Register { blob } => {
            pipeline.register(&model, &blob)?;
            Ok(JobOutput::Registered)
        }
        JobKind::Compile => {
            pipeline.compile(&model)?;
            Ok(JobOutput::Compiled)
        }
        JobKind::Setup => {
            pipeline.setup(&model)?;
            Ok(JobOutput::KeysReady)
        }
        JobKind::GenWitness { request } => {
            pipeline.generate_witness(&model, &request)?;
            Ok(JobOutput::WitnessReady)
        }
        JobKind::Prove { user, request } => {
            let summary = pipeline.prove(&user, &model, &request)?;
            Ok(JobOutput::Proved(summary))
        }
        JobKind::Verify {
            request,
            contract_address,
            rpc_url,
        } => {
            let verified = pipeline.verify(&model, &request, &contract_address, &rpc_url)?;
            Ok(JobOutput::Verified(verified))
        }
        JobKind::PrepareVoiceInput { audio, address } => {
            let tensor = pipeline.voice_input(&audio, &address)?;
            Ok(JobOutput::VoiceInput(tensor))
        }
    }
}
