/// Drives a programming run as a background job: the CPU-bound generator
/// executes on a blocking thread while progress flows through a channel into
/// the coordinator's broadcast.
use std::sync::Arc;

use lineup_core::{
    CancelToken, ContentItem, GenerationParams, Generator, ProgressFields, ProgressStep,
    ProgrammingRequest, Profile, StepStatus,
};
use tokio::sync::mpsc;

use crate::AppState;

/// Launch the generation job; returns immediately, progress is streamed.
pub async fn spawn_programming_job(
    state: Arc<AppState>,
    job_id: String,
    request: ProgrammingRequest,
    profile: Profile,
    pool: Vec<ContentItem>,
) {
    let cancel = CancelToken::new();
    state
        .cancel_tokens
        .write()
        .await
        .insert(job_id.clone(), cancel.clone());

    tokio::spawn(run_job(state, job_id, request, profile, pool, cancel));
}

async fn run_job(
    state: Arc<AppState>,
    job_id: String,
    request: ProgrammingRequest,
    profile: Profile,
    pool: Vec<ContentItem>,
    cancel: CancelToken,
) {
    let coordinator = Arc::clone(&state.coordinator);

    coordinator.start_job(&job_id).await;
    coordinator
        .set_steps(
            &job_id,
            vec![
                ProgressStep::pending("fetch", "Collect content pool"),
                ProgressStep::pending("generate", "Generate candidate schedules"),
                ProgressStep::pending("finalize", "Post-process best schedule"),
            ],
        )
        .await;

    coordinator
        .update_step_status(
            &job_id,
            "fetch",
            StepStatus::Completed,
            Some(format!("{} items", pool.len())),
        )
        .await;
    coordinator
        .update_progress(
            &job_id,
            5.0,
            "content pool ready",
            ProgressFields {
                total_content: Some(pool.len()),
                total_iterations: Some(request.iterations),
                ..ProgressFields::default()
            },
        )
        .await;
    coordinator
        .update_step_status(&job_id, "generate", StepStatus::Running, None)
        .await;

    // Progress updates cross from the blocking generator thread through a
    // channel; the callback itself never awaits
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<lineup_core::ProgressUpdate>();
    let forwarder = {
        let coordinator = Arc::clone(&coordinator);
        let job_id = job_id.clone();
        let total = request.iterations;
        tokio::spawn(async move {
            while let Some(update) = progress_rx.recv().await {
                let pct = 5.0 + (update.iteration as f64 / total.max(1) as f64) * 85.0;
                coordinator
                    .update_progress(
                        &job_id,
                        pct,
                        &format!("iteration {}/{}", update.iteration, total),
                        ProgressFields {
                            best_score: Some(update.best_score),
                            current_iteration: Some(update.iteration),
                            ..ProgressFields::default()
                        },
                    )
                    .await;
            }
        })
    };

    let params = GenerationParams {
        start: request
            .start_datetime
            .unwrap_or_else(|| chrono::Local::now().naive_local()),
        duration_hours: request.duration_hours(),
        iterations: request.iterations,
        randomness: request.randomness,
        seed: request.seed,
        replace_forbidden: request.replace_forbidden,
        improve_best: request.improve_best,
    };

    let generator_cancel = cancel.clone();
    let result = tokio::task::spawn_blocking(move || {
        let generator = Generator::new()
            .with_cancel(generator_cancel)
            .with_progress(Box::new(move |update| {
                let _ = progress_tx.send(update);
            }));
        generator.generate(&pool, &profile, &params)
    })
    .await;

    // The sender was moved into the generator closure, so the forwarder
    // drains remaining updates and exits once generation returns
    let _ = forwarder.await;
    state.cancel_tokens.write().await.remove(&job_id);

    // A run never partially publishes: either a complete result or a failure
    match result {
        Ok(Ok(result)) => {
            if cancel.is_cancelled() {
                // The cancel endpoint already broadcast job_cancelled;
                // discard the partial work
                return;
            }
            coordinator
                .update_step_status(&job_id, "generate", StepStatus::Completed, None)
                .await;
            coordinator
                .update_step_status(&job_id, "finalize", StepStatus::Completed, None)
                .await;
            let best_score = Some(result.total_score);
            let programs_count = result.programs.len();
            coordinator
                .update_progress(
                    &job_id,
                    95.0,
                    "serializing result",
                    ProgressFields {
                        programs_count: Some(programs_count),
                        best_iteration: Some(result.iteration),
                        ..ProgressFields::default()
                    },
                )
                .await;
            match serde_json::to_value(&result) {
                Ok(value) => coordinator.complete_job(&job_id, Some(value), best_score).await,
                Err(e) => {
                    coordinator
                        .fail_job(&job_id, &format!("failed to serialize result: {e}"))
                        .await
                }
            }
        }
        Ok(Err(e)) => {
            if cancel.is_cancelled() {
                return;
            }
            coordinator
                .update_step_status(&job_id, "generate", StepStatus::Failed, None)
                .await;
            coordinator.fail_job(&job_id, &e.to_string()).await;
        }
        Err(join_error) => {
            coordinator
                .fail_job(&job_id, &format!("generation task panicked: {join_error}"))
                .await;
        }
    }

}
