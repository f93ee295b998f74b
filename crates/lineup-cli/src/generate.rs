/// Start a programming run, then follow its job over the WebSocket until a
/// terminal event arrives.
use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use colored::Colorize;
use futures_util::StreamExt;
use lineup_core::JobEvent;
use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

pub struct GenerateArgs {
    pub channel_id: String,
    pub profile_id: String,
    pub iterations: u32,
    pub randomness: f64,
    pub days: u32,
    pub start: Option<String>,
    pub seed: Option<u64>,
    pub replace_forbidden: bool,
    pub improve_best: bool,
}

pub async fn run(server: &str, args: GenerateArgs) -> Result<()> {
    let start: Option<NaiveDateTime> = match &args.start {
        Some(raw) => Some(
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
                .context("start must be ISO 8601, e.g. 2025-01-10T20:00:00")?,
        ),
        None => None,
    };

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{server}/programming/run"))
        .json(&json!({
            "channel_id": args.channel_id,
            "profile_id": args.profile_id,
            "iterations": args.iterations,
            "randomness": args.randomness,
            "duration_days": args.days,
            "start_datetime": start,
            "seed": args.seed,
            "replace_forbidden": args.replace_forbidden,
            "improve_best": args.improve_best,
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        bail!("server rejected the run: {body}");
    }

    let body: serde_json::Value = response.json().await?;
    let job_id = body["job_id"]
        .as_str()
        .context("missing job_id in response")?
        .to_string();
    println!("{} {job_id}", "Started job".green().bold());

    follow_job(server, &job_id).await
}

/// Subscribe to the job stream and print progress until the job finishes.
async fn follow_job(server: &str, job_id: &str) -> Result<()> {
    let ws_url = format!("{}/ws", server.replace("http://", "ws://"));
    let (mut stream, _) = connect_async(&ws_url).await?;

    while let Some(message) = stream.next().await {
        let message = message?;
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(event) = serde_json::from_str::<JobEvent>(&text) else {
            continue;
        };

        match event {
            JobEvent::JobProgress { job } if job.id == job_id => {
                let step = if job.current_step.is_empty() {
                    "working".to_string()
                } else {
                    job.current_step.clone()
                };
                let best = job
                    .best_score
                    .map(|s| format!(" best={s:.1}"))
                    .unwrap_or_default();
                println!("  {:>5.1}% {step}{best}", job.progress);
            }
            JobEvent::JobCompleted { job } if job.id == job_id => {
                println!("{}", "Completed".green().bold());
                if let Some(result) = &job.result {
                    print_summary(result);
                }
                return Ok(());
            }
            JobEvent::JobFailed { job } if job.id == job_id => {
                bail!(
                    "job failed: {}",
                    job.error_message.unwrap_or_else(|| "unknown error".into())
                );
            }
            JobEvent::JobCancelled { job } if job.id == job_id => {
                println!("{}", "Cancelled".yellow().bold());
                return Ok(());
            }
            _ => {}
        }
    }

    bail!("server closed the stream before the job finished")
}

fn print_summary(result: &serde_json::Value) {
    let programs = result["programs"].as_array().map(|p| p.len()).unwrap_or(0);
    let total = result["total_score"].as_f64().unwrap_or(0.0);
    let average = result["average_score"].as_f64().unwrap_or(0.0);
    let iteration = result["iteration"].as_u64().unwrap_or(0);
    let forbidden = result["forbidden_count"].as_u64().unwrap_or(0);

    println!(
        "  {} programs, total {:.1}, average {:.1} (iteration {})",
        programs.to_string().bold(),
        total,
        average,
        iteration
    );
    if forbidden > 0 {
        println!("  {} {forbidden}", "forbidden programs:".red());
    }
    if result["is_improved"].as_bool().unwrap_or(false) {
        println!(
            "  improved {} programs over iteration {}",
            result["improved_count"].as_u64().unwrap_or(0),
            result["original_best_iteration"].as_u64().unwrap_or(0)
        );
    }
    if result["is_optimized"].as_bool().unwrap_or(false) {
        println!(
            "  replaced {} forbidden programs",
            result["replaced_count"].as_u64().unwrap_or(0)
        );
    }
}
