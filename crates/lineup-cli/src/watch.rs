/// Live job monitor: subscribes to the server's WebSocket and prints every
/// job event as it arrives.
use anyhow::Result;
use colored::Colorize;
use futures_util::{SinkExt, StreamExt};
use lineup_core::{Job, JobEvent, JobStatus};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

pub async fn run(server: &str) -> Result<()> {
    let ws_url = format!("{}/ws", server.replace("http://", "ws://"));
    let (mut stream, _) = connect_async(&ws_url).await?;
    println!("{} {ws_url}", "Watching".bold());

    while let Some(message) = stream.next().await {
        match message? {
            Message::Text(text) => {
                if let Ok(event) = serde_json::from_str::<JobEvent>(&text) {
                    print_event(&event);
                }
            }
            Message::Ping(payload) => {
                stream.send(Message::Pong(payload)).await?;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    Ok(())
}

fn print_event(event: &JobEvent) {
    match event {
        JobEvent::JobsState { jobs } => {
            println!("{} ({} jobs)", "state".dimmed(), jobs.len());
            for job in jobs {
                print_job_line(job);
            }
        }
        JobEvent::JobCreated { job } => {
            println!("{} {}", "created".cyan(), job.title);
        }
        JobEvent::JobStarted { job } => {
            println!("{} {}", "started".blue(), job.title);
        }
        JobEvent::JobProgress { job } => {
            let best = job
                .best_score
                .map(|s| format!(" best={s:.1}"))
                .unwrap_or_default();
            println!(
                "{} {:>5.1}% {}{best}",
                "progress".dimmed(),
                job.progress,
                job.current_step
            );
        }
        JobEvent::JobCompleted { job } => {
            println!("{} {}", "completed".green().bold(), job.title);
        }
        JobEvent::JobFailed { job } => {
            println!(
                "{} {} - {}",
                "failed".red().bold(),
                job.title,
                job.error_message.as_deref().unwrap_or("unknown error")
            );
        }
        JobEvent::JobCancelled { job } => {
            println!("{} {}", "cancelled".yellow(), job.title);
        }
    }
}

fn print_job_line(job: &Job) {
    let status = match job.status {
        JobStatus::Pending => "pending".dimmed(),
        JobStatus::Running => "running".blue(),
        JobStatus::Completed => "completed".green(),
        JobStatus::Failed => "failed".red(),
        JobStatus::Cancelled => "cancelled".yellow(),
    };
    println!("  [{status}] {} ({:.0}%)", job.title, job.progress);
}
