/// Score a playlist file against a profile and print or save the result.
use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde_json::json;

pub async fn run(
    server: &str,
    profile_id: &str,
    playlist_path: &str,
    csv: bool,
    output: Option<&str>,
) -> Result<()> {
    let playlist_raw = std::fs::read_to_string(playlist_path)
        .with_context(|| format!("failed to read playlist file: {playlist_path}"))?;
    let items: serde_json::Value =
        serde_json::from_str(&playlist_raw).context("playlist file is not valid JSON")?;

    let client = reqwest::Client::new();
    let mut url = format!("{server}/scoring/run");
    if csv {
        url.push_str("?format=csv");
    }

    let response = client
        .post(&url)
        .json(&json!({
            "profile_id": profile_id,
            "items": items,
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        bail!("scoring failed: {body}");
    }

    if csv {
        let body = response.text().await?;
        write_output(output, &body)?;
        return Ok(());
    }

    let body: serde_json::Value = response.json().await?;
    match output {
        Some(_) => write_output(output, &serde_json::to_string_pretty(&body)?)?,
        None => {
            let programs = body["programs"].as_array().map(|p| p.len()).unwrap_or(0);
            println!(
                "{} programs, total {:.1}, average {:.1}",
                programs.to_string().bold(),
                body["total_score"].as_f64().unwrap_or(0.0),
                body["average_score"].as_f64().unwrap_or(0.0),
            );
            if let Some(programs) = body["programs"].as_array() {
                for program in programs {
                    let forbidden = !program["score"]["forbidden_violations"]
                        .as_array()
                        .map(|v| v.is_empty())
                        .unwrap_or(true);
                    let marker = if forbidden { "✗".red() } else { "✓".green() };
                    println!(
                        "  {marker} {:>6.2}  {}",
                        program["score"]["total_score"].as_f64().unwrap_or(0.0),
                        program["content"]["title"].as_str().unwrap_or("?"),
                    );
                }
            }
        }
    }

    Ok(())
}

fn write_output(output: Option<&str>, body: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, body)
                .with_context(|| format!("failed to write output file: {path}"))?;
            println!("Wrote {path}");
        }
        None => println!("{body}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scoring.csv");
        let path_str = path.to_str().unwrap();

        write_output(Some(path_str), "Position,Title\n0,\"A\"").unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Position,Title"));
    }
}
