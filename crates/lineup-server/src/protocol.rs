use serde::{Deserialize, Serialize};

/// Client-to-server commands over the WebSocket.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Liveness probe; answered with a `pong` frame
    Ping,
    /// Cancel a pending or running job
    CancelJob { job_id: String },
    /// Request a fresh jobs_state snapshot
    GetJobs,
}

/// Server-to-client frames that are not job events.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlFrame {
    Pong,
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_shapes() {
        let cmd: Command = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(cmd, Command::Ping));

        let cmd: Command =
            serde_json::from_str(r#"{"type":"cancel_job","job_id":"abc"}"#).unwrap();
        match cmd {
            Command::CancelJob { job_id } => assert_eq!(job_id, "abc"),
            other => panic!("unexpected command: {other:?}"),
        }

        let frame = serde_json::to_value(ControlFrame::Pong).unwrap();
        assert_eq!(frame["type"], "pong");
    }
}
