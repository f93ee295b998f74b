use async_trait::async_trait;

use crate::domain::ScheduledProgram;

/// A channel on the downstream virtual-TV manager.
#[derive(Debug, Clone)]
pub struct ChannelRef {
    pub id: String,
    pub name: String,
}

/// Push access to the downstream channel manager.
#[async_trait]
pub trait ChannelSink: Send + Sync {
    /// List available channels
    async fn list_channels(&self) -> anyhow::Result<Vec<ChannelRef>>;

    /// Replace a channel's lineup with the given schedule
    async fn push_schedule(
        &self,
        channel_id: &str,
        programs: &[ScheduledProgram],
    ) -> anyhow::Result<()>;
}
