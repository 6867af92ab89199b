use burstpack_core::BurstpackError;
use thiserror::Error;

/// Errors raised by a running pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The stage or backend rejected an operation.
    #[error(transparent)]
    Stage(#[from] BurstpackError),

    /// A pipeline channel closed before the run finished.
    #[error("Pipeline channel '{channel}' closed before the run finished")]
    ChannelClosed {
        /// Which channel closed.
        channel: &'static str,
    },

    /// A pipeline task panicked or was cancelled.
    #[error("Pipeline task '{task}' failed: {cause}")]
    Join {
        /// Which task failed.
        task: &'static str,
        /// Join error message.
        cause: String,
    },
}

impl PipelineError {
    /// Whether this error only reports that a peer task went away.
    pub fn is_channel_closed(&self) -> bool {
        matches!(self, Self::ChannelClosed { .. })
    }
}
