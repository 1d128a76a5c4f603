use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

/// Status reported by a running job.
///
/// Every job ends with exactly one of the terminal events: [`JobEvent::Completed`],
/// [`JobEvent::Failed`] or [`JobEvent::Cancelled`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JobEvent {
    Progress { percentage: f32, status: String },
    Completed { status: String },
    Failed { reason: String },
    Cancelled,
}

impl JobEvent {
    pub fn progress<S: Into<String>>(percentage: f32, status: S) -> Self {
        Self::Progress {
            percentage,
            status: status.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

/// Receives job events synchronously at fixed points of the pipeline.
///
/// Relaying events elsewhere is up to the implementation; it must not fail when
/// nobody is listening.
pub trait JobObserver: Send + Sync {
    fn notify(&self, event: JobEvent);
}

impl JobObserver for () {
    fn notify(&self, _event: JobEvent) {}
}

impl<O> JobObserver for Arc<O>
where
    O: JobObserver + ?Sized,
{
    fn notify(&self, event: JobEvent) {
        self.as_ref().notify(event)
    }
}

impl<O> JobObserver for &O
where
    O: JobObserver + ?Sized,
{
    fn notify(&self, event: JobEvent) {
        (*self).notify(event)
    }
}

/// Writes every event to the log.
pub struct TracingObserver;

impl JobObserver for TracingObserver {
    fn notify(&self, event: JobEvent) {
        match event {
            JobEvent::Progress { percentage, status } => {
                tracing::info!("[{percentage:>5.1}%] {status}")
            }
            JobEvent::Completed { status } => tracing::info!("{status}"),
            JobEvent::Failed { reason } => tracing::error!("Download failed: {reason}"),
            JobEvent::Cancelled => tracing::warn!("Download cancelled"),
        }
    }
}

/// Forwards events into an unbounded channel. Events sent after the receiver
/// is dropped are discarded.
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<JobEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl JobObserver for ChannelObserver {
    fn notify(&self, event: JobEvent) {
        let _ = self.sender.send(event);
    }
}
