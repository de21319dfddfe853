use crossbeam_channel::Sender;

use super::job::JobStatus;

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    ItemStarted {
        index: usize,
        input_name: String,
    },
    ItemFinished {
        index: usize,
        input_name: String,
        success: bool,
        error: Option<String>,
    },
    JobFinished {
        job_id: String,
        status: JobStatus,
    },
}

/// Observer for incremental job progress. The runner calls this inline, so
/// implementations should return quickly.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Bridges events onto a channel so a caller on another thread can render
/// progress while the job runs.
pub struct ChannelProgress {
    sender: Sender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(sender: Sender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressReporter for ChannelProgress {
    fn report(&self, event: ProgressEvent) {
        // Progress is best-effort; a departed receiver never fails the job.
        let _ = self.sender.send(event);
    }
}
