//! Background execution: runs a job on its own thread and exposes progress
//! and the final report through channels.

use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Receiver};

use crate::batch::{BatchRunner, ChannelProgress, Job, JobReport, ProgressEvent};
use crate::error::WorkerError;
use crate::service::DocumentService;

/// Spawns the job on a dedicated thread. The caller drains progress events
/// from the handle and collects the report with `wait()`.
pub fn spawn<S>(runner: BatchRunner<S>, job: Job) -> JobHandle
where
    S: DocumentService + 'static,
{
    let (event_tx, event_rx) = unbounded();
    let (result_tx, result_rx) = bounded(1);

    let thread = std::thread::spawn(move || {
        let progress = ChannelProgress::new(event_tx);
        let report = runner.run(job, &progress);
        let _ = result_tx.send(report);
    });

    JobHandle {
        events: event_rx,
        result: result_rx,
        thread,
    }
}

pub struct JobHandle {
    events: Receiver<ProgressEvent>,
    result: Receiver<JobReport>,
    thread: JoinHandle<()>,
}

impl JobHandle {
    /// Next progress event, blocking. Returns `None` once the job thread is
    /// done and the channel has drained.
    pub fn recv_event(&self) -> Option<ProgressEvent> {
        self.events.recv().ok()
    }

    pub fn try_recv_event(&self) -> Option<ProgressEvent> {
        self.events.try_recv().ok()
    }

    /// Joins the job thread and returns its report.
    pub fn wait(self) -> Result<JobReport, WorkerError> {
        let JobHandle {
            events,
            result,
            thread,
        } = self;
        drop(events);

        match thread.join() {
            Ok(()) => result.recv().map_err(|_| WorkerError::ChannelClosed),
            Err(_) => Err(WorkerError::Panicked),
        }
    }
}
