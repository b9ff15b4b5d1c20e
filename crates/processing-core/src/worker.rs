//! Background execution context for one pipeline invocation.
//!
//! Each invocation gets its own named thread. The caller hands the
//! [`ProcessCommand`] over by value and afterwards only reads messages;
//! there is no shared mutable state between the two sides.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use voxtrim_common::error::VoxtrimResult;

use crate::message::{ProcessCommand, WorkerMessage};
use crate::pipeline::Pipeline;

/// Handle to a running pipeline thread.
///
/// Yields progress and status messages followed by exactly one terminal
/// message. There is no cancellation: [`PipelineWorker::terminate`]
/// detaches the thread and discards whatever it would still report.
pub struct PipelineWorker {
    receiver: Receiver<WorkerMessage>,
    handle: Option<JoinHandle<()>>,
    finished: bool,
}

impl PipelineWorker {
    /// Start processing `command` on a fresh thread.
    pub fn spawn(pipeline: Pipeline, command: ProcessCommand) -> VoxtrimResult<Self> {
        let (tx, receiver) = mpsc::channel::<WorkerMessage>();
        let ProcessCommand::Process { audio_data } = command;

        let handle = thread::Builder::new()
            .name("voxtrim-pipeline".to_string())
            .spawn(move || {
                let mut tx = tx;
                if pipeline.process(audio_data, &mut tx).is_err() {
                    tracing::debug!("Pipeline worker exiting without a listener");
                }
            })?;

        Ok(Self {
            receiver,
            handle: Some(handle),
            finished: false,
        })
    }

    /// Block until the next message. `None` once the terminal message
    /// has been delivered.
    pub fn recv(&mut self) -> Option<WorkerMessage> {
        if self.finished {
            return None;
        }
        let message = match self.receiver.recv() {
            Ok(message) => message,
            Err(_) => lost_worker_message(),
        };
        self.observe(message)
    }

    /// Like [`recv`](Self::recv) but gives up after `timeout`.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<WorkerMessage> {
        if self.finished {
            return None;
        }
        let message = match self.receiver.recv_timeout(timeout) {
            Ok(message) => message,
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => lost_worker_message(),
        };
        self.observe(message)
    }

    /// Next message if one is already waiting.
    pub fn try_recv(&mut self) -> Option<WorkerMessage> {
        if self.finished {
            return None;
        }
        let message = match self.receiver.try_recv() {
            Ok(message) => message,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => lost_worker_message(),
        };
        self.observe(message)
    }

    /// Drain messages into `on_event` and return the terminal one.
    pub fn wait(mut self, mut on_event: impl FnMut(&WorkerMessage)) -> WorkerMessage {
        while let Some(message) = self.recv() {
            if message.is_terminal() {
                return message;
            }
            on_event(&message);
        }
        lost_worker_message()
    }

    /// Whether the terminal message has been received.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Abandon the invocation without waiting for it.
    ///
    /// The thread keeps running until its next report notices the closed
    /// channel, then exits without a terminal message.
    pub fn terminate(mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!(
                thread = ?handle.thread().name(),
                "Terminating pipeline worker"
            );
        }
    }

    fn observe(&mut self, message: WorkerMessage) -> Option<WorkerMessage> {
        if message.is_terminal() {
            self.finished = true;
            if let Some(handle) = self.handle.take() {
                // The worker returns right after sending its terminal message.
                let _ = handle.join();
            }
        }
        Some(message)
    }
}

impl Iterator for PipelineWorker {
    type Item = WorkerMessage;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

fn lost_worker_message() -> WorkerMessage {
    WorkerMessage::Error {
        message: "Audio processing failed: worker exited without a result".to_string(),
    }
}
