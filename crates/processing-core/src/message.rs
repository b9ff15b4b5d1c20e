//! Messages exchanged between a caller and a pipeline worker.
//!
//! The serde representation matches the JSON shape used on the wire:
//!
//! ```text
//! caller -> worker   { "type": "process", "audioData": { ... } }
//! worker -> caller   { "type": "progress", "stage": "encoding", "progress": 40 }
//!                    { "type": "status", "message": "Compressing at 128kbps..." }
//!                    { "type": "complete", "data": [...], "size": 1234, "bitrate": 128 }
//!                    { "type": "error", "message": "..." }
//! ```

use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};
use voxtrim_common::error::{VoxtrimError, VoxtrimResult};

/// Decoded audio handed to the pipeline.
///
/// Not `Clone`: the buffers are moved into the worker and the caller
/// gives up access to them.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioData {
    /// First (or only) channel, samples in `[-1.0, 1.0]`.
    pub left_channel: Vec<f32>,

    /// Second channel for stereo input.
    pub right_channel: Option<Vec<f32>>,

    /// Samples per second, shared by both channels.
    pub sample_rate: u32,

    /// Size of the source file in bytes.
    pub original_size: u64,
}

impl AudioData {
    pub fn mono(samples: Vec<f32>, sample_rate: u32, original_size: u64) -> Self {
        Self {
            left_channel: samples,
            right_channel: None,
            sample_rate,
            original_size,
        }
    }

    pub fn stereo(left: Vec<f32>, right: Vec<f32>, sample_rate: u32, original_size: u64) -> Self {
        Self {
            left_channel: left,
            right_channel: Some(right),
            sample_rate,
            original_size,
        }
    }

    /// 1 for mono, 2 for stereo.
    pub fn channel_count(&self) -> u8 {
        if self.right_channel.is_some() {
            2
        } else {
            1
        }
    }

    /// Reject buffers the pipeline cannot work with.
    pub fn validate(&self) -> VoxtrimResult<()> {
        if self.sample_rate == 0 {
            return Err(VoxtrimError::invalid_input("sample rate must be positive"));
        }
        if let Some(right) = &self.right_channel {
            if right.len() != self.left_channel.len() {
                return Err(VoxtrimError::invalid_input(format!(
                    "channel length mismatch: left has {} samples, right has {}",
                    self.left_channel.len(),
                    right.len()
                )));
            }
        }
        let channels = std::iter::once(&self.left_channel).chain(self.right_channel.as_ref());
        for channel in channels {
            if channel.iter().any(|s| !s.is_finite()) {
                return Err(VoxtrimError::invalid_input(
                    "channel contains non-finite samples",
                ));
            }
        }
        Ok(())
    }
}

/// Command sent from the caller to a worker.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessCommand {
    Process {
        #[serde(rename = "audioData")]
        audio_data: AudioData,
    },
}

impl From<AudioData> for ProcessCommand {
    fn from(audio_data: AudioData) -> Self {
        Self::Process { audio_data }
    }
}

/// Pipeline stage a progress value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    Cleaning,
    Encoding,
}

/// Notification sent from a worker to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// Stage progress in percent.
    Progress { stage: ProgressStage, progress: u8 },

    /// Human-readable status line.
    Status { message: String },

    /// Accepted encoding.
    Complete { data: Vec<u8>, size: u64, bitrate: u32 },

    /// Terminal failure.
    Error { message: String },
}

impl WorkerMessage {
    /// `complete` and `error` end an invocation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

/// Destination for worker messages.
///
/// Returns [`VoxtrimError::Abandoned`] once nobody is listening anymore,
/// which lets long-running stages stop early.
pub trait EventSink {
    fn emit(&mut self, message: WorkerMessage) -> VoxtrimResult<()>;

    fn progress(&mut self, stage: ProgressStage, progress: u8) -> VoxtrimResult<()> {
        self.emit(WorkerMessage::Progress { stage, progress })
    }

    fn status(&mut self, message: String) -> VoxtrimResult<()> {
        self.emit(WorkerMessage::Status { message })
    }
}

impl EventSink for Sender<WorkerMessage> {
    fn emit(&mut self, message: WorkerMessage) -> VoxtrimResult<()> {
        self.send(message).map_err(|_| VoxtrimError::Abandoned)
    }
}

/// Collects messages in memory.
impl EventSink for Vec<WorkerMessage> {
    fn emit(&mut self, message: WorkerMessage) -> VoxtrimResult<()> {
        self.push(message);
        Ok(())
    }
}
