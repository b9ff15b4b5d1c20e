//! Batch sessions: compress and transcribe several files, one at a time.
//!
//! Each file gets its own pipeline worker. A failure at any step is
//! recorded against that file and the session moves on to the next one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use voxtrim_common::config::{PipelineConfig, TranscriptionConfig};
use voxtrim_common::error::{VoxtrimError, VoxtrimResult};
use voxtrim_processing_core::{Pipeline, PipelineWorker, WorkerMessage};

use crate::decode::decode_file;
use crate::transcription::{Transcriber, Transcript};

/// Receives every worker message, tagged with the file's queue index.
pub type EventCallback = Arc<dyn Fn(usize, &WorkerMessage) + Send + Sync>;

/// Builds a fresh pipeline for each file.
pub type PipelineFactory = Arc<dyn Fn() -> VoxtrimResult<Pipeline> + Send + Sync>;

/// What happened to one queued file.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub file_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Transcript>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Accepted bitrate, present once compression succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,

    /// Compressed size in bytes, present once compression succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    pub processed_at: DateTime<Utc>,
}

impl FileOutcome {
    fn new(file_name: String) -> Self {
        Self {
            file_name,
            transcript: None,
            error: None,
            bitrate_kbps: None,
            size_bytes: None,
            processed_at: Utc::now(),
        }
    }

    fn failed(mut self, error: VoxtrimError) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn is_success(&self) -> bool {
        self.transcript.is_some()
    }
}

/// Compressed output of one file.
struct Compressed {
    data: Vec<u8>,
    size: u64,
    bitrate: u32,
}

/// A queue of files processed sequentially.
pub struct BatchSession {
    files: Vec<PathBuf>,
    max_files: usize,
    pipeline: PipelineFactory,
    on_event: Option<EventCallback>,
}

impl BatchSession {
    /// Session that encodes through LAME with `pipeline_config`.
    pub fn new(pipeline_config: PipelineConfig, transcription: &TranscriptionConfig) -> Self {
        let pipeline: PipelineFactory =
            Arc::new(move || Pipeline::with_lame(pipeline_config.clone()));
        Self {
            files: Vec::new(),
            max_files: transcription.max_files,
            pipeline,
            on_event: None,
        }
    }

    /// Swap the pipeline used for each file.
    pub fn with_pipeline_factory(mut self, pipeline: PipelineFactory) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Observe worker messages while the session runs.
    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    /// Queue files, keeping the earliest ones when the session is full.
    ///
    /// Returns how many files were dropped.
    pub fn add_files<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut dropped = 0;
        for path in paths {
            if self.files.len() < self.max_files {
                self.files.push(path.into());
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::warn!(
                dropped,
                max_files = self.max_files,
                "Batch is full; extra files ignored"
            );
        }
        dropped
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Process every queued file in order.
    pub async fn run(&self, transcriber: &dyn Transcriber) -> Vec<FileOutcome> {
        let mut outcomes = Vec::with_capacity(self.files.len());

        for (index, path) in self.files.iter().enumerate() {
            let outcome = self.process_file(index, path, transcriber).await;
            match &outcome.error {
                Some(error) => {
                    tracing::warn!(file = %outcome.file_name, error = %error, "File failed")
                }
                None => tracing::info!(file = %outcome.file_name, "File transcribed"),
            }
            outcomes.push(outcome);
        }

        outcomes
    }

    async fn process_file(
        &self,
        index: usize,
        path: &Path,
        transcriber: &dyn Transcriber,
    ) -> FileOutcome {
        let file_name = display_name(path);
        let mut outcome = FileOutcome::new(file_name.clone());

        let compressed = match self.compress(index, path).await {
            Ok(compressed) => compressed,
            Err(e) => return outcome.failed(e),
        };
        outcome.bitrate_kbps = Some(compressed.bitrate);
        outcome.size_bytes = Some(compressed.size);

        tracing::debug!(backend = transcriber.name(), file = %file_name, "Transcribing");
        match transcriber.transcribe(compressed.data, &file_name).await {
            Ok(transcript) => {
                outcome.transcript = Some(transcript);
                outcome.processed_at = Utc::now();
                outcome
            }
            Err(e) => outcome.failed(e),
        }
    }

    /// Decode and compress on a blocking thread, waiting for the worker's
    /// terminal message.
    async fn compress(&self, index: usize, path: &Path) -> VoxtrimResult<Compressed> {
        let path = path.to_path_buf();
        let make_pipeline = Arc::clone(&self.pipeline);
        let on_event = self.on_event.clone();

        let terminal = tokio::task::spawn_blocking(move || -> VoxtrimResult<WorkerMessage> {
            let decoded = decode_file(&path)?;
            let original_size = std::fs::metadata(&path)?.len();
            let worker =
                PipelineWorker::spawn(make_pipeline()?, decoded.into_audio_data(original_size).into())?;

            let terminal = worker.wait(|message| {
                if let Some(callback) = &on_event {
                    callback(index, message);
                }
            });
            if let Some(callback) = &on_event {
                callback(index, &terminal);
            }
            Ok(terminal)
        })
        .await
        .map_err(|e| VoxtrimError::Other(e.into()))??;

        match terminal {
            WorkerMessage::Complete {
                data,
                size,
                bitrate,
            } => Ok(Compressed {
                data,
                size,
                bitrate,
            }),
            WorkerMessage::Error { message } => Err(VoxtrimError::Other(anyhow::anyhow!(message))),
            other => Err(VoxtrimError::Other(anyhow::anyhow!(
                "unexpected terminal message: {other:?}"
            ))),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
