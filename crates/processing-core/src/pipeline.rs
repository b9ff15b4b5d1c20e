//! Pipeline coordinator: conditioning followed by the bitrate search.

use std::panic::{self, AssertUnwindSafe};

use voxtrim_common::config::PipelineConfig;
use voxtrim_common::error::{VoxtrimError, VoxtrimResult};

use crate::bitrate::{BitrateSearch, EncodingAttempt};
use crate::conditioner::WaveformConditioner;
use crate::encoder::EncoderFactory;
use crate::lame::LameEncoderFactory;
use crate::message::{AudioData, EventSink, ProgressStage, WorkerMessage};
use crate::pcm::to_fixed_point;

/// Runs one invocation from raw channels to a terminal message.
pub struct Pipeline {
    conditioner: WaveformConditioner,
    search: BitrateSearch,
    factory: Box<dyn EncoderFactory>,
}

impl Pipeline {
    /// Create a pipeline with a custom encoder backend.
    pub fn new(config: PipelineConfig, factory: Box<dyn EncoderFactory>) -> VoxtrimResult<Self> {
        config.validate()?;
        Ok(Self {
            conditioner: WaveformConditioner::from_config(&config),
            search: BitrateSearch::new(config),
            factory,
        })
    }

    /// Create a pipeline that encodes MP3 through LAME.
    pub fn with_lame(config: PipelineConfig) -> VoxtrimResult<Self> {
        Self::new(config, Box::new(LameEncoderFactory))
    }

    /// Process `audio`, reporting everything through `sink`.
    ///
    /// Exactly one terminal message (`complete` or `error`) is emitted,
    /// always last. Stage errors and panics become `error` messages. The
    /// only error returned is [`VoxtrimError::Abandoned`], when `sink`
    /// has nobody listening anymore.
    pub fn process(&self, audio: AudioData, sink: &mut dyn EventSink) -> VoxtrimResult<()> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run(audio, &mut *sink)))
            .unwrap_or_else(|payload| Err(VoxtrimError::encode(panic_message(payload.as_ref()))));

        let terminal = match outcome {
            Ok(attempt) => WorkerMessage::Complete {
                size: attempt.size(),
                bitrate: attempt.bitrate_kbps,
                data: attempt.data,
            },
            Err(e) if e.is_abandoned() => {
                tracing::debug!("Pipeline abandoned; dropping remaining work");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Pipeline failed");
                WorkerMessage::Error {
                    message: e.to_string(),
                }
            }
        };

        sink.emit(terminal)
    }

    fn run(&self, audio: AudioData, sink: &mut dyn EventSink) -> VoxtrimResult<EncodingAttempt> {
        audio.validate()?;
        let channels = audio.channel_count();

        let AudioData {
            left_channel,
            right_channel,
            sample_rate,
            original_size,
        } = audio;

        tracing::info!(
            channels,
            samples = left_channel.len(),
            sample_rate,
            original_size,
            "Processing audio"
        );

        sink.progress(ProgressStage::Cleaning, 0)?;
        let left = self.conditioner.condition(left_channel);
        let right = right_channel.map(|channel| self.conditioner.condition(channel));
        sink.progress(ProgressStage::Cleaning, 100)?;

        let left = to_fixed_point(&left);
        let right = right.as_deref().map(to_fixed_point);

        self.search.find_acceptable_encoding(
            self.factory.as_ref(),
            &left,
            right.as_deref(),
            sample_rate,
            original_size,
            sink,
        )
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Audio processing failed unexpectedly".to_string()
    }
}
