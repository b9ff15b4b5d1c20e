//! Size-bounded bitrate search.
//!
//! Encodes repeatedly at decreasing bitrates until the output fits under
//! the configured ceiling or the attempt budget runs out.
//!
//! ```text
//!            fits                 too big, attempts left
//! Accepted <------ Attempting ------------------------+
//!                     |   ^                           |
//!                     |   +---------------------------+
//!                     |  too big, budget spent
//!                     v
//!                 Exhausted
//! ```

use voxtrim_common::config::PipelineConfig;
use voxtrim_common::error::{VoxtrimError, VoxtrimResult};

use crate::encoder::{BlockEncoder, EncoderFactory};
use crate::message::{EventSink, ProgressStage};

/// Output of one encode pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingAttempt {
    pub bitrate_kbps: u32,
    pub data: Vec<u8>,
}

impl EncodingAttempt {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Where the search currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchState {
    /// About to encode at `bitrate_kbps`; `attempt` is 1-based.
    Attempting { bitrate_kbps: u32, attempt: u32 },
    /// An attempt fit under the ceiling.
    Accepted(EncodingAttempt),
    /// Every attempt was too large; `size_bytes` is the last one's size.
    Exhausted { bitrate_kbps: u32, size_bytes: u64 },
}

impl SearchState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Attempting { .. })
    }
}

/// Drives encode attempts until one satisfies the size ceiling.
#[derive(Debug, Clone)]
pub struct BitrateSearch {
    config: PipelineConfig,
    encoder: BlockEncoder,
}

impl BitrateSearch {
    pub fn new(config: PipelineConfig) -> Self {
        let encoder = BlockEncoder::new(config.block_size);
        Self { config, encoder }
    }

    /// Starting bitrate: lower for large sources to improve the odds of
    /// fitting on the first pass.
    pub fn initial_bitrate(&self, original_size: u64) -> u32 {
        if original_size > self.config.large_input_threshold_bytes {
            self.config.large_input_bitrate_kbps
        } else {
            self.config.initial_bitrate_kbps
        }
    }

    /// Bitrate for the attempt after an oversized one at `current`.
    pub fn next_bitrate(&self, current: u32) -> u32 {
        let decayed = (f64::from(current) * self.config.bitrate_decay).floor() as u32;
        decayed.max(self.config.min_bitrate_kbps)
    }

    /// Advance the state machine by judging one finished attempt.
    pub fn transition(&self, attempt_number: u32, attempt: EncodingAttempt) -> SearchState {
        if attempt.size() <= self.config.max_output_bytes {
            return SearchState::Accepted(attempt);
        }

        if attempt_number >= self.config.max_attempts {
            return SearchState::Exhausted {
                bitrate_kbps: attempt.bitrate_kbps,
                size_bytes: attempt.size(),
            };
        }

        SearchState::Attempting {
            bitrate_kbps: self.next_bitrate(attempt.bitrate_kbps),
            attempt: attempt_number + 1,
        }
    }

    /// Encode at decreasing bitrates until the output fits.
    ///
    /// Before every attempt a status line naming the bitrate is emitted
    /// and encoding progress is reset to 0. Exhaustion is returned as
    /// [`VoxtrimError::SizeExhausted`].
    pub fn find_acceptable_encoding(
        &self,
        factory: &dyn EncoderFactory,
        left: &[i16],
        right: Option<&[i16]>,
        sample_rate: u32,
        original_size: u64,
        sink: &mut dyn EventSink,
    ) -> VoxtrimResult<EncodingAttempt> {
        let mut state = SearchState::Attempting {
            bitrate_kbps: self.initial_bitrate(original_size),
            attempt: 1,
        };

        loop {
            match state {
                SearchState::Attempting {
                    bitrate_kbps,
                    attempt,
                } => {
                    sink.status(format!("Compressing at {bitrate_kbps}kbps..."))?;
                    sink.progress(ProgressStage::Encoding, 0)?;

                    tracing::info!(attempt, bitrate_kbps, "Encoding attempt");
                    let data = self.encoder.encode(
                        factory,
                        left,
                        right,
                        sample_rate,
                        bitrate_kbps,
                        sink,
                    )?;
                    let encoded = EncodingAttempt { bitrate_kbps, data };

                    if encoded.size() > self.config.max_output_bytes {
                        tracing::warn!(
                            attempt,
                            bitrate_kbps,
                            size_bytes = encoded.size(),
                            limit_bytes = self.config.max_output_bytes,
                            "Encoded output exceeds size limit"
                        );
                    }
                    state = self.transition(attempt, encoded);
                }
                SearchState::Accepted(encoded) => {
                    tracing::info!(
                        bitrate_kbps = encoded.bitrate_kbps,
                        size_bytes = encoded.size(),
                        "Encoding accepted"
                    );
                    return Ok(encoded);
                }
                SearchState::Exhausted { size_bytes, .. } => {
                    return Err(VoxtrimError::SizeExhausted {
                        size_bytes,
                        limit_bytes: self.config.max_output_bytes,
                    });
                }
            }
        }
    }
}
