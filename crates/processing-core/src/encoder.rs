//! Block-wise streaming of PCM samples through a compressed-audio encoder.

use voxtrim_common::error::VoxtrimResult;

use crate::message::{EventSink, ProgressStage};

/// Samples per channel in one MPEG-1 Layer III frame.
pub const MP3_FRAME_SAMPLES: usize = 1152;

/// Parameters a fresh encoder instance is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    /// 1 (mono) or 2 (stereo).
    pub channels: u8,
    pub sample_rate: u32,
    pub bitrate_kbps: u32,
}

/// A stateful encoder for one encode run.
///
/// Encoder state cannot be reset, so an instance lives for exactly one
/// attempt and is consumed by [`FrameEncoder::flush`].
pub trait FrameEncoder {
    /// Encode one block, appending any finished frames to `output`.
    ///
    /// `right` is `Some` only for stereo encoders and has the same length
    /// as `left`.
    fn encode_block(
        &mut self,
        left: &[i16],
        right: Option<&[i16]>,
        output: &mut Vec<u8>,
    ) -> VoxtrimResult<()>;

    /// Drain buffered frames into `output` and release the encoder.
    fn flush(self: Box<Self>, output: &mut Vec<u8>) -> VoxtrimResult<()>;
}

/// Creates one [`FrameEncoder`] per encode attempt.
pub trait EncoderFactory: Send {
    fn create(&self, settings: EncoderSettings) -> VoxtrimResult<Box<dyn FrameEncoder>>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Decides when a block-loop should report progress.
///
/// Reports once per decile of blocks processed, so a run emits at most
/// ten block events no matter how long the input is. With fewer than
/// ten blocks every block crosses into a new decile and reports.
#[derive(Debug, Clone)]
pub struct ProgressSchedule {
    total_blocks: usize,
    last_decile: Option<usize>,
}

impl ProgressSchedule {
    pub fn new(total_blocks: usize) -> Self {
        Self {
            total_blocks,
            last_decile: None,
        }
    }

    /// Percentage to report before processing `block_index`, if any.
    pub fn tick(&mut self, block_index: usize) -> Option<u8> {
        if self.total_blocks == 0 || block_index >= self.total_blocks {
            return None;
        }

        let decile = block_index * 10 / self.total_blocks;
        if self.last_decile.is_some_and(|last| decile <= last) {
            return None;
        }
        self.last_decile = Some(decile);

        let percent = (block_index as f64 * 100.0 / self.total_blocks as f64).round();
        Some(percent as u8)
    }
}

/// Streams fixed-size blocks through a fresh encoder per call.
#[derive(Debug, Clone, Copy)]
pub struct BlockEncoder {
    block_size: usize,
}

impl Default for BlockEncoder {
    fn default() -> Self {
        Self::new(MP3_FRAME_SAMPLES)
    }
}

impl BlockEncoder {
    /// `block_size` must be non-zero; pipeline config validation enforces it.
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
        }
    }

    /// Number of blocks `samples` splits into; the last may be short.
    pub fn block_count(&self, samples: usize) -> usize {
        samples.div_ceil(self.block_size)
    }

    /// Encode `left` (and `right` when stereo) into one byte buffer.
    ///
    /// Output is the in-order concatenation of every block's frames
    /// followed by the flush. Encoding progress goes to `sink`.
    pub fn encode(
        &self,
        factory: &dyn EncoderFactory,
        left: &[i16],
        right: Option<&[i16]>,
        sample_rate: u32,
        bitrate_kbps: u32,
        sink: &mut dyn EventSink,
    ) -> VoxtrimResult<Vec<u8>> {
        let settings = EncoderSettings {
            channels: if right.is_some() { 2 } else { 1 },
            sample_rate,
            bitrate_kbps,
        };
        let mut encoder = factory.create(settings)?;

        let total_blocks = self.block_count(left.len());
        let mut schedule = ProgressSchedule::new(total_blocks);
        let mut output = Vec::new();

        for (block_index, start) in (0..left.len()).step_by(self.block_size).enumerate() {
            if let Some(percent) = schedule.tick(block_index) {
                sink.progress(ProgressStage::Encoding, percent)?;
            }

            let end = (start + self.block_size).min(left.len());
            let right_block = right.map(|r| &r[start.min(r.len())..end.min(r.len())]);
            encoder.encode_block(&left[start..end], right_block, &mut output)?;
        }

        encoder.flush(&mut output)?;
        sink.progress(ProgressStage::Encoding, 100)?;

        tracing::debug!(
            backend = factory.name(),
            blocks = total_blocks,
            bitrate_kbps,
            bytes = output.len(),
            "Encode pass finished"
        );

        Ok(output)
    }
}
