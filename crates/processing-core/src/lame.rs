//! MP3 encoding backed by LAME.

use mp3lame_encoder::{Bitrate, Builder, DualPcm, Encoder, FlushNoGap, MonoPcm};
use voxtrim_common::error::{VoxtrimError, VoxtrimResult};

use crate::encoder::{EncoderFactory, EncoderSettings, FrameEncoder};

/// Constant bitrates LAME accepts, highest first.
const SUPPORTED_KBPS: [u32; 16] = [
    320, 256, 224, 192, 160, 128, 112, 96, 80, 64, 48, 40, 32, 24, 16, 8,
];

/// LAME needs this much spare room to drain its internal buffers.
const FLUSH_RESERVE: usize = 7200;

/// Lowest rate LAME encodes at; slower input is resampled up to it.
const MIN_LAME_SAMPLE_RATE: u32 = 8000;

/// Worst-case MP3 output for `samples` samples per channel at
/// `sample_rate`.
///
/// LAME's `1.25 * n + 7200` bound counts samples after resampling, so
/// input below 8 kHz is scaled by the upsampling ratio.
fn encode_reserve(samples: usize, sample_rate: u32) -> usize {
    let upsampling = MIN_LAME_SAMPLE_RATE.div_ceil(sample_rate.max(1)).max(1) as usize;
    samples * 5 / 4 * upsampling + FLUSH_RESERVE
}

/// Supported bitrate closest to `kbps`, preferring the lower one on ties.
///
/// This is the rate LAME itself would settle on. Decayed bitrates stay
/// distinct (128, 76, 45, 38, 32 encode at 128, 80, 48, 40, 32); only
/// attempts that repeat the 32 kbps floor produce identical output.
pub fn supported_bitrate_kbps(kbps: u32) -> u32 {
    SUPPORTED_KBPS
        .iter()
        .copied()
        .min_by_key(|&rate| (rate.abs_diff(kbps), rate))
        .unwrap_or(8)
}

fn lame_bitrate(kbps: u32) -> Bitrate {
    match supported_bitrate_kbps(kbps) {
        320 => Bitrate::Kbps320,
        256 => Bitrate::Kbps256,
        224 => Bitrate::Kbps224,
        192 => Bitrate::Kbps192,
        160 => Bitrate::Kbps160,
        128 => Bitrate::Kbps128,
        112 => Bitrate::Kbps112,
        96 => Bitrate::Kbps96,
        80 => Bitrate::Kbps80,
        64 => Bitrate::Kbps64,
        48 => Bitrate::Kbps48,
        40 => Bitrate::Kbps40,
        32 => Bitrate::Kbps32,
        24 => Bitrate::Kbps24,
        16 => Bitrate::Kbps16,
        _ => Bitrate::Kbps8,
    }
}

/// Builds a new LAME encoder for every attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct LameEncoderFactory;

impl EncoderFactory for LameEncoderFactory {
    fn create(&self, settings: EncoderSettings) -> VoxtrimResult<Box<dyn FrameEncoder>> {
        let mut builder = Builder::new()
            .ok_or_else(|| VoxtrimError::encode("Failed to create LAME encoder"))?;

        builder
            .set_num_channels(settings.channels)
            .map_err(|e| VoxtrimError::encode(format!("Invalid channel count: {e:?}")))?;
        builder
            .set_sample_rate(settings.sample_rate)
            .map_err(|e| VoxtrimError::encode(format!("Invalid sample rate: {e:?}")))?;
        builder
            .set_brate(lame_bitrate(settings.bitrate_kbps))
            .map_err(|e| VoxtrimError::encode(format!("Invalid bitrate: {e:?}")))?;

        let encoder = builder
            .build()
            .map_err(|e| VoxtrimError::encode(format!("Failed to build encoder: {e:?}")))?;

        tracing::debug!(
            channels = settings.channels,
            sample_rate = settings.sample_rate,
            requested_kbps = settings.bitrate_kbps,
            lame_kbps = supported_bitrate_kbps(settings.bitrate_kbps),
            "LAME encoder created"
        );

        Ok(Box::new(LameFrameEncoder {
            encoder,
            sample_rate: settings.sample_rate,
        }))
    }

    fn name(&self) -> &str {
        "lame"
    }
}

/// One LAME encoder instance.
pub struct LameFrameEncoder {
    encoder: Encoder,
    sample_rate: u32,
}

impl FrameEncoder for LameFrameEncoder {
    fn encode_block(
        &mut self,
        left: &[i16],
        right: Option<&[i16]>,
        output: &mut Vec<u8>,
    ) -> VoxtrimResult<()> {
        output.reserve(encode_reserve(left.len(), self.sample_rate));

        let written = match right {
            Some(right) => self.encoder.encode_to_vec(DualPcm { left, right }, output),
            None => self.encoder.encode_to_vec(MonoPcm(left), output),
        };
        written.map_err(|e| VoxtrimError::encode(format!("MP3 encode failed: {e:?}")))?;
        Ok(())
    }

    fn flush(mut self: Box<Self>, output: &mut Vec<u8>) -> VoxtrimResult<()> {
        output.reserve(FLUSH_RESERVE);
        self.encoder
            .flush_to_vec::<FlushNoGap>(output)
            .map_err(|e| VoxtrimError::encode(format!("MP3 flush failed: {e:?}")))?;
        Ok(())
    }
}
