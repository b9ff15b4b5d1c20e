//! WAV decoding into float channels.
//!
//! Integer PCM is scaled by its bit depth into [-1, 1]; float PCM passes
//! through. Only the first two channels are kept.

use std::io::Read;
use std::path::Path;

use hound::{SampleFormat, WavReader};
use voxtrim_common::error::{VoxtrimError, VoxtrimResult};
use voxtrim_processing_core::AudioData;

const DECODE_FAILED: &str = "Failed to decode audio file.";

/// Decoded audio, still in floating point.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub left: Vec<f32>,
    pub right: Option<Vec<f32>>,
    pub sample_rate: u32,
    /// Channel count of the source file, before dropping extras.
    pub source_channels: u16,
}

impl DecodedAudio {
    pub fn channel_count(&self) -> usize {
        if self.right.is_some() {
            2
        } else {
            1
        }
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.left.len()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Build the pipeline input. `original_size` is the size of the
    /// source file in bytes.
    pub fn into_audio_data(self, original_size: u64) -> AudioData {
        AudioData {
            left_channel: self.left,
            right_channel: self.right,
            sample_rate: self.sample_rate,
            original_size,
        }
    }
}

/// Decode a WAV file from disk.
pub fn decode_file(path: &Path) -> VoxtrimResult<DecodedAudio> {
    if !path.exists() {
        return Err(VoxtrimError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let reader = WavReader::open(path).map_err(|e| decode_error(&e))?;
    let decoded = decode_reader(reader)?;

    tracing::debug!(
        path = %path.display(),
        channels = decoded.source_channels,
        sample_rate = decoded.sample_rate,
        frames = decoded.frames(),
        "Decoded audio file"
    );
    Ok(decoded)
}

/// Decode WAV data already held in memory.
pub fn decode_bytes(bytes: &[u8]) -> VoxtrimResult<DecodedAudio> {
    let reader = WavReader::new(std::io::Cursor::new(bytes)).map_err(|e| decode_error(&e))?;
    decode_reader(reader)
}

fn decode_reader<R: Read>(mut reader: WavReader<R>) -> VoxtrimResult<DecodedAudio> {
    let spec = reader.spec();
    let channels = usize::from(spec.channels);
    if channels == 0 {
        return Err(VoxtrimError::decode(DECODE_FAILED));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| decode_error(&e))?,
        SampleFormat::Int => {
            let scale = int_scale(spec.bits_per_sample)?;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| decode_error(&e))?
        }
    };

    let frames = interleaved.len() / channels;
    let mut left = Vec::with_capacity(frames);
    let mut right = (channels > 1).then(|| Vec::with_capacity(frames));

    for frame in interleaved.chunks_exact(channels) {
        left.push(frame[0]);
        if let Some(right) = right.as_mut() {
            right.push(frame[1]);
        }
    }

    Ok(DecodedAudio {
        left,
        right,
        sample_rate: spec.sample_rate,
        source_channels: spec.channels,
    })
}

fn int_scale(bits_per_sample: u16) -> VoxtrimResult<f32> {
    match bits_per_sample {
        1..=32 => Ok((1u64 << (bits_per_sample - 1)) as f32),
        _ => Err(VoxtrimError::decode(DECODE_FAILED)),
    }
}

fn decode_error(err: &hound::Error) -> VoxtrimError {
    tracing::warn!(error = %err, "Audio decoding failed");
    VoxtrimError::decode(DECODE_FAILED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use std::io::Cursor;

    fn wav_bytes(spec: WavSpec, write: impl FnOnce(&mut WavWriter<&mut Cursor<Vec<u8>>>)) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            write(&mut writer);
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_stereo_i16() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, |w| {
            for (l, r) in [(16384i16, -16384i16), (-32768, 0)] {
                w.write_sample(l).unwrap();
                w.write_sample(r).unwrap();
            }
        });

        let decoded = decode_bytes(&bytes).unwrap();
        assert_eq!(decoded.sample_rate, 22050);
        assert_eq!(decoded.left, vec![0.5, -1.0]);
        assert_eq!(decoded.right, Some(vec![-0.5, 0.0]));
        assert_eq!(decoded.channel_count(), 2);
    }

    #[test]
    fn test_decode_mono_float() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let bytes = wav_bytes(spec, |w| {
            for s in [0.25f32, -0.75, 1.0] {
                w.write_sample(s).unwrap();
            }
        });

        let decoded = decode_bytes(&bytes).unwrap();
        assert_eq!(decoded.left, vec![0.25, -0.75, 1.0]);
        assert!(decoded.right.is_none());
    }

    #[test]
    fn test_extra_channels_are_dropped() {
        let spec = WavSpec {
            channels: 3,
            sample_rate: 8000,
            bits_per_sample: 8,
            sample_format: SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, |w| {
            for s in [64i8, -64, 127] {
                w.write_sample(s).unwrap();
            }
        });

        let decoded = decode_bytes(&bytes).unwrap();
        assert_eq!(decoded.source_channels, 3);
        assert_eq!(decoded.left, vec![0.5]);
        assert_eq!(decoded.right, Some(vec![-0.5]));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = decode_bytes(b"definitely not a wav file").unwrap_err();
        assert_eq!(err.to_string(), "Failed to decode audio file.");
    }

    #[test]
    fn test_missing_file() {
        let err = decode_file(Path::new("/nonexistent/voxtrim/input.wav")).unwrap_err();
        assert!(matches!(err, VoxtrimError::FileNotFound { .. }));
    }

    #[test]
    fn test_into_audio_data() {
        let decoded = DecodedAudio {
            left: vec![0.1; 4],
            right: None,
            sample_rate: 16000,
            source_channels: 1,
        };
        assert!((decoded.duration_secs() - 0.00025).abs() < 1e-12);

        let audio = decoded.into_audio_data(2048);
        assert_eq!(audio.original_size, 2048);
        assert_eq!(audio.sample_rate, 16000);
        assert!(audio.right_channel.is_none());
    }
}
