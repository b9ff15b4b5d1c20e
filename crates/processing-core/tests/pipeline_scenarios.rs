use voxtrim_common::config::PipelineConfig;
use voxtrim_common::error::VoxtrimResult;
use voxtrim_processing_core::{
    AudioData, EncoderFactory, EncoderSettings, FrameEncoder, Pipeline, PipelineWorker,
    ProgressStage, WorkerMessage,
};

const MIB: u64 = 1024 * 1024;

/// Produces `bytes_per_kbps * bitrate` bytes per block without encoding.
struct InflatingFactory {
    bytes_per_kbps: usize,
}

struct InflatingEncoder {
    block_bytes: usize,
}

impl FrameEncoder for InflatingEncoder {
    fn encode_block(
        &mut self,
        _left: &[i16],
        _right: Option<&[i16]>,
        output: &mut Vec<u8>,
    ) -> VoxtrimResult<()> {
        output.resize(output.len() + self.block_bytes, 0);
        Ok(())
    }

    fn flush(self: Box<Self>, _output: &mut Vec<u8>) -> VoxtrimResult<()> {
        Ok(())
    }
}

impl EncoderFactory for InflatingFactory {
    fn create(&self, settings: EncoderSettings) -> VoxtrimResult<Box<dyn FrameEncoder>> {
        Ok(Box::new(InflatingEncoder {
            block_bytes: self.bytes_per_kbps * settings.bitrate_kbps as usize,
        }))
    }

    fn name(&self) -> &str {
        "inflating"
    }
}

fn run_worker(pipeline: Pipeline, audio: AudioData) -> Vec<WorkerMessage> {
    PipelineWorker::spawn(pipeline, audio.into())
        .expect("worker should spawn")
        .collect()
}

fn statuses(messages: &[WorkerMessage]) -> Vec<&str> {
    messages
        .iter()
        .filter_map(|m| match m {
            WorkerMessage::Status { message } => Some(message.as_str()),
            _ => None,
        })
        .collect()
}

/// Encoding progress values grouped by attempt (split at status lines).
fn encoding_progress_per_attempt(messages: &[WorkerMessage]) -> Vec<Vec<u8>> {
    let mut attempts: Vec<Vec<u8>> = Vec::new();
    for message in messages {
        match message {
            WorkerMessage::Status { .. } => attempts.push(Vec::new()),
            WorkerMessage::Progress {
                stage: ProgressStage::Encoding,
                progress,
            } => attempts
                .last_mut()
                .expect("encoding progress before any status")
                .push(*progress),
            _ => {}
        }
    }
    attempts
}

#[test]
fn mono_half_amplitude_second_compresses_at_128() {
    let pipeline = Pipeline::with_lame(PipelineConfig::default()).unwrap();
    let audio = AudioData::mono(vec![0.5; 44_100], 44_100, 10 * MIB);

    let messages = run_worker(pipeline, audio);

    assert_eq!(statuses(&messages), vec!["Compressing at 128kbps..."]);
    match messages.last() {
        Some(WorkerMessage::Complete {
            data,
            size,
            bitrate,
        }) => {
            assert_eq!(*bitrate, 128);
            assert_eq!(*size, data.len() as u64);
            assert!(*size > 0);
            assert!(*size <= 300 * MIB);
        }
        other => panic!("expected complete, got {other:?}"),
    }
}

#[test]
fn large_original_starts_at_64() {
    let pipeline = Pipeline::with_lame(PipelineConfig::default()).unwrap();
    let samples: Vec<f32> = (0..22_050).map(|i| (i as f32 * 0.03).sin() * 0.4).collect();
    let audio = AudioData::mono(samples, 22_050, 150 * MIB);

    let messages = run_worker(pipeline, audio);

    assert_eq!(statuses(&messages), vec!["Compressing at 64kbps..."]);
    assert!(matches!(
        messages.last(),
        Some(WorkerMessage::Complete { bitrate: 64, .. })
    ));
}

#[test]
fn stereo_that_never_fits_fails_after_five_attempts() {
    let config = PipelineConfig {
        max_output_bytes: MIB,
        ..Default::default()
    };
    // One block per channel: 64 kbps -> 4 MiB, 32 kbps -> 2 MiB.
    let pipeline = Pipeline::new(
        config,
        Box::new(InflatingFactory {
            bytes_per_kbps: 64 * 1024,
        }),
    )
    .unwrap();
    let audio = AudioData::stereo(vec![0.25; 1152], vec![-0.25; 1152], 44_100, 150 * MIB);

    let messages = run_worker(pipeline, audio);

    assert_eq!(
        statuses(&messages),
        vec![
            "Compressing at 64kbps...",
            "Compressing at 38kbps...",
            "Compressing at 32kbps...",
            "Compressing at 32kbps...",
            "Compressing at 32kbps...",
        ]
    );
    match messages.last() {
        Some(WorkerMessage::Error { message }) => {
            assert!(message.contains("Please use a shorter audio file"), "{message}");
            assert!(message.contains("Current size: 2.00MB"), "{message}");
        }
        other => panic!("expected error, got {other:?}"),
    }
}

#[test]
fn encoding_progress_resets_each_attempt() {
    let config = PipelineConfig {
        max_output_bytes: 1,
        ..Default::default()
    };
    let pipeline = Pipeline::new(config, Box::new(InflatingFactory { bytes_per_kbps: 1 })).unwrap();
    let audio = AudioData::mono(vec![0.1; 1152 * 37], 44_100, 0);

    let messages = run_worker(pipeline, audio);
    let attempts = encoding_progress_per_attempt(&messages);

    assert_eq!(attempts.len(), 5);
    for progress in attempts {
        assert_eq!(progress.first(), Some(&0));
        assert_eq!(progress.last(), Some(&100));
        assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
        // Reset, ten deciles, and the final 100.
        assert!(progress.len() <= 12);
    }
}

#[test]
fn cleaning_progress_precedes_encoding() {
    let pipeline = Pipeline::new(
        PipelineConfig::default(),
        Box::new(InflatingFactory { bytes_per_kbps: 1 }),
    )
    .unwrap();
    let audio = AudioData::stereo(vec![0.0; 10], vec![0.0; 10], 16_000, 0);

    let messages = run_worker(pipeline, audio);

    assert_eq!(
        &messages[..2],
        &[
            WorkerMessage::Progress {
                stage: ProgressStage::Cleaning,
                progress: 0
            },
            WorkerMessage::Progress {
                stage: ProgressStage::Cleaning,
                progress: 100
            },
        ]
    );
    assert!(matches!(messages[2], WorkerMessage::Status { .. }));
}

#[test]
fn sub_8khz_input_completes() {
    for sample_rate in [1000, 500] {
        let pipeline = Pipeline::with_lame(PipelineConfig::default()).unwrap();
        let samples: Vec<f32> = (0..20_000).map(|i| (i as f32 * 0.2).sin() * 0.6).collect();
        let audio = AudioData::mono(samples, sample_rate, MIB);

        let messages = run_worker(pipeline, audio);

        match messages.last() {
            Some(WorkerMessage::Complete { size, bitrate, .. }) => {
                assert_eq!(*bitrate, 128);
                assert!(*size > 0);
            }
            other => panic!("{sample_rate} Hz: expected complete, got {other:?}"),
        }
    }
}
