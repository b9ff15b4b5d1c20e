//! Compress and transcribe a batch of files.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use voxtrim_audio_ai::{BatchSession, FileOutcome, HttpTranscriber};
use voxtrim_common::config::AppConfig;
use voxtrim_common::error::mib;
use voxtrim_processing_core::WorkerMessage;

pub async fn run(config: &AppConfig, inputs: Vec<PathBuf>, json: bool) -> anyhow::Result<()> {
    let mut session = BatchSession::new(config.pipeline.clone(), &config.transcription);
    if !json {
        let total = inputs.len().min(config.transcription.max_files);
        session = session.with_event_callback(Arc::new(move |index: usize, message: &WorkerMessage| {
            match message {
                WorkerMessage::Progress { stage, progress } => {
                    print!("\r  [{}/{total}] {stage:?}: {progress:>3}%  ", index + 1);
                    let _ = std::io::stdout().flush();
                }
                WorkerMessage::Status { message } => {
                    println!("\n  [{}/{total}] {message}", index + 1)
                }
                _ => {}
            }
        }));
    }

    let dropped = session.add_files(inputs);
    if dropped > 0 {
        eprintln!(
            "Only the first {} files are processed; {dropped} ignored.",
            config.transcription.max_files
        );
    }

    let transcriber = HttpTranscriber::from_config(config.transcription.clone())?;
    let outcomes = session.run(&transcriber).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        println!();
        for outcome in &outcomes {
            print_outcome(outcome);
        }
    }

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} file(s) failed", outcomes.len());
    }
    Ok(())
}

fn print_outcome(outcome: &FileOutcome) {
    println!("== {} ==", outcome.file_name);
    if let (Some(bitrate), Some(size)) = (outcome.bitrate_kbps, outcome.size_bytes) {
        println!("  Compressed at {bitrate}kbps ({:.2}MB)", mib(&size));
    }
    match (&outcome.transcript, &outcome.error) {
        (Some(transcript), _) => {
            if let Some(language) = &transcript.language_code {
                println!("  Language: {language}");
            }
            println!();
            println!("{}", transcript.to_plain_text());
        }
        (None, Some(error)) => println!("  Error: {error}"),
        (None, None) => {}
    }
    println!();
}
