//! Clean and compress a single file.

use std::io::Write;
use std::path::PathBuf;

use voxtrim_audio_ai::decode_file;
use voxtrim_common::config::AppConfig;
use voxtrim_common::error::mib;
use voxtrim_processing_core::{Pipeline, PipelineWorker, ProgressStage, WorkerMessage};

pub fn run(
    config: &AppConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let output_path = output.unwrap_or_else(|| input.with_extension("mp3"));
    if output_path == input {
        anyhow::bail!("Output path must differ from the input: {}", input.display());
    }

    let decoded = decode_file(&input)?;
    let original_size = std::fs::metadata(&input)?.len();

    if !json {
        println!("Compressing: {}", input.display());
        println!(
            "  Input: {} channel(s), {} Hz, {:.1}s, {:.2}MB",
            decoded.source_channels,
            decoded.sample_rate,
            decoded.duration_secs(),
            mib(&original_size)
        );
    }

    let pipeline = Pipeline::with_lame(config.pipeline.clone())?;
    let worker = PipelineWorker::spawn(pipeline, decoded.into_audio_data(original_size).into())?;

    let terminal = worker.wait(|message| {
        if json {
            print_json_line(message);
        } else {
            print_human(message);
        }
    });
    if json {
        print_json_line(&terminal);
    }

    match terminal {
        WorkerMessage::Complete {
            data,
            size,
            bitrate,
        } => {
            std::fs::write(&output_path, &data)?;
            tracing::info!(path = %output_path.display(), size, bitrate, "Wrote compressed audio");
            if !json {
                println!("\nCompressed at {bitrate}kbps: {:.2}MB", mib(&size));
                println!("  Output: {}", output_path.display());
            }
            Ok(())
        }
        WorkerMessage::Error { message } => {
            if !json {
                println!();
            }
            Err(anyhow::anyhow!(message))
        }
        other => Err(anyhow::anyhow!("Unexpected worker message: {other:?}")),
    }
}

fn print_human(message: &WorkerMessage) {
    match message {
        WorkerMessage::Progress { stage, progress } => {
            let label = match stage {
                ProgressStage::Cleaning => "Cleaning",
                ProgressStage::Encoding => "Encoding",
            };
            print!("\r  {label}: {progress:>3}%  ");
            let _ = std::io::stdout().flush();
        }
        WorkerMessage::Status { message } => println!("\n  {message}"),
        _ => {}
    }
}

/// One JSON object per line. `complete` omits the payload bytes.
fn print_json_line(message: &WorkerMessage) {
    let value = match message {
        WorkerMessage::Complete { size, bitrate, .. } => serde_json::json!({
            "type": "complete",
            "size": size,
            "bitrate": bitrate,
        }),
        other => match serde_json::to_value(other) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize worker message");
                return;
            }
        },
    };
    println!("{value}");
}
