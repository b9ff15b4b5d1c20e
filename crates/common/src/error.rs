//! Error types shared across voxtrim crates.

use std::path::PathBuf;

const MIB: f64 = 1024.0 * 1024.0;

/// Top-level error type for voxtrim operations.
#[derive(Debug, thiserror::Error)]
pub enum VoxtrimError {
    #[error("{message}")]
    Decode { message: String },

    #[error("Invalid audio input: {message}")]
    InvalidInput { message: String },

    #[error("Encoding error: {message}")]
    Encode { message: String },

    #[error(
        "Unable to compress audio below {}. Current size: {:.2}MB. Please use a shorter audio file.",
        limit_label(.limit_bytes),
        mib(.size_bytes)
    )]
    SizeExhausted { size_bytes: u64, limit_bytes: u64 },

    /// The receiving side of a pipeline went away mid-run.
    #[error("Pipeline abandoned by caller")]
    Abandoned,

    #[error("{message}")]
    Transcription { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using VoxtrimError.
pub type VoxtrimResult<T> = Result<T, VoxtrimError>;

impl VoxtrimError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn transcription(msg: impl Into<String>) -> Self {
        Self::Transcription {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether the error means nobody is listening for the result anymore.
    pub fn is_abandoned(&self) -> bool {
        matches!(self, Self::Abandoned)
    }
}

/// Byte count expressed in MiB.
pub fn mib(bytes: &u64) -> f64 {
    *bytes as f64 / MIB
}

/// `300MB` for whole MiB, `0.50MB` otherwise, plain bytes below 0.01 MiB.
fn limit_label(bytes: &u64) -> String {
    const WHOLE: u64 = 1024 * 1024;
    if *bytes >= WHOLE && *bytes % WHOLE == 0 {
        format!("{}MB", *bytes / WHOLE)
    } else if mib(bytes) >= 0.01 {
        format!("{:.2}MB", mib(bytes))
    } else {
        format!("{bytes} bytes")
    }
}
