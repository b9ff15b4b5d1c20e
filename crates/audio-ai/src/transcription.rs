//! Speech-to-text over HTTP.
//!
//! [`Transcriber`] is the seam between a batch session and whatever turns
//! compressed audio into text. [`HttpTranscriber`] talks to a hosted
//! speech-to-text endpoint using multipart uploads.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use voxtrim_common::config::TranscriptionConfig;
use voxtrim_common::error::{VoxtrimError, VoxtrimResult};

const NO_TRANSCRIPTION: &str = "No transcription available.";

/// Kind of token in a word-level transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordKind {
    Word,
    Spacing,
    AudioEvent,
}

/// One timed token of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptWord {
    pub text: String,

    #[serde(rename = "type")]
    pub kind: WordKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<String>,

    /// Start time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,

    /// End time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
}

/// Result of transcribing one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<TranscriptWord>>,
}

impl Transcript {
    /// Render the transcript as text split into speaker paragraphs.
    ///
    /// Each speaker change starts a `[SPEAKER 0]` style label. Words
    /// without a speaker are grouped under `[UNKNOWN]`. Falls back to
    /// [`Transcript::text`] when there are no words.
    pub fn to_plain_text(&self) -> String {
        let words = match self.words.as_deref() {
            Some(words) if !words.is_empty() => words,
            _ => return self.text.clone(),
        };

        let mut out = String::new();
        let mut current_speaker: Option<&str> = None;
        let mut paragraph = String::new();

        for word in words {
            if word.kind == WordKind::Spacing {
                paragraph.push_str(&word.text);
                continue;
            }

            let speaker = word.speaker_id.as_deref().unwrap_or("unknown");
            if current_speaker != Some(speaker) {
                if current_speaker.is_some() && !paragraph.trim().is_empty() {
                    out.push_str(paragraph.trim());
                    out.push_str("\n\n");
                }
                current_speaker = Some(speaker);
                out.push_str(&format!("[{}]\n", speaker_label(speaker)));
                paragraph.clear();
            }
            paragraph.push_str(&word.text);
        }

        if !paragraph.trim().is_empty() {
            out.push_str(paragraph.trim());
        }
        out
    }
}

/// `speaker_0` becomes `SPEAKER 0`.
fn speaker_label(speaker_id: &str) -> String {
    speaker_id.replacen('_', " ", 1).to_uppercase()
}

/// Turns compressed audio into a transcript.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe MP3 bytes. `file_name` is passed along for services
    /// that use it as an upload name.
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> VoxtrimResult<Transcript>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

/// Hosted speech-to-text client.
pub struct HttpTranscriber {
    client: reqwest::Client,
    config: TranscriptionConfig,
    api_key: Option<String>,
}

impl HttpTranscriber {
    /// Build a client from settings, reading the API key from the
    /// configured environment variable.
    pub fn from_config(config: TranscriptionConfig) -> VoxtrimResult<Self> {
        let api_key = match config.api_key_env.as_deref() {
            Some(var) => match std::env::var(var) {
                Ok(key) if !key.trim().is_empty() => Some(key),
                _ => {
                    tracing::warn!(env = var, "API key variable not set; sending unauthenticated requests");
                    None
                }
            },
            None => None,
        };
        Self::with_api_key(config, api_key)
    }

    /// Build a client with an explicit API key.
    pub fn with_api_key(config: TranscriptionConfig, api_key: Option<String>) -> VoxtrimResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VoxtrimError::config(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn form(&self, audio: Vec<u8>, file_name: &str) -> VoxtrimResult<multipart::Form> {
        let file_part = multipart::Part::bytes(audio)
            .file_name(upload_name(file_name))
            .mime_str("audio/mpeg")
            .map_err(|e| VoxtrimError::transcription(e.to_string()))?;

        Ok(multipart::Form::new()
            .part("file", file_part)
            .text("model_id", self.config.model_id.clone())
            .text("tag_audio_events", self.config.tag_audio_events.to_string())
            .text("diarize", self.config.diarize.to_string()))
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> VoxtrimResult<Transcript> {
        tracing::info!(
            url = %self.config.api_url,
            model = %self.config.model_id,
            bytes = audio.len(),
            file = file_name,
            "Sending audio for transcription"
        );

        let mut request = self
            .client
            .post(&self.config.api_url)
            .multipart(self.form(audio, file_name)?);
        if let Some(key) = &self.api_key {
            request = request.header("xi-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| VoxtrimError::transcription(format!("Transcription request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VoxtrimError::transcription(format!("Transcription request failed: {e}")))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Transcription service returned an error");
            return Err(VoxtrimError::transcription(api_error_message(
                status.as_u16(),
                &body,
            )));
        }

        parse_transcript(&body)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Parse a successful response body. A blank transcript is an error.
pub fn parse_transcript(body: &str) -> VoxtrimResult<Transcript> {
    let transcript: Transcript = serde_json::from_str(body)?;
    if transcript.text.trim().is_empty() {
        return Err(VoxtrimError::transcription(NO_TRANSCRIPTION));
    }
    Ok(transcript)
}

/// Error text for a failed request: `detail.message`, then `message`,
/// then a generic status line.
pub fn api_error_message(status: u16, body: &str) -> String {
    let json: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
    let non_empty = |value: Option<&serde_json::Value>| {
        value
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    non_empty(json.pointer("/detail/message"))
        .or_else(|| non_empty(json.get("message")))
        .unwrap_or_else(|| format!("API Error: {status}"))
}

/// Upload name for the compressed file: the source stem with `.mp3`.
fn upload_name(file_name: &str) -> String {
    let stem = std::path::Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("processed_audio");
    format!("{stem}.mp3")
}
