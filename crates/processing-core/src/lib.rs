//! voxtrim Processing Core
//!
//! Prepares decoded audio for upload to a speech-to-text service:
//! - **Conditioning:** noise gate and peak normalization per channel
//! - **PCM conversion:** float samples to signed 16-bit
//! - **Block encoding:** 1152-sample blocks through a fresh MP3 encoder
//! - **Bitrate search:** retries at lower bitrates until the output fits
//!   under the size ceiling
//! - **Worker:** runs one invocation on its own thread and reports back
//!   through one-way messages
//!
//! # Flow
//!
//! ```text
//! ProcessCommand ──> PipelineWorker thread
//!                      │
//!                      ├─ WaveformConditioner (per channel)
//!                      ├─ to_fixed_point
//!                      └─ BitrateSearch ──> BlockEncoder ──> FrameEncoder (LAME)
//!                               │               (fresh per attempt)
//!                               ▼
//!                    progress / status ... complete | error
//! ```

pub mod bitrate;
pub mod conditioner;
pub mod encoder;
pub mod lame;
pub mod message;
pub mod pcm;
pub mod pipeline;
pub mod worker;

pub use bitrate::{BitrateSearch, EncodingAttempt, SearchState};
pub use conditioner::WaveformConditioner;
pub use encoder::{BlockEncoder, EncoderFactory, EncoderSettings, FrameEncoder};
pub use lame::LameEncoderFactory;
pub use message::{AudioData, EventSink, ProcessCommand, ProgressStage, WorkerMessage};
pub use pipeline::Pipeline;
pub use worker::PipelineWorker;
