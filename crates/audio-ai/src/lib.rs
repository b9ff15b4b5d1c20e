//! voxtrim audio intelligence
//!
//! Everything around the processing pipeline that a complete tool needs:
//! - **Decoding:** WAV files into float channels ready for the pipeline
//! - **Transcription:** speech-to-text over HTTP behind a [`Transcriber`] seam
//! - **Batch sessions:** compress then transcribe several files in turn

pub mod batch;
pub mod decode;
pub mod transcription;

pub use batch::*;
pub use decode::*;
pub use transcription::*;
