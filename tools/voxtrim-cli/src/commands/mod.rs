pub mod compress;
pub mod config;
pub mod transcribe;
