//! Video in, English transcript out.
//!
//! **clipscribe** takes an uploaded video, pulls its audio track out with
//! ffmpeg, and runs whisper.cpp in translate mode so the transcript is always
//! English, whatever language was spoken. Long transcripts can then be sent
//! to a remote abstractive summarizer (Hugging Face Inference API).
//!
//! # Quick start
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> clipscribe::Result<()> {
//! use std::sync::Arc;
//! use clipscribe::{
//!     EngineOptions, FfmpegExtractor, Pipeline, SummarizationClient, SummarizeOptions,
//!     SummarizerConfig, TempStore, WhisperEngine,
//! };
//!
//! let engine = Arc::new(WhisperEngine::from_options(EngineOptions::default()).await?);
//! let pipeline = Pipeline::new(
//!     TempStore::new("uploads")?,
//!     FfmpegExtractor::new(),
//!     engine,
//!     SummarizationClient::new(SummarizerConfig::from_env())?,
//! );
//!
//! let bytes = std::fs::read("talk.mp4")?;
//! let transcript = pipeline.transcribe_upload(&bytes, "talk.mp4")?;
//! println!("[{}] {}", transcript.detected_language, transcript.text);
//!
//! let summary = pipeline
//!     .summarize_text(&transcript.text, &SummarizeOptions::default())
//!     .await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod store;
pub mod summarize;
pub mod transcribe;
pub mod types;

pub use audio::{AudioExtractor, FfmpegExtractor};
pub use config::{EngineOptions, Model, SummarizerConfig};
pub use error::{Error, Result};
pub use pipeline::Pipeline;
pub use store::{AssetGuard, TempStore};
pub use summarize::{SummarizationClient, SummarizeOptions};
pub use transcribe::{join_segments, SpeechEngine, WhisperEngine};
pub use types::{AudioAsset, TranscriptionResult, VideoAsset};
