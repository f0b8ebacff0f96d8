//! Transcribe a local video into English and print the text.
//!
//! Usage: cargo run --example transcribe_video -- path/to/talk.mp4

use std::sync::Arc;

use clipscribe::{
    EngineOptions, FfmpegExtractor, Pipeline, SummarizationClient, SummarizerConfig, TempStore,
    WhisperEngine,
};

#[tokio::main]
async fn main() -> clipscribe::Result<()> {
    let path = std::env::args()
        .nth(1)
        .expect("usage: transcribe_video <video-file>");

    let engine = WhisperEngine::from_options(EngineOptions::default()).await?;
    let pipeline = Pipeline::new(
        TempStore::new(std::env::temp_dir().join("clipscribe-example"))?,
        FfmpegExtractor::new(),
        Arc::new(engine),
        SummarizationClient::new(SummarizerConfig::from_env())?,
    );

    let transcript = pipeline.transcribe_path(path.as_ref())?;
    eprintln!(
        "source language: {} (p={:.2})",
        transcript.detected_language, transcript.language_confidence
    );
    println!("{}", transcript.text);

    Ok(())
}
