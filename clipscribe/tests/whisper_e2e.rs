//! End-to-end run against a real whisper model and video.
//!
//! Needs `CLIPSCRIBE_TEST_MODEL` (path to a multilingual ggml model) and
//! `CLIPSCRIBE_TEST_VIDEO` (a video with an audio track):
//!
//! ```sh
//! CLIPSCRIBE_TEST_MODEL=~/.cache/clipscribe/models/ggml-tiny.bin \
//! CLIPSCRIBE_TEST_VIDEO=talk.mp4 cargo test -p clipscribe --test whisper_e2e -- --ignored
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clipscribe::{
    EngineOptions, FfmpegExtractor, Model, Pipeline, SummarizationClient, SummarizerConfig,
    TempStore, WhisperEngine,
};

#[test]
#[ignore]
fn test_transcribe_real_video() {
    let model = PathBuf::from(std::env::var("CLIPSCRIBE_TEST_MODEL").unwrap());
    let video = PathBuf::from(std::env::var("CLIPSCRIBE_TEST_VIDEO").unwrap());

    let options = EngineOptions::new()
        .model(Model::Custom(model.clone()))
        .unwrap()
        .gpu(false);
    let engine = Arc::new(WhisperEngine::load(&model, options).unwrap());

    let scratch = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(
        TempStore::new(scratch.path()).unwrap(),
        FfmpegExtractor::new(),
        engine,
        SummarizationClient::new(SummarizerConfig::new()).unwrap(),
    );

    let result = pipeline.transcribe_path(&video).unwrap();
    println!("[{} p={:.2}] {}", result.detected_language, result.language_confidence, result.text);

    assert!((0.0..=1.0).contains(&result.language_confidence));
    assert_eq!(result.text, result.text.trim());
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}
