use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clipscribe::{join_segments, AudioAsset, Error, SpeechEngine, TranscriptionResult};

#[derive(Clone)]
pub enum Behavior {
    /// Return these recognized segments.
    Segments(Vec<String>),
    /// Return the audio file's contents as the transcript.
    Echo,
    Fail(String),
    /// Fail with an error outside the pipeline taxonomy.
    Io(String),
}

#[derive(Clone)]
pub struct MockEngine {
    pub behavior: Behavior,
    pub language: String,
    pub confidence: f32,
    /// Audio path per call, and whether it existed when the engine saw it.
    pub calls: Arc<Mutex<Vec<(PathBuf, bool)>>>,
}

impl MockEngine {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            language: "de".into(),
            confidence: 0.87,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn segments(segments: &[&str]) -> Self {
        Self::new(Behavior::Segments(
            segments.iter().map(|s| s.to_string()).collect(),
        ))
    }
}

impl SpeechEngine for MockEngine {
    fn transcribe_translate(&self, audio: &AudioAsset) -> clipscribe::Result<TranscriptionResult> {
        self.calls
            .lock()
            .unwrap()
            .push((audio.path.clone(), audio.path.exists()));

        let text = match &self.behavior {
            Behavior::Segments(segments) => join_segments(segments),
            Behavior::Echo => std::fs::read_to_string(&audio.path).unwrap().trim().to_string(),
            Behavior::Fail(msg) => return Err(Error::TranscriptionFailed(msg.clone())),
            Behavior::Io(msg) => {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    msg.clone(),
                )))
            }
        };

        Ok(TranscriptionResult {
            text,
            detected_language: self.language.clone(),
            language_confidence: self.confidence,
            duration_secs: 1.0,
            model: "mock-whisper".into(),
        })
    }
}
