use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clipscribe::{AudioAsset, AudioExtractor, Error, VideoAsset};

#[derive(Clone, Default)]
pub struct MockExtractor {
    pub calls: Arc<Mutex<Vec<PathBuf>>>,
    pub fail_with: Option<String>,
    /// Write a partial audio file before failing.
    pub leave_partial: bool,
}

impl MockExtractor {
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_after_partial_write(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            leave_partial: true,
            ..Self::default()
        }
    }
}

impl AudioExtractor for MockExtractor {
    /// Copies the video bytes to `<video>.mp3`, so the engine can see exactly
    /// which upload it was handed.
    fn extract(&self, video: &VideoAsset) -> clipscribe::Result<AudioAsset> {
        self.calls.lock().unwrap().push(video.path.clone());
        let audio_path = video.audio_path();

        if let Some(ref msg) = self.fail_with {
            if self.leave_partial {
                std::fs::write(&audio_path, b"half an mp3").unwrap();
            }
            return Err(Error::ExtractionFailed(msg.clone()));
        }

        std::fs::copy(&video.path, &audio_path)?;
        Ok(AudioAsset { path: audio_path })
    }
}
