use std::path::{Path, PathBuf};

use serde::Serialize;

/// An uploaded video sitting in the scratch directory.
#[derive(Debug, Clone)]
pub struct VideoAsset {
    pub path: PathBuf,
    /// Filename as supplied by the uploader, before sanitizing.
    pub original_name: String,
}

/// Audio track derived from a [`VideoAsset`].
#[derive(Debug, Clone)]
pub struct AudioAsset {
    pub path: PathBuf,
}

impl VideoAsset {
    /// Where the extracted audio for this video goes: the video path plus `.mp3`.
    pub fn audio_path(&self) -> PathBuf {
        let mut p = self.path.clone().into_os_string();
        p.push(".mp3");
        PathBuf::from(p)
    }
}

impl AudioAsset {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// English transcript of one audio asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptionResult {
    pub text: String,
    /// Most probable spoken language, as a whisper short code ("de", "ja", ...).
    pub detected_language: String,
    /// Probability of `detected_language`, in [0, 1].
    pub language_confidence: f32,
    pub duration_secs: f64,
    pub model: String,
}
