use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, info_span};

use crate::audio::AudioExtractor;
use crate::error::{Error, Result};
use crate::store::TempStore;
use crate::summarize::{SummarizationClient, SummarizeOptions};
use crate::transcribe::SpeechEngine;
use crate::types::TranscriptionResult;

/// Sequences store → extract → transcribe, and forwards text to the summarizer.
///
/// Every file a transcribe run creates is gone by the time the call returns,
/// whichever stage failed. Nothing is remembered between calls.
pub struct Pipeline<X, E> {
    store: TempStore,
    extractor: X,
    engine: Arc<E>,
    summarizer: SummarizationClient,
}

impl<X: AudioExtractor, E: SpeechEngine> Pipeline<X, E> {
    pub fn new(
        store: TempStore,
        extractor: X,
        engine: Arc<E>,
        summarizer: SummarizationClient,
    ) -> Self {
        Self {
            store,
            extractor,
            engine,
            summarizer,
        }
    }

    pub fn store(&self) -> &TempStore {
        &self.store
    }

    pub fn summarization_enabled(&self) -> bool {
        self.summarizer.is_configured()
    }

    /// Transcribe an uploaded video into English text.
    ///
    /// Blocks for the duration of extraction and recognition; async callers
    /// should run it on a blocking thread.
    pub fn transcribe_upload(&self, bytes: &[u8], filename: &str) -> Result<TranscriptionResult> {
        let _span = info_span!("transcribe", filename).entered();

        if bytes.is_empty() {
            return Err(Error::InvalidInput("no video data provided".into()));
        }

        let video = self
            .store
            .store(bytes, filename)
            .map_err(|e| Error::ExtractionFailed(format!("could not store upload: {e}")))?;
        let _video_guard = self.store.guard(&video.path);
        // Guard the derived audio location up front so a partial write is
        // removed even if the extractor itself fails.
        let derived_audio_guard = self.store.guard(video.audio_path());
        debug!(path = %video.path.display(), "upload stored");

        let audio = self
            .extractor
            .extract(&video)
            .map_err(|e| within_taxonomy(e, Error::ExtractionFailed))?;
        let _audio_guard =
            (audio.path != derived_audio_guard.path()).then(|| self.store.guard(&audio.path));
        debug!(path = %audio.path.display(), "audio extracted");

        let result = self
            .engine
            .transcribe_translate(&audio)
            .map_err(|e| within_taxonomy(e, Error::TranscriptionFailed))?;

        info!(
            language = %result.detected_language,
            confidence = result.language_confidence,
            chars = result.text.len(),
            "transcription finished"
        );
        Ok(result)
    }

    /// Transcribe a video that is already on disk.
    ///
    /// The file is copied into the scratch directory first, so the original is
    /// never touched by cleanup.
    pub fn transcribe_path(&self, path: &Path) -> Result<TranscriptionResult> {
        let bytes = std::fs::read(path).map_err(|e| {
            Error::InvalidInput(format!("cannot read {}: {e}", path.display()))
        })?;
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.transcribe_upload(&bytes, &filename)
    }

    /// Summarize caller-supplied text.
    pub async fn summarize_text(&self, text: &str, options: &SummarizeOptions) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput(
                "no text was provided for summarization".into(),
            ));
        }

        self.summarizer
            .summarize(text, options)
            .await
            .map_err(|e| within_taxonomy(e, Error::SummarizationFailed))
    }
}

/// Keep pipeline errors inside the five-way taxonomy; anything else is
/// attributed to the stage that produced it.
fn within_taxonomy(e: Error, stage: fn(String) -> Error) -> Error {
    match e {
        Error::InvalidInput(_)
        | Error::ExtractionFailed(_)
        | Error::TranscriptionFailed(_)
        | Error::SummarizationFailed(_)
        | Error::SummarizationUnconfigured => e,
        other => stage(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_taxonomy_passes_through() {
        let e = within_taxonomy(
            Error::SummarizationUnconfigured,
            Error::SummarizationFailed,
        );
        assert!(matches!(e, Error::SummarizationUnconfigured));
    }

    #[test]
    fn test_within_taxonomy_wraps_foreign_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let e = within_taxonomy(Error::Io(io), Error::ExtractionFailed);
        assert!(matches!(e, Error::ExtractionFailed(_)));
        assert!(e.detail().contains("disk on fire"));
    }
}
