use std::path::PathBuf;

/// All errors that can occur in clipscribe.
///
/// The first five variants form the pipeline taxonomy: every pipeline
/// operation fails with exactly one of them, carrying the underlying cause as
/// a detail string. The remaining variants only arise while setting the
/// process up (loading or downloading a model, creating the scratch dir).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("audio extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("summarization failed: {0}")]
    SummarizationFailed(String),

    #[error("summarization is not configured — set HUGGING_FACE_HUB_TOKEN")]
    SummarizationUnconfigured,

    #[error("model error: {0}")]
    Model(String),

    #[error("model not found: {path}")]
    ModelNotFound { path: PathBuf },

    #[error("model download failed: {0}")]
    ModelDownload(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The human-readable cause, without the category prefix.
    ///
    /// This is what the HTTP layer puts in `{"error": ...}`.
    pub fn detail(&self) -> String {
        match self {
            Error::InvalidInput(d)
            | Error::ExtractionFailed(d)
            | Error::TranscriptionFailed(d)
            | Error::SummarizationFailed(d) => d.clone(),
            other => other.to_string(),
        }
    }

    /// Whether the caller sent something unusable (as opposed to a stage failing).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
