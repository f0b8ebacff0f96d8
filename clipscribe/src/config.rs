use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Whisper model sizes.
#[derive(Debug, Clone, PartialEq)]
pub enum Model {
    Tiny,
    TinyEn,
    Base,
    BaseEn,
    Small,
    SmallEn,
    Medium,
    MediumEn,
    LargeV2,
    LargeV3,
    LargeV3Turbo,
    /// User-provided .ggml file path.
    Custom(PathBuf),
}

impl Model {
    /// Every named model with its approximate download size.
    pub const CATALOG: &'static [(&'static str, &'static str)] = &[
        ("tiny", "75 MB"),
        ("tiny.en", "75 MB"),
        ("base", "142 MB"),
        ("base.en", "142 MB"),
        ("small", "466 MB"),
        ("small.en", "466 MB"),
        ("medium", "1.5 GB"),
        ("medium.en", "1.5 GB"),
        ("large-v2", "2.9 GB"),
        ("large-v3", "2.9 GB"),
        ("large-v3-turbo", "~1.6 GB"),
    ];

    /// Model filename as used by HuggingFace / whisper.cpp.
    pub fn filename(&self) -> String {
        match self {
            Model::Custom(path) => path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| "custom-model".into()),
            named => format!("ggml-{}.bin", named.name()),
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &str {
        match self {
            Model::Tiny => "tiny",
            Model::TinyEn => "tiny.en",
            Model::Base => "base",
            Model::BaseEn => "base.en",
            Model::Small => "small",
            Model::SmallEn => "small.en",
            Model::Medium => "medium",
            Model::MediumEn => "medium.en",
            Model::LargeV2 => "large-v2",
            Model::LargeV3 => "large-v3",
            Model::LargeV3Turbo => "large-v3-turbo",
            Model::Custom(_) => "custom",
        }
    }

    /// Parse a model name (e.g. CLI argument).
    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "tiny" => Some(Model::Tiny),
            "tiny.en" => Some(Model::TinyEn),
            "base" => Some(Model::Base),
            "base.en" => Some(Model::BaseEn),
            "small" => Some(Model::Small),
            "small.en" => Some(Model::SmallEn),
            "medium" => Some(Model::Medium),
            "medium.en" => Some(Model::MediumEn),
            "large-v2" => Some(Model::LargeV2),
            "large-v3" => Some(Model::LargeV3),
            "large-v3-turbo" => Some(Model::LargeV3Turbo),
            _ => None,
        }
    }

    /// English-only models can't detect or translate other languages.
    pub fn is_english_only(&self) -> bool {
        matches!(
            self,
            Model::TinyEn | Model::BaseEn | Model::SmallEn | Model::MediumEn
        )
    }
}

/// Options for the speech engine.
///
/// The engine always runs in translate mode: whatever the spoken language,
/// the transcript comes out in English.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub model: Model,
    pub beam_size: u32,
    pub n_threads: Option<u32>,
    pub gpu: bool,
    pub gpu_device: u32,
    pub temperature: f32,
    pub cache_dir: Option<PathBuf>,
    /// ffmpeg binary used to decode audio for recognition.
    pub ffmpeg: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            model: Model::Tiny,
            beam_size: 5,
            n_threads: None,
            gpu: true,
            gpu_device: 0,
            temperature: 0.0,
            cache_dir: None,
            ffmpeg: "ffmpeg".into(),
        }
    }
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model. English-only models are rejected since they can't translate.
    pub fn model(mut self, model: Model) -> Result<Self> {
        if model.is_english_only() {
            return Err(Error::InvalidOption(format!(
                "model {} is English-only and cannot translate — use a multilingual model",
                model.name()
            )));
        }
        self.model = model;
        Ok(self)
    }

    pub fn beam_size(mut self, size: u32) -> Result<Self> {
        if size == 0 || size > 16 {
            return Err(Error::InvalidOption(format!(
                "beam_size must be 1..=16, got {size}"
            )));
        }
        self.beam_size = size;
        Ok(self)
    }

    pub fn n_threads(mut self, n: u32) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidOption("n_threads must be at least 1".into()));
        }
        self.n_threads = Some(n);
        Ok(self)
    }

    pub fn gpu(mut self, enabled: bool) -> Self {
        self.gpu = enabled;
        self
    }

    pub fn gpu_device(mut self, device: u32) -> Self {
        self.gpu_device = device;
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    pub fn cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }

    pub fn ffmpeg(mut self, binary: impl Into<String>) -> Self {
        self.ffmpeg = binary.into();
        self
    }

    /// Resolve the cache directory, defaulting to ~/.cache/clipscribe/models.
    pub fn resolve_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("clipscribe")
                .join("models")
        })
    }
}

/// Environment variable holding the Hugging Face API token.
pub const TOKEN_ENV: &str = "HUGGING_FACE_HUB_TOKEN";

/// Default summarization endpoint.
pub const DEFAULT_SUMMARIZATION_URL: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-cnn";

/// Connection settings for the remote summarizer.
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    /// Bearer token. `None` disables summarization.
    pub token: Option<String>,
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            token: None,
            endpoint: DEFAULT_SUMMARIZATION_URL.into(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl SummarizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the token from `HUGGING_FACE_HUB_TOKEN`. An unset or blank value
    /// leaves summarization disabled.
    pub fn from_env() -> Self {
        Self::default().token(std::env::var(TOKEN_ENV).ok())
    }

    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }
}
