use std::path::Path;
use std::sync::Mutex;

use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::{self, WHISPER_SAMPLE_RATE};
use crate::config::EngineOptions;
use crate::error::{Error, Result};
use crate::model;
use crate::types::{AudioAsset, TranscriptionResult};

/// Speech recognition that always produces English text.
pub trait SpeechEngine: Send + Sync {
    /// Recognize `audio` in translate mode.
    ///
    /// Silent audio yields an empty `text`, not an error.
    fn transcribe_translate(&self, audio: &AudioAsset) -> Result<TranscriptionResult>;
}

/// A whisper.cpp model loaded once and shared for the life of the process.
///
/// whisper.cpp decoding is CPU/GPU bound and one decode already saturates the
/// configured threads, so calls are serialized: at most one recognition runs
/// at a time and concurrent callers queue on the lock.
pub struct WhisperEngine {
    ctx: WhisperContext,
    options: EngineOptions,
    busy: Mutex<()>,
}

impl WhisperEngine {
    /// Resolve the configured model (downloading it if necessary) and load it.
    pub async fn from_options(options: EngineOptions) -> Result<Self> {
        let cache_dir = options.resolve_cache_dir();
        let model_path = model::ensure_model(&options.model, &cache_dir).await?;
        Self::load(&model_path, options)
    }

    /// Load a model file from disk.
    pub fn load(model_path: &Path, options: EngineOptions) -> Result<Self> {
        info!(model = %model_path.display(), "loading whisper model");

        let mut ctx_params = WhisperContextParameters::new();
        ctx_params.use_gpu(options.gpu);
        ctx_params.gpu_device(options.gpu_device as i32);

        let path = model_path
            .to_str()
            .ok_or_else(|| Error::Model("model path contains invalid UTF-8".into()))?;
        let ctx = WhisperContext::new_with_params(path, ctx_params)
            .map_err(|e| Error::Model(format!("failed to load {}: {e}", model_path.display())))?;

        info!(model = options.model.name(), "whisper model loaded");
        Ok(Self {
            ctx,
            options,
            busy: Mutex::new(()),
        })
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    fn threads(&self) -> usize {
        match self.options.n_threads {
            Some(n) => n as usize,
            None => std::thread::available_parallelism()
                .map(|n| n.get().min(8))
                .unwrap_or(4),
        }
    }

    /// Run detection and translation over 16kHz mono samples.
    pub fn transcribe_samples(&self, samples: &[f32]) -> Result<TranscriptionResult> {
        let _turn = self.busy.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut state = self.ctx.create_state().map_err(whisper_err("create state"))?;
        let threads = self.threads();

        state
            .pcm_to_mel(samples, threads)
            .map_err(whisper_err("compute mel spectrogram"))?;
        let (lang_id, probs) = state
            .lang_detect(0, threads)
            .map_err(whisper_err("detect language"))?;
        let (language, confidence) = language_metadata(lang_id, &probs);
        info!(language = %language, confidence, "detected source language");

        let mut params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: self.options.beam_size as i32,
            patience: -1.0,
        });
        params.set_translate(true);
        params.set_language(whisper_rs::get_lang_str(lang_id));
        params.set_temperature(self.options.temperature);
        params.set_n_threads(threads as i32);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_print_special(false);

        debug!(samples = samples.len(), beam_size = self.options.beam_size, "running translation");
        state.full(params, samples).map_err(whisper_err("decode"))?;

        let num_segments = state.full_n_segments();
        let mut texts = Vec::with_capacity(num_segments.max(0) as usize);
        for i in 0..num_segments {
            let segment = state
                .get_segment(i)
                .ok_or_else(|| Error::TranscriptionFailed(format!("segment {i} not found")))?;
            let text = segment
                .to_str_lossy()
                .map_err(|e| Error::TranscriptionFailed(format!("segment {i} text: {e}")))?;
            texts.push(text.into_owned());
        }
        debug!(num_segments, "translation complete");

        Ok(TranscriptionResult {
            text: join_segments(&texts),
            detected_language: language,
            language_confidence: confidence,
            duration_secs: samples.len() as f64 / WHISPER_SAMPLE_RATE as f64,
            model: self.options.model.name().to_string(),
        })
    }
}

impl SpeechEngine for WhisperEngine {
    fn transcribe_translate(&self, audio: &AudioAsset) -> Result<TranscriptionResult> {
        let samples = audio::load_samples(&self.options.ffmpeg, audio.path())?;
        self.transcribe_samples(&samples)
    }
}

fn whisper_err(stage: &'static str) -> impl Fn(whisper_rs::WhisperError) -> Error {
    move |e| Error::TranscriptionFailed(format!("{stage}: {e}"))
}

/// Concatenate segment texts in order, then trim the ends.
///
/// Whisper segments carry their own leading spaces, so nothing is inserted
/// between them.
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Short language code and its probability for a detected language id.
fn language_metadata(lang_id: i32, probs: &[f32]) -> (String, f32) {
    let code = whisper_rs::get_lang_str(lang_id).unwrap_or("unknown");
    let confidence = usize::try_from(lang_id)
        .ok()
        .and_then(|i| probs.get(i))
        .copied()
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);
    (code.to_string(), confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_segments_keeps_order_without_separator() {
        assert_eq!(join_segments(&["Hello ", "world."]), "Hello world.");
    }

    #[test]
    fn test_join_segments_trims_ends_only() {
        let segs = [" The meeting", " started late.", " Then  it ended. "];
        assert_eq!(
            join_segments(&segs),
            "The meeting started late. Then  it ended."
        );
    }

    #[test]
    fn test_join_segments_empty() {
        let none: [&str; 0] = [];
        assert_eq!(join_segments(&none), "");
        assert_eq!(join_segments(&["  ", "\n"]), "");
    }

    #[test]
    fn test_language_metadata() {
        let en = whisper_rs::get_lang_id("en").unwrap();
        let mut probs = vec![0.0; (en as usize) + 4];
        probs[en as usize] = 0.93;

        let (code, p) = language_metadata(en, &probs);
        assert_eq!(code, "en");
        assert!((p - 0.93).abs() < 1e-6);
    }

    #[test]
    fn test_language_metadata_out_of_range() {
        let (code, p) = language_metadata(-1, &[0.5]);
        assert_eq!(code, "unknown");
        assert_eq!(p, 0.0);
    }
}
