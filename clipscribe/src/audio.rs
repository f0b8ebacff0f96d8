use std::path::Path;
use std::process::Command;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{AudioAsset, VideoAsset};

/// Target sample rate for whisper.cpp.
pub(crate) const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Maximum audio duration in seconds (8 hours).
/// 8 hours at 16kHz mono f32 = ~1.8 GB.
const MAX_AUDIO_DURATION_SECS: f64 = 8.0 * 3600.0;

/// Pulls the audio track out of a video container.
pub trait AudioExtractor: Send + Sync {
    /// Write the first audio stream of `video` to a standalone file.
    ///
    /// On failure no audio file is left behind.
    fn extract(&self, video: &VideoAsset) -> Result<AudioAsset>;
}

/// Extracts audio by running ffmpeg as a subprocess.
///
/// The output is MP3 next to the video (`<video>.mp3`). ffmpeg runs with
/// `-nostdin -loglevel error`, so it never prints progress, and the child
/// process exiting closes the container on every path.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    ffmpeg: String,
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".into(),
        }
    }
}

impl FfmpegExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific ffmpeg binary instead of the one on `PATH`.
    pub fn with_binary(mut self, ffmpeg: impl Into<String>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self
    }
}

impl AudioExtractor for FfmpegExtractor {
    fn extract(&self, video: &VideoAsset) -> Result<AudioAsset> {
        info!(path = %video.path.display(), "extracting audio");

        if !video.path.exists() {
            return Err(Error::ExtractionFailed(format!(
                "video file not found: {}",
                video.path.display()
            )));
        }

        let audio_path = video.audio_path();

        let output = Command::new(&self.ffmpeg)
            .args(["-nostdin", "-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(&video.path)
            .args([
                "-map", "0:a:0", "-vn", "-acodec", "libmp3lame", "-q:a", "2", "-f", "mp3",
            ])
            .arg(&audio_path)
            .output();

        let failure = match output {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Some(ffmpeg_not_found(&self.ffmpeg))
            }
            Err(e) => Some(format!("failed to run ffmpeg: {e}")),
            Ok(out) if !out.status.success() => {
                Some(describe_ffmpeg_failure(&String::from_utf8_lossy(&out.stderr)))
            }
            Ok(_) => match std::fs::metadata(&audio_path) {
                Ok(meta) if meta.len() > 0 => None,
                _ => Some("ffmpeg produced no audio output".to_string()),
            },
        };

        if let Some(detail) = failure {
            remove_partial(&audio_path);
            return Err(Error::ExtractionFailed(detail));
        }

        debug!(path = %audio_path.display(), "audio extracted");
        Ok(AudioAsset { path: audio_path })
    }
}

fn ffmpeg_not_found(ffmpeg: &str) -> String {
    format!("ffmpeg not found ({ffmpeg}); install with: apt install ffmpeg")
}

/// Turn ffmpeg's stderr into a one-line cause.
fn describe_ffmpeg_failure(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.contains("matches no streams") {
        return "video has no audio stream".to_string();
    }
    if stderr.contains("No space left on device") {
        return "no space left on device while writing audio".to_string();
    }
    match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
        Some(last) => format!("ffmpeg failed: {}", last.trim()),
        None => "ffmpeg failed with no diagnostic output".to_string(),
    }
}

fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed partial audio"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial audio"),
    }
}

/// Decode an audio file to 16kHz mono f32 samples ready for whisper.
///
/// ffmpeg handles decoding, resampling, and channel mixing in one shot.
/// Output format is raw PCM signed 16-bit little-endian, which we convert to f32.
/// Decode failures are reported as [`Error::TranscriptionFailed`], since this
/// runs as the first step of recognition. `ffmpeg` is the binary to run.
pub fn load_samples(ffmpeg: &str, path: &Path) -> Result<Vec<f32>> {
    info!(path = %path.display(), "loading audio");

    if !path.exists() {
        return Err(Error::TranscriptionFailed(format!(
            "audio file not found: {}",
            path.display()
        )));
    }

    let output = Command::new(ffmpeg)
        .args(["-nostdin", "-threads", "0", "-i"])
        .arg(path)
        .args([
            "-f",
            "s16le",
            "-ac",
            "1",
            "-acodec",
            "pcm_s16le",
            "-ar",
            &WHISPER_SAMPLE_RATE.to_string(),
            "-",
        ])
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::TranscriptionFailed(ffmpeg_not_found(ffmpeg))
            } else {
                Error::TranscriptionFailed(format!("failed to run ffmpeg: {e}"))
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::TranscriptionFailed(format!(
            "unreadable audio: {}",
            stderr.trim().lines().last().unwrap_or("ffmpeg failed")
        )));
    }

    let samples = pcm_s16le_to_f32(&output.stdout);
    if samples.is_empty() {
        return Err(Error::TranscriptionFailed("audio track is empty".into()));
    }

    let duration = samples.len() as f64 / WHISPER_SAMPLE_RATE as f64;
    if duration > MAX_AUDIO_DURATION_SECS {
        return Err(Error::TranscriptionFailed(format!(
            "audio too long ({duration:.0}s) — maximum supported duration is {MAX_AUDIO_DURATION_SECS:.0}s"
        )));
    }

    debug!(
        samples = samples.len(),
        duration_secs = format!("{duration:.1}"),
        "decoded audio"
    );
    Ok(samples)
}

/// Convert s16le bytes to f32 samples, normalized to [-1.0, 1.0].
fn pcm_s16le_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0)
        .collect()
}
