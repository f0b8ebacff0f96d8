use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use clipscribe::config::DEFAULT_SUMMARIZATION_URL;
use clipscribe::{
    EngineOptions, Error, FfmpegExtractor, Model, Pipeline, SummarizationClient,
    SummarizeOptions, SummarizerConfig, TempStore, WhisperEngine,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

mod server;

#[derive(Parser)]
#[command(
    name = "clipscribe",
    about = "Transcribe videos into English text and summarize the result"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (POST /transcribe, POST /summarize).
    Serve {
        /// Address to listen on.
        #[arg(long, default_value = "127.0.0.1:5000")]
        bind: SocketAddr,

        /// Directory for request-scoped temporary files.
        #[arg(long, default_value = "uploads")]
        scratch_dir: PathBuf,

        /// Largest accepted upload, in megabytes.
        #[arg(long, default_value_t = 512)]
        max_upload_mb: usize,

        #[command(flatten)]
        engine: EngineArgs,

        #[command(flatten)]
        summarizer: SummarizerArgs,
    },

    /// Transcribe a local video file into English.
    Transcribe {
        /// Video file to transcribe.
        video: PathBuf,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,

        /// Directory for temporary files (default: system temp dir).
        #[arg(long)]
        scratch_dir: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Summarize text with the remote summarization model.
    Summarize {
        /// Text to summarize.
        #[arg(required_unless_present = "file")]
        text: Option<String>,

        /// Read the text from a file instead.
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Maximum summary length in tokens.
        #[arg(long, default_value_t = 150)]
        max_length: u32,

        /// Minimum summary length in tokens.
        #[arg(long, default_value_t = 30)]
        min_length: u32,

        /// Allow sampling (non-deterministic output).
        #[arg(long)]
        sample: bool,

        #[command(flatten)]
        summarizer: SummarizerArgs,
    },

    /// Download a model without transcribing.
    DownloadModel {
        name: String,

        /// Model cache directory.
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },

    /// List available and cached models.
    ListModels {
        /// Model cache directory.
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
struct EngineArgs {
    /// Whisper model name, or a path to a .ggml file. Must be multilingual.
    #[arg(short, long, default_value = "tiny")]
    model: String,

    /// Beam search width.
    #[arg(long, default_value_t = 5)]
    beam_size: u32,

    /// Number of threads (default: auto).
    #[arg(long)]
    threads: Option<u32>,

    /// Disable GPU acceleration.
    #[arg(long)]
    no_gpu: bool,

    /// GPU device ID.
    #[arg(long, default_value_t = 0)]
    gpu_device: u32,

    /// Model cache directory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// ffmpeg binary used for extraction and decoding.
    #[arg(long, env = "CLIPSCRIBE_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: String,
}

impl EngineArgs {
    fn into_options(self) -> clipscribe::Result<EngineOptions> {
        let mut opts = EngineOptions::new()
            .model(parse_model(&self.model)?)?
            .beam_size(self.beam_size)?
            .gpu(!self.no_gpu)
            .gpu_device(self.gpu_device)
            .ffmpeg(self.ffmpeg);
        if let Some(n) = self.threads {
            opts = opts.n_threads(n)?;
        }
        if let Some(dir) = self.cache_dir {
            opts = opts.cache_dir(dir);
        }
        Ok(opts)
    }
}

#[derive(Args)]
struct SummarizerArgs {
    /// Hugging Face API token. Summarization is disabled without one.
    #[arg(long, env = "HUGGING_FACE_HUB_TOKEN", hide_env_values = true)]
    hf_token: Option<String>,

    /// Summarization endpoint.
    #[arg(long, default_value = DEFAULT_SUMMARIZATION_URL)]
    summarize_url: String,

    /// Timeout for the summarization request, in seconds.
    #[arg(long, default_value_t = 60)]
    summarize_timeout_secs: u64,
}

impl SummarizerArgs {
    fn into_config(self) -> SummarizerConfig {
        SummarizerConfig::new()
            .token(self.hf_token)
            .endpoint(self.summarize_url)
            .timeout(Duration::from_secs(self.summarize_timeout_secs))
    }
}

fn parse_model(name: &str) -> clipscribe::Result<Model> {
    if let Some(model) = Model::parse_name(name) {
        return Ok(model);
    }
    let path = PathBuf::from(name);
    if path.exists() {
        Ok(Model::Custom(path))
    } else {
        Err(Error::InvalidOption(format!(
            "unknown model: {name} — use `clipscribe list-models`, or provide a path to a .ggml file"
        )))
    }
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("clipscribe=info,clipscribe_cli=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Command) -> clipscribe::Result<()> {
    match command {
        Command::Serve {
            bind,
            scratch_dir,
            max_upload_mb,
            engine,
            summarizer,
        } => {
            let engine = WhisperEngine::from_options(engine.into_options()?).await?;
            let extractor = FfmpegExtractor::new().with_binary(engine.options().ffmpeg.clone());
            let pipeline = Pipeline::new(
                TempStore::new(scratch_dir)?,
                extractor,
                Arc::new(engine),
                SummarizationClient::new(summarizer.into_config())?,
            );
            server::serve(Arc::new(pipeline), bind, max_upload_mb * 1024 * 1024).await?;
        }

        Command::Transcribe {
            video,
            json,
            scratch_dir,
            engine,
        } => {
            let engine = WhisperEngine::from_options(engine.into_options()?).await?;
            let scratch_dir = scratch_dir.unwrap_or_else(|| {
                std::env::temp_dir().join(format!("clipscribe-{}", std::process::id()))
            });
            let extractor = FfmpegExtractor::new().with_binary(engine.options().ffmpeg.clone());
            let pipeline = Arc::new(Pipeline::new(
                TempStore::new(&scratch_dir)?,
                extractor,
                Arc::new(engine),
                SummarizationClient::new(SummarizerConfig::new())?,
            ));

            let spinner = spinner("Transcribing");
            let worker = Arc::clone(&pipeline);
            let result = tokio::task::spawn_blocking(move || worker.transcribe_path(&video))
                .await
                .map_err(|e| Error::TranscriptionFailed(format!("worker failed: {e}")))?;
            spinner.finish_and_clear();
            // Only removes the directory if the run left it empty.
            let _ = std::fs::remove_dir(&scratch_dir);
            let result = result?;

            eprintln!(
                "Transcription complete: {:.1}s of audio, source language: {} (p={:.2})",
                result.duration_secs, result.detected_language, result.language_confidence,
            );
            if json {
                let out = serde_json::to_string_pretty(&result)
                    .map_err(|e| Error::InvalidOption(format!("JSON error: {e}")))?;
                println!("{out}");
            } else {
                println!("{}", result.text);
            }
        }

        Command::Summarize {
            text,
            file,
            max_length,
            min_length,
            sample,
            summarizer,
        } => {
            let text = match (text, file) {
                (_, Some(path)) => std::fs::read_to_string(&path).map_err(|e| {
                    Error::InvalidInput(format!("cannot read {}: {e}", path.display()))
                })?,
                (Some(text), None) => text,
                (None, None) => return Err(Error::InvalidInput("no text provided".into())),
            };
            let options = SummarizeOptions::new()
                .max_length(max_length)
                .min_length(min_length)
                .deterministic(!sample);

            let client = SummarizationClient::new(summarizer.into_config())?;
            let spinner = spinner("Summarizing");
            let summary = client.summarize(text.trim(), &options).await;
            spinner.finish_and_clear();
            println!("{}", summary?);
        }

        Command::DownloadModel { name, cache_dir } => {
            let model = Model::parse_name(&name).ok_or_else(|| {
                Error::InvalidOption(format!(
                    "unknown model: {name} — use `clipscribe list-models` to see available models"
                ))
            })?;
            let cache_dir = cache_dir.unwrap_or_else(|| EngineOptions::default().resolve_cache_dir());
            let path = clipscribe::model::ensure_model(&model, &cache_dir).await?;
            println!("Model ready: {}", path.display());
        }

        Command::ListModels { cache_dir } => {
            println!("{:<16} {:<10} {}", "MODEL", "SIZE", "TRANSLATES");
            println!("{:<16} {:<10} {}", "-----", "----", "----------");
            for (name, size) in Model::CATALOG {
                let translates = Model::parse_name(name).is_some_and(|m| !m.is_english_only());
                println!("{name:<16} {size:<10} {}", if translates { "yes" } else { "no" });
            }

            let cache_dir = cache_dir.unwrap_or_else(|| EngineOptions::default().resolve_cache_dir());
            let cached = clipscribe::model::list_cached_models(&cache_dir);
            if !cached.is_empty() {
                println!("\nCached models in {}:", cache_dir.display());
                for path in cached {
                    let size = std::fs::metadata(&path)
                        .map(|m| format_bytes(m.len()))
                        .unwrap_or_default();
                    println!(
                        "  {} ({})",
                        path.file_name()
                            .map(|f| f.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                        size
                    );
                }
            }
        }
    }
    Ok(())
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1} GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.0} MB", bytes as f64 / 1_000_000.0)
    } else {
        format!("{:.0} KB", bytes as f64 / 1_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_model_names_and_paths() {
        assert_eq!(parse_model("small").unwrap(), Model::Small);
        assert!(parse_model("gigantic").is_err());

        let tmp = tempfile::NamedTempFile::new().unwrap();
        let model = parse_model(tmp.path().to_str().unwrap()).unwrap();
        assert_eq!(model, Model::Custom(tmp.path().to_path_buf()));
    }

    #[test]
    fn test_engine_args_reject_english_only() {
        let cli = Cli::try_parse_from(["clipscribe", "transcribe", "a.mp4", "--model", "base.en"]).unwrap();
        let Command::Transcribe { engine, .. } = cli.command else {
            panic!("expected transcribe");
        };
        assert!(matches!(engine.into_options(), Err(Error::InvalidOption(_))));
    }

    #[test]
    fn test_summarize_requires_text_or_file() {
        assert!(Cli::try_parse_from(["clipscribe", "summarize"]).is_err());
        assert!(Cli::try_parse_from(["clipscribe", "summarize", "some text"]).is_ok());
        assert!(Cli::try_parse_from(["clipscribe", "summarize", "--file", "t.txt"]).is_ok());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(75_000_000), "75 MB");
        assert_eq!(format_bytes(2_900_000_000), "2.9 GB");
        assert_eq!(format_bytes(12_000), "12 KB");
    }
}
