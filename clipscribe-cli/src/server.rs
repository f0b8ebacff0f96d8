//! HTTP surface over the pipeline.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clipscribe::{AudioExtractor, Error, Pipeline, SpeechEngine, SummarizeOptions};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Error body `{"error": detail}` with a status picked from the error kind.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = status_for(&e);
        if status.is_server_error() {
            error!(error = %e, "request failed");
        } else {
            warn!(error = %e, "request rejected");
        }
        Self {
            status,
            message: e.detail(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::SummarizationUnconfigured => StatusCode::SERVICE_UNAVAILABLE,
        Error::SummarizationFailed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Build the router. Generic over the pipeline stages so it can be driven
/// with stand-ins.
pub fn router<X, E>(pipeline: Arc<Pipeline<X, E>>, max_upload_bytes: usize) -> Router
where
    X: AudioExtractor + 'static,
    E: SpeechEngine + 'static,
{
    Router::new()
        .route("/", get(index))
        .route("/health", get(health::<X, E>))
        .route("/transcribe", post(transcribe::<X, E>))
        .route("/summarize", post(summarize::<X, E>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

/// Bind and serve until Ctrl-C.
pub async fn serve<X, E>(
    pipeline: Arc<Pipeline<X, E>>,
    bind: SocketAddr,
    max_upload_bytes: usize,
) -> std::io::Result<()>
where
    X: AudioExtractor + 'static,
    E: SpeechEngine + 'static,
{
    if !pipeline.summarization_enabled() {
        warn!("HUGGING_FACE_HUB_TOKEN not set — /summarize will answer 503");
    }

    let app = router(pipeline, max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutting down");
        })
        .await
}

async fn index() -> &'static str {
    "clipscribe: POST /transcribe (multipart field \"video\"), POST /summarize ({\"text\": ...})\n"
}

async fn health<X, E>(State(pipeline): State<Arc<Pipeline<X, E>>>) -> Json<serde_json::Value>
where
    X: AudioExtractor + 'static,
    E: SpeechEngine + 'static,
{
    Json(json!({
        "status": "ok",
        "summarization": pipeline.summarization_enabled(),
    }))
}

async fn transcribe<X, E>(
    State(pipeline): State<Arc<Pipeline<X, E>>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError>
where
    X: AudioExtractor + 'static,
    E: SpeechEngine + 'static,
{
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError {
        status: e.status(),
        message: e.body_text(),
    })? {
        if field.name() != Some("video") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await.map_err(|e| ApiError {
            status: e.status(),
            message: e.body_text(),
        })?;
        upload = Some((filename, bytes));
        break;
    }

    let Some((filename, bytes)) = upload else {
        return Err(ApiError::bad_request("No video file provided"));
    };

    let result = tokio::task::spawn_blocking(move || pipeline.transcribe_upload(&bytes, &filename))
        .await
        .map_err(|e| Error::TranscriptionFailed(format!("worker failed: {e}")))??;

    Ok(Json(json!({
        "transcript": result.text,
        "language": result.detected_language,
        "language_probability": result.language_confidence,
    })))
}

#[derive(Debug, Deserialize)]
struct SummarizeRequest {
    text: Option<String>,
    max_length: Option<u32>,
    min_length: Option<u32>,
}

async fn summarize<X, E>(
    State(pipeline): State<Arc<Pipeline<X, E>>>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError>
where
    X: AudioExtractor + 'static,
    E: SpeechEngine + 'static,
{
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "unreadable summarize payload");
            return Err(ApiError::bad_request("No text was provided for summarization"));
        }
    };
    let Some(text) = request.text else {
        return Err(ApiError::bad_request("No text was provided for summarization"));
    };

    let mut options = SummarizeOptions::default();
    if let Some(n) = request.max_length {
        options = options.max_length(n);
    }
    if let Some(n) = request.min_length {
        options = options.min_length(n);
    }

    let summary = pipeline.summarize_text(&text, &options).await?;
    Ok(Json(json!({ "summary": summary })))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use clipscribe::{
        AudioAsset, SummarizationClient, SummarizerConfig, TempStore, TranscriptionResult,
        VideoAsset,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    struct CopyExtractor;

    impl AudioExtractor for CopyExtractor {
        fn extract(&self, video: &VideoAsset) -> clipscribe::Result<AudioAsset> {
            if std::fs::read(&video.path)? == b"no audio" {
                return Err(Error::ExtractionFailed("video has no audio stream".into()));
            }
            let path = video.audio_path();
            std::fs::copy(&video.path, &path)?;
            Ok(AudioAsset { path })
        }
    }

    struct FixedEngine;

    impl SpeechEngine for FixedEngine {
        fn transcribe_translate(&self, _audio: &AudioAsset) -> clipscribe::Result<TranscriptionResult> {
            Ok(TranscriptionResult {
                text: clipscribe::join_segments(&[" Hello ", "world. "]),
                detected_language: "fr".into(),
                language_confidence: 0.75,
                duration_secs: 1.0,
                model: "fixed".into(),
            })
        }
    }

    fn app(scratch: &std::path::Path) -> Router {
        let pipeline = Pipeline::new(
            TempStore::new(scratch).unwrap(),
            CopyExtractor,
            Arc::new(FixedEngine),
            SummarizationClient::new(
                SummarizerConfig::new()
                    .endpoint("http://127.0.0.1:9/unused")
                    .timeout(Duration::from_secs(1)),
            )
            .unwrap(),
        );
        router(Arc::new(pipeline), 1024 * 1024)
    }

    const BOUNDARY: &str = "clipscribe-test-boundary";

    fn multipart_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: video/mp4\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/transcribe")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_transcribe_returns_transcript() {
        let scratch = tempfile::tempdir().unwrap();
        let (status, body) = send(
            app(scratch.path()),
            multipart_request("video", "talk.mp4", b"fake video"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["transcript"], "Hello world.");
        assert_eq!(body["language"], "fr");
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_transcribe_missing_field_is_400() {
        let scratch = tempfile::tempdir().unwrap();
        let (status, body) = send(
            app(scratch.path()),
            multipart_request("attachment", "talk.mp4", b"fake video"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No video file provided");
    }

    #[tokio::test]
    async fn test_transcribe_pipeline_failure_is_500() {
        let scratch = tempfile::tempdir().unwrap();
        let (status, body) = send(
            app(scratch.path()),
            multipart_request("video", "mute.mp4", b"no audio"),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "video has no audio stream");
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_summarize_missing_text_is_400() {
        let scratch = tempfile::tempdir().unwrap();
        let (status, body) = send(app(scratch.path()), json_request("/summarize", "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No text was provided for summarization");

        let (status, _) = send(app(scratch.path()), json_request("/summarize", "not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_summarize_unconfigured_is_503() {
        let scratch = tempfile::tempdir().unwrap();
        let (status, body) = send(
            app(scratch.path()),
            json_request("/summarize", r#"{"text":"a long transcript"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("HUGGING_FACE_HUB_TOKEN"));
    }

    #[tokio::test]
    async fn test_health_reports_summarization() {
        let scratch = tempfile::tempdir().unwrap();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app(scratch.path()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summarization"], false);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&Error::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&Error::ExtractionFailed("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&Error::TranscriptionFailed("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&Error::SummarizationFailed("x".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&Error::SummarizationUnconfigured),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
