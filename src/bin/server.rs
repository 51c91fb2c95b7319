//! HTTP front door (spec §6): a thin axum surface over [`echoid::AppContext`].
//! Every handler just extracts a request, calls into the core on a blocking
//! thread, and serialises the result — no fingerprinting logic lives here.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use echoid::config::ServiceConfig;
use echoid::error::EchoidError;
use echoid::ingest::NewRecording;
use echoid::models::{IdentifyOutcome, IngestOutcome, RecordingMetadata, StoreStats};
use echoid::store::postgres::PostgresStore;
use echoid::AppContext;
use serde::Serialize;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = ServiceConfig::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_filter.clone()))
        .init();

    let database_url = env::var("DATABASE_URL")?;
    let store = PostgresStore::connect(&database_url)?;
    let ctx = Arc::new(AppContext::new(config.clone(), Arc::new(store)));

    let app = Router::new()
        .route("/recordings/identify", post(identify))
        .route("/recordings", post(create_recording).get(list_recordings))
        .route("/recordings/{id}", get(get_recording).delete(delete_recording))
        .route("/stats", get(stats))
        .with_state(ctx);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(addr = %config.http_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Serialize)]
struct RecordingResponse {
    id: i64,
    title: String,
    artist: String,
    album: Option<String>,
    duration_s: Option<f64>,
}

impl From<RecordingMetadata> for RecordingResponse {
    fn from(m: RecordingMetadata) -> Self {
        Self {
            id: m.id,
            title: m.title,
            artist: m.artist,
            album: m.album,
            duration_s: m.duration_s,
        }
    }
}

#[derive(Serialize)]
struct PutResponse {
    recording_id: i64,
    tuple_count: usize,
}

impl From<IngestOutcome> for PutResponse {
    fn from(outcome: IngestOutcome) -> Self {
        PutResponse {
            recording_id: outcome.outcome.id(),
            tuple_count: outcome.tuple_count,
        }
    }
}

#[derive(Serialize)]
struct IdentifyResponse {
    matched: bool,
    recording_id: Option<i64>,
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    duration: Option<f64>,
    alignment_offset: i32,
    score: u32,
    confidence_pct: f64,
}

impl From<IdentifyOutcome> for IdentifyResponse {
    fn from(outcome: IdentifyOutcome) -> Self {
        match outcome {
            IdentifyOutcome::Match {
                recording,
                score,
                alignment_offset,
                confidence_pct,
            } => IdentifyResponse {
                matched: true,
                recording_id: Some(recording.id),
                title: Some(recording.title),
                artist: Some(recording.artist),
                album: recording.album,
                duration: recording.duration_s,
                alignment_offset,
                score,
                confidence_pct,
            },
            IdentifyOutcome::NoMatch => IdentifyResponse {
                matched: false,
                recording_id: None,
                title: None,
                artist: None,
                album: None,
                duration: None,
                alignment_offset: 0,
                score: 0,
                confidence_pct: 0.0,
            },
        }
    }
}

#[derive(Serialize)]
struct StatsResponse {
    recording_count: u64,
    tuple_count: u64,
}

impl From<StoreStats> for StatsResponse {
    fn from(s: StoreStats) -> Self {
        Self {
            recording_count: s.recording_count,
            tuple_count: s.tuple_count,
        }
    }
}

struct ApiError(EchoidError);

impl From<EchoidError> for ApiError {
    fn from(err: EchoidError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EchoidError::UnsupportedFormat { .. }
            | EchoidError::DecodeFailed(_)
            | EchoidError::Unfingerprintable(_)
            | EchoidError::InvalidParameters(_) => StatusCode::BAD_REQUEST,
            EchoidError::NotFound(_) => StatusCode::NOT_FOUND,
            EchoidError::DuplicateContent { .. } => StatusCode::CONFLICT,
            EchoidError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status == StatusCode::SERVICE_UNAVAILABLE {
            error!(error = %self.0, "store unavailable");
        }
        (status, self.0.to_string()).into_response()
    }
}

struct UploadedClip {
    title: String,
    artist: String,
    album: Option<String>,
    filename: String,
    bytes: Vec<u8>,
}

async fn read_multipart_clip(mut multipart: Multipart) -> Result<UploadedClip, ApiError> {
    let mut title = String::new();
    let mut artist = String::new();
    let mut album = None;
    let mut filename = String::new();
    let mut bytes = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError(EchoidError::InvalidParameters(e.to_string())))?
    {
        match field.name().unwrap_or("") {
            "title" => title = field.text().await.unwrap_or_default(),
            "artist" => artist = field.text().await.unwrap_or_default(),
            "album" => {
                let text = field.text().await.unwrap_or_default();
                if !text.is_empty() {
                    album = Some(text);
                }
            }
            "file" => {
                filename = field.file_name().unwrap_or("upload").to_string();
                bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError(EchoidError::InvalidParameters(e.to_string())))?
                    .to_vec();
            }
            _ => {}
        }
    }

    if bytes.is_empty() {
        return Err(ApiError(EchoidError::InvalidParameters(
            "missing file field".to_string(),
        )));
    }

    Ok(UploadedClip {
        title,
        artist,
        album,
        filename,
        bytes,
    })
}

async fn create_recording(
    State(ctx): State<Arc<AppContext>>,
    multipart: Multipart,
) -> Result<Json<PutResponse>, ApiError> {
    let clip = read_multipart_clip(multipart).await?;
    let outcome = tokio::task::spawn_blocking(move || {
        ctx.ingest(NewRecording {
            title: clip.title,
            artist: clip.artist,
            album: clip.album,
            filename_hint: clip.filename,
            bytes: clip.bytes,
        })
    })
    .await
    .expect("ingest task panicked")?;

    Ok(Json(outcome.into()))
}

async fn identify(
    State(ctx): State<Arc<AppContext>>,
    multipart: Multipart,
) -> Result<Json<IdentifyResponse>, ApiError> {
    let clip = read_multipart_clip(multipart).await?;
    let task = tokio::task::spawn_blocking(move || ctx.identify(&clip.bytes, &clip.filename));

    let outcome = tokio::time::timeout(IDENTIFY_TIMEOUT, task)
        .await
        .map_err(|_| ApiError(EchoidError::StoreUnavailable("identify timed out".to_string())))?
        .expect("identify task panicked")?;

    Ok(Json(outcome.into()))
}

async fn list_recordings(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Vec<RecordingResponse>>, ApiError> {
    let recordings = tokio::task::spawn_blocking(move || ctx.list_recordings())
        .await
        .expect("list task panicked")?;
    Ok(Json(recordings.into_iter().map(RecordingResponse::from).collect()))
}

async fn get_recording(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<Json<RecordingResponse>, ApiError> {
    let recording = tokio::task::spawn_blocking(move || ctx.get_recording(id))
        .await
        .expect("get task panicked")?;
    Ok(Json(recording.into()))
}

async fn delete_recording(State(ctx): State<Arc<AppContext>>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    tokio::task::spawn_blocking(move || ctx.delete_recording(id))
        .await
        .expect("delete task panicked")?;
    Ok(StatusCode::NO_CONTENT)
}

async fn stats(State(ctx): State<Arc<AppContext>>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = tokio::task::spawn_blocking(move || ctx.stats())
        .await
        .expect("stats task panicked")?;
    Ok(Json(stats.into()))
}
