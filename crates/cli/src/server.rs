//! Web upload front-end.

use crate::convert::{convert_reader, ConversionOptions, ConversionReport};
use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Multipart, Path as AxumPath, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use deck2pdf_core::PresentationFormat;
use serde::Serialize;
use serde_json::json;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

/// Largest accepted upload request.
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// How long a finished summary stays available for download.
pub const OUTPUT_TTL: Duration = Duration::from_secs(60 * 60);

const INDEX_HTML: &str = include_str!("index.html");

/// How the server binds and starts.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub open_browser: bool,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            open_browser: true,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

/// Shared server state.
pub struct AppState {
    /// Finished summaries, one subdirectory per conversion. Removed on drop.
    output_root: TempDir,
    max_upload_bytes: usize,
}

impl AppState {
    pub fn new() -> std::io::Result<Self> {
        let output_root = tempfile::Builder::new().prefix("deck2pdf-output-").tempdir()?;
        log::debug!("Storing summaries under {}", output_root.path().display());
        Ok(Self {
            output_root,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        })
    }

    pub fn with_upload_limit(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    fn output_dir(&self, id: &Uuid) -> PathBuf {
        self.output_root.path().join(id.to_string())
    }
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    success: bool,
    download_url: String,
    filename: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    let limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload).layer(DefaultBodyLimit::max(limit)))
        .route("/download/{id}", get(download))
        .with_state(state)
}

/// Bind, serve until Ctrl+C or SIGTERM, then clean up the output directory.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = AppState::new()
        .context("create output directory failed")?
        .with_upload_limit(config.max_upload_bytes);
    let state = Arc::new(state);
    let app = router(state.clone());

    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(bind_addr.as_str())
        .await
        .with_context(|| format!("bind failed: {bind_addr}"))?;
    let local_addr = listener.local_addr().context("resolve local addr failed")?;

    let url = format!("http://localhost:{}", local_addr.port());
    println!();
    println!("PowerPoint to PDF converter");
    println!("   Server running on {}", url);
    println!("   Press Ctrl+C to stop the server");
    println!();
    log::info!("Listening on {}", local_addr);

    if config.open_browser {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            if let Err(err) = open_external_browser(&url) {
                log::debug!("Could not open a browser: {:#}", err);
            }
        });
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")?;

    log::info!("Server stopped");
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, Response> {
    // Dropped on every return path, taking the upload with it.
    let scratch = tempfile::Builder::new()
        .prefix("deck2pdf-upload-")
        .tempdir()
        .map_err(|err| error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;

    let mut upload: Option<(String, PathBuf)> = None;
    let mut title: Option<String> = None;
    let mut include_images = false;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .and_then(|raw| Path::new(raw).file_name())
                    .and_then(|name| name.to_str())
                    .unwrap_or("")
                    .to_string();
                if filename.is_empty() {
                    continue;
                }
                if PresentationFormat::from_path(&filename).is_none() {
                    return Err(error_response(
                        StatusCode::BAD_REQUEST,
                        "Please upload a PowerPoint file (.pptx or .ppt)".to_string(),
                    ));
                }

                let target = scratch.path().join(sanitize_filename(&filename));
                save_multipart_file(field, &target).await?;
                upload = Some((filename, target));
            }
            "title" => {
                let value = field.text().await.map_err(multipart_error)?;
                title = Some(value.trim().to_string()).filter(|t| !t.is_empty());
            }
            "include_images" => {
                let value = field.text().await.map_err(multipart_error)?;
                include_images = parse_bool(&value, false);
            }
            _ => {}
        }
    }

    let Some((filename, upload_path)) = upload else {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "No file selected".to_string(),
        ));
    };

    prune_expired(state.output_root.path(), SystemTime::now(), OUTPUT_TTL).await;

    let id = Uuid::new_v4();
    let stem = Path::new(&filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("presentation");
    let output_name = format!("{}_summary.pdf", sanitize_filename(stem));
    let output_dir = state.output_dir(&id);
    let output_path = output_dir.join(&output_name);

    let options = ConversionOptions {
        title,
        include_images,
    };
    log::info!(
        "Converting upload {} ({}, images: {})",
        filename,
        id,
        options.include_images
    );

    let source_name = filename.clone();
    let job = tokio::task::spawn_blocking(move || -> deck2pdf_core::Result<ConversionReport> {
        let file = std::fs::File::open(&upload_path)?;
        let (pdf, report) = convert_reader(BufReader::new(file), &source_name, &options)?;
        std::fs::create_dir_all(&output_dir)?;
        std::fs::write(&output_path, &pdf)?;
        Ok(report)
    });

    let report = match job.await {
        Ok(Ok(report)) => report,
        Ok(Err(err)) => {
            log::error!("Conversion of {} failed: {}", filename, err);
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Conversion failed: {}", err),
            ));
        }
        Err(err) => {
            log::error!("Conversion task for {} failed: {}", filename, err);
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Conversion failed: {}", err),
            ));
        }
    };
    drop(scratch);

    log::info!(
        "Converted {}: {} slides, {} images, {} bytes",
        filename,
        report.slide_count,
        report.image_count,
        report.bytes
    );

    Ok(Json(UploadResponse {
        success: true,
        download_url: format!("/download/{}", id),
        filename: output_name,
    }))
}

async fn download(
    State(state): State<Arc<AppState>>,
    AxumPath(raw_id): AxumPath<String>,
) -> Result<Response, Response> {
    let id = Uuid::parse_str(&raw_id).map_err(|_| not_found())?;

    let mut entries = tokio::fs::read_dir(state.output_dir(&id))
        .await
        .map_err(|_| not_found())?;
    while let Some(entry) = entries.next_entry().await.map_err(|_| not_found())? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("pdf") {
            continue;
        }
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("summary.pdf")
            .to_string();
        let file = tokio::fs::File::open(&path).await.map_err(|_| not_found())?;
        return Ok(stream_response(file, &filename, "application/pdf"));
    }

    Err(not_found())
}

/// Remove conversion directories last modified more than `ttl` before `now`.
/// Returns how many were removed.
async fn prune_expired(root: &Path, now: SystemTime, ttl: Duration) -> usize {
    let Ok(mut entries) = tokio::fs::read_dir(root).await else {
        return 0;
    };

    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let Ok(modified) = entry.metadata().await.and_then(|meta| meta.modified()) else {
            continue;
        };
        let expired = now
            .duration_since(modified)
            .map(|age| age > ttl)
            .unwrap_or(false);
        if !expired {
            continue;
        }

        match tokio::fs::remove_dir_all(entry.path()).await {
            Ok(()) => {
                removed += 1;
                log::debug!("Removed expired summary {}", entry.path().display());
            }
            Err(err) => log::warn!("Failed to remove {}: {}", entry.path().display(), err),
        }
    }
    removed
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "File not found".to_string())
}

fn multipart_error(err: MultipartError) -> Response {
    error_response(err.status(), err.body_text())
}

fn parse_bool(value: &str, default_value: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "" => default_value,
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default_value,
    }
}

async fn save_multipart_file(mut field: Field<'_>, target: &Path) -> Result<(), Response> {
    let mut file = tokio::fs::File::create(target)
        .await
        .map_err(|err| error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        file.write_all(&chunk)
            .await
            .map_err(|err| error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    }
    file.flush()
        .await
        .map_err(|err| error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    Ok(())
}

fn stream_response(file: tokio::fs::File, filename: &str, content_type: &'static str) -> Response {
    let disposition = build_content_disposition(filename);
    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

fn build_content_disposition(filename: &str) -> String {
    let ascii_name = sanitize_filename(filename);
    if ascii_name == filename {
        return format!("attachment; filename=\"{ascii_name}\"");
    }
    let encoded = percent_encode(filename);
    format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}

fn sanitize_filename(value: &str) -> String {
    let output: String = value
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if output.trim_matches(['_', '.']).is_empty() {
        "presentation".to_string()
    } else {
        output
    }
}

fn percent_encode(value: &str) -> String {
    let mut output = String::new();
    for byte in value.bytes() {
        let ch = byte as char;
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '~') {
            output.push(ch);
        } else {
            output.push_str(&format!("%{:02X}", byte));
        }
    }
    output
}

/// Best-effort launch of the platform's default browser.
fn open_external_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        Command::new("cmd")
            .args(["/C", "start", "", url])
            .spawn()
            .with_context(|| format!("open browser failed: {url}"))?;
    }
    #[cfg(target_os = "macos")]
    {
        Command::new("open")
            .arg(url)
            .spawn()
            .with_context(|| format!("open browser failed: {url}"))?;
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        Command::new("xdg-open")
            .arg(url)
            .spawn()
            .with_context(|| format!("open browser failed: {url}"))?;
    }
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                log::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutdown signal received, stopping server");
}
