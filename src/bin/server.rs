//! medquiz-server — job queue HTTP API and extraction worker.
//!
//! Thin axum server wrapping the shared medquiz_lib layers: endpoints to
//! enqueue parse jobs, inspect their status, and list a book's extracted
//! chapters, plus a background worker that polls for pending jobs one at a
//! time and runs the extraction pipeline.
//!
//! Usage:
//!   MEDQUIZ_DB=/path/quiz.db MEDQUIZ_BOOKS=/path/books medquiz-server
//!
//! Or with args:
//!   medquiz-server --db /path/quiz.db --books /path/books --bind 0.0.0.0:8000

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use medquiz_lib::db::Database;
use medquiz_lib::pdf::Bookshelf;
use medquiz_lib::{jobs, settings};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// AppState
// ============================================================================

#[derive(Clone)]
struct AppState {
    db: Arc<Database>,
}

// ============================================================================
// Error type
// ============================================================================

struct AppError(StatusCode, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({"error": self.1}))).into_response()
    }
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError(StatusCode::INTERNAL_SERVER_ERROR, s)
    }
}

fn not_found(msg: impl Into<String>) -> AppError {
    AppError(StatusCode::NOT_FOUND, msg.into())
}

fn bad_request(msg: impl Into<String>) -> AppError {
    AppError(StatusCode::BAD_REQUEST, msg.into())
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Deserialize)]
struct ParseBookParams {
    book: String,
    start: u32,
    end: u32,
}

/// GET /parse-book?book=...&start=N&end=M - enqueue a pending job.
async fn parse_book_handler(
    State(state): State<AppState>,
    Query(params): Query<ParseBookParams>,
) -> Result<impl IntoResponse, AppError> {
    if params.book.trim().is_empty() {
        return Err(bad_request("Please provide a valid book name"));
    }
    let range = format!("{}-{}", params.start, params.end);
    jobs::parse_page_range(&range).map_err(|e| bad_request(e.to_string()))?;

    let job = state
        .db
        .create_job(&params.book, &range)
        .map_err(|e| AppError::from(format!("Failed to create job: {}", e)))?;

    println!("[Server] Job {} enqueued for {} pages {}", job.id, job.book, job.range);
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Job created successfully",
            "jobId": job.id,
            "status": job.status,
            "book": job.book,
            "range": job.range,
        })),
    ))
}

/// GET /job/{id} - job status and accumulated logs.
async fn get_job_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let job = state
        .db
        .get_job(&id)
        .map_err(|e| AppError::from(format!("Failed to fetch job: {}", e)))?
        .ok_or_else(|| not_found("Job not found"))?;
    Ok(Json(job))
}

#[derive(Deserialize)]
struct ChaptersParams {
    book: String,
}

/// GET /chapters?book=... - distinct chapters of a book in reading order.
async fn chapters_handler(
    State(state): State<AppState>,
    Query(params): Query<ChaptersParams>,
) -> Result<impl IntoResponse, AppError> {
    if params.book.trim().is_empty() {
        return Err(bad_request("Book name is required"));
    }
    let chapters = state
        .db
        .chapters_for_book(&params.book)
        .map_err(|e| AppError::from(format!("Failed to fetch chapters: {}", e)))?;
    Ok(Json(chapters))
}

/// GET /health - liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"connected": true, "version": VERSION}))
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    // Parse simple args (no clap to keep binary small)
    let args: Vec<String> = std::env::args().collect();
    let mut db_arg: Option<&str> = None;
    let mut books_arg: Option<&str> = None;
    let mut bind_arg: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" if i + 1 < args.len() => {
                db_arg = Some(&args[i + 1]);
                i += 2;
            }
            "--books" if i + 1 < args.len() => {
                books_arg = Some(&args[i + 1]);
                i += 2;
            }
            "--bind" if i + 1 < args.len() => {
                bind_arg = Some(&args[i + 1]);
                i += 2;
            }
            "--help" | "-h" => {
                println!("medquiz-server — question extraction job API");
                println!();
                println!("Usage: medquiz-server [--db PATH] [--books DIR] [--bind ADDR:PORT]");
                println!();
                println!("Environment variables:");
                println!("  MEDQUIZ_DB     Database path");
                println!("  MEDQUIZ_BOOKS  Books directory (default: ./books)");
                println!("  MEDQUIZ_BIND   Bind address (default: 0.0.0.0:8000)");
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    let bind_addr = bind_arg
        .map(|s| s.to_string())
        .or_else(|| std::env::var("MEDQUIZ_BIND").ok())
        .unwrap_or_else(|| "0.0.0.0:8000".to_string());

    // Initialize settings
    let app_data_dir = dirs::data_dir()
        .map(|p| p.join("com.medquiz.app"))
        .unwrap_or_else(|| PathBuf::from("."));
    settings::init(app_data_dir.clone());

    let db_path = find_database(db_arg, &app_data_dir);
    let books_dir = books_arg
        .map(PathBuf::from)
        .or_else(settings::get_books_dir)
        .unwrap_or_else(|| PathBuf::from("books"));

    println!("[Server] Database: {}", db_path.display());
    println!("[Server] Books directory: {}", books_dir.display());
    println!("[Server] Binding to: {}", bind_addr);

    // Open database
    let db = match Database::new(&db_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            eprintln!("[Server] Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    if !settings::has_api_key() {
        eprintln!("[Server] Warning: no API key configured, generative fallback is disabled");
    }

    // Start the job worker
    let shelf = Arc::new(Bookshelf::new(books_dir));
    tokio::spawn(jobs::poll_loop(db.clone(), shelf));

    // Build router
    let state = AppState { db };

    let app = Router::new()
        .route("/parse-book", get(parse_book_handler))
        .route("/job/{id}", get(get_job_handler))
        .route("/chapters", get(chapters_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Bind and serve
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("[Server] Failed to bind to {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    println!("[Server] Listening on {}", bind_addr);
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("[Server] Server error: {}", e);
        std::process::exit(1);
    }
}

/// Database path resolution (matches CLI pattern)
fn find_database(db_arg: Option<&str>, app_data_dir: &std::path::Path) -> PathBuf {
    // 1. CLI argument
    if let Some(path) = db_arg {
        return PathBuf::from(path);
    }

    // 2. Environment variable
    if let Ok(path) = std::env::var("MEDQUIZ_DB") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // 3. App data directory
    app_data_dir.join("medquiz.db")
}
