//! HTTP server for the DataDash API.
//!
//! Provides REST endpoints for table uploads, insight recomputation and
//! XLSX downloads. Each interaction recomputes the visible pipeline from
//! the stored table forward.
//!
//! # API Endpoints
//!
//! | Method | Path                         | Description                         |
//! |--------|------------------------------|-------------------------------------|
//! | GET    | `/health`                    | Health check                        |
//! | GET    | `/api/logs`                  | SSE stream for real-time logs       |
//! | POST   | `/api/members/upload`        | Upload member table                 |
//! | DELETE | `/api/members`               | Clear stored member table           |
//! | POST   | `/api/members/insights`      | Member page data for a filter state |
//! | POST   | `/api/agents/upload`         | Upload agent-evaluation table       |
//! | DELETE | `/api/agents`                | Clear stored agent table            |
//! | POST   | `/api/agents/insights`       | Agent page data for a filter state  |
//! | POST   | `/api/agents/drilldown`      | One agent's records                 |
//! | POST   | `/api/agents/summary.xlsx`   | Summary download                    |
//! | POST   | `/api/agents/drilldown.xlsx` | Per-agent details download          |

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Sse},
    routing::{delete, get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, LOG_BROADCASTER};
use super::state::AppState;
use super::types::{error_response, DrilldownRequest, UploadResponse};
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::export::{agent_details_filename, AGENT_SUMMARY_FILENAME, XLSX_MIME};
use crate::filter::{AgentCriteria, MemberCriteria};
use crate::pipeline;

/// Start the HTTP server
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    let app = Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/logs", get(sse_logs))
        .route("/api/members/upload", post(upload_members))
        .route("/api/members", delete(clear_members))
        .route("/api/members/insights", post(member_insights))
        .route("/api/agents/upload", post(upload_agents))
        .route("/api/agents", delete(clear_agents))
        .route("/api/agents/insights", post(agent_insights))
        .route("/api/agents/drilldown", post(agent_drilldown))
        .route("/api/agents/summary.xlsx", post(export_summary))
        .route("/api/agents/drilldown.xlsx", post(export_details))
        .layer(cors)
        .with_state(AppState::new());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("DataDash server running on http://localhost:{}", port);
    println!("   POST /api/members/upload   - Upload member table");
    println!("   POST /api/agents/upload    - Upload agent evaluation table");
    println!("   GET  /api/logs             - SSE log stream");
    println!("   GET  /health               - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "datadash",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

type Rejection = (StatusCode, Json<Value>);

fn reject(err: ServerError) -> Rejection {
    log_error(err.to_string());
    let status = match &err {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::NoTable(_) => StatusCode::NOT_FOUND,
        ServerError::Pipeline(PipelineError::Schema(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        ServerError::Pipeline(PipelineError::Ingest(_)) => StatusCode::BAD_REQUEST,
        ServerError::Pipeline(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(error_response(&err.to_string())))
}

/// Pull the `file` field out of a multipart upload.
async fn read_upload(mut multipart: Multipart) -> ServerResult<(Vec<u8>, String)> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            file_name = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?
                    .to_vec(),
            );
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;
    let name = file_name.unwrap_or_else(|| "upload.csv".to_string());
    Ok((bytes, name))
}

/// Upload and store the member table
async fn upload_members(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, Rejection> {
    let (bytes, filename) = read_upload(multipart).await.map_err(reject)?;

    let (records, info) = pipeline::load_member_table(&bytes, &filename)
        .map_err(|e| reject(ServerError::Pipeline(e)))?;
    let count = records.len();
    state.set_members(records).await;

    Ok(Json(UploadResponse::new("member", info, count)))
}

/// Clear the stored member table
async fn clear_members(State(state): State<AppState>) -> Json<Value> {
    state.clear_members().await;
    Json(json!({ "status": "cleared", "table": "member" }))
}

/// Member page data for one filter state
async fn member_insights(
    State(state): State<AppState>,
    Json(criteria): Json<MemberCriteria>,
) -> Result<Json<pipeline::MemberInsights>, Rejection> {
    let records = state
        .members()
        .await
        .ok_or_else(|| reject(ServerError::NoTable("member")))?;
    Ok(Json(pipeline::member_insights(&records, &criteria)))
}

/// Upload and store the agent-evaluation table
async fn upload_agents(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, Rejection> {
    let (bytes, filename) = read_upload(multipart).await.map_err(reject)?;

    let (records, info) = pipeline::load_agent_table(&bytes, &filename)
        .map_err(|e| reject(ServerError::Pipeline(e)))?;
    let count = records.len();
    state.set_agent_evals(records).await;

    Ok(Json(UploadResponse::new("agent", info, count)))
}

/// Clear the stored agent-evaluation table
async fn clear_agents(State(state): State<AppState>) -> Json<Value> {
    state.clear_agent_evals().await;
    Json(json!({ "status": "cleared", "table": "agent" }))
}

/// Agent page data for one filter state
async fn agent_insights(
    State(state): State<AppState>,
    Json(criteria): Json<AgentCriteria>,
) -> Result<Json<pipeline::AgentInsights>, Rejection> {
    let records = state
        .agent_evals()
        .await
        .ok_or_else(|| reject(ServerError::NoTable("agent")))?;
    Ok(Json(pipeline::agent_insights(&records, &criteria)))
}

/// One agent's records within the current filter state
async fn agent_drilldown(
    State(state): State<AppState>,
    Json(request): Json<DrilldownRequest>,
) -> Result<Json<crate::summary::AgentDrilldown>, Rejection> {
    let records = state
        .agent_evals()
        .await
        .ok_or_else(|| reject(ServerError::NoTable("agent")))?;
    Ok(Json(pipeline::agent_drilldown_view(
        &records,
        &request.criteria,
        &request.agent,
    )))
}

fn xlsx_download(filename: &str, bytes: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
}

/// Download the agent performance summary
async fn export_summary(
    State(state): State<AppState>,
    Json(criteria): Json<AgentCriteria>,
) -> Result<impl IntoResponse, Rejection> {
    let records = state
        .agent_evals()
        .await
        .ok_or_else(|| reject(ServerError::NoTable("agent")))?;
    let bytes = pipeline::agent_summary_export(&records, &criteria)
        .map_err(|e| reject(ServerError::Pipeline(e)))?;
    Ok(xlsx_download(AGENT_SUMMARY_FILENAME, bytes))
}

/// Download one agent's subscriber details
async fn export_details(
    State(state): State<AppState>,
    Json(request): Json<DrilldownRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let records = state
        .agent_evals()
        .await
        .ok_or_else(|| reject(ServerError::NoTable("agent")))?;
    let bytes = pipeline::agent_details_export(&records, &request.criteria, &request.agent)
        .map_err(|e| reject(ServerError::Pipeline(e)))?;
    Ok(xlsx_download(&agent_details_filename(&request.agent), bytes))
}
