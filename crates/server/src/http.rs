//! REST API defining the core's HTTP boundary.
//!
//! Wires requests onto the staged/dynamic routers and the session/output
//! stores, and carries none of the orchestration logic itself.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use dialogue_core::{AgentProfile, Language, Session, Version};
use dialogue_facilitator::Facilitator;
use dialogue_router::{DynamicRouter, StagedRouter};
use dialogue_summarizer::Summarizer;
use serde::{Deserialize, Serialize};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::metrics::metrics_handler;
use crate::rate_limit::rate_limit_middleware;
use crate::state::AppState;
use crate::websocket::WebSocketHandler;

pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server.cors_origins, state.settings.server.cors_enabled);

    Router::new()
        .route("/agents", get(list_agents))
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/realtime/sessions", post(create_or_reuse_realtime_session))
        .route("/realtime/sessions/:id/stage", post(run_stage))
        .route("/outputs", get(list_outputs))
        .route("/outputs/:id", get(get_output).delete(delete_output))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/ws", get(ws_handler))
        .layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (not for production)");
        return CorsLayer::permissive();
    }
    if origins.is_empty() {
        tracing::info!("no CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers(Any);
    }
    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    if parsed.is_empty() {
        tracing::error!("all configured CORS origins are invalid, falling back to localhost");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers(Any);
    }
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
        .allow_credentials(true)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
    (status, Json(ErrorBody { error: message.into() }))
}

/// `GET /agents`.
async fn list_agents(State(state): State<AppState>) -> Json<Vec<AgentProfile>> {
    Json(state.roster.as_ref().clone())
}

/// `GET /sessions`, sorted by `updatedAt` descending
async fn list_sessions(State(state): State<AppState>) -> Result<Json<Vec<Session>>, (StatusCode, Json<ErrorBody>)> {
    state
        .store
        .list_sessions()
        .await
        .map(Json)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    title: String,
    #[serde(rename = "agentIds")]
    agent_ids: Vec<String>,
    #[serde(default)]
    version: Option<VersionParam>,
    #[serde(default)]
    language: Option<LanguageParam>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum VersionParam {
    V1,
    V2,
}

impl From<VersionParam> for Version {
    fn from(v: VersionParam) -> Self {
        match v {
            VersionParam::V1 => Version::V1,
            VersionParam::V2 => Version::V2,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum LanguageParam {
    En,
    Ja,
}

impl From<LanguageParam> for Language {
    fn from(l: LanguageParam) -> Self {
        match l {
            LanguageParam::En => Language::En,
            LanguageParam::Ja => Language::Ja,
        }
    }
}

/// `title` and a non-empty `agentIds` array are required. Resolves ids against the process roster, silently
/// dropping any id that doesn't resolve — an unresolvable id is not by
/// itself a validation failure, only an empty resulting roster is.
fn resolve_agents(state: &AppState, agent_ids: &[String]) -> Vec<AgentProfile> {
    agent_ids
        .iter()
        .filter_map(|id| crate::registry::find(&state.roster, id).cloned())
        .collect()
}

/// `POST /sessions {title, agentIds}`.
async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), (StatusCode, Json<ErrorBody>)> {
    if request.title.trim().is_empty() || request.agent_ids.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "title and a non-empty agentIds array are required"));
    }
    let agents = resolve_agents(&state, &request.agent_ids);
    if agents.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "no agentIds resolved to a known agent"));
    }

    let session = Session::new(
        Uuid::new_v4().to_string(),
        request.title,
        agents,
        request.language.map(Language::from).unwrap_or(Language::En),
        request.version.map(Version::from).unwrap_or(Version::V2),
    );
    state
        .sessions
        .register(&session)
        .await
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// `GET /sessions/:id`.
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, (StatusCode, Json<ErrorBody>)> {
    match state.store.load_session(&id).await {
        Ok(Some(session)) => Ok(Json(session)),
        Ok(None) => Err(error_response(StatusCode::NOT_FOUND, format!("session not found: {id}"))),
        Err(e) => Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// `DELETE /sessions/:id`.
async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    state.sessions.forget(&id);
    match state.store.delete_session(&id).await {
        Ok(true) => StatusCode::NO_CONTENT,
        Ok(false) => StatusCode::NOT_FOUND,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `POST /realtime/sessions {title, agentIds}` — reuses an existing
/// session with the same title when present.
async fn create_or_reuse_realtime_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), (StatusCode, Json<ErrorBody>)> {
    if request.title.trim().is_empty() || request.agent_ids.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "title and a non-empty agentIds array are required"));
    }

    let existing = state
        .store
        .list_sessions()
        .await
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .into_iter()
        .find(|s| s.title == request.title);
    if let Some(session) = existing {
        return Ok((StatusCode::OK, Json(session)));
    }

    let agents = resolve_agents(&state, &request.agent_ids);
    if agents.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "no agentIds resolved to a known agent"));
    }
    let session = Session::new(
        Uuid::new_v4().to_string(),
        request.title,
        agents,
        request.language.map(Language::from).unwrap_or(Language::En),
        Version::V2,
    );
    state
        .sessions
        .register(&session)
        .await
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[derive(Debug, Deserialize)]
struct StageRequest {
    prompt: String,
    #[allow(dead_code)]
    stage: String,
    #[serde(default)]
    #[allow(dead_code)]
    language: Option<LanguageParam>,
}

/// `POST /realtime/sessions/:id/stage {prompt, stage, language}`.
/// Dispatches the session's next sequence through the router matching
/// its `version`; `stage`/`language` are accepted per the
/// wire contract but the router itself determines stage progression.
async fn run_stage(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StageRequest>,
) -> Result<Json<Session>, (StatusCode, Json<ErrorBody>)> {
    if request.prompt.trim().is_empty() || request.stage.trim().is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "prompt and stage are required"));
    }

    let mut session = match state.store.load_session(&id).await {
        Ok(Some(session)) => session,
        Ok(None) => return Err(error_response(StatusCode::NOT_FOUND, format!("session not found: {id}"))),
        Err(e) => return Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    };

    let agents = state.agents_for(&session);
    let result = match session.version {
        Version::V1 => {
            let summarizer = Summarizer::new(state.executor.clone());
            let router = StagedRouter::new(
                agents,
                summarizer,
                state.store.clone(),
                state.output_store.clone(),
                state.settings.router.clone(),
                state.events.clone(),
            );
            router.run_sequence(&mut session, &request.prompt).await
        }
        Version::V2 => {
            let facilitator = Facilitator::new(state.settings.facilitator.clone());
            let router = DynamicRouter::new(
                agents,
                facilitator,
                state.store.clone(),
                state.output_store.clone(),
                state.settings.storage.data_dir.clone(),
                state.settings.consensus.clone(),
                state.settings.router.clone(),
                state.events.clone(),
            );
            router.run_sequence(&mut session, &request.prompt).await
        }
    };

    result.map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    crate::metrics::record_sequence_completed(match session.version {
        Version::V1 => "v1",
        Version::V2 => "v2",
    });
    state.sessions.touch(&session.id);
    Ok(Json(session))
}

/// `GET /outputs`.
async fn list_outputs(State(state): State<AppState>) -> Result<Json<Vec<String>>, (StatusCode, Json<ErrorBody>)> {
    state
        .output_store
        .list_outputs()
        .map(Json)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

#[derive(Debug, Serialize)]
struct OutputBody {
    id: String,
    content: String,
}

/// `GET /outputs/:id`.
async fn get_output(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OutputBody>, (StatusCode, Json<ErrorBody>)> {
    match state.output_store.load_output(&id) {
        Ok(Some(content)) => Ok(Json(OutputBody { id, content })),
        Ok(None) => Err(error_response(StatusCode::NOT_FOUND, format!("output not found: {id}"))),
        Err(e) => Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// `DELETE /outputs/:id`.
async fn delete_output(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    match state.output_store.delete_output(&id) {
        Ok(true) => StatusCode::NO_CONTENT,
        Ok(false) => StatusCode::NOT_FOUND,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy", "version": env!("CARGO_PKG_VERSION") }))
}

/// Realtime WebSocket upgrade, forwarding the `EventSink` broadcast as
/// the wire events named
async fn ws_handler(ws: axum::extract::ws::WebSocketUpgrade, state: State<AppState>) -> impl IntoResponse {
    WebSocketHandler::handle(ws, state).await
}
