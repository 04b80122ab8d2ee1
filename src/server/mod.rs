//! HTTP API powered by axum.
//!
//! Serves:
//! - `POST /api/debates`                 — create a debate
//! - `GET  /api/debates`                 — list debates
//! - `GET  /api/debates/{id}`            — debate detail with transcript
//! - `POST /api/debates/{id}/user-turn`  — spectator interjection
//! - `POST /api/topics`                  — suggest debate topics
//! - `GET  /api/debate/turn`             — execute a turn (SSE)
//! - `GET  /api/characters`              — persona roster
//! - `GET  /health`                      — health check

use std::net::SocketAddr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{sse, IntoResponse, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::ServerConfig;
use crate::db::models::{Debate, DebateTurn};
use crate::debate::{DebateFormat, NextTurn};
use crate::engine::{TurnEngine, TurnEvent};
use crate::error::{AgoraError, Result};
use crate::persona;

#[derive(Clone)]
pub struct AppState {
    pub engine: TurnEngine,
}

/// Build the axum router.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    };

    Router::new()
        .route("/api/debates", post(create_debate).get(list_debates))
        .route("/api/debates/{id}", get(get_debate))
        .route("/api/debates/{id}/user-turn", post(add_user_turn))
        .route("/api/topics", post(suggest_topics))
        .route("/api/debate/turn", get(run_turn))
        .route("/api/characters", get(list_characters))
        .route("/health", get(health_check))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server. Runs until the listener fails.
pub async fn start_server(config: &ServerConfig, engine: TurnEngine) -> anyhow::Result<()> {
    let state = AppState { engine };
    let app = build_router(state, &config.allowed_origins);
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    tracing::info!("Agora listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ─── Request / response shapes ───

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDebateRequest {
    topic: String,
    format: String,
    participants: Vec<String>,
    #[serde(default)]
    user_participating: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DebateDetail {
    #[serde(flatten)]
    debate: Debate,
    turns: Vec<DebateTurn>,
    next_turn: Option<NextTurn>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TurnQuery {
    debate_id: String,
    character_id: String,
}

#[derive(Debug, Deserialize)]
struct UserTurnRequest {
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopicsRequest {
    character_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TopicsResponse {
    topics: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CharacterInfo {
    id: &'static str,
    name: &'static str,
}

// ─── Handlers ───

/// POST /api/debates
async fn create_debate(
    State(state): State<AppState>,
    Json(req): Json<CreateDebateRequest>,
) -> Result<impl IntoResponse> {
    let format = DebateFormat::parse(&req.format)
        .ok_or_else(|| AgoraError::InvalidRequest(format!("unknown format: {}", req.format)))?;
    let debate = state
        .engine
        .create_debate(&req.topic, format, &req.participants, req.user_participating)
        .await?;
    Ok((StatusCode::CREATED, Json(debate)))
}

/// GET /api/debates
async fn list_debates(State(state): State<AppState>) -> Result<Json<Vec<Debate>>> {
    Ok(Json(state.engine.list_debates().await?))
}

/// GET /api/debates/{id}
async fn get_debate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DebateDetail>> {
    let debate = state.engine.get_debate(&id).await?;
    let turns = state.engine.transcript(&id).await?;
    let next_turn = state.engine.peek_next_turn(&id).await?;
    Ok(Json(DebateDetail {
        debate,
        turns,
        next_turn,
    }))
}

/// POST /api/debates/{id}/user-turn
async fn add_user_turn(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UserTurnRequest>,
) -> Result<impl IntoResponse> {
    let turn = state.engine.add_user_turn(&id, &req.content).await?;
    Ok((StatusCode::CREATED, Json(turn)))
}

/// POST /api/topics
async fn suggest_topics(
    State(state): State<AppState>,
    Json(req): Json<TopicsRequest>,
) -> Result<Json<TopicsResponse>> {
    let topics = state.engine.suggest_topics(&req.character_ids).await?;
    Ok(Json(TopicsResponse { topics }))
}

/// GET /api/debate/turn?debateId=..&characterId=..
///
/// Validation failures surface as plain JSON error responses before any
/// stream starts. Once the turn is running, the response is an SSE stream of
/// `{"delta": ...}` events (or one `{"error": ...}`), closed by `[DONE]`.
async fn run_turn(
    State(state): State<AppState>,
    Query(query): Query<TurnQuery>,
) -> Result<impl IntoResponse> {
    let rx = state
        .engine
        .run_turn(&query.debate_id, &query.character_id)
        .await?;

    let stream = stream::unfold(Some(rx), |state| async move {
        let mut rx = state?;
        let (event, next) = match rx.recv().await {
            Some(TurnEvent::Delta { text }) => {
                let data = serde_json::json!({ "delta": text }).to_string();
                (sse::Event::default().data(data), Some(rx))
            }
            Some(TurnEvent::Error { message }) => {
                let data = serde_json::json!({ "error": message }).to_string();
                (sse::Event::default().data(data), Some(rx))
            }
            // Done sentinel, or the channel closing after an error.
            Some(TurnEvent::Done) | None => (sse::Event::default().data("[DONE]"), None),
        };
        Some((Ok::<_, std::convert::Infallible>(event), next))
    });

    Ok(Sse::new(stream))
}

/// GET /api/characters
async fn list_characters() -> Json<Vec<CharacterInfo>> {
    Json(
        persona::all()
            .iter()
            .map(|p| CharacterInfo {
                id: p.id,
                name: p.name,
            })
            .collect(),
    )
}

/// GET /health
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::init_memory_database;
    use crate::provider::{MockProvider, MockResponse};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_app(provider: MockProvider) -> Router {
        let pool = init_memory_database().await.unwrap();
        let engine = TurnEngine::new(pool, Arc::new(provider), &Config::default());
        build_router(AppState { engine }, &[])
    }

    fn create_request() -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/debates")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "topic": "Is virtue teachable?",
                    "format": "oxford",
                    "participants": ["socrates", "nietzsche"],
                    "userParticipating": true
                })
                .to_string(),
            ))
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = test_app(MockProvider::new()).await;
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_and_fetch_debate() {
        let app = test_app(MockProvider::new()).await;

        let resp = app.clone().oneshot(create_request()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        let id = created["id"].as_str().unwrap().to_string();

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/debates/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let detail = body_json(resp).await;
        assert_eq!(detail["topic"], "Is virtue teachable?");
        assert_eq!(detail["turns"].as_array().unwrap().len(), 0);
        assert_eq!(detail["nextTurn"]["characterId"], "socrates");

        let resp = app
            .oneshot(Request::builder().uri("/api/debates").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let listed = body_json(resp).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_debate_with_unknown_format_is_bad_request() {
        let app = test_app(MockProvider::new()).await;
        let req = Request::builder()
            .method("POST")
            .uri("/api/debates")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "topic": "t",
                    "format": "cage-match",
                    "participants": ["socrates", "nietzsche"]
                })
                .to_string(),
            ))
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_debate_is_not_found() {
        let app = test_app(MockProvider::new()).await;
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/debates/no-such-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_turn_stream_protocol() {
        let provider = MockProvider::new()
            .with_response(MockResponse::Deltas(vec![
                "Hello ".to_string(),
                "world.".to_string(),
            ]))
            .with_response(MockResponse::NoToolCall);
        let app = test_app(provider).await;

        let resp = app.clone().oneshot(create_request()).await.unwrap();
        let id = body_json(resp).await["id"].as_str().unwrap().to_string();

        let resp = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/debate/turn?debateId={id}&characterId=socrates"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(body.contains(r#"data: {"delta":"Hello "}"#));
        assert!(body.contains(r#"data: {"delta":"world."}"#));
        assert!(body.trim_end().ends_with("data: [DONE]"));
    }

    #[tokio::test]
    async fn test_out_of_turn_request_is_conflict_before_streaming() {
        let app = test_app(MockProvider::new()).await;
        let resp = app.clone().oneshot(create_request()).await.unwrap();
        let id = body_json(resp).await["id"].as_str().unwrap().to_string();

        let resp = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/debate/turn?debateId={id}&characterId=nietzsche"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body = body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("socrates"));
    }

    #[tokio::test]
    async fn test_user_turn_endpoint() {
        let app = test_app(MockProvider::new()).await;
        let resp = app.clone().oneshot(create_request()).await.unwrap();
        let id = body_json(resp).await["id"].as_str().unwrap().to_string();

        let req = Request::builder()
            .method("POST")
            .uri(format!("/api/debates/{id}/user-turn"))
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "content": "What about moral luck?" }).to_string(),
            ))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let turn = body_json(resp).await;
        assert_eq!(turn["turn_number"], 1);
        assert!(turn["character_id"].is_null());
    }

    #[tokio::test]
    async fn test_user_turn_rejected_without_participation_flag() {
        let app = test_app(MockProvider::new()).await;

        // userParticipating omitted; it defaults to false.
        let req = Request::builder()
            .method("POST")
            .uri("/api/debates")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "topic": "Is virtue teachable?",
                    "format": "oxford",
                    "participants": ["socrates", "nietzsche"]
                })
                .to_string(),
            ))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        assert_eq!(created["user_participating"], false);
        let id = created["id"].as_str().unwrap().to_string();

        let req = Request::builder()
            .method("POST")
            .uri(format!("/api/debates/{id}/user-turn"))
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "content": "Let me in." }).to_string(),
            ))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_topics_endpoint() {
        let provider = MockProvider::new().with_response(MockResponse::ToolCall(
            serde_json::json!({
                "topics": [
                    "Is virtue teachable?",
                    "Does morality require God?",
                    "Is the examined life overrated?",
                    "Should we trust the wisdom of crowds?",
                    "Is suffering necessary for greatness?"
                ]
            }),
        ));
        let app = test_app(provider).await;

        let req = Request::builder()
            .method("POST")
            .uri("/api/topics")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "characterIds": ["socrates", "nietzsche"] }).to_string(),
            ))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["topics"].as_array().unwrap().len(), 5);

        // Fewer than two characters is rejected before any model call.
        let req = Request::builder()
            .method("POST")
            .uri("/api/topics")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "characterIds": ["socrates"] }).to_string(),
            ))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_character_roster() {
        let app = test_app(MockProvider::new()).await;
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/characters")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let roster = body_json(resp).await;
        let ids: Vec<&str> = roster
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap())
            .collect();
        assert!(ids.contains(&"socrates"));
        assert!(ids.contains(&"karl-marx"));
    }
}
