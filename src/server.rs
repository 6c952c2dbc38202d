use crate::config::{LlmConfig, ServerConfig};
use crate::error::ApiError;
use crate::llm::{ChatBackend, GeminiBackend};
use crate::logging;
use crate::registry::ConversationRegistry;
use crate::search::SearchService;
use crate::session::{MemorySessionStore, SessionId, SessionStore};
use actix_web::http::StatusCode;
use actix_web::{App, Error, HttpRequest, HttpResponse, HttpServer, error, get, post, web};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const SEARCH_FALLBACK: &str = "An error occurred while processing your search";
const FOLLOW_UP_FALLBACK: &str = "An error occurred while processing your follow-up question";

#[derive(Clone)]
pub struct AppState {
    service: SearchService,
}

impl AppState {
    pub fn new(client: Client, llm: &LlmConfig) -> Self {
        Self::with_backend(
            Arc::new(GeminiBackend::new(client, llm)),
            Arc::new(MemorySessionStore::new()),
        )
    }

    pub fn with_backend(backend: Arc<dyn ChatBackend>, store: Arc<dyn SessionStore>) -> Self {
        let registry = ConversationRegistry::new(backend, store);
        Self {
            service: SearchService::new(registry),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FollowUpRequest {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
    query: Option<String>,
}

fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> Error {
    log::error!("JSON payload error: {:?}", err);
    match &err {
        error::JsonPayloadError::OverflowKnownLength { length, limit } => ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!(
                "Payload too large: {} bytes exceeds limit of {} bytes",
                length, limit
            ),
        )
        .into(),
        error::JsonPayloadError::Overflow { limit } => ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Payload exceeds limit of {} bytes", limit),
        )
        .into(),
        _ => ApiError::bad_request(format!("Invalid JSON payload: {}", err)).into(),
    }
}

fn query_error_handler(err: error::QueryPayloadError, _req: &HttpRequest) -> Error {
    log::error!("Query string error: {:?}", err);
    ApiError::bad_request(format!("Invalid query string: {}", err)).into()
}

pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(json_error_handler)
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(query_error_handler)
}

/// Registers the API routes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(search).service(follow_up);
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().body("Ok")
}

#[get("/api/search")]
async fn search(
    params: web::Query<SearchParams>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let Some(query) = non_empty(params.q.as_deref()) else {
        log::warn!("Search rejected: missing query parameter 'q'");
        return Err(ApiError::bad_request("Query parameter 'q' is required"));
    };

    match data.service.search(query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(err) => {
            log::error!("Search error: {}", err);
            Err(ApiError::from_search_error(err, SEARCH_FALLBACK))
        }
    }
}

#[post("/api/follow-up")]
async fn follow_up(
    body: web::Json<FollowUpRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let (Some(session_id), Some(query)) = (
        non_empty(body.session_id.as_deref()),
        non_empty(body.query.as_deref()),
    ) else {
        log::warn!(
            "Follow-up rejected: sessionId present={}, query present={}",
            non_empty(body.session_id.as_deref()).is_some(),
            non_empty(body.query.as_deref()).is_some()
        );
        return Err(ApiError::bad_request("Both sessionId and query are required"));
    };

    let session_id = SessionId::from(session_id);
    match data.service.follow_up(&session_id, query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(err) => {
            log::error!("Follow-up error: {}", err);
            Err(ApiError::from_search_error(err, FOLLOW_UP_FALLBACK))
        }
    }
}

pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    log::debug!("No route for {} {}", req.method(), req.path());
    Err(ApiError::new(StatusCode::NOT_FOUND, "Not found"))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn startup(config: ServerConfig) -> std::io::Result<()> {
    logging::init_logging(config.log_level.as_deref());

    log::info!("Initializing search server on {}:{}", config.host, config.port);
    log::info!("Model: {}", config.llm.model);
    log::info!("Generation config: {:?}", config.llm.generation);
    log::info!("Max payload size: {} KB", config.max_payload_size / 1024);

    let client = Client::builder()
        .pool_idle_timeout(Some(Duration::from_secs(50)))
        .timeout(Duration::from_secs(config.llm.request_timeout_secs))
        .build()
        .map_err(std::io::Error::other)?;

    let app_state = web::Data::new(AppState::new(client, &config.llm));
    let max_payload_size = config.max_payload_size;

    log::info!("Serving search API on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(app_state.clone())
            .app_data(json_config(max_payload_size))
            .app_data(query_config())
            .configure(routes)
            .default_service(web::route().to(not_found))
    })
    .bind((config.host, config.port))?
    .run()
    .await
}
