//! Application startup and lifecycle management.

use axum::{
    http::{header, HeaderValue, Method, Request},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::SupportConfig;
use crate::handlers;
use crate::models::NewFaq;
use crate::services::providers::{GeminiConfig, GeminiTextProvider, TextProvider};
use crate::services::{
    metrics, EscalationClassifier, FaqStore, LlmGateway, MemorySupportStore, PgSupportStore,
    SupportService, SupportStore,
};

const SEED_FAQS: &str = include_str!("../data/faqs.json");

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub support: SupportService,
}

/// FAQ set loaded into an empty store at startup.
pub fn seed_faqs() -> Result<Vec<NewFaq>, AppError> {
    serde_json::from_str(SEED_FAQS)
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid bundled FAQ data: {}", e)))
}

/// Connect the store, build the provider and gateway, and load FAQs.
pub async fn build_state(config: &SupportConfig) -> Result<AppState, AppError> {
    let store: Arc<dyn SupportStore> = if config.database.is_in_memory() {
        tracing::warn!("Using in-memory store; data is lost on restart");
        Arc::new(MemorySupportStore::new())
    } else {
        let pg = PgSupportStore::connect(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to PostgreSQL: {}", e);
            e
        })?;
        pg.run_migrations().await?;
        Arc::new(pg)
    };

    let gemini_config = GeminiConfig::new(
        config.llm.api_key.clone(),
        config.llm.model.clone(),
        std::time::Duration::from_secs(config.llm.timeout_secs),
    );
    let provider: Arc<dyn TextProvider> = Arc::new(
        GeminiTextProvider::new(gemini_config)
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?,
    );
    tracing::info!(model = %config.llm.model, "Initialized Gemini text provider");

    let gateway = LlmGateway::new(provider, config.llm.clone(), config.chat.history_limit);
    let support = SupportService::new(
        store,
        FaqStore::new(Vec::new(), config.chat.faq_min_match_score),
        gateway,
        EscalationClassifier::default(),
        config.chat.history_limit,
    );
    support.load_faqs(&seed_faqs()?).await?;

    Ok(AppState { support })
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Build the HTTP router with the middleware stack.
pub fn build_router(
    state: AppState,
    allowed_origins: &[String],
    frontend_dir: Option<&str>,
) -> Router {
    let api = Router::new()
        .route("/api/sessions/start", post(handlers::start_session))
        .route("/api/chat", post(handlers::chat))
        .route("/api/sessions/:session_id/history", get(handlers::get_history))
        .route(
            "/api/sessions/:session_id/escalate",
            post(handlers::escalate_session),
        )
        .route("/api/sessions/:session_id/end", post(handlers::end_session))
        .route("/api/sessions/:session_id/summary", get(handlers::get_summary))
        .route(
            "/api/faqs",
            get(handlers::list_faqs).post(handlers::create_faq),
        )
        .route("/api/faqs/categories", get(handlers::list_categories))
        .route("/api/admin/stats", get(handlers::stats))
        .route("/api/admin/escalated", get(handlers::escalated_sessions))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler));

    let app = match frontend_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: SupportConfig) -> Result<Self, AppError> {
        metrics::init_metrics();

        let state = build_state(&config).await?;
        let router = build_router(
            state,
            &config.allowed_origins,
            config.frontend_dir.as_deref(),
        );

        let addr = config.common.bind_address();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Support service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}
