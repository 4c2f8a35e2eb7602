use crate::config::DermaConfig;
use crate::handlers;
use crate::models::LabelTable;
use crate::services::classifier::{Classifier, ResNetClassifier};
use crate::services::providers::{Explainer, GeminiExplainer};
use crate::services::AnalysisService;
use axum::{
    extract::DefaultBodyLimit,
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
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: DermaConfig,
    pub analyzer: Arc<AnalysisService>,
}

/// Application wrapper for lifecycle management.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Load the classifier and Gemini client, then bind the listener.
    pub async fn build(config: DermaConfig) -> Result<Self, AppError> {
        let labels = config.label_table();

        let classifier = ResNetClassifier::load(&config.classifier, labels.len()).map_err(|e| {
            tracing::error!(
                path = %config.classifier.weights_path.display(),
                "Failed to load classifier: {}",
                e
            );
            AppError::ConfigError(anyhow::Error::new(e))
        })?;

        let explainer = GeminiExplainer::new(config.gemini_config()).map_err(|e| {
            tracing::error!("Failed to initialize Gemini explainer: {}", e);
            AppError::ConfigError(anyhow::Error::new(e))
        })?;

        if config.gemini.verify_on_startup {
            explainer.health_check().await.map_err(|e| {
                tracing::error!("Gemini API key verification failed: {}", e);
                AppError::ConfigError(anyhow::anyhow!("Gemini API key verification failed: {}", e))
            })?;
            tracing::info!(model = %config.gemini.model, "Gemini API key verified");
        } else {
            tracing::warn!("Skipping Gemini API key verification");
        }

        Self::build_with(config, labels, Arc::new(classifier), Arc::new(explainer)).await
    }

    /// Bind with caller-supplied capabilities (port 0 = random port for testing).
    pub async fn build_with(
        config: DermaConfig,
        labels: LabelTable,
        classifier: Arc<dyn Classifier>,
        explainer: Arc<dyn Explainer>,
    ) -> Result<Self, AppError> {
        tracing::info!(
            classifier = classifier.name(),
            explainer_model = explainer.model(),
            labels = labels.len(),
            "Initialized analysis service"
        );

        let analyzer = AnalysisService::new(
            classifier,
            explainer,
            Arc::new(labels),
            config.explain_timeout(),
        );
        let state = AppState {
            config: config.clone(),
            analyzer: Arc::new(analyzer),
        };
        let router = build_router(state);

        let address = config.common.bind_address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", address, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Derma service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.upload.max_bytes;
    let static_dir = state.config.static_dir.clone();

    let mut router = Router::new()
        .route(
            "/analyze",
            post(handlers::analyze).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics));

    if let Some(dir) = static_dir {
        tracing::info!(dir = %dir.display(), "Serving static front-end");
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
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
        .with_state(state)
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
            Ok(mut stream) => {
                stream.recv().await;
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
