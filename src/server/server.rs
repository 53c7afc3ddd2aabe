//! Server instance management

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::Router;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::config::ServerConfig;
use super::error::ApiError;
use super::handlers::{create_router, AppState, USER_ID_HEADER};
use crate::engine::{load_classifier, Predictor};
use crate::storage::Storage;

/// ObesiTrack HTTP server
///
/// Owns the configuration, the shared database handle and the predictor,
/// and runs the axum router until a shutdown signal arrives.
pub struct ObesiTrackServer {
    /// Server configuration
    config: ServerConfig,

    /// Storage layer wrapped in Arc<Mutex> for thread safety
    storage: Arc<Mutex<Storage>>,

    /// Prediction service
    predictor: Arc<Predictor>,
}

impl ObesiTrackServer {
    /// Create new server instance
    ///
    /// Validates the configuration, loads the classifier and opens the
    /// database, creating its parent directory when missing.
    pub fn new(config: ServerConfig) -> Result<Self, ApiError> {
        if let Err(e) = config.validate() {
            return Err(ApiError::internal(format!("Invalid config: {}", e)));
        }

        let classifier = load_classifier(config.model_path.as_deref()).map_err(|e| {
            error!("Failed to load classifier: {}", e);
            ApiError::internal(format!("Failed to load classifier: {}", e))
        })?;

        if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                error!("Failed to create {:?}: {}", parent, e);
                ApiError::internal(format!("Failed to create database directory: {}", e))
            })?;
        }

        let storage = Storage::open(&config.db_path).map_err(|e| {
            error!("Failed to open storage: {}", e);
            ApiError::internal(format!("Failed to open storage: {}", e))
        })?;

        Ok(Self::with_parts(config, storage, Predictor::new(classifier)))
    }

    /// Assemble a server from an already opened database and predictor
    pub fn with_parts(config: ServerConfig, storage: Storage, predictor: Predictor) -> Self {
        Self {
            config,
            storage: Arc::new(Mutex::new(storage)),
            predictor: Arc::new(predictor),
        }
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> Result<SocketAddr, ApiError> {
        self.config
            .socket_addr()
            .map_err(|e| ApiError::internal(format!("Failed to parse address: {}", e)))
    }

    /// Router with state, CORS and request tracing applied
    pub fn router(&self) -> Router {
        let state = AppState::new(
            Arc::clone(&self.storage),
            Arc::clone(&self.predictor),
            self.config.clone(),
        );

        let mut app = create_router().with_state(state).layer(self.cors_layer());
        if self.config.enable_logging {
            app = app.layer(TraceLayer::new_for_http());
        }
        app
    }

    fn cors_layer(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .config
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(USER_ID_HEADER)])
    }

    /// Start server and serve until Ctrl+C or SIGTERM
    pub async fn start(&self) -> Result<(), ApiError> {
        let addr = self.socket_addr()?;
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            error!("Failed to bind to {}: {:?}", addr, e);
            ApiError::internal(format!("Failed to bind to {}: {}", addr, e))
        })?;

        info!(
            "Server listening on: {} (classifier: {})",
            self.server_url(),
            self.predictor.classifier_name()
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ApiError::internal(format!("Server error: {}", e)))?;

        self.checkpoint();
        Ok(())
    }

    /// Fold the WAL back into the database file
    fn checkpoint(&self) {
        match self.storage.lock() {
            Ok(mut storage) => {
                if let Err(e) = storage.close() {
                    warn!("WAL checkpoint failed: {}", e);
                }
            }
            Err(_) => warn!("Storage mutex poisoned, skipping WAL checkpoint"),
        }
    }

    /// Get storage reference
    #[must_use]
    pub fn storage(&self) -> Arc<Mutex<Storage>> {
        Arc::clone(&self.storage)
    }

    /// Get server URL
    #[must_use]
    pub fn server_url(&self) -> String {
        self.config.server_url()
    }
}

/// Resolve on Ctrl+C or, on unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix;
        match unix::signal(unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received TERM signal");
            }
            Err(e) => {
                error!("Failed to install TERM handler: {}", e);
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
}
