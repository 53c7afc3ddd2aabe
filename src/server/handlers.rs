//! HTTP handlers for REST API endpoints

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

use super::config::ServerConfig;
use super::error::{ApiError, ApiResult};
use super::responses::{
    DeleteResponse, FeatureImportanceResponse, HistoryResponse, ModelHealthResponse,
    ModelInfoResponse, ModelStatusResponse, PredictionResponse,
};
use crate::engine::{ObesityLabel, PredictionInput, Predictor, FEATURE_NAMES};
use crate::storage::{Analytics, DashboardStats, PredictionStore, Storage, StorageError};

/// Header carrying the caller identity
pub const USER_ID_HEADER: &str = "x-user-id";

/// User id for requests without [`USER_ID_HEADER`]
pub const ANONYMOUS_USER: &str = "anonymous";

/// Query parameters for history listings
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of entries to return
    pub limit: Option<usize>,
}

/// Default page size of the admin listing
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Query parameters for the paginated admin listing
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Page number, starting at 1
    pub page: Option<usize>,
    /// Entries per page
    pub per_page: Option<usize>,
}

/// State shared across all handlers
///
/// Uses `Arc<Mutex<Storage>>` because `rusqlite::Connection` is not `Sync`.
/// Handlers lock it only inside blocking tasks, never across an `.await`.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe storage access requiring mutex lock
    pub storage: Arc<Mutex<Storage>>,

    /// Prediction service with the injected classifier
    pub predictor: Arc<Predictor>,

    /// Immutable server configuration
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Create AppState from already shared parts
    pub fn new(
        storage: Arc<Mutex<Storage>>,
        predictor: Arc<Predictor>,
        config: ServerConfig,
    ) -> Self {
        Self {
            storage,
            predictor,
            config: Arc::new(config),
        }
    }
}

fn lock_storage(storage: &Mutex<Storage>) -> ApiResult<MutexGuard<'_, Storage>> {
    storage.lock().map_err(|_| {
        error!("Storage mutex poisoned");
        ApiError::internal("Storage unavailable")
    })
}

/// Run synchronous classifier or SQLite work on the blocking pool
async fn run_blocking<T, F>(task: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(|e| {
        error!("Blocking task failed: {}", e);
        ApiError::internal("Internal server error")
    })?
}

fn user_id(headers: &HeaderMap) -> String {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_USER)
        .to_string()
}

/// POST /api/predict - Classify one questionnaire and store the result
pub async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<PredictionResponse>> {
    let Json(payload) = payload?;
    let input = PredictionInput::from_json(&payload).map_err(|errors| {
        info!("Rejected prediction input: {}", errors);
        ApiError::from(errors)
    })?;
    let user_id = user_id(&headers);

    info!("Prediction requested by {}", user_id);

    let result = run_blocking(move || {
        let result = state.predictor.predict(&input)?;
        let storage = lock_storage(&state.storage)?;
        PredictionStore::new(&storage).insert(&user_id, &input, &result, Utc::now())?;
        Ok(result)
    })
    .await?;

    Ok(Json(PredictionResponse::from(&result)))
}

fn history_response(
    state: &AppState,
    user_id: String,
    limit: usize,
) -> ApiResult<HistoryResponse> {
    let storage = lock_storage(&state.storage)?;
    let store = PredictionStore::new(&storage);
    let records = store.recent_for_user(&user_id, limit)?;
    let total = store.count_for_user(&user_id)?;
    Ok(HistoryResponse::new(user_id, &records, total))
}

/// GET /api/predictions/history - Caller's recent predictions
pub async fn prediction_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<HistoryResponse>> {
    let Query(query) = query?;
    let user_id = user_id(&headers);
    let limit = query.limit.unwrap_or(state.config.default_history_limit);

    info!("History requested by {}, limit={}", user_id, limit);

    let response = run_blocking(move || history_response(&state, user_id, limit)).await?;
    Ok(Json(response))
}

/// GET /api/admin/users/:user_id/predictions - One page of any user's predictions
pub async fn user_predictions(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<HistoryResponse>> {
    let Query(query) = query.map_err(|r| ApiError::invalid_query("query", r.body_text()))?;
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PAGE_SIZE);

    info!(
        "Admin history lookup for {}, page={} per_page={}",
        user_id, page, per_page
    );

    let response = run_blocking(move || {
        let storage = lock_storage(&state.storage)?;
        let store = PredictionStore::new(&storage);
        let records = store.page_for_user(&user_id, page, per_page)?;
        let total = store.count_for_user(&user_id)?;
        Ok(HistoryResponse::new(user_id, &records, total).with_page(page, per_page))
    })
    .await?;
    if response.total == 0 {
        return Err(ApiError::not_found(format!("predictions of {}", response.user_id)));
    }
    Ok(Json(response))
}

/// DELETE /api/admin/users/:user_id/predictions - Drop a user's history
pub async fn delete_user_predictions(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<DeleteResponse>> {
    info!("Deleting predictions of {}", user_id);

    let response = run_blocking(move || {
        let storage = lock_storage(&state.storage)?;
        let deleted = PredictionStore::new(&storage).delete_for_user(&user_id)?;
        Ok(DeleteResponse { user_id, deleted })
    })
    .await?;

    if response.deleted == 0 {
        return Err(ApiError::not_found(format!("predictions of {}", response.user_id)));
    }
    Ok(Json(response))
}

/// GET /api/admin/stats/dashboard - Aggregates for the admin dashboard
pub async fn dashboard_stats(State(state): State<AppState>) -> ApiResult<Json<DashboardStats>> {
    let stats = run_blocking(move || {
        let storage = lock_storage(&state.storage)?;
        Analytics::new(&storage)
            .dashboard(Utc::now())
            .map_err(|e| ApiError::from(StorageError::from(e)))
    })
    .await?;

    Ok(Json(stats))
}

/// GET /api/model/status - Classifier in service
pub async fn model_status(State(state): State<AppState>) -> Json<ModelStatusResponse> {
    Json(ModelStatusResponse {
        status: "loaded".to_string(),
        classifier: state.predictor.classifier_name().to_string(),
        model_path: state
            .config
            .model_path
            .as_ref()
            .map(|p| p.display().to_string()),
        labels: ObesityLabel::ALL.to_vec(),
        features: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
    })
}

/// GET /api/model/info - Shape of the classifier in service
pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfoResponse> {
    let classifier = state.predictor.classifier();
    let classes = classifier.classes();

    Json(ModelInfoResponse {
        classifier: classifier.name().to_string(),
        algorithm: classifier.algorithm().to_string(),
        feature_count: FEATURE_NAMES.len(),
        class_count: classes.len(),
        features: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        classes,
        supports_feature_importance: classifier.feature_importance().is_some(),
    })
}

/// GET /api/model/feature-importance - Feature ranking of the classifier
pub async fn feature_importance(
    State(state): State<AppState>,
) -> ApiResult<Json<FeatureImportanceResponse>> {
    let classifier = state.predictor.classifier();
    let ranking = classifier.feature_importance().ok_or_else(|| {
        ApiError::not_found(format!("feature importance of {}", classifier.name()))
    })?;

    Ok(Json(FeatureImportanceResponse::new(classifier.name(), ranking)))
}

/// GET /api/model/health - Run a canned prediction through the classifier
pub async fn model_health(State(state): State<AppState>) -> ApiResult<Json<ModelHealthResponse>> {
    let predictor = Arc::clone(&state.predictor);
    let outcome = run_blocking(move || {
        Ok(predictor.predict(&PredictionInput::reference_sample()))
    })
    .await?;

    let classifier = state.predictor.classifier_name();
    let response = match outcome {
        Ok(result) => ModelHealthResponse::healthy(classifier, &result),
        Err(e) => {
            warn!("Model health check failed: {}", e);
            ModelHealthResponse::unhealthy(classifier)
        }
    };
    Ok(Json(response))
}

/// GET /api/health - Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "obesitrack",
        "version": env!("CARGO_PKG_VERSION"),
        "classifier": state.predictor.classifier_name(),
    }))
}

/// Create router with all API endpoints
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/predict", post(predict))
        .route("/api/predictions/history", get(prediction_history))
        .route(
            "/api/admin/users/:user_id/predictions",
            get(user_predictions).delete(delete_user_predictions),
        )
        .route("/api/admin/stats/dashboard", get(dashboard_stats))
        .route("/api/model/status", get(model_status))
        .route("/api/model/info", get(model_info))
        .route("/api/model/feature-importance", get(feature_importance))
        .route("/api/model/health", get(model_health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_user_id_defaults_to_anonymous() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_id(&headers), ANONYMOUS_USER);

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("   "));
        assert_eq!(user_id(&headers), ANONYMOUS_USER);

        headers.insert(USER_ID_HEADER, HeaderValue::from_static(" alice "));
        assert_eq!(user_id(&headers), "alice");
    }

    #[test]
    fn test_history_query_empty() {
        let query = HistoryQuery::default();
        assert!(query.limit.is_none());

        let query = PageQuery::default();
        assert!(query.page.is_none() && query.per_page.is_none());
    }
}
