use serde::{Deserialize, Serialize};

use crate::handlers::{NavEvent, View};
use crate::models::{DietaryPreference, HistoryItem};

/// `POST /api/scan` body: the captured photo as a data URI.
#[derive(Debug, Deserialize, Serialize)]
pub struct ScanRequest {
    pub image: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ScanResponse {
    pub item: HistoryItem,
    pub recognized: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PreferencesBody {
    pub preferences: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NavigationRequest {
    pub current: View,
    pub event: NavEvent,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NavigationResponse {
    pub view: View,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Ids in `requested` that are not part of the dietary catalog.
pub fn unknown_preferences(requested: &[String]) -> Vec<String> {
    requested
        .iter()
        .filter(|id| DietaryPreference::find(id).is_none())
        .cloned()
        .collect()
}

// Axum integration
#[cfg(feature = "http-server")]
pub mod server {
    use super::*;
    use axum::{
        extract::{DefaultBodyLimit, Path, Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::{delete, get, post},
        Json, Router,
    };
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower_http::services::ServeDir;

    use crate::handlers::{ScanHandler, ScanOutcome};
    use crate::models::{Recipe, DIETARY_PREFERENCES};
    use crate::services::{HistoryStore, ImageInput};

    // Phone photos as base64 data URIs easily exceed axum's 2 MB default
    const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

    pub struct AppState {
        pub scan_handler: Arc<ScanHandler>,
        pub history: Arc<HistoryStore>,
        pub api_token: Option<String>,
    }

    #[derive(Deserialize)]
    pub struct AuthQuery {
        token: Option<String>,
    }

    pub fn create_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
        let api = Router::new()
            .route("/health", get(health_check))
            .route("/api/scan", post(scan))
            .route("/api/history", get(list_history).delete(clear_history))
            .route("/api/preferences", get(get_preferences).put(set_preferences))
            .route("/api/dietary-options", get(dietary_options))
            .route("/api/saved", get(list_saved).post(save_recipe))
            .route("/api/saved/:title", delete(remove_saved))
            .route("/api/navigation", post(navigate))
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .with_state(Arc::new(state));

        match static_dir {
            Some(dir) => {
                log::info!("📂 Serving front end from {}", dir.display());
                api.fallback_service(ServeDir::new(dir))
            }
            None => api.route("/", get(root_handler)),
        }
    }

    /// Verify API token when one is configured
    fn verify_token(query: &AuthQuery, api_token: Option<&str>) -> Result<(), StatusCode> {
        let Some(expected) = api_token else {
            return Ok(());
        };

        match query.token.as_deref() {
            Some(provided) if tokens_match(provided, expected) => Ok(()),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }

    /// Compares both tokens as HMAC-SHA256 tags so the check takes the same
    /// time however many leading bytes match.
    fn tokens_match(provided: &str, expected: &str) -> bool {
        type HmacSha256 = Hmac<Sha256>;

        let tag = |token: &str| {
            HmacSha256::new_from_slice(expected.as_bytes()).map(|mut mac| {
                mac.update(token.as_bytes());
                mac
            })
        };

        match (tag(provided), tag(expected)) {
            (Ok(provided), Ok(expected)) => provided
                .verify_slice(&expected.finalize().into_bytes())
                .is_ok(),
            _ => false,
        }
    }

    fn internal_error(context: &str, e: anyhow::Error) -> StatusCode {
        log::error!("❌ {}: {:#}", context, e);
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
        (status, Json(ErrorBody::new(message))).into_response()
    }

    async fn scan(
        Query(query): Query<AuthQuery>,
        State(state): State<Arc<AppState>>,
        Json(request): Json<ScanRequest>,
    ) -> Result<Response, StatusCode> {
        verify_token(&query, state.api_token.as_deref())?;

        let image = match ImageInput::from_data_uri(&request.image) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("⚠️ Rejected scan image: {:#}", e);
                return Ok(error_response(StatusCode::BAD_REQUEST, e.to_string()));
            }
        };

        let outcome = state
            .scan_handler
            .scan(&image)
            .await
            .map_err(|e| internal_error("Failed to store scan", e))?;

        let response = match outcome {
            ScanOutcome::Completed { item, recognized } => {
                (StatusCode::OK, Json(ScanResponse { item, recognized })).into_response()
            }
            ScanOutcome::AnalysisUnavailable(reason) => error_response(
                StatusCode::BAD_GATEWAY,
                format!("analysis unavailable: {}", reason),
            ),
        };
        Ok(response)
    }

    async fn list_history(
        Query(query): Query<AuthQuery>,
        State(state): State<Arc<AppState>>,
    ) -> Result<impl IntoResponse, StatusCode> {
        verify_token(&query, state.api_token.as_deref())?;

        let history = state
            .history
            .list()
            .await
            .map_err(|e| internal_error("Failed to load history", e))?;

        Ok((StatusCode::OK, Json(history)))
    }

    async fn clear_history(
        Query(query): Query<AuthQuery>,
        State(state): State<Arc<AppState>>,
    ) -> Result<StatusCode, StatusCode> {
        verify_token(&query, state.api_token.as_deref())?;

        state
            .history
            .clear_history()
            .await
            .map_err(|e| internal_error("Failed to clear history", e))?;

        Ok(StatusCode::NO_CONTENT)
    }

    async fn get_preferences(
        Query(query): Query<AuthQuery>,
        State(state): State<Arc<AppState>>,
    ) -> Result<impl IntoResponse, StatusCode> {
        verify_token(&query, state.api_token.as_deref())?;

        let preferences = state
            .history
            .get_preferences()
            .await
            .map_err(|e| internal_error("Failed to load preferences", e))?;

        Ok(Json(PreferencesBody {
            preferences: preferences.into_iter().collect(),
        }))
    }

    async fn set_preferences(
        Query(query): Query<AuthQuery>,
        State(state): State<Arc<AppState>>,
        Json(body): Json<PreferencesBody>,
    ) -> Result<Response, StatusCode> {
        verify_token(&query, state.api_token.as_deref())?;

        let unknown = unknown_preferences(&body.preferences);
        if !unknown.is_empty() {
            return Ok(error_response(
                StatusCode::BAD_REQUEST,
                format!("unknown dietary preferences: {}", unknown.join(", ")),
            ));
        }

        let preferences: BTreeSet<String> = body.preferences.into_iter().collect();
        state
            .history
            .set_preferences(&preferences)
            .await
            .map_err(|e| internal_error("Failed to save preferences", e))?;

        Ok(Json(PreferencesBody {
            preferences: preferences.into_iter().collect(),
        })
        .into_response())
    }

    async fn dietary_options(
        Query(query): Query<AuthQuery>,
        State(state): State<Arc<AppState>>,
    ) -> Result<impl IntoResponse, StatusCode> {
        verify_token(&query, state.api_token.as_deref())?;
        Ok(Json(DIETARY_PREFERENCES))
    }

    async fn list_saved(
        Query(query): Query<AuthQuery>,
        State(state): State<Arc<AppState>>,
    ) -> Result<impl IntoResponse, StatusCode> {
        verify_token(&query, state.api_token.as_deref())?;

        let saved = state
            .history
            .saved_recipes()
            .await
            .map_err(|e| internal_error("Failed to load saved recipes", e))?;

        Ok(Json(saved))
    }

    async fn save_recipe(
        Query(query): Query<AuthQuery>,
        State(state): State<Arc<AppState>>,
        Json(recipe): Json<Recipe>,
    ) -> Result<Response, StatusCode> {
        verify_token(&query, state.api_token.as_deref())?;

        if recipe.title.trim().is_empty() {
            return Ok(error_response(StatusCode::BAD_REQUEST, "recipe title is required"));
        }

        let saved = state
            .history
            .save_recipe(recipe)
            .await
            .map_err(|e| internal_error("Failed to save recipe", e))?;

        Ok((StatusCode::CREATED, Json(saved)).into_response())
    }

    async fn remove_saved(
        Path(title): Path<String>,
        Query(query): Query<AuthQuery>,
        State(state): State<Arc<AppState>>,
    ) -> Result<StatusCode, StatusCode> {
        verify_token(&query, state.api_token.as_deref())?;

        let removed = state
            .history
            .remove_saved_recipe(&title)
            .await
            .map_err(|e| internal_error("Failed to remove saved recipe", e))?;

        if removed {
            Ok(StatusCode::NO_CONTENT)
        } else {
            Err(StatusCode::NOT_FOUND)
        }
    }

    async fn navigate(
        Query(query): Query<AuthQuery>,
        State(state): State<Arc<AppState>>,
        Json(request): Json<NavigationRequest>,
    ) -> Result<Response, StatusCode> {
        verify_token(&query, state.api_token.as_deref())?;

        let response = match request.current.transition(request.event) {
            Some(view) => Json(NavigationResponse { view }).into_response(),
            None => error_response(
                StatusCode::CONFLICT,
                format!("{:?} is not allowed from {}", request.event, request.current),
            ),
        };
        Ok(response)
    }

    async fn root_handler() -> &'static str {
        "FridgeChef API Server - POST a photo to /api/scan"
    }

    async fn health_check() -> &'static str {
        "OK"
    }

}
