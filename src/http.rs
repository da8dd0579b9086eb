//! HTTP API
//!
//! REST endpoints over the offer service, CORS-open for browser frontends.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::service::{OfferService, RequestedCurrency, SearchError, SearchQuery};
use crate::types::Direction;

/// Uniform response envelope
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Create the API router with all endpoints
pub fn create_router(service: Arc<OfferService>) -> Router {
    Router::new()
        .route("/api/search", post(search))
        .route("/api/health", get(health))
        .route("/api/refresh", post(refresh))
        .with_state(service)
        // CORS for frontend
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    action: String,
    amount: f64,
    currency: String,
}

fn reject(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::error(msg))).into_response()
}

/// POST /api/search - ranked offers for a requested trade
async fn search(
    State(service): State<Arc<OfferService>>,
    Json(request): Json<SearchRequest>,
) -> Response {
    // Reject malformed requests before touching the cache.
    let Some(direction) = Direction::from_str(&request.action) else {
        return reject(
            StatusCode::BAD_REQUEST,
            "Invalid action. Use \"buy\" or \"sell\"",
        );
    };

    let currency = if request.currency.eq_ignore_ascii_case(service.asset()) {
        RequestedCurrency::Asset
    } else if request.currency.eq_ignore_ascii_case(service.fiat()) {
        RequestedCurrency::Fiat
    } else {
        return reject(
            StatusCode::BAD_REQUEST,
            format!(
                "Invalid currency. Use \"{}\" or \"{}\"",
                service.asset(),
                service.fiat()
            ),
        );
    };

    let query = SearchQuery {
        direction,
        amount: request.amount,
        currency,
    };

    match service.search(query).await {
        Ok(report) => Json(ApiResponse::success(report)).into_response(),
        Err(SearchError::InvalidAmount) => {
            reject(StatusCode::BAD_REQUEST, SearchError::InvalidAmount.to_string())
        }
        Err(err @ SearchError::Unavailable(_)) => {
            reject(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
    }
}

/// GET /api/health - per-slot snapshot freshness and errors
async fn health(State(service): State<Arc<OfferService>>) -> impl IntoResponse {
    Json(ApiResponse::success(service.health().await))
}

/// POST /api/refresh - fire-and-forget snapshot refresh
async fn refresh(State(service): State<Arc<OfferService>>) -> impl IntoResponse {
    service.trigger_refresh();
    (
        StatusCode::ACCEPTED,
        Json(ApiResponse::success("refresh started")),
    )
}
