use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pricewise_core::domain::group::{
    PriceComparison, ProductGroup, RankedGroup, RecommendationCandidate,
};
use pricewise_core::domain::product::ProductId;
use pricewise_core::errors::InterfaceError;
use pricewise_core::search::{IndexStats, SearchService};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ApiState {
    service: Arc<SearchService>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub top_n: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopNParams {
    pub top_n: Option<usize>,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub correlation_id: String,
}

/// Renders an [`InterfaceError`] as a JSON response with a matching status.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = self.0;
        let (status, detail) = match &error {
            InterfaceError::BadRequest { message, .. } => {
                (StatusCode::BAD_REQUEST, Some(message.clone()))
            }
            InterfaceError::NotFound { message, .. } => {
                (StatusCode::NOT_FOUND, Some(message.clone()))
            }
            InterfaceError::ServiceUnavailable { .. } => (StatusCode::SERVICE_UNAVAILABLE, None),
            InterfaceError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };

        if status.is_server_error() {
            warn!(
                event_name = "api.request.failed",
                correlation_id = error.correlation_id(),
                status = status.as_u16(),
                error = %error,
                "request failed"
            );
        }

        let body = ErrorBody {
            error: error.user_message().to_string(),
            detail,
            correlation_id: error.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(service: Arc<SearchService>) -> Router {
    Router::new()
        .route("/search", get(search))
        .route("/product/{id}", get(product_detail))
        .route("/compare/{id}", get(compare))
        .route("/recommend/{id}", get(recommend))
        .route("/stores", get(stores))
        .route("/admin/refresh", post(refresh))
        .with_state(ApiState { service })
}

fn new_correlation_id() -> String {
    format!("req-{}", Uuid::new_v4().simple())
}

fn parse_product_id(raw: &str, correlation_id: &str) -> Result<ProductId, ApiError> {
    raw.trim().parse::<i64>().map(ProductId).map_err(|_| {
        ApiError(InterfaceError::bad_request(
            format!("product id must be an integer, got `{raw}`"),
            correlation_id,
        ))
    })
}

fn validate_top_n(top_n: Option<usize>, correlation_id: &str) -> Result<Option<usize>, ApiError> {
    match top_n {
        Some(0) => Err(ApiError(InterfaceError::bad_request(
            "top_n must be greater than zero",
            correlation_id,
        ))),
        other => Ok(other),
    }
}

pub async fn search(
    State(state): State<ApiState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<RankedGroup>>, ApiError> {
    let correlation_id = new_correlation_id();
    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|query| !query.is_empty())
        .ok_or_else(|| {
            ApiError(InterfaceError::bad_request("query must not be blank", &correlation_id))
        })?;
    let top_n = validate_top_n(params.top_n, &correlation_id)?;

    let results = state.service.search(query, top_n);
    info!(
        event_name = "api.search.completed",
        correlation_id = %correlation_id,
        groups = results.len(),
        "search served"
    );
    Ok(Json(results))
}

pub async fn product_detail(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> Result<Json<ProductGroup>, ApiError> {
    let correlation_id = new_correlation_id();
    let product_id = parse_product_id(&raw_id, &correlation_id)?;

    state
        .service
        .product_detail(product_id)
        .map(Json)
        .map_err(|error| ApiError(error.into_interface(correlation_id)))
}

pub async fn compare(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> Result<Json<PriceComparison>, ApiError> {
    let correlation_id = new_correlation_id();
    let product_id = parse_product_id(&raw_id, &correlation_id)?;

    state
        .service
        .compare(product_id)
        .map(Json)
        .map_err(|error| ApiError(error.into_interface(correlation_id)))
}

pub async fn recommend(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
    Query(params): Query<TopNParams>,
) -> Result<Json<Vec<RecommendationCandidate>>, ApiError> {
    let correlation_id = new_correlation_id();
    let product_id = parse_product_id(&raw_id, &correlation_id)?;
    let top_n = validate_top_n(params.top_n, &correlation_id)?;

    state
        .service
        .recommend(product_id, top_n)
        .map(Json)
        .map_err(|error| ApiError(error.into_interface(correlation_id)))
}

pub async fn stores(State(state): State<ApiState>) -> Json<Vec<String>> {
    Json(state.service.stores())
}

pub async fn refresh(State(state): State<ApiState>) -> Result<Json<IndexStats>, ApiError> {
    let correlation_id = new_correlation_id();
    info!(
        event_name = "api.refresh.requested",
        correlation_id = %correlation_id,
        "manual index refresh requested"
    );

    state
        .service
        .refresh()
        .await
        .map(Json)
        .map_err(|error| ApiError(error.into_interface(correlation_id)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use pricewise_core::search::{SearchService, SearchSettings};
    use pricewise_db::{InMemoryCatalogRepository, SampleCatalog};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::{router, ErrorBody};

    async fn app() -> (Router, Arc<InMemoryCatalogRepository>) {
        let repo = Arc::new(InMemoryCatalogRepository::default());
        SampleCatalog::load(repo.as_ref()).await.expect("seed");
        let service = Arc::new(SearchService::new(repo.clone(), SearchSettings::default()));
        service.refresh().await.expect("initial refresh");
        (router(service), repo)
    }

    async fn call(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let request =
            Request::builder().method(method).uri(uri).body(Body::empty()).expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn blank_query_is_rejected_with_correlation_id() {
        let (app, _) = app().await;

        let (status, body) = call(&app, Method::GET, "/search?query=%20%20").await;
        let body: ErrorBody = serde_json::from_value(body).expect("error body");

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.correlation_id.starts_with("req-"));
        assert_eq!(body.detail.as_deref(), Some("query must not be blank"));

        let (status, _) = call(&app, Method::GET, "/search").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn search_returns_ranked_groups() {
        let (app, _) = app().await;

        let (status, body) = call(&app, Method::GET, "/search?query=olpers%20milk&top_n=5").await;
        let groups = body.as_array().expect("array");

        assert_eq!(status, StatusCode::OK);
        assert!(!groups.is_empty());
        assert!(groups.iter().all(|group| group.get("final_ranking_score").is_some()));
        assert!(groups.iter().all(|group| group.get("store_prices").is_some()));
    }

    #[tokio::test]
    async fn zero_top_n_is_a_bad_request() {
        let (app, _) = app().await;

        let (status, _) = call(&app, Method::GET, "/search?query=milk&top_n=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids_are_distinguished() {
        let (app, _) = app().await;

        let (status, _) = call(&app, Method::GET, "/product/9999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, Method::GET, "/recommend/9999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, Method::GET, "/compare/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn product_compare_and_recommend_serve_known_ids() {
        let (app, _) = app().await;

        let (status, detail) = call(&app, Method::GET, "/product/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["id"], 1);

        let (status, comparison) = call(&app, Method::GET, "/compare/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(comparison["target"]["id"], 1);
        assert!(comparison["alternatives"].is_array());

        let (status, recommendations) = call(&app, Method::GET, "/recommend/1?top_n=3").await;
        assert_eq!(status, StatusCode::OK);
        assert!(recommendations.as_array().expect("array").len() <= 3);
    }

    #[tokio::test]
    async fn stores_are_listed_once_each() {
        let (app, _) = app().await;

        let (status, body) = call(&app, Method::GET, "/stores").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!(["Carrefour", "Imtiaz", "Metro", "Naheed"]));
    }

    #[tokio::test]
    async fn failed_refresh_reports_unavailable_and_keeps_serving() {
        let (app, repo) = app().await;
        repo.set_unavailable(true);

        let (status, body) = call(&app, Method::POST, "/admin/refresh").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.get("detail").is_none());

        let (status, body) = call(&app, Method::GET, "/search?query=dalda").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.as_array().expect("array").is_empty());
    }

    #[tokio::test]
    async fn manual_refresh_publishes_next_generation() {
        let (app, _) = app().await;

        let (status, body) = call(&app, Method::POST, "/admin/refresh").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["generation"], 2);
        assert_eq!(body["ready"], true);
    }
}
