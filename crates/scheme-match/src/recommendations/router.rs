use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{SchemeId, UserId};
use super::repository::{
    ProfileStore, RecommendationStore, RepositoryError, SchemeCatalog,
};
use super::service::{RecommendationService, RecommendationServiceError};
use crate::catalog::{self, SchemeFilters, DEFAULT_POPULAR_LIMIT};

type SharedService<P, C, R> = Arc<RecommendationService<P, C, R>>;

/// Router builder exposing recommendation lifecycle and catalog browsing endpoints.
pub fn recommendation_router<P, C, R>(service: SharedService<P, C, R>) -> Router
where
    P: ProfileStore + 'static,
    C: SchemeCatalog + 'static,
    R: RecommendationStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/recommendations/:user_id",
            get(list_handler::<P, C, R>),
        )
        .route(
            "/api/v1/recommendations/:user_id/generate",
            post(generate_handler::<P, C, R>),
        )
        .route(
            "/api/v1/recommendations/:user_id/refresh",
            post(refresh_handler::<P, C, R>),
        )
        .route(
            "/api/v1/eligibility/:user_id",
            get(eligibility_handler::<P, C, R>),
        )
        .route("/api/v1/schemes", get(schemes_handler::<P, C, R>))
        .route(
            "/api/v1/schemes/categories",
            get(categories_handler::<P, C, R>),
        )
        .route("/api/v1/schemes/popular", get(popular_handler::<P, C, R>))
        .route(
            "/api/v1/schemes/:scheme_id",
            get(scheme_handler::<P, C, R>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CategoryQuery {
    #[serde(default)]
    pub(crate) category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PopularQuery {
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

pub(crate) async fn generate_handler<P, C, R>(
    State(service): State<SharedService<P, C, R>>,
    Path(user_id): Path<String>,
) -> Response
where
    P: ProfileStore + 'static,
    C: SchemeCatalog + 'static,
    R: RecommendationStore + 'static,
{
    match service.generate(&UserId(user_id)).await {
        Ok(recommendations) => (StatusCode::OK, axum::Json(recommendations)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn refresh_handler<P, C, R>(
    State(service): State<SharedService<P, C, R>>,
    Path(user_id): Path<String>,
) -> Response
where
    P: ProfileStore + 'static,
    C: SchemeCatalog + 'static,
    R: RecommendationStore + 'static,
{
    match service.refresh(&UserId(user_id)).await {
        Ok(recommendations) => (StatusCode::OK, axum::Json(recommendations)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn list_handler<P, C, R>(
    State(service): State<SharedService<P, C, R>>,
    Path(user_id): Path<String>,
    Query(query): Query<CategoryQuery>,
) -> Response
where
    P: ProfileStore + 'static,
    C: SchemeCatalog + 'static,
    R: RecommendationStore + 'static,
{
    let user_id = UserId(user_id);
    let result = match query.category.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(category) => service.recommendations_in_category(&user_id, category),
        None => service.recommendations_for(&user_id),
    };

    match result {
        Ok(recommendations) => (StatusCode::OK, axum::Json(recommendations)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn eligibility_handler<P, C, R>(
    State(service): State<SharedService<P, C, R>>,
    Path(user_id): Path<String>,
) -> Response
where
    P: ProfileStore + 'static,
    C: SchemeCatalog + 'static,
    R: RecommendationStore + 'static,
{
    match service.eligible_schemes(&UserId(user_id)) {
        Ok(shortlist) => (StatusCode::OK, axum::Json(shortlist)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn schemes_handler<P, C, R>(
    State(service): State<SharedService<P, C, R>>,
    Query(filters): Query<SchemeFilters>,
) -> Response
where
    P: ProfileStore + 'static,
    C: SchemeCatalog + 'static,
    R: RecommendationStore + 'static,
{
    match catalog::filter_schemes(service.catalog(), &filters) {
        Ok(schemes) => (StatusCode::OK, axum::Json(schemes)).into_response(),
        Err(error) => repository_error_response(error),
    }
}

pub(crate) async fn categories_handler<P, C, R>(
    State(service): State<SharedService<P, C, R>>,
) -> Response
where
    P: ProfileStore + 'static,
    C: SchemeCatalog + 'static,
    R: RecommendationStore + 'static,
{
    match catalog::categories(service.catalog()) {
        Ok(categories) => (StatusCode::OK, axum::Json(categories)).into_response(),
        Err(error) => repository_error_response(error),
    }
}

pub(crate) async fn popular_handler<P, C, R>(
    State(service): State<SharedService<P, C, R>>,
    Query(query): Query<PopularQuery>,
) -> Response
where
    P: ProfileStore + 'static,
    C: SchemeCatalog + 'static,
    R: RecommendationStore + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_POPULAR_LIMIT);
    match catalog::popular(service.catalog(), limit) {
        Ok(schemes) => (StatusCode::OK, axum::Json(schemes)).into_response(),
        Err(error) => repository_error_response(error),
    }
}

pub(crate) async fn scheme_handler<P, C, R>(
    State(service): State<SharedService<P, C, R>>,
    Path(scheme_id): Path<String>,
) -> Response
where
    P: ProfileStore + 'static,
    C: SchemeCatalog + 'static,
    R: RecommendationStore + 'static,
{
    let id = SchemeId(scheme_id);
    match service.catalog().get_by_id(&id) {
        Ok(Some(scheme)) => (StatusCode::OK, axum::Json(scheme)).into_response(),
        Ok(None) => {
            let payload = json!({
                "error": "scheme not found",
                "scheme_id": id.0,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(error) => repository_error_response(error),
    }
}

fn service_error_response(error: RecommendationServiceError) -> Response {
    match error {
        RecommendationServiceError::ProfileNotFound(user_id) => {
            let payload = json!({
                "error": "citizen profile not found",
                "user_id": user_id.0,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        RecommendationServiceError::Repository(error) => repository_error_response(error),
    }
}

fn repository_error_response(error: RepositoryError) -> Response {
    let status = match error {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
