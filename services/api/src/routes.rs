use crate::infra::{AppState, InMemoryProfileStore};
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::Extension;
use axum::Json;
use chrono::NaiveDate;
use scheme_match::recommendations::{
    recommendation_router, CitizenProfile, RecommendationService, RecommendationStore,
    SchemeCatalog, UserId,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Profile payload; the user id comes from the path.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProfileUpsert {
    #[serde(default)]
    pub(crate) date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) category: Option<String>,
    #[serde(default)]
    pub(crate) occupation: Option<String>,
    pub(crate) state: String,
    #[serde(default)]
    pub(crate) annual_income: Option<u64>,
    #[serde(default)]
    pub(crate) has_disability: bool,
    #[serde(default)]
    pub(crate) family_size: Option<u32>,
    #[serde(default)]
    pub(crate) education: Option<String>,
}

impl ProfileUpsert {
    fn into_profile(self, user_id: UserId) -> CitizenProfile {
        CitizenProfile {
            user_id,
            date_of_birth: self.date_of_birth,
            category: self.category,
            occupation: self.occupation,
            state: self.state,
            annual_income: self.annual_income,
            has_disability: self.has_disability,
            family_size: self.family_size,
            education: self.education,
        }
    }
}

pub(crate) fn with_platform_routes<C, R>(
    service: Arc<RecommendationService<InMemoryProfileStore, C, R>>,
    profiles: InMemoryProfileStore,
) -> axum::Router
where
    C: SchemeCatalog + 'static,
    R: RecommendationStore + 'static,
{
    recommendation_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/profiles/:user_id", put(upsert_profile))
        .layer(Extension(profiles))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn upsert_profile(
    Extension(profiles): Extension<InMemoryProfileStore>,
    Path(user_id): Path<String>,
    Json(payload): Json<ProfileUpsert>,
) -> Response {
    let profile = payload.into_profile(UserId(user_id));
    match profiles.upsert(profile.clone()) {
        Ok(()) => {
            info!(user_id = %profile.user_id, "citizen profile stored");
            (StatusCode::OK, Json(profile)).into_response()
        }
        Err(error) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{InMemoryRecommendationStore, InMemorySchemeCatalog};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use scheme_match::catalog;
    use scheme_match::recommendations::RuleOnlyScorer;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let profiles = InMemoryProfileStore::default();
        let service = RecommendationService::new(
            Arc::new(profiles.clone()),
            Arc::new(InMemorySchemeCatalog::new(
                catalog::sample_catalog().expect("sample catalog"),
            )),
            Arc::new(InMemoryRecommendationStore::default()),
            Arc::new(RuleOnlyScorer),
        )
        .with_evaluation_date(NaiveDate::from_ymd_opt(2025, 9, 24).expect("valid date"));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };

        with_platform_routes(Arc::new(service), profiles).layer(Extension(state))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_reflects_startup_flag() {
        let request = || {
            Request::builder()
                .uri("/ready")
                .body(Body::empty())
                .expect("request")
        };

        let response = app(false).oneshot(request()).await.expect("response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app(true).oneshot(request()).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn stored_profile_can_be_recommended() {
        let app = app(true);
        let profile = json!({
            "dateOfBirth": "1978-11-02",
            "category": "OBC",
            "occupation": "Farmer",
            "state": "Odisha",
            "annualIncome": 120000,
            "familySize": 5
        });

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/v1/profiles/farmer-1")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(profile.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["userId"], "farmer-1");

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/recommendations/farmer-1/generate")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let ids: Vec<&str> = body
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|rec| rec["scheme"]["id"].as_str())
            .collect();
        assert!(ids.contains(&"kalia"));
    }
}
