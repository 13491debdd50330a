use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use scholar_match::llm::LanguageModel;
use scholar_match::portal::{portal_router, Portal};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_portal_routes<L>(portal: Arc<Portal<L>>) -> Router
where
    L: LanguageModel + 'static,
{
    portal_router(portal)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
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

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use scholar_match::config::LlmConfig;
    use scholar_match::llm::ChatCompletionsClient;
    use scholar_match::portal::{InMemoryStore, NewScholarship, PortalSettings, Repositories};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn app(ready: bool) -> (Router, Arc<Portal<ChatCompletionsClient>>) {
        let model = Arc::new(ChatCompletionsClient::new(&LlmConfig::default()).expect("client"));
        let portal = Arc::new(Portal::new(
            Repositories::in_memory(InMemoryStore::new()),
            model,
            PortalSettings::default(),
        ));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        state.readiness.store(ready, Ordering::Release);
        let router = with_portal_routes(portal.clone()).layer(Extension(state));
        (router, portal)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let (router, _) = app(false);
        let (status, body) = get_json(router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_tracks_the_flag() {
        let (router, _) = app(false);
        let (status, body) = get_json(router, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");

        let (router, _) = app(true);
        let (status, _) = get_json(router, "/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn portal_routes_are_mounted() {
        let (router, portal) = app(true);
        portal
            .catalog
            .create(
                NewScholarship {
                    title: "Merit Award".to_string(),
                    provider: "State Board".to_string(),
                    ..NewScholarship::default()
                },
                chrono::Utc::now(),
            )
            .expect("listing");

        let (status, body) = get_json(router, "/api/v1/scholarships?q=merit").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
    }

    #[tokio::test]
    async fn ai_routes_answer_unavailable_without_api_key() {
        let (router, portal) = app(true);
        let created = portal
            .catalog
            .create(
                NewScholarship {
                    title: "Merit Award".to_string(),
                    provider: "State Board".to_string(),
                    ..NewScholarship::default()
                },
                chrono::Utc::now(),
            )
            .expect("listing");
        portal
            .profiles
            .upsert(
                &scholar_match::portal::UserId("student-1".to_string()),
                None,
                Default::default(),
                chrono::Utc::now(),
            )
            .expect("profile");

        let response = router
            .oneshot(
                Request::post(format!("/api/v1/scholarships/{}/sop", created.id.0))
                    .header("x-user-id", "student-1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
