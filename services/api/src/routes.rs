use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use contact_allocator::error::AppError;
use contact_allocator::workflows::allocation::{
    Agent, AllocationEngine, AllocationSettings, AllocationSnapshot, Contact, InputTables,
    PriorSnapshot, PriorityMap, RunMode,
};
use serde::Deserialize;
use serde_json::json;
use std::num::NonZeroUsize;
use std::sync::atomic::Ordering;
use tracing::info;

#[derive(Debug, Deserialize)]
pub(crate) struct AllocationRequest {
    pub(crate) contacts: Vec<Contact>,
    pub(crate) agents: Vec<Agent>,
    #[serde(default)]
    pub(crate) priorities: PriorityMap,
    #[serde(default)]
    pub(crate) max_per_agent: Option<NonZeroUsize>,
    /// Prior snapshot to extend; absent for a fresh run.
    #[serde(default)]
    pub(crate) prior: Option<PriorSnapshot>,
}

pub(crate) fn with_allocation_routes() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/allocations", post(allocation_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
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

pub(crate) async fn allocation_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<AllocationRequest>,
) -> Result<Json<AllocationSnapshot>, AppError> {
    let AllocationRequest {
        contacts,
        agents,
        priorities,
        max_per_agent,
        prior,
    } = payload;

    let settings = AllocationSettings {
        max_per_agent: max_per_agent.or(state.defaults.max_per_agent),
    };
    let mode = match prior {
        Some(prior) => RunMode::Incremental(prior),
        None => RunMode::Fresh,
    };
    let tables = InputTables {
        contacts,
        agents,
        priorities,
    };

    let snapshot = AllocationEngine::new(settings).run(&tables, mode)?;
    info!(
        mode = snapshot.mode.label(),
        allocated = snapshot.stats.newly_allocated,
        unallocated = snapshot.stats.unallocated,
        "allocation request served"
    );
    Ok(Json(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use contact_allocator::workflows::allocation::ModeKind;
    use tower::ServiceExt;

    fn request(body: serde_json::Value) -> AllocationRequest {
        serde_json::from_value(body).expect("request deserializes")
    }

    #[tokio::test]
    async fn allocation_endpoint_returns_snapshot() {
        let payload = request(json!({
            "contacts": [
                { "name": "Meera", "phone": "9001", "source": "Website" },
                { "name": "Kabir", "phone": "9002", "source": "Workshop" },
                { "name": "Ira", "phone": "9003" }
            ],
            "agents": [{ "name": "Asha" }, { "name": "Ravi" }],
            "priorities": { "Workshop": 1, "Website": 2 }
        }));

        let Json(snapshot) =
            allocation_endpoint(Extension(AppState::for_tests(true)), Json(payload))
                .await
                .expect("allocation succeeds");

        assert_eq!(snapshot.mode, ModeKind::Fresh);
        assert_eq!(snapshot.stats.newly_allocated, 3);
        let asha: Vec<_> = snapshot.new_assignments("Asha").map(|c| c.name.as_str()).collect();
        assert_eq!(asha, ["Kabir", "Ira"]);
    }

    #[tokio::test]
    async fn allocation_endpoint_extends_prior_snapshot() {
        let payload = request(json!({
            "contacts": [
                { "name": "Meera", "phone": "9001" },
                { "name": "Kabir", "phone": "9002" }
            ],
            "agents": [{ "name": "Asha" }, { "name": "Ravi" }],
            "max_per_agent": 5,
            "prior": {
                "agents": [{
                    "agent": "Asha",
                    "contacts": [{ "name": "Meera", "phone": "9001", "origin": "prior" }]
                }],
                "cursors": [{ "next": 1 }]
            }
        }));

        let Json(snapshot) =
            allocation_endpoint(Extension(AppState::for_tests(true)), Json(payload))
                .await
                .expect("allocation succeeds");

        assert_eq!(snapshot.mode, ModeKind::Incremental);
        assert_eq!(snapshot.stats.already_allocated, 1);
        assert_eq!(snapshot.new_assignments("Ravi").count(), 1);
        assert_eq!(snapshot.stats.cumulative_allocated, 2);
    }

    #[tokio::test]
    async fn previous_response_posted_back_as_prior_adds_nothing_new() {
        let body = json!({
            "contacts": [
                { "name": "Meera", "phone": "9001" },
                { "name": "Kabir", "phone": "9002" },
                { "name": "Ira", "phone": "9003" },
                { "name": "Dev", "phone": "9004" }
            ],
            "agents": [{ "name": "Asha" }, { "name": "Ravi" }]
        });
        let Json(first) =
            allocation_endpoint(Extension(AppState::for_tests(true)), Json(request(body.clone())))
                .await
                .expect("first allocation succeeds");

        let mut rerun = body;
        rerun["prior"] = serde_json::to_value(&first).expect("snapshot serializes");
        let Json(second) =
            allocation_endpoint(Extension(AppState::for_tests(true)), Json(request(rerun)))
                .await
                .expect("second allocation succeeds");

        assert_eq!(second.stats.newly_allocated, 0);
        for tally in &second.stats.agents {
            assert_eq!(tally.new, 0, "{} has no new contacts", tally.agent);
            assert_eq!(tally.cumulative, 2);
        }
    }

    #[tokio::test]
    async fn inconsistent_centers_are_unprocessable() {
        let app = with_allocation_routes().layer(Extension(AppState::for_tests(true)));
        let body = json!({
            "contacts": [{ "name": "Meera", "phone": "9001" }],
            "agents": [{ "name": "Asha", "center": "Pune" }, { "name": "Ravi" }]
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/allocations")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert!(payload["error"]
            .as_str()
            .is_some_and(|message| message.contains("center validation failed for agents")));
    }

    #[tokio::test]
    async fn readiness_reports_initializing_until_bound() {
        let app = with_allocation_routes().layer(Extension(AppState::for_tests(false)));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/ready")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
