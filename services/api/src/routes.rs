use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use belize_grants::workflows::awards::{
    assess, evaluate_budget, get_limits, AwardCategory, AwardLimits, BudgetFigures,
};
use belize_grants::workflows::proposals::{
    proposal_router, DraftCache, ProposalRepository, ProposalSessions,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Category limits as shown next to the budget fields.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct LimitsView {
    pub(crate) category: AwardCategory,
    pub(crate) label: &'static str,
    pub(crate) min_amount: f64,
    pub(crate) max_amount: Option<f64>,
    pub(crate) co_financing_required: bool,
    pub(crate) co_financing_min_pct: Option<f64>,
    pub(crate) co_financing_max_pct: Option<f64>,
    pub(crate) max_duration_months: Option<u32>,
}

impl LimitsView {
    pub(crate) fn new(category: AwardCategory) -> Self {
        let limits: AwardLimits = get_limits(Some(category));
        Self {
            category,
            label: category.label(),
            min_amount: limits.min_amount,
            max_amount: limits.max_amount,
            co_financing_required: limits.co_financing_required(),
            co_financing_min_pct: limits.co_financing_min_pct(),
            co_financing_max_pct: limits.co_financing_max_pct(),
            max_duration_months: limits.max_duration_months,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EvaluateRequest {
    #[serde(default)]
    pub(crate) category: Option<String>,
    #[serde(default)]
    pub(crate) requested_amount: f64,
    #[serde(default)]
    pub(crate) co_financing_amount: f64,
    #[serde(default)]
    pub(crate) duration_months: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EvaluateResponse {
    pub(crate) category: Option<AwardCategory>,
    pub(crate) eligible: bool,
    pub(crate) within_funding_range: bool,
    pub(crate) within_co_financing_range: bool,
    pub(crate) co_financing_pct: f64,
    pub(crate) display_co_financing_pct: f64,
    pub(crate) total_project_cost: f64,
    pub(crate) issues: Vec<String>,
}

pub(crate) fn with_portal_routes<R, C>(sessions: Arc<ProposalSessions<R, C>>) -> axum::Router
where
    R: ProposalRepository + 'static,
    C: DraftCache + 'static,
{
    proposal_router(sessions)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/awards/:category/limits",
            axum::routing::get(limits_endpoint),
        )
        .route(
            "/api/v1/awards/evaluate",
            axum::routing::post(evaluate_endpoint),
        )
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

pub(crate) async fn limits_endpoint(Path(category): Path<String>) -> Response {
    match AwardCategory::parse(&category) {
        Some(category) => (StatusCode::OK, Json(LimitsView::new(category))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown award category '{category}'") })),
        )
            .into_response(),
    }
}

pub(crate) async fn evaluate_endpoint(Json(request): Json<EvaluateRequest>) -> Response {
    let category = match request.category.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match AwardCategory::parse(raw) {
            Some(category) => Some(category),
            None => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "error": format!("unknown award category '{raw}'") })),
                )
                    .into_response()
            }
        },
    };

    Json(evaluate(category, &request)).into_response()
}

pub(crate) fn evaluate(category: Option<AwardCategory>, request: &EvaluateRequest) -> EvaluateResponse {
    let figures = BudgetFigures::new(request.requested_amount, request.co_financing_amount);
    let evaluation = evaluate_budget(category, &figures);
    let issues = assess(category, &figures, request.duration_months);

    EvaluateResponse {
        category,
        eligible: issues.is_empty(),
        within_funding_range: evaluation.within_funding_range,
        within_co_financing_range: evaluation.within_co_financing_range,
        co_financing_pct: evaluation.co_financing_pct,
        display_co_financing_pct: evaluation.display_co_financing_pct(),
        total_project_cost: figures.total_project_cost(),
        issues: issues.iter().map(|issue| issue.summary()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{InMemoryProposalRepository, InMemoryUserDataService};
    use axum::body::Body;
    use axum::http::Request;
    use belize_grants::workflows::proposals::{
        ApplicantContext, ApplicantContextProvider, MemoryDraftCache, UserDataService,
    };
    use tower::ServiceExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json payload")
    }

    #[tokio::test]
    async fn limits_endpoint_accepts_short_names() {
        let response = limits_endpoint(Path("medium".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["label"], "Medium Grants");
        assert_eq!(body["min_amount"], 50_000.01);
        assert_eq!(body["co_financing_max_pct"], 25.0);
        assert_eq!(body["max_duration_months"], 24);
    }

    #[tokio::test]
    async fn limits_endpoint_rejects_unknown_categories() {
        let response = limits_endpoint(Path("platinum".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn evaluate_reports_issues_for_large_grant_without_co_financing() {
        let request = EvaluateRequest {
            category: Some("Large Grants".to_string()),
            requested_amount: 200_000.0,
            co_financing_amount: 0.0,
            duration_months: Some(24.0),
        };
        let response = evaluate(Some(AwardCategory::LargeGrants), &request);

        assert!(!response.eligible);
        assert!(response.within_funding_range);
        assert!(!response.within_co_financing_range);
        assert_eq!(response.issues.len(), 1);
        assert!(response.issues[0].contains("currently 0.0%"));
    }

    #[tokio::test]
    async fn evaluate_route_treats_missing_category_as_permissive() {
        let sessions = Arc::new(ProposalSessions::new(
            Arc::new(InMemoryProposalRepository::default()),
            Arc::new(MemoryDraftCache::default()),
        ));
        let router = with_portal_routes(sessions);

        let response = router
            .oneshot(
                Request::post("/api/v1/awards/evaluate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "requested_amount": 2_000_000.0 }).to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["eligible"], true);
        assert_eq!(body["category"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn health_route_is_mounted_alongside_proposals() {
        let sessions = Arc::new(ProposalSessions::new(
            Arc::new(InMemoryProposalRepository::default()),
            Arc::new(MemoryDraftCache::default()),
        ));
        let router = with_portal_routes(sessions);

        let response = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(
                Request::post("/api/v1/proposals")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "kind": "concept_paper" }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["step_count"], 1);
    }

    #[tokio::test]
    async fn prefill_route_uses_the_configured_profile() {
        let profile = ApplicantContext {
            organization_name: "Hopkins Women's Group".to_string(),
            contact_name: "Delia Nunez".to_string(),
            contact_email: "delia@hopkins.bz".to_string(),
            contact_phone: None,
            district: Some("Stann Creek".to_string()),
        };
        let service: Arc<dyn UserDataService> = Arc::new(InMemoryUserDataService::new(profile));
        let sessions = Arc::new(
            ProposalSessions::new(
                Arc::new(InMemoryProposalRepository::default()),
                Arc::new(MemoryDraftCache::default()),
            )
            .with_profiles(Arc::new(ApplicantContextProvider::new(service))),
        );
        let router = with_portal_routes(sessions);

        let response = router
            .clone()
            .oneshot(
                Request::post("/api/v1/proposals")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "kind": "community_proposal" }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("router responds");
        let body = body_json(response).await;
        let session = body["session_id"].as_str().expect("session id").to_string();

        let response = router
            .oneshot(
                Request::post(format!("/api/v1/proposals/{session}/prefill"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["draft"]["contact_name"], "Delia Nunez");
        assert_eq!(body["draft"]["district"], "Stann Creek");
        assert!(body["draft"].get("contact_phone").is_none());
    }
}
