//! REST endpoints for sign-in, the onboarding wizard, and plans.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

use crate::error::ValidationError;
use crate::onboarding::orchestrator::PlanOrchestrator;
use crate::onboarding::progress::{ProgressSnapshot, STAGE_LABELS};
use crate::onboarding::state::{OnboardingStep, StepOutcome};
use crate::routing::{AppRoute, AppRouter};
use crate::store::{PersistenceGateway, UserIdentity};

use super::session::{SessionRegistry, StepAnswer};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionRegistry,
    pub orchestrator: Arc<PlanOrchestrator>,
    pub gateway: PersistenceGateway,
    pub router: AppRouter,
}

/// Build the Axum router with every API route.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/users/sign-in", post(sign_in))
        .route("/api/users/{id}/route", get(resolve_route))
        .route("/api/users/{id}/plan", get(get_plan))
        .route("/api/onboarding/{id}", get(get_wizard).delete(discard_wizard))
        .route("/api/onboarding/{id}/answer", post(answer_step))
        .route("/api/onboarding/{id}/next", post(next_step))
        .route("/api/onboarding/{id}/back", post(previous_step))
        .route("/api/onboarding/{id}/progress", get(get_progress))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

fn validation_response(e: ValidationError) -> Response {
    let status = match e {
        ValidationError::WizardClosed => StatusCode::CONFLICT,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    error_response(status, e.to_string())
}

/// `409` once the user's onboarding is finished: the wizard never reopens
/// and a second generation never starts.
async fn reject_if_completed(state: &AppState, user_id: &str) -> Option<Response> {
    (state.router.route_user(user_id).await == AppRoute::Main).then(|| {
        debug!(user_id, "Wizard request for a completed user refused");
        error_response(StatusCode::CONFLICT, "Onboarding already completed")
    })
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "fitplan"
    }))
}

// ── Users ───────────────────────────────────────────────────────────────

async fn sign_in(State(state): State<AppState>, Json(identity): Json<UserIdentity>) -> Response {
    if identity.id.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "id must not be empty");
    }
    let result = state.gateway.sign_in(&identity).await;
    info!(
        user_id = %identity.id,
        success = result.success,
        completed = result.has_completed_onboarding,
        "User signed in"
    );
    Json(result).into_response()
}

#[derive(Serialize)]
struct RouteResponse {
    route: AppRoute,
}

async fn resolve_route(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let route = state.router.route_user(&id).await;
    Json(RouteResponse { route })
}

async fn get_plan(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.gateway.read_plan(&id).await {
        Ok(Some(plan)) => Json(plan).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "No plan for this user"),
        Err(e) => {
            error!(user_id = %id, error = %e, "Failed to read plan");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read plan")
        }
    }
}

// ── Onboarding ──────────────────────────────────────────────────────────

async fn get_wizard(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if let Some(rejected) = reject_if_completed(&state, &id).await {
        return rejected;
    }
    Json(state.sessions.snapshot(&id).await).into_response()
}

async fn discard_wizard(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if state.sessions.discard(&id).await {
        debug!(user_id = %id, "Onboarding session discarded");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn answer_step(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(answer): Json<StepAnswer>,
) -> Response {
    if let Some(rejected) = reject_if_completed(&state, &id).await {
        return rejected;
    }
    match state.sessions.with_wizard(&id, |w| answer.apply(w)).await {
        Ok((Ok(()), snapshot)) => Json(snapshot).into_response(),
        Ok((Err(e), _)) | Err(e) => validation_response(e),
    }
}

async fn next_step(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if let Some(rejected) = reject_if_completed(&state, &id).await {
        return rejected;
    }
    let (outcome, snapshot) = match state.sessions.with_wizard(&id, |w| w.advance()).await {
        Ok(advanced) => advanced,
        Err(e) => return validation_response(e),
    };

    match outcome {
        StepOutcome::Advanced(OnboardingStep::Generating) => {
            start_generation(&state, &id).await;
            (StatusCode::ACCEPTED, Json(snapshot)).into_response()
        }
        StepOutcome::Advanced(_) | StepOutcome::Blocked => Json(snapshot).into_response(),
    }
}

async fn previous_step(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if let Some(rejected) = reject_if_completed(&state, &id).await {
        return rejected;
    }
    match state.sessions.with_wizard(&id, |w| w.back()).await {
        Ok((Ok(_), snapshot)) => Json(snapshot).into_response(),
        Ok((Err(e), _)) | Err(e) => validation_response(e),
    }
}

async fn get_progress(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    // Runs are forgotten once they end; a completed user sees every stage done.
    if state.router.route_user(&id).await == AppRoute::Main {
        return Json(ProgressSnapshot::from_completed(STAGE_LABELS.len())).into_response();
    }
    match state.orchestrator.progress(&id).await {
        Some(progress) => Json(progress).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "No plan generation running"),
    }
}

/// Hand the wizard's profile to the orchestrator on a background task.
async fn start_generation(state: &AppState, user_id: &str) {
    let Some((profile, cancel)) = state.sessions.begin_generation(user_id).await else {
        return;
    };

    let orchestrator = Arc::clone(&state.orchestrator);
    let sessions = state.sessions.clone();
    let user_id = user_id.to_string();
    tokio::spawn(async move {
        let outcome = orchestrator.run(&user_id, profile, cancel).await;
        debug!(user_id = %user_id, ?outcome, "Generation task finished");
        sessions.finish(&user_id).await;
    });
}
