use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use dialogue_core::SessionGateway;
use dialogue_core::gateway::{
    ConversationalTurnRequest, ConversationalTurnResponse, StartConversationRequest,
    StartConversationResponse, SubmitSurveyRequest, SubmitSurveyResponse,
};

use crate::error::ServerError;

pub const HEALTH_PATH: &str = "/health";
pub const START_PATH: &str = "/api/dialogue/start";
pub const CONVERSATION_PATH: &str = "/api/dialogue/conversation";
pub const SUBMIT_INTERVIEW_PATH: &str = "/api/dialogue/submit_interview";

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<SessionGateway>,
}

impl AppState {
    pub fn new(gateway: Arc<SessionGateway>) -> Self {
        Self { gateway }
    }
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route(HEALTH_PATH, get(health))
}

pub fn dialogue_routes() -> Router<AppState> {
    Router::new()
        .route(START_PATH, post(start_conversation))
        .route(CONVERSATION_PATH, post(conversational_turn))
        .route(SUBMIT_INTERVIEW_PATH, post(submit_interview))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(dialogue_routes())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn start_conversation(
    State(st): State<AppState>,
    body: Result<Json<StartConversationRequest>, JsonRejection>,
) -> Result<Json<StartConversationResponse>, ServerError> {
    let Json(request) = body?;
    Ok(Json(st.gateway.start_conversation(request).await?))
}

async fn conversational_turn(
    State(st): State<AppState>,
    body: Result<Json<ConversationalTurnRequest>, JsonRejection>,
) -> Result<Json<ConversationalTurnResponse>, ServerError> {
    let Json(request) = body?;
    Ok(Json(st.gateway.advance_turn(request).await?))
}

async fn submit_interview(
    State(st): State<AppState>,
    body: Result<Json<SubmitSurveyRequest>, JsonRejection>,
) -> Result<Json<SubmitSurveyResponse>, ServerError> {
    let Json(request) = body?;
    Ok(Json(st.gateway.submit_survey(request).await?))
}
