use crate::AppState;
use crate::api::models::chat::{ChatRequest, ChatResponse};
use crate::errors::{Error, ErrorResponse, Result};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    summary = "Chat completion",
    description = "Forward a single user message to the provider, behind the relay's fixed system instruction, and return the generated text.",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Generated reply", body = ChatResponse),
        (status = 400, description = "Missing or empty message, or malformed JSON", body = ErrorResponse),
        (status = 500, description = "Provider or network failure", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn chat(State(state): State<AppState>, payload: std::result::Result<Json<ChatRequest>, JsonRejection>) -> Result<Json<ChatResponse>> {
    let Json(request) = payload.map_err(|e| Error::bad_request(e.body_text()))?;

    let message = request
        .message
        .filter(|message| !message.is_empty())
        .ok_or_else(|| Error::bad_request("Message is required"))?;

    let response = state.relay.chat(&message, request.model.as_deref()).await?;

    Ok(Json(ChatResponse { response }))
}
