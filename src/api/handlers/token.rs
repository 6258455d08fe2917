use crate::AppState;
use crate::api::error::AppError;
use crate::services::token::{TokenError, WopiUser};
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub file_id: String,
    pub user: WopiUser,
}

#[derive(Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Host-internal issuance endpoint: the embedding frontend calls this before
/// constructing the editor iframe URL. Not part of the WOPI surface itself,
/// which is why it sits outside the token middleware.
#[utoipa::path(
    post,
    path = "/wopi/token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Signed WOPI access token", body = TokenResponse),
        (status = 400, description = "Missing fileId or user identity")
    ),
    tag = "wopi"
)]
pub async fn issue_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    if !crate::utils::wopi::is_valid_file_id(&req.file_id) {
        return Err(AppError::BadRequest("invalid fileId".to_string()));
    }

    let token = state.tokens.issue(&req.file_id, &req.user).map_err(|e| match e {
        TokenError::InvalidInput(msg) => AppError::BadRequest(msg),
        other => AppError::Internal(other.to_string()),
    })?;

    Ok(Json(TokenResponse { token }))
}
