use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

#[derive(Deserialize)]
struct AuthQuery {
    access_token: Option<String>,
}

/// Gate for every WOPI route. The protocol passes the token as the
/// `access_token` query parameter; an Authorization bearer header is
/// accepted as a fallback. Verified claims land in request extensions so
/// handlers can check the file binding.
pub async fn wopi_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let query = req.uri().query().unwrap_or_default();
    let query_token = serde_urlencoded::from_str::<AuthQuery>(query)
        .ok()
        .and_then(|q| q.access_token);

    let token = if let Some(t) = query_token {
        Some(t)
    } else {
        req.headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    };

    if let Some(token) = token {
        if let Ok(claims) = state.tokens.verify(&token) {
            req.extensions_mut().insert(claims);
            return Ok(next.run(req).await);
        }
    }

    // Missing, malformed, expired, bad signature: all the same 401.
    Err(StatusCode::UNAUTHORIZED)
}
