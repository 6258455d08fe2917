use crate::AppState;
use crate::api::error::AppError;
use crate::services::locks::{AcquireResult, LockResult};
use crate::services::token::WopiClaims;
use crate::utils::wopi;
use axum::{
    Extension,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

fn required_lock_id<'a>(headers: &'a HeaderMap) -> Result<&'a str, AppError> {
    header_str(headers, wopi::HEADER_LOCK)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("X-WOPI-Lock header is required".to_string()))
}

/// Lock family multiplexed onto `POST /wopi/files/{file_id}` by the
/// X-WOPI-Override header: LOCK, GET_LOCK, REFRESH_LOCK, UNLOCK.
#[utoipa::path(
    post,
    path = "/wopi/files/{file_id}",
    params(
        ("file_id" = String, Path, description = "Document ID"),
        ("access_token" = String, Query, description = "WOPI access token"),
        ("X-WOPI-Override" = String, Header, description = "LOCK | GET_LOCK | REFRESH_LOCK | UNLOCK"),
        ("X-WOPI-Lock" = Option<String>, Header, description = "Caller's opaque lock id")
    ),
    responses(
        (status = 200, description = "Lock operation applied"),
        (status = 400, description = "Missing X-WOPI-Lock header"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "GET_LOCK on an unlocked file"),
        (status = 409, description = "Lock conflict, holder in X-WOPI-Lock"),
        (status = 501, description = "Unrecognized override")
    ),
    tag = "wopi"
)]
pub async fn lock_dispatch(
    State(state): State<AppState>,
    Extension(claims): Extension<WopiClaims>,
    Path(file_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if !wopi::is_valid_file_id(&file_id) {
        return Err(AppError::BadRequest("invalid file id".to_string()));
    }
    if claims.file_id != file_id {
        return Err(AppError::Unauthorized);
    }

    let wopi_override = header_str(&headers, wopi::HEADER_OVERRIDE).unwrap_or_default();

    match wopi_override {
        "LOCK" => {
            let lock_id = required_lock_id(&headers)?;
            match state.locks.acquire(&file_id, lock_id) {
                AcquireResult::Created => {
                    tracing::info!("🔒 LOCK {} acquired", file_id);
                    Ok(StatusCode::OK.into_response())
                }
                AcquireResult::Refreshed => Ok(StatusCode::OK.into_response()),
                AcquireResult::Conflict { current } => Err(AppError::LockConflict {
                    current: Some(current),
                }),
            }
        }

        "GET_LOCK" => match state.locks.get(&file_id) {
            Some(lock) => {
                Ok((StatusCode::OK, [(wopi::HEADER_LOCK, lock.lock_id)]).into_response())
            }
            None => Err(AppError::NotFound("File not locked".to_string())),
        },

        "REFRESH_LOCK" => {
            let lock_id = required_lock_id(&headers)?;
            match state.locks.refresh(&file_id, lock_id) {
                LockResult::Ok => Ok(StatusCode::OK.into_response()),
                LockResult::Conflict { current } => Err(AppError::LockConflict { current }),
            }
        }

        "UNLOCK" => {
            let lock_id = required_lock_id(&headers)?;
            match state.locks.release(&file_id, lock_id) {
                LockResult::Ok => {
                    tracing::info!("🔓 UNLOCK {}", file_id);
                    Ok(StatusCode::OK.into_response())
                }
                LockResult::Conflict { current } => Err(AppError::LockConflict { current }),
            }
        }

        other => Err(AppError::Unsupported(format!(
            "Unsupported X-WOPI-Override: {:?}",
            other
        ))),
    }
}
