use crate::AppState;
use crate::api::error::AppError;
use crate::services::token::WopiClaims;
use crate::utils::wopi;
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// CheckFileInfo wire document. A fixed struct rather than a free-form map
/// keeps the contract exact; the editor is strict about both names and
/// types (Size in particular travels as a string).
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct WopiFileInfo {
    pub base_file_name: String,
    pub owner_id: String,
    pub user_id: String,
    pub size: String,
    pub version: String,

    // Host capabilities
    pub supports_update: bool,
    pub supports_locks: bool,
    pub supports_get_lock: bool,
    pub supports_extended_lock_length: bool,
    pub supports_cobalt: bool,

    // User permissions
    pub user_can_write: bool,
    pub user_can_not_write_relative: bool,

    // Add-in support and host-frontend messaging
    pub office_addin_host: bool,
    pub post_message_origin: String,

    pub host_endpoint: String,
    pub file_url: String,
    pub breadcrumb_brand_name: String,
    pub breadcrumb_brand_url: String,
}

#[derive(Deserialize)]
pub struct CheckFileInfoQuery {
    #[serde(rename = "WOPISrc")]
    pub wopi_src: Option<String>,
}

/// The token is bound to exactly one file; a valid token for another file
/// is as unauthorized as no token at all.
fn require_file_binding(claims: &WopiClaims, file_id: &str) -> Result<(), AppError> {
    if claims.file_id != file_id {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn validate_file_id(file_id: &str) -> Result<(), AppError> {
    if !wopi::is_valid_file_id(file_id) {
        return Err(AppError::BadRequest("invalid file id".to_string()));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/wopi/files/{file_id}",
    params(
        ("file_id" = String, Path, description = "Document ID"),
        ("access_token" = String, Query, description = "WOPI access token")
    ),
    responses(
        (status = 200, description = "File metadata and host capabilities", body = WopiFileInfo),
        (status = 400, description = "Malformed WOPISrc"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    tag = "wopi"
)]
pub async fn check_file_info(
    State(state): State<AppState>,
    Extension(claims): Extension<WopiClaims>,
    Path(file_id): Path<String>,
    Query(query): Query<CheckFileInfoQuery>,
) -> Result<Response, AppError> {
    validate_file_id(&file_id)?;

    if let Some(src) = query.wopi_src.as_deref() {
        if wopi::is_malformed_wopi_src(src) {
            return Err(AppError::BadRequest("Malformed WOPISrc".to_string()));
        }
    }

    require_file_binding(&claims, &file_id)?;

    let stat = state
        .store
        .stat(&file_id)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    let version = stat.version();
    let base = &state.config.public_base_url;

    let info = WopiFileInfo {
        base_file_name: file_id.clone(),
        owner_id: claims.sub.clone(),
        user_id: claims.sub.clone(),
        size: stat.size.to_string(),
        version: version.clone(),
        supports_update: true,
        supports_locks: true,
        supports_get_lock: true,
        supports_extended_lock_length: true,
        supports_cobalt: true,
        user_can_write: true,
        user_can_not_write_relative: true,
        office_addin_host: true,
        post_message_origin: base.clone(),
        host_endpoint: base.clone(),
        file_url: format!("{}/wopi/files/{}/contents", base, file_id),
        breadcrumb_brand_name: state.config.brand_name.clone(),
        breadcrumb_brand_url: base.clone(),
    };

    Ok((
        StatusCode::OK,
        [
            (wopi::HEADER_ITEM_VERSION, version),
            (wopi::HEADER_MACHINE_NAME, state.config.machine_name.clone()),
        ],
        Json(info),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/wopi/files/{file_id}/contents",
    params(
        ("file_id" = String, Path, description = "Document ID"),
        ("access_token" = String, Query, description = "WOPI access token")
    ),
    responses(
        (status = 200, description = "Raw document bytes"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    tag = "wopi"
)]
pub async fn get_file(
    State(state): State<AppState>,
    Extension(claims): Extension<WopiClaims>,
    Path(file_id): Path<String>,
) -> Result<Response, AppError> {
    validate_file_id(&file_id)?;
    require_file_binding(&claims, &file_id)?;

    let data = state
        .store
        .read(&file_id)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, wopi::content_type_for(&file_id))],
        data,
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/wopi/files/{file_id}/contents",
    params(
        ("file_id" = String, Path, description = "Document ID"),
        ("access_token" = String, Query, description = "WOPI access token")
    ),
    responses(
        (status = 200, description = "Content stored"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Lock mismatch, holder in X-WOPI-Lock"),
        (status = 500, description = "Store failure")
    ),
    tag = "wopi"
)]
pub async fn put_file(
    State(state): State<AppState>,
    Extension(claims): Extension<WopiClaims>,
    Path(file_id): Path<String>,
    headers: axum::http::HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    validate_file_id(&file_id)?;
    require_file_binding(&claims, &file_id)?;

    let caller_lock = headers
        .get(wopi::HEADER_LOCK)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    // MS-WOPI PutFile contract: a locked file only accepts a matching lock
    // id, and an unlocked file only accepts writes while it is still empty
    // (or absent, which covers first-save).
    match state.locks.get(&file_id) {
        Some(lock) => {
            if lock.lock_id != caller_lock {
                return Err(AppError::LockConflict {
                    current: Some(lock.lock_id),
                });
            }
        }
        None => {
            if let Some(stat) = state.store.stat(&file_id).await? {
                if stat.size > 0 {
                    return Err(AppError::LockConflict { current: None });
                }
            }
        }
    }

    state
        .store
        .write(&file_id, body.to_vec())
        .await
        .map_err(|e| AppError::Internal(format!("store write failed: {}", e)))?;

    tracing::info!("📄 PutFile {} ({} bytes)", file_id, body.len());

    let version = state
        .store
        .stat(&file_id)
        .await?
        .map(|s| s.version())
        .unwrap_or_default();

    Ok((StatusCode::OK, [(wopi::HEADER_ITEM_VERSION, version)]).into_response())
}
