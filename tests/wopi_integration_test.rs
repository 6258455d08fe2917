use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use wopi_host::config::WopiConfig;
use wopi_host::services::storage::LocalDocumentStore;
use wopi_host::{AppState, create_app};

const SAMPLE_DOC: &[u8] = b"PK\x03\x04 not really a docx, but bytes are bytes";

fn setup_app() -> (Router, AppState, TempDir) {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("wopi_host=debug,tower_http=debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("sample.docx"), SAMPLE_DOC).unwrap();

    let config = WopiConfig::development();
    let store = Arc::new(LocalDocumentStore::new(dir.path()));
    let state = AppState::new(store, config);
    (create_app(state.clone()), state, dir)
}

async fn fetch_token(app: &Router, file_id: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/wopi/token")
                .header("Content-Type", "application/json")
                .body(Body::from(format!(
                    r#"{{"fileId": "{}", "user": {{"email": "a@b.com"}}}}"#,
                    file_id
                )))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    json["token"].as_str().unwrap().to_string()
}

async fn lock_op(
    app: &Router,
    token: &str,
    file_id: &str,
    op: &str,
    lock_id: Option<&str>,
) -> axum::http::Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/wopi/files/{}?access_token={}", file_id, token))
        .header("X-WOPI-Override", op);
    if let Some(id) = lock_id {
        builder = builder.header("X-WOPI-Lock", id);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_wopi_end_to_end_flow() {
    let (app, _state, _dir) = setup_app();
    let token = fetch_token(&app, "sample.docx").await;

    // CheckFileInfo
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/wopi/files/sample.docx?access_token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let header_version = response
        .headers()
        .get("X-WOPI-ItemVersion")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(response.headers().contains_key("X-WOPI-MachineName"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let info: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(info["BaseFileName"], "sample.docx");
    assert_eq!(info["UserId"], "a@b.com");
    // Size travels as a string and must reflect the real content.
    let size: i64 = info["Size"].as_str().unwrap().parse().unwrap();
    assert_eq!(size, SAMPLE_DOC.len() as i64);
    // The body version and the header version are the same string.
    assert_eq!(info["Version"].as_str().unwrap(), header_version);
    assert_eq!(info["SupportsLocks"], true);
    assert_eq!(info["SupportsUpdate"], true);
    assert_eq!(info["SupportsGetLock"], true);
    assert_eq!(info["SupportsExtendedLockLength"], true);

    // GetFile returns the raw bytes with the OOXML content type.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/wopi/files/sample.docx/contents?access_token={}",
                    token
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("Content-Type").unwrap(),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], SAMPLE_DOC);

    // LOCK "abc" succeeds.
    let response = lock_op(&app, &token, "sample.docx", "LOCK", Some("abc")).await;
    assert_eq!(response.status(), StatusCode::OK);

    // LOCK "xyz" conflicts and names the holder.
    let response = lock_op(&app, &token, "sample.docx", "LOCK", Some("xyz")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(response.headers().get("X-WOPI-Lock").unwrap(), "abc");

    // GET_LOCK reports the holder.
    let response = lock_op(&app, &token, "sample.docx", "GET_LOCK", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("X-WOPI-Lock").unwrap(), "abc");

    // UNLOCK with the right id, then GET_LOCK finds nothing.
    let response = lock_op(&app, &token, "sample.docx", "UNLOCK", Some("abc")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = lock_op(&app, &token, "sample.docx", "GET_LOCK", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_refresh_lock_mismatch_leaves_state_unchanged() {
    let (app, state, _dir) = setup_app();
    let token = fetch_token(&app, "sample.docx").await;

    let response = lock_op(&app, &token, "sample.docx", "LOCK", Some("abc")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = lock_op(&app, &token, "sample.docx", "REFRESH_LOCK", Some("xyz")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(response.headers().get("X-WOPI-Lock").unwrap(), "abc");

    // Registry still holds the original lock.
    assert_eq!(state.locks.get("sample.docx").unwrap().lock_id, "abc");

    let response = lock_op(&app, &token, "sample.docx", "REFRESH_LOCK", Some("abc")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_override_is_not_implemented() {
    let (app, _state, _dir) = setup_app();
    let token = fetch_token(&app, "sample.docx").await;

    let response = lock_op(&app, &token, "sample.docx", "RENAME_FILE", Some("abc")).await;
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_missing_lock_header_is_bad_request() {
    let (app, _state, _dir) = setup_app();
    let token = fetch_token(&app, "sample.docx").await;

    let response = lock_op(&app, &token, "sample.docx", "LOCK", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wopi_endpoints_require_valid_token() {
    let (app, _state, _dir) = setup_app();

    for uri in [
        "/wopi/files/sample.docx",
        "/wopi/files/sample.docx/contents",
    ] {
        // No token at all.
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Garbage token.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("{}?access_token=garbage", uri))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // A valid token for a different file must not open this one.
    let token = fetch_token(&app, "other.docx").await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/wopi/files/sample.docx?access_token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_check_file_info_missing_file_is_404() {
    let (app, _state, _dir) = setup_app();
    let token = fetch_token(&app, "nope.docx").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/wopi/files/nope.docx?access_token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_put_file_enforces_lock_contract() {
    let (app, _state, _dir) = setup_app();
    let token = fetch_token(&app, "sample.docx").await;

    let put = |lock: Option<&str>, content: &'static [u8]| {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!(
                "/wopi/files/sample.docx/contents?access_token={}",
                token
            ));
        if let Some(id) = lock {
            builder = builder.header("X-WOPI-Lock", id);
        }
        app.clone().oneshot(builder.body(Body::from(content)).unwrap())
    };

    // Unlocked and non-empty: reject, empty holder header.
    let response = put(None, b"overwrite attempt").await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(response.headers().get("X-WOPI-Lock").unwrap(), "");

    // Take the lock, then write under the wrong id.
    let response = lock_op(&app, &token, "sample.docx", "LOCK", Some("abc")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = put(Some("xyz"), b"wrong holder").await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(response.headers().get("X-WOPI-Lock").unwrap(), "abc");

    // Matching lock id: content is replaced and a fresh version comes back.
    let response = put(Some("abc"), b"brand new body").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("X-WOPI-ItemVersion"));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/wopi/files/sample.docx/contents?access_token={}",
                    token
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"brand new body");
}

#[tokio::test]
async fn test_token_endpoint_validates_input() {
    let (app, _state, _dir) = setup_app();

    // User with neither name nor email.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/wopi/token")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"fileId": "sample.docx", "user": {}}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // File id that would escape the content directory.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/wopi/token")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"fileId": "../secrets", "user": {"email": "a@b.com"}}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_wopi_src_is_rejected() {
    let (app, _state, _dir) = setup_app();
    let token = fetch_token(&app, "sample.docx").await;

    // Double-encoded WOPISrc still carries %-sequences after query decoding.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/wopi/files/sample.docx?access_token={}&WOPISrc=http%253A%252F%252Fhost%252Fwopi",
                    token
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
