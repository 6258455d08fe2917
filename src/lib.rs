pub mod api;
pub mod config;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::WopiConfig;
use crate::services::locks::LockRegistry;
use crate::services::storage::DocumentStore;
use crate::services::token::TokenService;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::token::issue_token,
        api::handlers::files::check_file_info,
        api::handlers::files::get_file,
        api::handlers::files::put_file,
        api::handlers::locks::lock_dispatch,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            api::handlers::token::TokenRequest,
            api::handlers::token::TokenResponse,
            api::handlers::files::WopiFileInfo,
            services::token::WopiUser,
        )
    ),
    tags(
        (name = "system", description = "Service health"),
        (name = "wopi", description = "WOPI host endpoints")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub locks: Arc<LockRegistry>,
    pub tokens: Arc<TokenService>,
    pub config: WopiConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: WopiConfig) -> Self {
        Self {
            store,
            locks: Arc::new(LockRegistry::new(config.lock_ttl_secs)),
            tokens: Arc::new(TokenService::new(&config.jwt_secret, config.token_ttl_secs)),
            config,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/wopi/token", post(api::handlers::token::issue_token))
        .route(
            "/wopi/files/:file_id",
            get(api::handlers::files::check_file_info)
                .post(api::handlers::locks::lock_dispatch)
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::wopi_auth_middleware,
                )),
        )
        .route(
            "/wopi/files/:file_id/contents",
            get(api::handlers::files::get_file)
                .post(api::handlers::files::put_file)
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::wopi_auth_middleware,
                )),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_file_size,
        ))
        .with_state(state)
}
