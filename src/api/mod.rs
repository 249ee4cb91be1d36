mod handlers;
pub mod middleware;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;

pub use handlers::Actor;
pub use middleware::SecurityConfig;

/// Header naming the acting user on every request.
pub const ACTOR_HEADER: &str = "X-Actor-Id";

/// Router with authentication disabled, for local use and tests.
pub fn create_router(db: Database) -> Router {
    create_router_with_security(db, SecurityConfig::disabled())
}

pub fn create_router_with_security(db: Database, security: SecurityConfig) -> Router {
    let api = Router::new()
        // Comments
        .route(
            "/boards/{board_id}/comments",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .route(
            "/boards/{board_id}/comments/tree",
            get(handlers::get_comment_tree),
        )
        .route(
            "/boards/{board_id}/comments/{id}",
            put(handlers::update_comment).delete(handlers::delete_comment),
        )
        // Files
        .route("/files/{file_id}", get(handlers::download_file))
        .route_layer(from_fn_with_state(
            security.clone(),
            middleware::auth_middleware,
        ))
        // Health stays reachable without a key
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&security)),
        )
        .with_state(db)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    match &security.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any)
        }
        None => CorsLayer::permissive(),
    }
}
