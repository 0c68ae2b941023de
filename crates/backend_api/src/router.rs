use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::any::Any;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{handlers, handlers::AppState, view_handlers};

/// Create the main application router with all API endpoints
pub fn create_router(state: AppState) -> Router {
    // Create CORS layer
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Dashboard
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/dashboard/options", get(handlers::get_dashboard_options))
        .route("/api/summary", get(handlers::get_summary))
        // Accounts and Konto detail
        .route("/api/accounts", get(handlers::get_accounts))
        .route("/api/konto/:konto_nr", get(handlers::get_konto))
        .route("/api/konto/:konto_nr/burndown", get(handlers::get_konto_burndown))
        .route("/api/konto/:konto_nr/treemap", get(handlers::get_konto_treemap))
        // OK detail
        .route("/api/oks/:ok_id", get(handlers::get_ok))
        .route("/api/oks/:ok_id/burndown", get(handlers::get_ok_burndown))
        .route("/api/oks/:ok_id/treemap", get(handlers::get_ok_treemap))
        // Saved views
        .route(
            "/api/views",
            get(view_handlers::list_views).post(view_handlers::create_view),
        )
        .route("/api/views/default", get(view_handlers::get_default_view))
        .route(
            "/api/views/:id",
            get(view_handlers::get_view).delete(view_handlers::delete_view),
        )
        .route("/api/views/:id/default", post(view_handlers::set_default_view))
        // Cache management
        .route("/api/cache/invalidate", post(handlers::invalidate_cache))
        .with_state(state)
        // Add middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
}

/// Last-resort boundary: a panicking handler answers 500 and the client offers a reload.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };
    tracing::error!("Handler panicked: {}", details);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": details,
            "reload": true,
        })),
    )
        .into_response()
}
