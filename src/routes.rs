use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, patch, post};
use axum::{middleware, Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::session_middleware;
use crate::state::AppState;

/// The full HTTP surface. Static segments take precedence over `:resource`,
/// so `/api/saved-views` or `/api/forms/tally-cards` never reach the generic handlers.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/api/health", get(handlers::health::health))
        .merge(session_routes())
        .merge(saved_view_routes())
        .merge(form_routes())
        .merge(admin_routes())
        .route("/api/dashboard-inventory", get(handlers::dashboard::inventory))
        .route("/api/tally-cards/:id/actions/patch-scd2", post(handlers::tally_cards::patch_scd2))
        .merge(resource_routes())
        .layer(middleware::from_fn(session_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                ))
                .layer(Extension(state)),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();
    base.allow_origin(AllowOrigin::list(allowed))
}

fn session_routes() -> Router {
    use handlers::me;

    Router::new()
        .route("/api/me/role", get(me::role))
        .route("/api/me/permissions", get(me::permissions))
}

fn saved_view_routes() -> Router {
    use handlers::saved_views;

    Router::new()
        .route("/api/saved-views", get(saved_views::list).post(saved_views::create))
        .route("/api/saved-views/:id", patch(saved_views::update).delete(saved_views::delete))
}

fn form_routes() -> Router {
    use handlers::forms;

    Router::new()
        .route("/api/forms/stock-adjustments", post(forms::stock_adjustment))
        .route("/api/forms/tally-cards", post(forms::tally_card))
        .route("/api/forms/:key", post(forms::submit))
}

fn admin_routes() -> Router {
    use handlers::admin;

    Router::new()
        .route("/api/admin/users", get(admin::users))
        .route("/api/admin/table-docs-health", get(admin::table_docs_health))
}

fn resource_routes() -> Router {
    use handlers::{bulk, resource};

    Router::new()
        .route("/api/:resource", get(resource::list).post(resource::create))
        .route("/api/:resource/bulk", delete(bulk::delete_bulk))
        .route("/api/:resource/:id", get(resource::get_one).patch(resource::patch_one))
}
