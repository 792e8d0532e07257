//! API route definitions
//!
//! Author: alfredo.tarigan@gmail.com

use crate::auth::middleware::{auth_middleware, require_admin};
use crate::handlers::{auth, clients, features, health, properties, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

/// Create API v1 routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/ping", get(health::ping))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh-token", post(auth::refresh_handler))
        .route("/user/register", post(users::register_handler));

    // Admin routes; the admin check runs after authentication
    let admin_routes = Router::new()
        .route("/users", get(users::list_users))
        .route_layer(middleware::from_fn(require_admin));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout_handler))
        .route("/users/me", get(users::me_handler))
        // Client endpoints
        .route("/clients", get(clients::list_clients).post(clients::create_client))
        .route("/clients/:id", get(clients::get_client))
        .route("/clients/:id/update", put(clients::update_client))
        .route("/clients/:id/delete", delete(clients::delete_client))
        // Feature endpoints
        .route("/features", post(features::create_feature))
        // Property endpoints
        .route(
            "/properties",
            get(properties::list_properties).post(properties::create_property),
        )
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
