use axum::{
    routing::{get, post, put, delete},
    Router, middleware,
};
use crate::state::AppState;
use crate::handlers::shop::{create_shop, get_shop, list_shops, update_shop, delete_shop};
use crate::middleware::auth::require_auth;

pub fn routes(state: &AppState) -> Router<AppState> {
    // Anyone can browse shops
    let open_routes = Router::new()
        .route("/massageshops", get(list_shops))
        .route("/massageshops/{id}", get(get_shop));

    // Only admins can create, update, delete (checked in the handlers)
    let protected_routes = Router::new()
        .route("/massageshops", post(create_shop))
        .route("/massageshops/{id}", put(update_shop))
        .route("/massageshops/{id}", delete(delete_shop))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    open_routes.merge(protected_routes)
}
