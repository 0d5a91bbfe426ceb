use axum::{
    routing::get,
    Router, middleware,
};
use crate::state::AppState;
use crate::handlers::reservation::{
    create_reservation, delete_reservation, get_reservation, list_reservations,
    list_shop_reservations, update_reservation,
};
use crate::middleware::auth::require_auth;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/reservations", get(list_reservations))
        .route(
            "/reservations/{id}",
            get(get_reservation).put(update_reservation).patch(update_reservation).delete(delete_reservation),
        )
        .route(
            "/massageshops/{id}/reservations",
            get(list_shop_reservations).post(create_reservation),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

