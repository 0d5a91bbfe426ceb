pub mod reservations;
pub mod shops;
pub mod users;

use axum::Router;
use crate::state::AppState;

pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(users::routes(state))
        .merge(shops::routes(state))
        .merge(reservations::routes(state))
}
