use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::{Extension, Json};
use axum::http::StatusCode;
use crate::dtos::{ApiResponse, Empty};
use crate::dtos::reservation::{CreateReservationRequest, ReservationResponse, UpdateReservationRequest};
use crate::dtos::shop::ShopSummary;
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::Reservation;
use crate::state::AppState;

/// Attaches `{ id, name, province, tel }` of each reservation's shop.
async fn with_shops(
    state: &AppState,
    reservations: Vec<Reservation>,
) -> Result<Vec<ReservationResponse>, AppError> {
    let mut shops: HashMap<i64, Option<ShopSummary>> = HashMap::new();
    let mut out = Vec::with_capacity(reservations.len());

    for resv in reservations {
        if !shops.contains_key(&resv.shop_id) {
            let summary = state.store.get_shop(resv.shop_id).await?.as_ref().map(ShopSummary::from);
            shops.insert(resv.shop_id, summary);
        }
        let summary = shops.get(&resv.shop_id).cloned().flatten();
        out.push(ReservationResponse::new(resv, summary));
    }
    Ok(out)
}

pub async fn list_reservations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ApiResponse<Vec<ReservationResponse>>>, AppError> {
    let reservations = state.reservations.list(&auth, None).await?;
    Ok(Json(ApiResponse::list(with_shops(&state, reservations).await?)))
}

pub async fn list_shop_reservations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<ReservationResponse>>>, AppError> {
    let reservations = state.reservations.list(&auth, Some(shop_id)).await?;
    Ok(Json(ApiResponse::list(with_shops(&state, reservations).await?)))
}

pub async fn get_reservation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ReservationResponse>>, AppError> {
    let resv = state.reservations.get(&auth, id).await?;
    let mut responses = with_shops(&state, vec![resv]).await?;
    let response = responses
        .pop()
        .ok_or_else(|| AppError::internal("reservation lost while attaching shop"))?;
    Ok(Json(ApiResponse::ok(response)))
}

pub async fn create_reservation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<i64>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReservationResponse>>), AppError> {
    let resv = state.reservations.create(&auth, shop_id, req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(resv.into()))))
}

pub async fn update_reservation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateReservationRequest>,
) -> Result<Json<ApiResponse<ReservationResponse>>, AppError> {
    let resv = state.reservations.update(&auth, id, req).await?;
    Ok(Json(ApiResponse::ok(resv.into())))
}

pub async fn delete_reservation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Empty>>, AppError> {
    state.reservations.delete(&auth, id).await?;
    Ok(Json(ApiResponse::ok(Empty {})))
}
