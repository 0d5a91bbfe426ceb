use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use axum::http::StatusCode;
use crate::dtos::{ApiResponse, Empty};
use crate::dtos::shop::{CreateShopRequest, Pagination, ShopListQuery, ShopResponse, UpdateShopRequest};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::{NewShop, ShopChanges, ShopFilter, ShopQuery, ShopSort};
use crate::scheduling::TimeOfDay;
use crate::state::AppState;

const DEFAULT_PAGE_LIMIT: i64 = 25;
const MAX_PAGE_LIMIT: i64 = 100;

fn parse_hours(text: &str) -> Result<TimeOfDay, AppError> {
    TimeOfDay::parse(text.trim()).map_err(|_| AppError::validation("Invalid time format. Use hh:mm AM/PM"))
}

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("Please add a {field}")));
    }
    Ok(value.to_string())
}

fn check_postalcode(code: &str) -> Result<(), AppError> {
    if code.chars().count() > 5 {
        return Err(AppError::validation("Postal Code can not be more than 5 digits"));
    }
    Ok(())
}

pub async fn list_shops(
    State(state): State<AppState>,
    Query(query): Query<ShopListQuery>,
) -> Result<Json<ApiResponse<Vec<ShopResponse>>>, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
    let sort = match query.sort.as_deref() {
        None => ShopSort::default(),
        Some(s) => ShopSort::parse(s).ok_or_else(|| AppError::validation(format!("Unsupported sort '{s}'")))?,
    };
    let filter = ShopFilter {
        province: query.province,
        district: query.district,
    };

    let total = state.store.count_shops(&filter).await?;
    let shops = state
        .store
        .list_shops(&ShopQuery {
            filter,
            sort,
            offset: (page - 1).saturating_mul(limit),
            limit,
        })
        .await?;

    Ok(Json(ApiResponse::paginated(
        shops.into_iter().map(ShopResponse::from).collect(),
        Pagination::new(page, limit, total),
    )))
}

pub async fn get_shop(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ShopResponse>>, AppError> {
    let shop = state
        .store
        .get_shop(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Massage shop not found with id of {id}")))?;

    Ok(Json(ApiResponse::ok(shop.into())))
}

pub async fn create_shop(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateShopRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ShopResponse>>), AppError> {
    auth.require_admin("Only admins can create massage shops")?;

    let open_time = parse_hours(&req.open_time)?;
    let close_time = parse_hours(&req.close_time)?;
    if open_time > close_time {
        return Err(AppError::validation("Invalid time range"));
    }

    let postalcode = required(&req.postalcode, "postalcode")?;
    check_postalcode(&postalcode)?;

    let shop = state
        .store
        .create_shop(NewShop {
            name: required(&req.name, "name")?,
            address: required(&req.address, "address")?,
            district: required(&req.district, "district")?,
            province: required(&req.province, "province")?,
            postalcode,
            tel: req.tel,
            open_time,
            close_time,
        })
        .await?;

    tracing::info!(shop_id = shop.id, name = %shop.name, "massage shop created");

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(shop.into()))))
}

pub async fn update_shop(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateShopRequest>,
) -> Result<Json<ApiResponse<ShopResponse>>, AppError> {
    auth.require_admin("Only admins can update massage shops")?;

    if req.busy_time.is_some() {
        return Err(AppError::validation("busyTime can not update, Please remove busyTime field"));
    }

    let existing = state
        .store
        .get_shop(id)
        .await?
        .ok_or_else(|| AppError::not_found("Massage shop not found"))?;

    let open_time = req.open_time.as_deref().map(parse_hours).transpose()?;
    let close_time = req.close_time.as_deref().map(parse_hours).transpose()?;
    if open_time.unwrap_or(existing.open_time) > close_time.unwrap_or(existing.close_time) {
        return Err(AppError::validation("Invalid time range"));
    }

    if let Some(code) = &req.postalcode {
        check_postalcode(code.trim())?;
    }

    let changes = ShopChanges {
        name: req.name.as_deref().map(|n| required(n, "name")).transpose()?,
        address: req.address.as_deref().map(|a| required(a, "address")).transpose()?,
        district: req.district.as_deref().map(|d| required(d, "district")).transpose()?,
        province: req.province.as_deref().map(|p| required(p, "province")).transpose()?,
        postalcode: req.postalcode.as_deref().map(|p| required(p, "postalcode")).transpose()?,
        tel: req.tel,
        open_time,
        close_time,
    };

    let shop = state
        .store
        .update_shop(id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("Massage shop not found"))?;

    Ok(Json(ApiResponse::ok(shop.into())))
}

pub async fn delete_shop(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Empty>>, AppError> {
    auth.require_admin("Only admins can delete massage shops")?;

    if !state.store.delete_shop(id).await? {
        return Err(AppError::not_found(format!("Massage shop not found with id of {id}")));
    }

    tracing::info!(shop_id = id, "massage shop deleted with its reservations");

    Ok(Json(ApiResponse::ok(Empty {})))
}
