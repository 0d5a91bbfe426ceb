use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::Store;
use crate::error::AppError;
use crate::models::{
    MassageShop, NewReservation, NewShop, NewUser, Reservation, ReservationFilter, Role,
    ScheduleWrite, ShopChanges, ShopFilter, ShopQuery, ShopSort, User,
};
use crate::scheduling::{ShopSchedule, TimeOfDay, TimeRange};

const USER_COLUMNS: &str = "id, name, telephone, email, password_hash, role, created_at";
const SHOP_COLUMNS: &str = "id, name, address, district, province, postalcode, tel, open_time, close_time, busy_time, created_at";
const RESERVATION_COLUMNS: &str = "id, user_id, shop_id, resv_date, start_time, end_time, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    name: String,
    telephone: Option<String>,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| AppError::internal(format!("Unknown role '{}' for user {}", row.role, row.id)))?;
        Ok(User {
            id: row.id,
            name: row.name,
            telephone: row.telephone,
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct ShopRow {
    id: i64,
    name: String,
    address: String,
    district: String,
    province: String,
    postalcode: String,
    tel: Option<String>,
    open_time: i16,
    close_time: i16,
    busy_time: Json<ShopSchedule>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ShopRow> for MassageShop {
    type Error = AppError;

    fn try_from(row: ShopRow) -> Result<Self, Self::Error> {
        Ok(MassageShop {
            open_time: minutes(row.open_time)?,
            close_time: minutes(row.close_time)?,
            id: row.id,
            name: row.name,
            address: row.address,
            district: row.district,
            province: row.province,
            postalcode: row.postalcode,
            tel: row.tel,
            busy_time: row.busy_time.0,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct ReservationRow {
    id: i64,
    user_id: i64,
    shop_id: i64,
    resv_date: NaiveDate,
    start_time: i16,
    end_time: i16,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = AppError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let range = TimeRange::new(minutes(row.start_time)?, minutes(row.end_time)?)?;
        Ok(Reservation {
            id: row.id,
            user_id: row.user_id,
            shop_id: row.shop_id,
            resv_date: row.resv_date,
            range,
            created_at: row.created_at,
        })
    }
}

fn minutes(value: i16) -> Result<TimeOfDay, AppError> {
    u16::try_from(value)
        .ok()
        .and_then(TimeOfDay::from_minutes)
        .ok_or_else(|| AppError::internal(format!("Stored time {value} is out of range")))
}

fn to_db(time: TimeOfDay) -> i16 {
    // Always below 1440.
    time.minutes() as i16
}

fn map_unique(e: sqlx::Error, message: &str) -> AppError {
    if let Some(db) = e.as_database_error() {
        if db.code().as_deref() == Some("23505") {
            return AppError::conflict(message);
        }
        if db.code().as_deref() == Some("23503") {
            return AppError::not_found("Referenced user or massage shop does not exist");
        }
    }
    AppError::db(e)
}

fn order_by(sort: ShopSort) -> &'static str {
    match sort {
        ShopSort::Name => "name ASC",
        ShopSort::NameDesc => "name DESC",
        ShopSort::CreatedAt => "created_at ASC, id ASC",
        ShopSort::CreatedAtDesc => "created_at DESC, id DESC",
    }
}

async fn apply_writes(
    tx: &mut Transaction<'_, Postgres>,
    writes: Vec<ScheduleWrite>,
) -> Result<(), AppError> {
    for write in writes {
        let Json(mut schedule) = sqlx::query_scalar::<_, Json<ShopSchedule>>(
            "SELECT busy_time FROM massage_shops WHERE id = $1 FOR UPDATE",
        )
        .bind(write.shop_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::not_found(format!("No massage shop with the id of {}", write.shop_id)))?;

        schedule.set_day(write.date, write.day);

        sqlx::query("UPDATE massage_shops SET busy_time = $2 WHERE id = $1")
            .bind(write.shop_id)
            .bind(Json(&schedule))
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (name, telephone, email, password_hash, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.name)
        .bind(&user.telephone)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, "Email already registered"))?;

        row.try_into()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn list_shops(&self, query: &ShopQuery) -> Result<Vec<MassageShop>, AppError> {
        tracing::debug!(offset = query.offset, limit = query.limit, "listing massage shops");

        let rows = sqlx::query_as::<_, ShopRow>(&format!(
            "SELECT {SHOP_COLUMNS} FROM massage_shops
             WHERE ($1::TEXT IS NULL OR province = $1)
               AND ($2::TEXT IS NULL OR district = $2)
             ORDER BY {}
             OFFSET $3 LIMIT $4",
            order_by(query.sort)
        ))
        .bind(&query.filter.province)
        .bind(&query.filter.district)
        .bind(query.offset)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MassageShop::try_from).collect()
    }

    async fn count_shops(&self, filter: &ShopFilter) -> Result<i64, AppError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM massage_shops
             WHERE ($1::TEXT IS NULL OR province = $1)
               AND ($2::TEXT IS NULL OR district = $2)",
        )
        .bind(&filter.province)
        .bind(&filter.district)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn get_shop(&self, id: i64) -> Result<Option<MassageShop>, AppError> {
        sqlx::query_as::<_, ShopRow>(&format!("SELECT {SHOP_COLUMNS} FROM massage_shops WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(MassageShop::try_from)
            .transpose()
    }

    async fn create_shop(&self, shop: NewShop) -> Result<MassageShop, AppError> {
        let row = sqlx::query_as::<_, ShopRow>(&format!(
            "INSERT INTO massage_shops (name, address, district, province, postalcode, tel, open_time, close_time)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {SHOP_COLUMNS}"
        ))
        .bind(&shop.name)
        .bind(&shop.address)
        .bind(&shop.district)
        .bind(&shop.province)
        .bind(&shop.postalcode)
        .bind(&shop.tel)
        .bind(to_db(shop.open_time))
        .bind(to_db(shop.close_time))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, "Massage shop name already exists"))?;

        row.try_into()
    }

    async fn update_shop(&self, id: i64, changes: ShopChanges) -> Result<Option<MassageShop>, AppError> {
        let row = sqlx::query_as::<_, ShopRow>(&format!(
            "UPDATE massage_shops SET
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                district = COALESCE($4, district),
                province = COALESCE($5, province),
                postalcode = COALESCE($6, postalcode),
                tel = COALESCE($7, tel),
                open_time = COALESCE($8, open_time),
                close_time = COALESCE($9, close_time)
             WHERE id = $1
             RETURNING {SHOP_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.address)
        .bind(&changes.district)
        .bind(&changes.province)
        .bind(&changes.postalcode)
        .bind(&changes.tel)
        .bind(changes.open_time.map(to_db))
        .bind(changes.close_time.map(to_db))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique(e, "Massage shop name already exists"))?;

        row.map(MassageShop::try_from).transpose()
    }

    async fn delete_shop(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM reservations WHERE shop_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM massage_shops WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_reservation(&self, id: i64) -> Result<Option<Reservation>, AppError> {
        sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Reservation::try_from)
        .transpose()
    }

    async fn list_reservations(&self, filter: ReservationFilter) -> Result<Vec<Reservation>, AppError> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
               AND ($2::BIGINT IS NULL OR shop_id = $2)
             ORDER BY id ASC"
        ))
        .bind(filter.user_id)
        .bind(filter.shop_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn count_reservations(&self, filter: ReservationFilter) -> Result<i64, AppError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reservations
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
               AND ($2::BIGINT IS NULL OR shop_id = $2)",
        )
        .bind(filter.user_id)
        .bind(filter.shop_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn create_reservation(
        &self,
        writes: Vec<ScheduleWrite>,
        reservation: NewReservation,
    ) -> Result<Reservation, AppError> {
        let mut tx = self.pool.begin().await?;

        apply_writes(&mut tx, writes).await?;

        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "INSERT INTO reservations (user_id, shop_id, resv_date, start_time, end_time)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(reservation.user_id)
        .bind(reservation.shop_id)
        .bind(reservation.resv_date)
        .bind(to_db(reservation.range.start))
        .bind(to_db(reservation.range.end))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique(e, "Reservation already exists"))?;

        tx.commit().await?;
        row.try_into()
    }

    async fn update_reservation(
        &self,
        writes: Vec<ScheduleWrite>,
        reservation: Reservation,
    ) -> Result<Reservation, AppError> {
        let mut tx = self.pool.begin().await?;

        apply_writes(&mut tx, writes).await?;

        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "UPDATE reservations
             SET shop_id = $2, resv_date = $3, start_time = $4, end_time = $5
             WHERE id = $1
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(reservation.id)
        .bind(reservation.shop_id)
        .bind(reservation.resv_date)
        .bind(to_db(reservation.range.start))
        .bind(to_db(reservation.range.end))
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_unique(e, "Reservation already exists"))?
        .ok_or_else(|| AppError::not_found(format!("No reservation with the id of {}", reservation.id)))?;

        tx.commit().await?;
        row.try_into()
    }

    async fn delete_reservation(&self, writes: Vec<ScheduleWrite>, id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        apply_writes(&mut tx, writes).await?;

        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the schedule writes.
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }
}
