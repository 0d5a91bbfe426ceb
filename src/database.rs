// src/database.rs
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}

pub async fn initialize_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    info!("Initializing database schema...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            telephone TEXT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Opening hours and reservation times are minutes since midnight.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS massage_shops (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            address TEXT NOT NULL,
            district TEXT NOT NULL,
            province TEXT NOT NULL,
            postalcode VARCHAR(5) NOT NULL,
            tel TEXT NULL,
            open_time SMALLINT NOT NULL,
            close_time SMALLINT NOT NULL,
            busy_time JSONB NOT NULL DEFAULT '{}'::jsonb,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_opening_hours CHECK (open_time <= close_time)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reservations (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            shop_id BIGINT NOT NULL REFERENCES massage_shops(id) ON DELETE CASCADE,
            resv_date DATE NOT NULL,
            start_time SMALLINT NOT NULL,
            end_time SMALLINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_time_range CHECK (end_time > start_time)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reservations_user ON reservations(user_id);")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reservations_shop ON reservations(shop_id, resv_date);")
        .execute(pool)
        .await?;

    info!("Database schema initialized");
    Ok(())
}
