use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Trains are the parent of every profile table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS trains (
            train_id VARCHAR(255) PRIMARY KEY,
            trainname VARCHAR(255) NOT NULL,
            "current_date" TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fitness_certificates (
            train_id VARCHAR(255) PRIMARY KEY REFERENCES trains(train_id) ON DELETE CASCADE,
            rolling_stock_fitness_status BOOLEAN NOT NULL DEFAULT FALSE,
            signalling_fitness_status BOOLEAN NOT NULL DEFAULT FALSE,
            telecom_fitness_status BOOLEAN NOT NULL DEFAULT FALSE,
            rolling_stock_fitness_expiry_date TIMESTAMPTZ NOT NULL,
            signalling_fitness_expiry_date TIMESTAMPTZ NOT NULL,
            telecom_fitness_expiry_date TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_card_status (
            train_id VARCHAR(255) PRIMARY KEY REFERENCES trains(train_id) ON DELETE CASCADE,
            job_card_status VARCHAR(50) NOT NULL,
            open_job_cards INTEGER NOT NULL DEFAULT 0,
            closed_job_cards INTEGER NOT NULL DEFAULT 0,
            last_job_card_update TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS branding (
            train_id VARCHAR(255) PRIMARY KEY REFERENCES trains(train_id) ON DELETE CASCADE,
            branding_active BOOLEAN NOT NULL DEFAULT FALSE,
            brand_campaign_id VARCHAR(255),
            exposure_hours_accrued INTEGER NOT NULL DEFAULT 0,
            exposure_hours_target INTEGER NOT NULL DEFAULT 0,
            exposure_daily_quota INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mileage (
            train_id VARCHAR(255) PRIMARY KEY REFERENCES trains(train_id) ON DELETE CASCADE,
            total_mileage_km INTEGER NOT NULL DEFAULT 0,
            mileage_since_last_service_km INTEGER NOT NULL DEFAULT 0,
            mileage_balance_variance INTEGER NOT NULL DEFAULT 0,
            brakepad_wear_percent INTEGER NOT NULL DEFAULT 0,
            hvac_wear_percent INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cleaning (
            train_id VARCHAR(255) PRIMARY KEY REFERENCES trains(train_id) ON DELETE CASCADE,
            cleaning_required BOOLEAN NOT NULL DEFAULT FALSE,
            cleaning_slot_status VARCHAR(50),
            bay_occupancy_idc VARCHAR(255),
            cleaning_crew_assigned INTEGER,
            last_cleaned_date TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stabling (
            train_id VARCHAR(255) PRIMARY KEY REFERENCES trains(train_id) ON DELETE CASCADE,
            bay_position_id INTEGER NOT NULL DEFAULT 0,
            shunting_moves_required INTEGER NOT NULL DEFAULT 0,
            stabling_sequence_order INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS operations (
            train_id VARCHAR(255) PRIMARY KEY REFERENCES trains(train_id) ON DELETE CASCADE,
            operational_status VARCHAR(50) NOT NULL DEFAULT 'in_service',
            reason_for_status TEXT,
            rank INTEGER,
            score INTEGER,
            rl_priority INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_operations_rank ON operations(rank)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
