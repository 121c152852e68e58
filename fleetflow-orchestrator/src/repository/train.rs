//! Train Store
//!
//! Persistent train records with create-or-update semantics keyed by train id.
//! Sub-profile upserts assume the train row already exists.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetflow_core::domain::train::{
    Branding, Cleaning, DEFAULT_OPERATIONAL_STATUS, FitnessCertificate, JobCardStatus, Mileage,
    Operations, Stabling, Train, TrainProfile,
};
use sqlx::{PgPool, Row};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("train {0} does not exist")]
    MissingTrain(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Repository of train profiles
#[async_trait]
pub trait TrainStore: Send + Sync {
    /// Create the train or update its name; `current_date` is only set on create
    async fn upsert_train(&self, train: &Train) -> Result<()>;

    async fn upsert_fitness(&self, train_id: &str, record: &FitnessCertificate) -> Result<()>;

    async fn upsert_job_card(&self, train_id: &str, record: &JobCardStatus) -> Result<()>;

    async fn upsert_branding(&self, train_id: &str, record: &Branding) -> Result<()>;

    async fn upsert_mileage(&self, train_id: &str, record: &Mileage) -> Result<()>;

    async fn upsert_cleaning(&self, train_id: &str, record: &Cleaning) -> Result<()>;

    async fn upsert_stabling(&self, train_id: &str, record: &Stabling) -> Result<()>;

    /// Upsert operations; a `None` status keeps the stored one, or the default on create
    async fn upsert_operations(&self, train_id: &str, record: &Operations) -> Result<()>;

    async fn get_profile(&self, train_id: &str) -> Result<Option<TrainProfile>>;

    async fn count_trains(&self) -> Result<usize>;
}

// =============================================================================
// In-memory store
// =============================================================================

/// In-memory implementation of TrainStore
///
/// Used when no database is configured, and in tests.
#[derive(Clone, Default)]
pub struct InMemoryTrainStore {
    profiles: Arc<RwLock<BTreeMap<String, TrainProfile>>>,
}

impl InMemoryTrainStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_profile(&self, train_id: &str, apply: impl FnOnce(&mut TrainProfile)) -> Result<()> {
        let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        let profile = profiles
            .get_mut(train_id)
            .ok_or_else(|| StoreError::MissingTrain(train_id.to_string()))?;
        apply(profile);
        Ok(())
    }
}

#[async_trait]
impl TrainStore for InMemoryTrainStore {
    async fn upsert_train(&self, train: &Train) -> Result<()> {
        let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        profiles
            .entry(train.train_id.clone())
            .and_modify(|p| p.train.trainname = train.trainname.clone())
            .or_insert_with(|| TrainProfile::new(train.clone()));
        Ok(())
    }

    async fn upsert_fitness(&self, train_id: &str, record: &FitnessCertificate) -> Result<()> {
        self.with_profile(train_id, |p| p.fitness = Some(record.clone()))
    }

    async fn upsert_job_card(&self, train_id: &str, record: &JobCardStatus) -> Result<()> {
        self.with_profile(train_id, |p| p.job_card = Some(record.clone()))
    }

    async fn upsert_branding(&self, train_id: &str, record: &Branding) -> Result<()> {
        self.with_profile(train_id, |p| p.branding = Some(record.clone()))
    }

    async fn upsert_mileage(&self, train_id: &str, record: &Mileage) -> Result<()> {
        self.with_profile(train_id, |p| p.mileage = Some(record.clone()))
    }

    async fn upsert_cleaning(&self, train_id: &str, record: &Cleaning) -> Result<()> {
        self.with_profile(train_id, |p| p.cleaning = Some(record.clone()))
    }

    async fn upsert_stabling(&self, train_id: &str, record: &Stabling) -> Result<()> {
        self.with_profile(train_id, |p| p.stabling = Some(record.clone()))
    }

    async fn upsert_operations(&self, train_id: &str, record: &Operations) -> Result<()> {
        self.with_profile(train_id, |p| {
            p.operations = Some(record.merged_onto(p.operations.as_ref()));
        })
    }

    async fn get_profile(&self, train_id: &str) -> Result<Option<TrainProfile>> {
        let profiles = self.profiles.read().unwrap_or_else(PoisonError::into_inner);
        Ok(profiles.get(train_id).cloned())
    }

    async fn count_trains(&self) -> Result<usize> {
        let profiles = self.profiles.read().unwrap_or_else(PoisonError::into_inner);
        Ok(profiles.len())
    }
}

// =============================================================================
// Postgres store
// =============================================================================

/// Postgres implementation of TrainStore
#[derive(Clone)]
pub struct PgTrainStore {
    pool: PgPool,
}

impl PgTrainStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrainStore for PgTrainStore {
    async fn upsert_train(&self, train: &Train) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trains (train_id, trainname, "current_date", created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            ON CONFLICT (train_id) DO UPDATE
            SET trainname = EXCLUDED.trainname, updated_at = NOW()
            "#,
        )
        .bind(&train.train_id)
        .bind(&train.trainname)
        .bind(train.current_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_fitness(&self, train_id: &str, record: &FitnessCertificate) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fitness_certificates (
                train_id, rolling_stock_fitness_status, signalling_fitness_status,
                telecom_fitness_status, rolling_stock_fitness_expiry_date,
                signalling_fitness_expiry_date, telecom_fitness_expiry_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (train_id) DO UPDATE
            SET rolling_stock_fitness_status = EXCLUDED.rolling_stock_fitness_status,
                signalling_fitness_status = EXCLUDED.signalling_fitness_status,
                telecom_fitness_status = EXCLUDED.telecom_fitness_status,
                rolling_stock_fitness_expiry_date = EXCLUDED.rolling_stock_fitness_expiry_date,
                signalling_fitness_expiry_date = EXCLUDED.signalling_fitness_expiry_date,
                telecom_fitness_expiry_date = EXCLUDED.telecom_fitness_expiry_date
            "#,
        )
        .bind(train_id)
        .bind(record.rolling_stock_fitness_status)
        .bind(record.signalling_fitness_status)
        .bind(record.telecom_fitness_status)
        .bind(record.rolling_stock_fitness_expiry_date)
        .bind(record.signalling_fitness_expiry_date)
        .bind(record.telecom_fitness_expiry_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_job_card(&self, train_id: &str, record: &JobCardStatus) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO job_card_status (
                train_id, job_card_status, open_job_cards, closed_job_cards, last_job_card_update
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (train_id) DO UPDATE
            SET job_card_status = EXCLUDED.job_card_status,
                open_job_cards = EXCLUDED.open_job_cards,
                closed_job_cards = EXCLUDED.closed_job_cards,
                last_job_card_update = EXCLUDED.last_job_card_update
            "#,
        )
        .bind(train_id)
        .bind(&record.job_card_status)
        .bind(record.open_job_cards)
        .bind(record.closed_job_cards)
        .bind(record.last_job_card_update)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_branding(&self, train_id: &str, record: &Branding) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO branding (
                train_id, branding_active, brand_campaign_id, exposure_hours_accrued,
                exposure_hours_target, exposure_daily_quota
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (train_id) DO UPDATE
            SET branding_active = EXCLUDED.branding_active,
                brand_campaign_id = EXCLUDED.brand_campaign_id,
                exposure_hours_accrued = EXCLUDED.exposure_hours_accrued,
                exposure_hours_target = EXCLUDED.exposure_hours_target,
                exposure_daily_quota = EXCLUDED.exposure_daily_quota
            "#,
        )
        .bind(train_id)
        .bind(record.branding_active)
        .bind(&record.brand_campaign_id)
        .bind(record.exposure_hours_accrued)
        .bind(record.exposure_hours_target)
        .bind(record.exposure_daily_quota)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_mileage(&self, train_id: &str, record: &Mileage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO mileage (
                train_id, total_mileage_km, mileage_since_last_service_km,
                mileage_balance_variance, brakepad_wear_percent, hvac_wear_percent
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (train_id) DO UPDATE
            SET total_mileage_km = EXCLUDED.total_mileage_km,
                mileage_since_last_service_km = EXCLUDED.mileage_since_last_service_km,
                mileage_balance_variance = EXCLUDED.mileage_balance_variance,
                brakepad_wear_percent = EXCLUDED.brakepad_wear_percent,
                hvac_wear_percent = EXCLUDED.hvac_wear_percent
            "#,
        )
        .bind(train_id)
        .bind(record.total_mileage_km)
        .bind(record.mileage_since_last_service_km)
        .bind(record.mileage_balance_variance)
        .bind(record.brakepad_wear_percent)
        .bind(record.hvac_wear_percent)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_cleaning(&self, train_id: &str, record: &Cleaning) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cleaning (
                train_id, cleaning_required, cleaning_slot_status, bay_occupancy_idc,
                cleaning_crew_assigned, last_cleaned_date
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (train_id) DO UPDATE
            SET cleaning_required = EXCLUDED.cleaning_required,
                cleaning_slot_status = EXCLUDED.cleaning_slot_status,
                bay_occupancy_idc = EXCLUDED.bay_occupancy_idc,
                cleaning_crew_assigned = EXCLUDED.cleaning_crew_assigned,
                last_cleaned_date = EXCLUDED.last_cleaned_date
            "#,
        )
        .bind(train_id)
        .bind(record.cleaning_required)
        .bind(&record.cleaning_slot_status)
        .bind(&record.bay_occupancy_idc)
        .bind(record.cleaning_crew_assigned)
        .bind(record.last_cleaned_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_stabling(&self, train_id: &str, record: &Stabling) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stabling (
                train_id, bay_position_id, shunting_moves_required, stabling_sequence_order
            )
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (train_id) DO UPDATE
            SET bay_position_id = EXCLUDED.bay_position_id,
                shunting_moves_required = EXCLUDED.shunting_moves_required,
                stabling_sequence_order = EXCLUDED.stabling_sequence_order
            "#,
        )
        .bind(train_id)
        .bind(record.bay_position_id)
        .bind(record.shunting_moves_required)
        .bind(record.stabling_sequence_order)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_operations(&self, train_id: &str, record: &Operations) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO operations (
                train_id, operational_status, reason_for_status, rank, score, rl_priority
            )
            VALUES ($1, COALESCE($2, $7), $3, $4, $5, $6)
            ON CONFLICT (train_id) DO UPDATE
            SET operational_status = COALESCE($2, operations.operational_status),
                reason_for_status = EXCLUDED.reason_for_status,
                rank = EXCLUDED.rank,
                score = EXCLUDED.score,
                rl_priority = EXCLUDED.rl_priority
            "#,
        )
        .bind(train_id)
        .bind(&record.operational_status)
        .bind(&record.reason_for_status)
        .bind(record.rank)
        .bind(record.score)
        .bind(record.rl_priority)
        .bind(DEFAULT_OPERATIONAL_STATUS)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_profile(&self, train_id: &str) -> Result<Option<TrainProfile>> {
        let row = sqlx::query(
            r#"SELECT train_id, trainname, "current_date" FROM trains WHERE train_id = $1"#,
        )
        .bind(train_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut profile = TrainProfile::new(Train {
            train_id: row.try_get("train_id")?,
            trainname: row.try_get("trainname")?,
            current_date: row.try_get("current_date")?,
        });

        profile.fitness = sqlx::query(
            r#"
            SELECT rolling_stock_fitness_status, signalling_fitness_status, telecom_fitness_status,
                   rolling_stock_fitness_expiry_date, signalling_fitness_expiry_date,
                   telecom_fitness_expiry_date
            FROM fitness_certificates WHERE train_id = $1
            "#,
        )
        .bind(train_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|r| -> std::result::Result<_, sqlx::Error> {
            Ok(FitnessCertificate {
                rolling_stock_fitness_status: r.try_get("rolling_stock_fitness_status")?,
                signalling_fitness_status: r.try_get("signalling_fitness_status")?,
                telecom_fitness_status: r.try_get("telecom_fitness_status")?,
                rolling_stock_fitness_expiry_date: r.try_get("rolling_stock_fitness_expiry_date")?,
                signalling_fitness_expiry_date: r.try_get("signalling_fitness_expiry_date")?,
                telecom_fitness_expiry_date: r.try_get("telecom_fitness_expiry_date")?,
            })
        })
        .transpose()?;

        profile.job_card = sqlx::query(
            r#"
            SELECT job_card_status, open_job_cards, closed_job_cards, last_job_card_update
            FROM job_card_status WHERE train_id = $1
            "#,
        )
        .bind(train_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|r| -> std::result::Result<_, sqlx::Error> {
            Ok(JobCardStatus {
                job_card_status: r.try_get("job_card_status")?,
                open_job_cards: r.try_get("open_job_cards")?,
                closed_job_cards: r.try_get("closed_job_cards")?,
                last_job_card_update: r.try_get::<DateTime<Utc>, _>("last_job_card_update")?,
            })
        })
        .transpose()?;

        profile.branding = sqlx::query(
            r#"
            SELECT branding_active, brand_campaign_id, exposure_hours_accrued,
                   exposure_hours_target, exposure_daily_quota
            FROM branding WHERE train_id = $1
            "#,
        )
        .bind(train_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|r| -> std::result::Result<_, sqlx::Error> {
            Ok(Branding {
                branding_active: r.try_get("branding_active")?,
                brand_campaign_id: r.try_get("brand_campaign_id")?,
                exposure_hours_accrued: r.try_get("exposure_hours_accrued")?,
                exposure_hours_target: r.try_get("exposure_hours_target")?,
                exposure_daily_quota: r.try_get("exposure_daily_quota")?,
            })
        })
        .transpose()?;

        profile.mileage = sqlx::query(
            r#"
            SELECT total_mileage_km, mileage_since_last_service_km, mileage_balance_variance,
                   brakepad_wear_percent, hvac_wear_percent
            FROM mileage WHERE train_id = $1
            "#,
        )
        .bind(train_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|r| -> std::result::Result<_, sqlx::Error> {
            Ok(Mileage {
                total_mileage_km: r.try_get("total_mileage_km")?,
                mileage_since_last_service_km: r.try_get("mileage_since_last_service_km")?,
                mileage_balance_variance: r.try_get("mileage_balance_variance")?,
                brakepad_wear_percent: r.try_get("brakepad_wear_percent")?,
                hvac_wear_percent: r.try_get("hvac_wear_percent")?,
            })
        })
        .transpose()?;

        profile.cleaning = sqlx::query(
            r#"
            SELECT cleaning_required, cleaning_slot_status, bay_occupancy_idc,
                   cleaning_crew_assigned, last_cleaned_date
            FROM cleaning WHERE train_id = $1
            "#,
        )
        .bind(train_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|r| -> std::result::Result<_, sqlx::Error> {
            Ok(Cleaning {
                cleaning_required: r.try_get("cleaning_required")?,
                cleaning_slot_status: r.try_get("cleaning_slot_status")?,
                bay_occupancy_idc: r.try_get("bay_occupancy_idc")?,
                cleaning_crew_assigned: r.try_get("cleaning_crew_assigned")?,
                last_cleaned_date: r.try_get("last_cleaned_date")?,
            })
        })
        .transpose()?;

        profile.stabling = sqlx::query(
            r#"
            SELECT bay_position_id, shunting_moves_required, stabling_sequence_order
            FROM stabling WHERE train_id = $1
            "#,
        )
        .bind(train_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|r| -> std::result::Result<_, sqlx::Error> {
            Ok(Stabling {
                bay_position_id: r.try_get("bay_position_id")?,
                shunting_moves_required: r.try_get("shunting_moves_required")?,
                stabling_sequence_order: r.try_get("stabling_sequence_order")?,
            })
        })
        .transpose()?;

        profile.operations = sqlx::query(
            r#"
            SELECT operational_status, reason_for_status, rank, score, rl_priority
            FROM operations WHERE train_id = $1
            "#,
        )
        .bind(train_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|r| -> std::result::Result<_, sqlx::Error> {
            Ok(Operations {
                operational_status: r.try_get("operational_status")?,
                reason_for_status: r.try_get("reason_for_status")?,
                rank: r.try_get("rank")?,
                score: r.try_get("score")?,
                rl_priority: r.try_get("rl_priority")?,
            })
        })
        .transpose()?;

        Ok(Some(profile))
    }

    async fn count_trains(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trains")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
