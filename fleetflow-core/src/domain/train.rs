//! Train profile records
//!
//! A train is identified by its `trainID`; each sub-profile is keyed by the same
//! id and upserted independently. [`TrainProfileUpdate::from_row`] computes the
//! target values for one normalized row; the store decides create vs update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalize::fields::*;
use crate::normalize::{NormalizedRow, value};

/// Operational status given to an operations record created without one
pub const DEFAULT_OPERATIONAL_STATUS: &str = "in_service";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Train {
    #[serde(rename = "trainID")]
    pub train_id: String,
    pub trainname: String,
    pub current_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitnessCertificate {
    pub rolling_stock_fitness_status: bool,
    pub signalling_fitness_status: bool,
    pub telecom_fitness_status: bool,
    pub rolling_stock_fitness_expiry_date: DateTime<Utc>,
    pub signalling_fitness_expiry_date: DateTime<Utc>,
    pub telecom_fitness_expiry_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCardStatus {
    pub job_card_status: String,
    pub open_job_cards: i32,
    pub closed_job_cards: i32,
    pub last_job_card_update: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branding {
    pub branding_active: bool,
    #[serde(rename = "brandCampaignID")]
    pub brand_campaign_id: Option<String>,
    pub exposure_hours_accrued: i32,
    pub exposure_hours_target: i32,
    pub exposure_daily_quota: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mileage {
    #[serde(rename = "totalMileageKM")]
    pub total_mileage_km: i32,
    #[serde(rename = "mileageSinceLastServiceKM")]
    pub mileage_since_last_service_km: i32,
    #[serde(rename = "mileageBalanceVariance")]
    pub mileage_balance_variance: i32,
    #[serde(rename = "brakepadWearPercent")]
    pub brakepad_wear_percent: i32,
    #[serde(rename = "hvacWearPercent")]
    pub hvac_wear_percent: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cleaning {
    pub cleaning_required: bool,
    pub cleaning_slot_status: Option<String>,
    #[serde(rename = "bayOccupancyIDC")]
    pub bay_occupancy_idc: Option<String>,
    pub cleaning_crew_assigned: Option<i32>,
    pub last_cleaned_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stabling {
    #[serde(rename = "bayPositionID")]
    pub bay_position_id: i32,
    pub shunting_moves_required: i32,
    pub stabling_sequence_order: i32,
}

/// Operations record
///
/// `operational_status` is `None` when the row carried ranking fields only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operations {
    pub operational_status: Option<String>,
    pub reason_for_status: Option<String>,
    pub rank: Option<i32>,
    pub score: Option<i32>,
    pub rl_priority: Option<i32>,
}

impl Operations {
    /// Apply this update on top of an existing record
    ///
    /// A missing status keeps the existing one, or the default on create.
    pub fn merged_onto(&self, existing: Option<&Operations>) -> Operations {
        let status = self
            .operational_status
            .clone()
            .or_else(|| existing.and_then(|e| e.operational_status.clone()))
            .unwrap_or_else(|| DEFAULT_OPERATIONAL_STATUS.to_string());

        Operations {
            operational_status: Some(status),
            ..self.clone()
        }
    }
}

/// Everything stored for one train
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainProfile {
    pub train: Train,
    pub fitness: Option<FitnessCertificate>,
    pub job_card: Option<JobCardStatus>,
    pub branding: Option<Branding>,
    pub mileage: Option<Mileage>,
    pub cleaning: Option<Cleaning>,
    pub stabling: Option<Stabling>,
    pub operations: Option<Operations>,
}

impl TrainProfile {
    pub fn new(train: Train) -> Self {
        Self {
            train,
            fitness: None,
            job_card: None,
            branding: None,
            mileage: None,
            cleaning: None,
            stabling: None,
            operations: None,
        }
    }
}

/// Why a row could not be turned into an update
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("missing trainname/trainID after normalization")]
    MissingTrainFields,

    #[error("invalid date in {field}: {value:?}")]
    InvalidDate { field: &'static str, value: String },
}

/// Target values computed from one normalized row
///
/// A sub-profile is `Some` only if the row carries one of its signal fields
/// and all of its dates parse. A sub-profile with a bad date is left out and
/// its error kept in `date_errors`; an unparseable `currentDate` falls back to
/// `now` so the train itself is still stored.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainProfileUpdate {
    pub train: Train,
    pub fitness: Option<FitnessCertificate>,
    pub job_card: Option<JobCardStatus>,
    pub branding: Option<Branding>,
    pub mileage: Option<Mileage>,
    pub cleaning: Option<Cleaning>,
    pub stabling: Option<Stabling>,
    pub operations: Option<Operations>,
    pub date_errors: Vec<RowError>,
}

impl TrainProfileUpdate {
    /// Build the update for a row; absent dates default to `now`
    ///
    /// Only a row without a train identity is rejected outright.
    pub fn from_row(row: &NormalizedRow, now: DateTime<Utc>) -> Result<Self, RowError> {
        let (train_id, trainname) = match (row.get(TRAIN_ID), row.get(TRAIN_NAME)) {
            (Some(id), Some(name)) => (id.to_string(), name.to_string()),
            _ => return Err(RowError::MissingTrainFields),
        };

        let fields = RowFields { row, now };
        let mut date_errors = Vec::new();

        let current_date = fields.date(CURRENT_DATE).unwrap_or_else(|e| {
            date_errors.push(e);
            now
        });
        let train = Train {
            train_id,
            trainname,
            current_date,
        };

        let fitness = row
            .has_any(FITNESS_SIGNALS)
            .then(|| -> Result<_, RowError> {
                Ok(FitnessCertificate {
                    rolling_stock_fitness_status: fields.flag(ROLLING_STOCK_FITNESS_STATUS),
                    signalling_fitness_status: fields.flag(SIGNALLING_FITNESS_STATUS),
                    telecom_fitness_status: fields.flag(TELECOM_FITNESS_STATUS),
                    rolling_stock_fitness_expiry_date: fields
                        .date(ROLLING_STOCK_FITNESS_EXPIRY_DATE)?,
                    signalling_fitness_expiry_date: fields.date(SIGNALLING_FITNESS_EXPIRY_DATE)?,
                    telecom_fitness_expiry_date: fields.date(TELECOM_FITNESS_EXPIRY_DATE)?,
                })
            });
        let fitness = keep_valid(fitness, &mut date_errors);

        let job_card = row
            .get(JOB_CARD_STATUS)
            .map(|status| -> Result<_, RowError> {
                Ok(JobCardStatus {
                    job_card_status: status.to_string(),
                    open_job_cards: fields.int(OPEN_JOB_CARDS),
                    closed_job_cards: fields.int(CLOSED_JOB_CARDS),
                    last_job_card_update: fields.date(LAST_JOB_CARD_UPDATE)?,
                })
            });
        let job_card = keep_valid(job_card, &mut date_errors);

        let branding = row.has_any(BRANDING_SIGNALS).then(|| Branding {
            branding_active: fields.flag(BRANDING_ACTIVE),
            brand_campaign_id: fields.text(BRAND_CAMPAIGN_ID),
            exposure_hours_accrued: fields.int(EXPOSURE_HOURS_ACCRUED),
            exposure_hours_target: fields.int(EXPOSURE_HOURS_TARGET),
            exposure_daily_quota: fields.int(EXPOSURE_DAILY_QUOTA),
        });

        let mileage = row.has_any(MILEAGE_SIGNALS).then(|| Mileage {
            total_mileage_km: fields.int(TOTAL_MILEAGE_KM),
            mileage_since_last_service_km: fields.int(MILEAGE_SINCE_LAST_SERVICE_KM),
            mileage_balance_variance: fields.int(MILEAGE_BALANCE_VARIANCE),
            brakepad_wear_percent: fields.int(BRAKEPAD_WEAR_PERCENT),
            hvac_wear_percent: fields.int(HVAC_WEAR_PERCENT),
        });

        let cleaning = row
            .has_any(CLEANING_SIGNALS)
            .then(|| -> Result<_, RowError> {
                Ok(Cleaning {
                    cleaning_required: fields.flag(CLEANING_REQUIRED),
                    cleaning_slot_status: fields.text(CLEANING_SLOT_STATUS),
                    bay_occupancy_idc: fields.text(BAY_OCCUPANCY_IDC),
                    cleaning_crew_assigned: fields.opt_int(CLEANING_CREW_ASSIGNED),
                    last_cleaned_date: fields.date(LAST_CLEANED_DATE)?,
                })
            });
        let cleaning = keep_valid(cleaning, &mut date_errors);

        let stabling = row.has_any(STABLING_SIGNALS).then(|| Stabling {
            bay_position_id: fields.int(BAY_POSITION_ID),
            shunting_moves_required: fields.int(SHUNTING_MOVES_REQUIRED),
            stabling_sequence_order: fields.int(STABLING_SEQUENCE_ORDER),
        });

        let operations = row.has_any(OPERATIONS_SIGNALS).then(|| Operations {
            operational_status: fields.text(OPERATIONAL_STATUS),
            reason_for_status: fields.text(REASON_FOR_STATUS),
            rank: fields.opt_int(RANK),
            score: fields.opt_int(SCORE),
            rl_priority: fields.opt_int(RL_PRIORITY),
        });

        Ok(Self {
            train,
            fitness,
            job_card,
            branding,
            mileage,
            cleaning,
            stabling,
            operations,
            date_errors,
        })
    }

    pub fn train_id(&self) -> &str {
        &self.train.train_id
    }
}

fn keep_valid<T>(built: Option<Result<T, RowError>>, errors: &mut Vec<RowError>) -> Option<T> {
    match built? {
        Ok(record) => Some(record),
        Err(e) => {
            errors.push(e);
            None
        }
    }
}

struct RowFields<'a> {
    row: &'a NormalizedRow,
    now: DateTime<Utc>,
}

impl RowFields<'_> {
    fn text(&self, field: &str) -> Option<String> {
        self.row.get(field).map(str::to_string)
    }

    fn flag(&self, field: &str) -> bool {
        self.row.get(field) == Some("true")
    }

    fn int(&self, field: &str) -> i32 {
        self.opt_int(field).unwrap_or(0)
    }

    fn opt_int(&self, field: &str) -> Option<i32> {
        self.row.get(field).and_then(value::parse_int_lenient)
    }

    fn date(&self, field: &'static str) -> Result<DateTime<Utc>, RowError> {
        match self.row.get(field) {
            None => Ok(self.now),
            Some(raw) => value::parse_date_flexible(raw).ok_or_else(|| RowError::InvalidDate {
                field,
                value: raw.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(pairs: &[(&str, &str)]) -> NormalizedRow {
        let mut row = NormalizedRow::new(0);
        for (k, v) in pairs {
            row.insert(*k, *v);
        }
        row
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_missing_identity() {
        let err = TrainProfileUpdate::from_row(&row(&[(TRAIN_ID, "T1")]), now()).unwrap_err();
        assert_eq!(err, RowError::MissingTrainFields);
    }

    #[test]
    fn test_train_only_row() {
        let update =
            TrainProfileUpdate::from_row(&row(&[(TRAIN_ID, "T1"), (TRAIN_NAME, "Alpha")]), now())
                .unwrap();

        assert_eq!(update.train_id(), "T1");
        assert_eq!(update.train.current_date, now());
        assert!(update.fitness.is_none());
        assert!(update.mileage.is_none());
        assert!(update.operations.is_none());
    }

    #[test]
    fn test_sparse_mileage_row_defaults() {
        let update = TrainProfileUpdate::from_row(
            &row(&[(TRAIN_ID, "T1"), (TRAIN_NAME, "A"), (TOTAL_MILEAGE_KM, "1200.5")]),
            now(),
        )
        .unwrap();

        let mileage = update.mileage.unwrap();
        assert_eq!(mileage.total_mileage_km, 1200);
        assert_eq!(mileage.hvac_wear_percent, 0);
        assert!(update.fitness.is_none());
        assert!(update.cleaning.is_none());
    }

    #[test]
    fn test_fitness_flags_and_dates() {
        let update = TrainProfileUpdate::from_row(
            &row(&[
                (TRAIN_ID, "T1"),
                (TRAIN_NAME, "A"),
                (SIGNALLING_FITNESS_STATUS, "true"),
                (TELECOM_FITNESS_STATUS, "yes"),
                (ROLLING_STOCK_FITNESS_EXPIRY_DATE, "2026-02-01T00:00:00.000Z"),
            ]),
            now(),
        )
        .unwrap();

        let fitness = update.fitness.unwrap();
        assert!(fitness.signalling_fitness_status);
        assert!(!fitness.telecom_fitness_status);
        assert!(!fitness.rolling_stock_fitness_status);
        assert_eq!(
            fitness.rolling_stock_fitness_expiry_date,
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(fitness.telecom_fitness_expiry_date, now());
    }

    #[test]
    fn test_invalid_date_drops_only_its_profile() {
        let update = TrainProfileUpdate::from_row(
            &row(&[
                (TRAIN_ID, "T1"),
                (TRAIN_NAME, "A"),
                (TOTAL_MILEAGE_KM, "500"),
                (CLEANING_REQUIRED, "true"),
                (LAST_CLEANED_DATE, "last tuesday"),
            ]),
            now(),
        )
        .unwrap();

        assert_eq!(update.train_id(), "T1");
        assert_eq!(update.mileage.unwrap().total_mileage_km, 500);
        assert!(update.cleaning.is_none());
        assert_eq!(update.date_errors.len(), 1);
        assert!(matches!(
            &update.date_errors[0],
            RowError::InvalidDate { field, .. } if *field == LAST_CLEANED_DATE
        ));
    }

    #[test]
    fn test_invalid_current_date_falls_back_to_now() {
        let update = TrainProfileUpdate::from_row(
            &row(&[(TRAIN_ID, "T1"), (TRAIN_NAME, "A"), (CURRENT_DATE, "soon")]),
            now(),
        )
        .unwrap();

        assert_eq!(update.train.current_date, now());
        assert_eq!(
            update.date_errors,
            vec![RowError::InvalidDate {
                field: CURRENT_DATE,
                value: "soon".to_string(),
            }]
        );
    }

    #[test]
    fn test_operations_without_status() {
        let update = TrainProfileUpdate::from_row(
            &row(&[(TRAIN_ID, "T1"), (TRAIN_NAME, "A"), (RANK, "3"), (RL_PRIORITY, "x")]),
            now(),
        )
        .unwrap();

        let ops = update.operations.unwrap();
        assert_eq!(ops.operational_status, None);
        assert_eq!(ops.rank, Some(3));
        assert_eq!(ops.rl_priority, None);

        let created = ops.merged_onto(None);
        assert_eq!(created.operational_status.as_deref(), Some(DEFAULT_OPERATIONAL_STATUS));

        let existing = Operations {
            operational_status: Some("maintenance".to_string()),
            reason_for_status: None,
            rank: None,
            score: None,
            rl_priority: None,
        };
        let updated = ops.merged_onto(Some(&existing));
        assert_eq!(updated.operational_status.as_deref(), Some("maintenance"));
        assert_eq!(updated.rank, Some(3));
    }
}
