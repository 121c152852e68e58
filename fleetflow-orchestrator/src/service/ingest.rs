//! Record Upserter
//!
//! Turns CSV bytes into train store upserts, one row at a time, reporting
//! progress into the upload registry. A bad row is recorded and skipped; only
//! an unreadable file fails the whole job.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleetflow_core::domain::train::{RowError, TrainProfileUpdate};
use fleetflow_core::dto::upload::{IngestReport, UploadResults, UploadStatus};
use fleetflow_core::normalize::{CsvError, NormalizedRow, normalize_rows, parse_csv};
use thiserror::Error;

use crate::repository::train::{StoreError, TrainStore};
use crate::service::upload::UploadRegistry;

/// Number of normalized rows exposed in a job's results
pub const PREVIEW_ROWS: usize = 25;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Csv(#[from] CsvError),
}

/// Why a single row was not applied
#[derive(Debug, Error)]
enum RowFailure {
    #[error(transparent)]
    Row(#[from] RowError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Ingestor {
    store: Arc<dyn TrainStore>,
    uploads: UploadRegistry,
}

impl Ingestor {
    pub fn new(store: Arc<dyn TrainStore>, uploads: UploadRegistry) -> Self {
        Self { store, uploads }
    }

    pub fn uploads(&self) -> &UploadRegistry {
        &self.uploads
    }

    /// Run a registered job to completion and return its final state
    ///
    /// Never fails: errors end up in the job's `failed` status.
    pub async fn run_job(&self, job_id: &str, data: &[u8]) -> UploadStatus {
        match self.process(job_id, data).await {
            Ok(results) => {
                let report = results.report.as_ref();
                tracing::info!(
                    "Ingestion job {} completed: {} train(s), {} error(s)",
                    job_id,
                    report.map_or(0, |r| r.trains),
                    report.map_or(0, |r| r.errors.len())
                );
                self.uploads.complete(job_id, results)
            }
            Err(e) => {
                tracing::error!("Ingestion job {} failed: {}", job_id, e);
                self.uploads.fail(job_id, e.to_string())
            }
        }
    }

    async fn process(&self, job_id: &str, data: &[u8]) -> Result<UploadResults, IngestError> {
        let raw = parse_csv(data)?;
        self.uploads
            .set_progress(job_id, 40, format!("Parsed {} rows from CSV", raw.len()));

        let rows = normalize_rows(&raw);
        let mut results = UploadResults {
            parsed_count: rows.len(),
            parsed_preview: rows.iter().take(PREVIEW_ROWS).cloned().collect(),
            report: None,
        };
        self.uploads.set_results(job_id, results.clone());

        results.report = Some(self.ingest_rows(job_id, &rows).await);
        Ok(results)
    }

    /// Apply normalized rows in source order
    pub async fn ingest_rows(&self, job_id: &str, rows: &[NormalizedRow]) -> IngestReport {
        let mut ordered: Vec<&NormalizedRow> = rows.iter().collect();
        ordered.sort_by_key(|r| r.row_index);

        let total = ordered.len();
        let now = Utc::now();
        let mut report = IngestReport {
            parsed_rows: total,
            ..Default::default()
        };

        for (i, row) in ordered.into_iter().enumerate() {
            match self.apply_row(i + 1, row, now, &mut report).await {
                Ok(()) => {}
                Err(RowFailure::Row(RowError::MissingTrainFields)) => {
                    report.skipped_missing_train_fields += 1;
                    report
                        .errors
                        .push(format!("Row {}: {}", i + 1, RowError::MissingTrainFields));
                }
                Err(e) => {
                    tracing::warn!("Row {} of job {} failed: {}", i + 1, job_id, e);
                    report.errors.push(format!("Row {}: {}", i + 1, e));
                }
            }

            let progress = 25 + (i * 70 / total) as u8;
            self.uploads.set_progress(
                job_id,
                progress,
                format!("Processing row {} of {}", i + 1, total),
            );
        }

        self.uploads
            .set_progress(job_id, 95, "Finalizing data insertion...");
        report
    }

    /// Upsert the train and every sub-profile whose dates parsed
    ///
    /// Date errors are reported per field; only a store failure stops the row.
    async fn apply_row(
        &self,
        number: usize,
        row: &NormalizedRow,
        now: DateTime<Utc>,
        report: &mut IngestReport,
    ) -> Result<(), RowFailure> {
        let update = TrainProfileUpdate::from_row(row, now)?;
        let id = update.train_id();

        for e in &update.date_errors {
            tracing::warn!("Row {} for train {}: {}", number, id, e);
            report.errors.push(format!("Row {}: {}", number, e));
        }

        self.store.upsert_train(&update.train).await?;
        report.trains += 1;

        if let Some(record) = &update.fitness {
            self.store.upsert_fitness(id, record).await?;
            report.fitness += 1;
        }
        if let Some(record) = &update.job_card {
            self.store.upsert_job_card(id, record).await?;
            report.job_cards += 1;
        }
        if let Some(record) = &update.branding {
            self.store.upsert_branding(id, record).await?;
            report.branding += 1;
        }
        if let Some(record) = &update.mileage {
            self.store.upsert_mileage(id, record).await?;
            report.mileage += 1;
        }
        if let Some(record) = &update.cleaning {
            self.store.upsert_cleaning(id, record).await?;
            report.cleaning += 1;
        }
        if let Some(record) = &update.stabling {
            self.store.upsert_stabling(id, record).await?;
            report.stabling += 1;
        }
        if let Some(record) = &update.operations {
            self.store.upsert_operations(id, record).await?;
            report.operations += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::train::InMemoryTrainStore;
    use fleetflow_core::dto::upload::UploadState;

    fn ingestor() -> (Ingestor, InMemoryTrainStore) {
        let store = InMemoryTrainStore::new();
        let ingestor = Ingestor::new(Arc::new(store.clone()), UploadRegistry::new());
        (ingestor, store)
    }

    #[tokio::test]
    async fn test_full_profile_row() {
        let (ingestor, store) = ingestor();
        ingestor.uploads().create("job", "processing");

        let csv = "Train ID;Train Name;Rolling Stock Fitness Status;Total Mileage KM;Rank\n\
                   T-1;Alpha;yes;1200;3\n";
        let status = ingestor.run_job("job", csv.as_bytes()).await;

        assert_eq!(status.status, UploadState::Completed);
        let results = status.results.unwrap();
        assert_eq!(results.parsed_count, 1);
        assert_eq!(results.parsed_preview[0].get("trainID"), Some("T-1"));

        let report = results.report.unwrap();
        assert_eq!(report.trains, 1);
        assert_eq!(report.fitness, 1);
        assert_eq!(report.mileage, 1);
        assert_eq!(report.operations, 1);
        assert_eq!(report.cleaning, 0);
        assert!(report.errors.is_empty());

        let profile = store.get_profile("T-1").await.unwrap().unwrap();
        assert!(profile.fitness.unwrap().rolling_stock_fitness_status);
        assert_eq!(
            profile.operations.unwrap().operational_status.as_deref(),
            Some("in_service")
        );
    }

    #[tokio::test]
    async fn test_rows_missing_identity_are_skipped() {
        let (ingestor, store) = ingestor();
        ingestor.uploads().create("job", "processing");

        let csv = "trainId,trainname,totalMileageKM\n,,500\nT-2,Beta,10\n";
        let status = ingestor.run_job("job", csv.as_bytes()).await;

        let report = status.results.unwrap().report.unwrap();
        assert_eq!(report.parsed_rows, 2);
        assert_eq!(report.skipped_missing_train_fields, 1);
        assert_eq!(report.trains, 1);
        assert_eq!(
            report.errors,
            vec!["Row 1: missing trainname/trainID after normalization".to_string()]
        );
        assert_eq!(store.count_trains().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bad_date_skips_only_its_profile() {
        let (ingestor, store) = ingestor();
        ingestor.uploads().create("job", "processing");

        let csv = "trainID,trainname,Total Mileage KM,Cleaning Required,Last Cleaned Date\n\
                   T-9,Nine,500,yes,someday\n";
        let status = ingestor.run_job("job", csv.as_bytes()).await;

        assert_eq!(status.status, UploadState::Completed);
        let report = status.results.unwrap().report.unwrap();
        assert_eq!(report.trains, 1);
        assert_eq!(report.mileage, 1);
        assert_eq!(report.cleaning, 0);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Row 1: invalid date in lastCleanedDate"));

        let profile = store.get_profile("T-9").await.unwrap().unwrap();
        assert_eq!(profile.train.trainname, "Nine");
        assert_eq!(profile.mileage.unwrap().total_mileage_km, 500);
        assert!(profile.cleaning.is_none());
    }

    #[tokio::test]
    async fn test_bad_current_date_still_stores_train() {
        let (ingestor, store) = ingestor();
        ingestor.uploads().create("job", "processing");

        let csv = "trainID,trainname,Current Date\nT-4,Delta,not a date\n";
        let report = ingestor
            .run_job("job", csv.as_bytes())
            .await
            .results
            .unwrap()
            .report
            .unwrap();

        assert_eq!(report.trains, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Row 1: invalid date in current_date"));
        assert_eq!(store.count_trains().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_job_message_has_single_prefix() {
        let (ingestor, _store) = ingestor();
        ingestor.uploads().create("job", "processing");

        let status = ingestor.run_job("job", b"").await;
        let message = status.message.unwrap();
        assert_eq!(message, CsvError::MissingHeader.to_string());
        assert_eq!(message.matches("CSV").count(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_file_fails_job() {
        let (ingestor, _store) = ingestor();
        ingestor.uploads().create("job", "processing");

        let status = ingestor.run_job("job", b"").await;
        assert_eq!(status.status, UploadState::Failed);
        assert_eq!(
            ingestor.uploads().get("job").unwrap().status,
            UploadState::Failed
        );
    }

    #[tokio::test]
    async fn test_progress_ends_at_finalizing() {
        let (ingestor, _store) = ingestor();
        ingestor.uploads().create("job", "processing");

        let mut row = NormalizedRow::new(0);
        row.insert("trainID", "T1");
        row.insert("trainname", "A");
        ingestor.ingest_rows("job", &[row]).await;

        let job = ingestor.uploads().get("job").unwrap();
        assert_eq!(job.progress, Some(95));
        assert_eq!(job.message.as_deref(), Some("Finalizing data insertion..."));
    }
}
