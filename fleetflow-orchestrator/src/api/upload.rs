//! Upload API Handlers
//!
//! CSV ingestion jobs: accept a file, ingest it in the background and expose
//! the job's progress for polling.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Path, Request, State, multipart::MultipartError},
    http::{StatusCode, header::CONTENT_TYPE},
};
use fleetflow_core::dto::upload::{UploadAccepted, UploadStatus};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::upload_service::UploadRegistry;

/// A file part of a multipart form
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    /// Accept by `.csv` extension or a CSV content type
    pub fn looks_like_csv(&self) -> bool {
        let by_name = self
            .file_name
            .as_deref()
            .is_some_and(|n| n.to_ascii_lowercase().ends_with(".csv"));
        let by_type = self
            .content_type
            .as_deref()
            .is_some_and(|t| t.starts_with("text/csv") || t == "application/vnd.ms-excel");
        by_name || by_type
    }
}

/// Parsed multipart form: the first file part plus all text fields
#[derive(Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

/// Read a multipart form, enforcing the upload size limit
pub async fn read_form(mut multipart: Multipart, max_bytes: usize) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let is_file = name == "file" || file_name.is_some();

        if is_file && form.file.is_none() {
            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| multipart_error(e, max_bytes))?;
            if data.len() > max_bytes {
                return Err(too_large(max_bytes));
            }
            form.file = Some(UploadedFile {
                file_name,
                content_type,
                data,
            });
        } else if !is_file {
            let value = field
                .text()
                .await
                .map_err(|e| multipart_error(e, max_bytes))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_bytes)
    } else {
        ApiError::BadRequest(format!("Failed to read multipart data: {}", err.body_text()))
    }
}

fn too_large(max_bytes: usize) -> ApiError {
    ApiError::PayloadTooLarge(format!(
        "File too large. Maximum size is {} bytes",
        max_bytes
    ))
}

/// POST /upload
/// Schedule ingestion of a CSV sent as multipart form or raw body
pub async fn upload_csv(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<UploadAccepted>)> {
    let is_multipart = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let data = if is_multipart {
        let multipart = Multipart::from_request(req, &state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        read_form(multipart, state.max_upload_bytes)
            .await?
            .file
            .map(|f| f.data)
            .unwrap_or_default()
    } else {
        Bytes::from_request(req, &state).await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                too_large(state.max_upload_bytes)
            } else {
                ApiError::BadRequest(e.body_text())
            }
        })?
    };

    if data.is_empty() {
        return Err(ApiError::BadRequest("No file uploaded".to_string()));
    }

    let job_id = UploadRegistry::new_job_id();
    state
        .ingestor
        .uploads()
        .create(&job_id, "File uploaded, processing started");
    tracing::info!("Upload job {} accepted ({} bytes)", job_id, data.len());

    let ingestor = Arc::clone(&state.ingestor);
    let spawned_id = job_id.clone();
    tokio::spawn(async move {
        ingestor.run_job(&spawned_id, &data).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadAccepted {
            message: "File uploaded successfully, processing started".to_string(),
            status_url: format!("/upload-status/{}", job_id),
            job_id,
        }),
    ))
}

/// GET /upload-status/{job_id}
/// Poll an ingestion job
pub async fn upload_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<UploadStatus>> {
    tracing::debug!("Getting upload status: {}", job_id);

    let status = state
        .ingestor
        .uploads()
        .get(&job_id)
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;

    Ok(Json(status))
}
