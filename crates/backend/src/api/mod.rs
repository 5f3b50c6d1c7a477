use std::sync::Arc;

use asphalt_shared::bounds::{BoundsError, ViewportBounds};
use asphalt_shared::models::HazardRecord;
use asphalt_shared::submission::{
    self, SubmissionError, SubmissionReceipt, FIELD_BOXES, FIELD_IMAGE, FIELD_LATITUDE,
    FIELD_LONGITUDE, FIELD_SPEED_LIMIT,
};
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::storage::{Storage, StoredHazard};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Bounds(#[from] BoundsError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("malformed multipart body: {0}")]
    Multipart(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Bounds(_) | ApiError::Submission(_) | ApiError::Multipart(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "rejected request");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct BoundsQuery {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// `GET /dangers?north=..&south=..&east=..&west=..`
pub async fn list_dangers(
    State(storage): State<Arc<Storage>>,
    Query(q): Query<BoundsQuery>,
) -> Result<Json<Vec<HazardRecord>>, ApiError> {
    let bounds = ViewportBounds::new(q.north, q.south, q.east, q.west)?;
    let hazards = storage.hazards_within(&bounds).map_err(ApiError::Storage)?;
    tracing::debug!(%bounds, count = hazards.len(), "served hazards");
    Ok(Json(hazards.into_iter().map(HazardRecord::from).collect()))
}

/// Raw multipart fields of a submission, before validation.
#[derive(Debug, Default)]
pub struct SubmissionForm {
    pub image: Option<Vec<u8>>,
    pub boxes: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub speed_limit: Option<String>,
}

/// `POST /dangers`
pub async fn submit_danger(
    State(storage): State<Arc<Storage>>,
    mut multipart: Multipart,
) -> Result<Json<SubmissionReceipt>, ApiError> {
    let mut form = SubmissionForm::default();
    let multipart_err = |e: axum::extract::multipart::MultipartError| ApiError::Multipart(e.to_string());

    while let Some(field) = multipart.next_field().await.map_err(multipart_err)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FIELD_IMAGE => form.image = Some(field.bytes().await.map_err(multipart_err)?.to_vec()),
            FIELD_BOXES => form.boxes = Some(field.text().await.map_err(multipart_err)?),
            FIELD_LATITUDE => form.latitude = Some(field.text().await.map_err(multipart_err)?),
            FIELD_LONGITUDE => form.longitude = Some(field.text().await.map_err(multipart_err)?),
            FIELD_SPEED_LIMIT => {
                form.speed_limit = Some(field.text().await.map_err(multipart_err)?)
            }
            _ => tracing::debug!(field = %name, "ignoring unknown form field"),
        }
    }

    accept_submission(&storage, form).map(Json)
}

/// Validate a submission and store it when it carries at least one detection.
/// The photo itself is only checked, never kept.
pub fn accept_submission(
    storage: &Storage,
    form: SubmissionForm,
) -> Result<SubmissionReceipt, ApiError> {
    let image = form
        .image
        .ok_or(SubmissionError::MissingField(FIELD_IMAGE))?;
    submission::check_jpeg(&image)?;

    let latitude = form
        .latitude
        .ok_or(SubmissionError::MissingField(FIELD_LATITUDE))?;
    let longitude = form
        .longitude
        .ok_or(SubmissionError::MissingField(FIELD_LONGITUDE))?;
    let position = submission::parse_position(&latitude, &longitude)?;

    let boxes = form
        .boxes
        .ok_or(SubmissionError::MissingField(FIELD_BOXES))?;
    let boxes = submission::parse_boxes(&boxes)?;

    if boxes.is_empty() {
        tracing::info!(%position, "submission without detections, nothing stored");
        return Ok(SubmissionReceipt {
            detections: 0,
            id: None,
        });
    }

    let hazard = StoredHazard {
        id: Uuid::new_v4(),
        latitude: position.lat,
        longitude: position.lng,
        severity: submission::severity_for_speed_limit(form.speed_limit.as_deref()),
        detections: boxes.len(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    storage.save_hazard(&hazard).map_err(ApiError::Storage)?;
    tracing::info!(
        id = %hazard.id,
        %position,
        severity = %hazard.severity,
        detections = hazard.detections,
        "stored hazard"
    );

    Ok(SubmissionReceipt {
        detections: hazard.detections,
        id: Some(hazard.id.to_string()),
    })
}
