//! Hazard photo submissions (`POST /dangers`).
//!
//! Boxes are in pixel units of a fixed 640×480 reference frame, whatever the
//! size of the uploaded photo.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{LatLng, RawSeverity};

pub const FRAME_WIDTH_PX: f64 = 640.0;
pub const FRAME_HEIGHT_PX: f64 = 480.0;

pub const FIELD_IMAGE: &str = "image";
pub const FIELD_BOXES: &str = "boxes";
pub const FIELD_LATITUDE: &str = "latitude";
pub const FIELD_LONGITUDE: &str = "longitude";
pub const FIELD_SPEED_LIMIT: &str = "speed_limit";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmissionError {
    #[error("missing form field `{0}`")]
    MissingField(&'static str),
    #[error("image is empty")]
    EmptyImage,
    #[error("image is not a JPEG")]
    NotJpeg,
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),
    #[error("invalid boxes: {0}")]
    InvalidBoxes(String),
    #[error("box {index} lies outside the 640x480 frame")]
    BoxOutOfFrame { index: usize },
}

/// One annotated detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub class: u32,
    pub x_center: f64,
    pub y_center: f64,
    pub w: f64,
    pub h: f64,
}

impl BoundingBox {
    /// Positive size and fully inside the reference frame.
    pub fn is_within_frame(&self) -> bool {
        let values = [self.x_center, self.y_center, self.w, self.h];
        if !values.iter().all(|v| v.is_finite()) || self.w <= 0.0 || self.h <= 0.0 {
            return false;
        }
        let left = self.x_center - self.w / 2.0;
        let right = self.x_center + self.w / 2.0;
        let top = self.y_center - self.h / 2.0;
        let bottom = self.y_center + self.h / 2.0;
        left >= 0.0 && top >= 0.0 && right <= FRAME_WIDTH_PX && bottom <= FRAME_HEIGHT_PX
    }
}

/// Parse and validate the `boxes` form field.
pub fn parse_boxes(json: &str) -> Result<Vec<BoundingBox>, SubmissionError> {
    let boxes: Vec<BoundingBox> =
        serde_json::from_str(json).map_err(|e| SubmissionError::InvalidBoxes(e.to_string()))?;
    if let Some(index) = boxes.iter().position(|b| !b.is_within_frame()) {
        return Err(SubmissionError::BoxOutOfFrame { index });
    }
    Ok(boxes)
}

pub fn parse_position(latitude: &str, longitude: &str) -> Result<LatLng, SubmissionError> {
    let lat: f64 = latitude
        .trim()
        .parse()
        .map_err(|_| SubmissionError::InvalidCoordinates(format!("latitude {:?}", latitude)))?;
    let lng: f64 = longitude
        .trim()
        .parse()
        .map_err(|_| SubmissionError::InvalidCoordinates(format!("longitude {:?}", longitude)))?;
    let position = LatLng::new(lat, lng);
    if !position.is_valid() {
        return Err(SubmissionError::InvalidCoordinates(position.to_string()));
    }
    Ok(position)
}

/// JPEG files start with an SOI marker followed by another marker.
pub fn check_jpeg(bytes: &[u8]) -> Result<(), SubmissionError> {
    if bytes.is_empty() {
        return Err(SubmissionError::EmptyImage);
    }
    if bytes.len() < 3 || bytes[..3] != [0xFF, 0xD8, 0xFF] {
        return Err(SubmissionError::NotJpeg);
    }
    Ok(())
}

/// Severity label stored for a new hazard, from the road's speed limit.
/// Slow streets are low severity, anything faster is high, and a missing
/// limit is stored as "Unknown".
pub fn severity_for_speed_limit(speed_limit: Option<&str>) -> RawSeverity {
    let label = match speed_limit.map(str::trim) {
        None | Some("") | Some("Unknown") => "Unknown",
        Some("20 km/h") | Some("30 km/h") => "Low",
        Some(_) => "High",
    };
    RawSeverity::Label(label.to_string())
}

/// Body of a successful `POST /dangers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub detections: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}
