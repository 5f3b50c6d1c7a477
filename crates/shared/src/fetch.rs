//! Viewport queries against the hazard feed.
//!
//! Every query is tagged with a [`FetchGeneration`] when it is issued. Only the
//! response carrying the newest generation may be reconciled; anything older
//! is stale and gets dropped. Requests are never cancelled.
use std::future::Future;

use thiserror::Error;

use crate::bounds::ViewportBounds;
use crate::models::HazardRecord;

pub const DANGERS_PATH: &str = "/dangers";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("hazard feed returned HTTP {0}")]
    HttpStatus(u16),
    #[error("malformed hazard payload: {0}")]
    MalformedPayload(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchGeneration(u64);

impl FetchGeneration {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for FetchGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Hands out generations and answers whether a response is still current.
#[derive(Debug, Default)]
pub struct GenerationTracker {
    latest: u64,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// First generation is 1.
    pub fn issue(&mut self) -> FetchGeneration {
        self.latest += 1;
        FetchGeneration(self.latest)
    }

    pub fn latest(&self) -> Option<FetchGeneration> {
        (self.latest > 0).then_some(FetchGeneration(self.latest))
    }

    pub fn is_current(&self, generation: FetchGeneration) -> bool {
        generation.0 == self.latest
    }
}

/// Something that can answer a viewport query asynchronously.
pub trait HazardSource {
    fn fetch(
        &self,
        bounds: ViewportBounds,
    ) -> impl Future<Output = Result<Vec<HazardRecord>, FetchError>>;
}

/// A query that has been issued a generation but not yet sent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchTicket {
    pub generation: FetchGeneration,
    pub bounds: ViewportBounds,
}

impl FetchTicket {
    pub async fn execute<S: HazardSource>(self, source: &S) -> FetchCompletion {
        let result = source.fetch(self.bounds).await;
        FetchCompletion {
            generation: self.generation,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchCompletion {
    pub generation: FetchGeneration,
    pub result: Result<Vec<HazardRecord>, FetchError>,
}

/// `{base}/dangers?north=..&south=..&east=..&west=..`
pub fn query_url(base: &str, bounds: &ViewportBounds) -> String {
    format!(
        "{}{}?{}",
        base.trim_end_matches('/'),
        DANGERS_PATH,
        bounds.query_string()
    )
}

/// Interpret an HTTP response from the feed.
///
/// The body must be a JSON array. Array elements that do not decode as a
/// [`HazardRecord`] are logged and skipped; the rest of the batch survives.
pub fn decode_response(status: u16, body: &str) -> Result<Vec<HazardRecord>, FetchError> {
    if !(200..300).contains(&status) {
        return Err(FetchError::HttpStatus(status));
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FetchError::MalformedPayload(e.to_string()))?;
    let serde_json::Value::Array(items) = value else {
        return Err(FetchError::MalformedPayload(
            "expected a JSON array".to_string(),
        ));
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<HazardRecord>(item) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(index, error = %e, "skipping undecodable hazard record"),
        }
    }
    Ok(records)
}
