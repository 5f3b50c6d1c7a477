//! Raw feed records → hazard markers.
//!
//! Marker ids come from the feed's `id` when it sends one, otherwise from the
//! position rounded to `precision` decimals. Ids repeated within one batch get
//! an occurrence suffix (`#1`, `#2`, ...) in feed order, skipping any suffix
//! already taken by another record, so every id in the output is unique.
use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::models::{HazardMarker, HazardRecord, LatLng, MarkerId, RawSeverity, Severity};

/// Six decimals is roughly 0.1 m of latitude.
pub const DEFAULT_ID_PRECISION: u32 = 6;

/// Beyond this the rounding scale stops being meaningful for f64 degrees.
pub const MAX_ID_PRECISION: u32 = 12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("unknown severity {0}")]
    UnknownSeverity(RawSeverity),
}

/// Levels 1..=3 (whole floats such as `2.0` included) and the labels
/// low/medium/high (any case). Everything else, including the feed's "Unknown"
/// label, is rejected.
pub fn severity_from_raw(raw: &RawSeverity) -> Result<Severity, NormalizeError> {
    match raw {
        RawSeverity::Level(1) => Ok(Severity::Low),
        RawSeverity::Level(2) => Ok(Severity::Medium),
        RawSeverity::Level(3) => Ok(Severity::High),
        RawSeverity::Label(label) => match label.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(NormalizeError::UnknownSeverity(raw.clone())),
        },
        RawSeverity::Decimal(v) if v.fract() == 0.0 && (1.0..=3.0).contains(v) => {
            severity_from_raw(&RawSeverity::Level(*v as i64))
        }
        RawSeverity::Level(_) | RawSeverity::Decimal(_) => {
            Err(NormalizeError::UnknownSeverity(raw.clone()))
        }
    }
}

/// Stable key for a position, e.g. `"42.684928,23.316489"`. Precision is
/// capped at [`MAX_ID_PRECISION`].
pub fn position_key(position: LatLng, precision: u32) -> String {
    let precision = precision.min(MAX_ID_PRECISION);
    let scale = 10f64.powi(precision as i32);
    // + 0.0 folds -0.0 into 0.0
    let lat = (position.lat * scale).round() / scale + 0.0;
    let lng = (position.lng * scale).round() / scale + 0.0;
    let p = precision as usize;
    format!("{:.*},{:.*}", p, lat, p, lng)
}

#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    precision: u32,
}

impl Default for Normalizer {
    fn default() -> Self {
        Normalizer::new(DEFAULT_ID_PRECISION)
    }
}

impl Normalizer {
    pub fn new(precision: u32) -> Self {
        Normalizer {
            precision: precision.min(MAX_ID_PRECISION),
        }
    }

    fn base_id(&self, record: &HazardRecord) -> String {
        match record.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => position_key(record.position(), self.precision),
        }
    }

    /// Normalize a whole batch. Records that fail are logged and dropped.
    pub fn normalize(&self, raw: &[HazardRecord]) -> Vec<HazardMarker> {
        let mut emitted: HashSet<String> = HashSet::new();
        let mut next_suffix: HashMap<String, usize> = HashMap::new();
        let mut markers = Vec::with_capacity(raw.len());

        for (index, record) in raw.iter().enumerate() {
            let severity = match severity_from_raw(&record.severity) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(index, error = %e, "dropping hazard record");
                    continue;
                }
            };

            // Server ids, position keys and generated suffixes share one
            // namespace; count up the suffix until the candidate is free.
            let base = self.base_id(record);
            let mut id = base.clone();
            if emitted.contains(&id) {
                let n = next_suffix.entry(base.clone()).or_insert(1);
                loop {
                    id = format!("{}#{}", base, n);
                    *n += 1;
                    if !emitted.contains(&id) {
                        break;
                    }
                }
            }
            emitted.insert(id.clone());

            markers.push(HazardMarker {
                id: MarkerId::new(id),
                position: record.position(),
                severity,
            });
        }

        markers
    }
}

pub fn normalize(raw: &[HazardRecord]) -> Vec<HazardMarker> {
    Normalizer::default().normalize(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(lat: f64, lng: f64, severity: RawSeverity) -> HazardRecord {
        HazardRecord {
            id: None,
            latitude: lat,
            longitude: lng,
            severity,
        }
    }

    fn label(s: &str) -> RawSeverity {
        RawSeverity::Label(s.to_string())
    }

    #[test]
    fn test_severity_levels() {
        assert_eq!(severity_from_raw(&RawSeverity::Level(1)), Ok(Severity::Low));
        assert_eq!(severity_from_raw(&RawSeverity::Level(2)), Ok(Severity::Medium));
        assert_eq!(severity_from_raw(&RawSeverity::Level(3)), Ok(Severity::High));
        assert!(severity_from_raw(&RawSeverity::Level(0)).is_err());
        assert!(severity_from_raw(&RawSeverity::Level(4)).is_err());
    }

    #[test]
    fn test_severity_labels_case_insensitive() {
        assert_eq!(severity_from_raw(&label("Low")), Ok(Severity::Low));
        assert_eq!(severity_from_raw(&label(" MEDIUM ")), Ok(Severity::Medium));
        assert_eq!(severity_from_raw(&label("high")), Ok(Severity::High));
    }

    #[test]
    fn test_unknown_label_is_typed_error() {
        assert_eq!(
            severity_from_raw(&label("Unknown")),
            Err(NormalizeError::UnknownSeverity(label("Unknown")))
        );
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn test_unknown_severity_drops_only_that_record() {
        let raw = vec![
            record(42.1, 23.1, label("Low")),
            record(42.2, 23.2, label("Catastrophic")),
            record(42.3, 23.3, RawSeverity::Level(3)),
        ];
        let markers = normalize(&raw);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].severity, Severity::Low);
        assert_eq!(markers[1].severity, Severity::High);
        assert_eq!(markers[1].position, LatLng::new(42.3, 23.3));
    }

    #[test]
    fn test_position_copied_verbatim() {
        let raw = vec![record(42.684928123, 23.316489987, label("Low"))];
        let markers = normalize(&raw);
        assert_eq!(markers[0].position.lat, 42.684928123);
        assert_eq!(markers[0].position.lng, 23.316489987);
    }

    #[test]
    fn test_position_key_rounding() {
        assert_eq!(
            position_key(LatLng::new(42.6849284, 23.3164886), 6),
            "42.684928,23.316489"
        );
        assert_eq!(position_key(LatLng::new(-0.0000001, 0.0), 6), "0.000000,0.000000");
    }

    #[test]
    fn test_ids_stable_across_batch_order() {
        let a = record(42.1, 23.1, label("Low"));
        let b = record(42.2, 23.2, label("High"));
        let first = normalize(&[a.clone(), b.clone()]);
        let second = normalize(&[b, a]);
        assert_eq!(first[0].id, second[1].id);
        assert_eq!(first[1].id, second[0].id);
    }

    #[test]
    fn test_server_id_preferred() {
        let mut rec = record(42.1, 23.1, label("Low"));
        rec.id = Some("pothole-7".to_string());
        let markers = normalize(&[rec]);
        assert_eq!(markers[0].id.as_str(), "pothole-7");
    }

    #[test]
    fn test_blank_server_id_falls_back_to_position() {
        let mut rec = record(42.1, 23.1, label("Low"));
        rec.id = Some("  ".to_string());
        let markers = normalize(&[rec]);
        assert_eq!(markers[0].id.as_str(), "42.100000,23.100000");
    }

    #[test]
    fn test_duplicate_positions_get_suffixes() {
        let raw = vec![
            record(42.1, 23.1, label("Low")),
            record(42.1, 23.1, label("High")),
            record(42.1, 23.1, label("Medium")),
        ];
        let ids: Vec<String> = normalize(&raw)
            .into_iter()
            .map(|m| m.id.to_string())
            .collect();
        assert_eq!(
            ids,
            vec![
                "42.100000,23.100000",
                "42.100000,23.100000#1",
                "42.100000,23.100000#2"
            ]
        );
    }

    #[test]
    fn test_custom_precision() {
        let markers = Normalizer::new(2).normalize(&[record(42.126, 23.1, label("low"))]);
        assert_eq!(markers[0].id.as_str(), "42.13,23.10");
    }

    fn with_id(id: &str) -> HazardRecord {
        HazardRecord {
            id: Some(id.to_string()),
            ..record(42.1, 23.1, label("Low"))
        }
    }

    fn ids_of(raw: &[HazardRecord]) -> Vec<String> {
        normalize(raw).into_iter().map(|m| m.id.to_string()).collect()
    }

    #[test]
    fn test_suffix_never_reuses_literal_id() {
        let ids = ids_of(&[with_id("X"), with_id("X"), with_id("X#1")]);
        assert_eq!(ids, vec!["X", "X#1", "X#1#1"]);
    }

    #[test]
    fn test_literal_id_seen_first_pushes_suffix_along() {
        let ids = ids_of(&[with_id("X#1"), with_id("X"), with_id("X")]);
        assert_eq!(ids, vec!["X#1", "X", "X#2"]);
    }

    #[test]
    fn test_server_id_equal_to_position_key_stays_unique() {
        let raw = vec![
            with_id("42.100000,23.100000"),
            record(42.1, 23.1, label("High")),
        ];
        let ids = ids_of(&raw);
        assert_eq!(ids, vec!["42.100000,23.100000", "42.100000,23.100000#1"]);
    }

    #[test]
    fn test_ids_unique_in_mixed_batch() {
        let raw = vec![
            with_id("A"),
            with_id("A#2"),
            with_id("A"),
            with_id("A"),
            with_id("A#1"),
        ];
        let ids = ids_of(&raw);
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), raw.len());
    }

    #[test]
    fn test_whole_float_severity_levels() {
        assert_eq!(severity_from_raw(&RawSeverity::Decimal(1.0)), Ok(Severity::Low));
        assert_eq!(severity_from_raw(&RawSeverity::Decimal(2.0)), Ok(Severity::Medium));
        assert_eq!(severity_from_raw(&RawSeverity::Decimal(3.0)), Ok(Severity::High));
        assert!(severity_from_raw(&RawSeverity::Decimal(2.5)).is_err());
        assert!(severity_from_raw(&RawSeverity::Decimal(4.0)).is_err());
        assert!(severity_from_raw(&RawSeverity::Decimal(f64::NAN)).is_err());
    }

    #[test]
    fn test_float_severities_decode_and_normalize_per_record() {
        let json = r#"[
            {"latitude": 42.1, "longitude": 23.1, "severity": 2.0},
            {"latitude": 42.2, "longitude": 23.2, "severity": 2.5},
            {"latitude": 42.3, "longitude": 23.3, "severity": 3}
        ]"#;
        let raw: Vec<HazardRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(raw[0].severity, RawSeverity::Decimal(2.0));
        assert_eq!(raw[2].severity, RawSeverity::Level(3));

        let markers = normalize(&raw);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].severity, Severity::Medium);
        assert_eq!(markers[1].severity, Severity::High);
    }

    #[test]
    fn test_large_precision_is_capped() {
        let key = position_key(LatLng::new(42.1, 23.1), 400);
        assert!(!key.contains("NaN"));
        assert_eq!(key, position_key(LatLng::new(42.1, 23.1), MAX_ID_PRECISION));

        let markers = Normalizer::new(u32::MAX).normalize(&[
            record(42.1, 23.1, label("Low")),
            record(42.2, 23.2, label("Low")),
        ]);
        assert_ne!(markers[0].id, markers[1].id);
        assert!(!markers[0].id.as_str().contains('#'));
    }
}
