use serde::{Deserialize, Serialize};

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }

    /// True when both coordinates are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
        }
    }
}

/// Severity exactly as the hazard feed sends it: a level number or a label.
/// Numbers that arrive in float form (`2.0`, `2.5`) land in `Decimal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSeverity {
    Level(i64),
    Decimal(f64),
    Label(String),
}

impl std::fmt::Display for RawSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawSeverity::Level(n) => write!(f, "{}", n),
            RawSeverity::Decimal(n) => write!(f, "{}", n),
            RawSeverity::Label(s) => write!(f, "{:?}", s),
        }
    }
}

/// A hazard as returned by `GET /dangers`. The feed is not required to send an `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub severity: RawSeverity,
}

impl HazardRecord {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

/// Identity of a marker within the registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarkerId(String);

impl MarkerId {
    pub fn new(id: impl Into<String>) -> Self {
        MarkerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MarkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MarkerId {
    fn from(s: &str) -> Self {
        MarkerId(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardMarker {
    pub id: MarkerId,
    pub position: LatLng,
    pub severity: Severity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn test_record_deserializes_numeric_severity() {
        let json = r#"{"latitude":42.69,"longitude":23.31,"severity":2}"#;
        let rec: HazardRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.severity, RawSeverity::Level(2));
        assert!(rec.id.is_none());
    }

    #[test]
    fn test_record_deserializes_label_severity_and_id() {
        let json = r#"{"id":"abc","latitude":42.69,"longitude":23.31,"severity":"Low"}"#;
        let rec: HazardRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.severity, RawSeverity::Label("Low".to_string()));
        assert_eq!(rec.id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_record_serialization_omits_missing_id() {
        let rec = HazardRecord {
            id: None,
            latitude: 1.0,
            longitude: 2.0,
            severity: RawSeverity::Label("High".to_string()),
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["severity"], "High");
    }

    #[test]
    fn test_latlng_validity() {
        assert!(LatLng::new(42.0, 23.0).is_valid());
        assert!(!LatLng::new(91.0, 23.0).is_valid());
        assert!(!LatLng::new(42.0, f64::NAN).is_valid());
        assert!(!LatLng::new(42.0, 181.0).is_valid());
    }
}
