use std::collections::BTreeMap;

use asphalt_shared::bounds::ViewportBounds;
use asphalt_shared::fetch::{self, FetchError};
use asphalt_shared::models::{HazardMarker, HazardRecord, Severity};
use asphalt_shared::normalize::Normalizer;
use asphalt_shared::submission::{
    self, SubmissionReceipt, FIELD_BOXES, FIELD_IMAGE, FIELD_LATITUDE, FIELD_LONGITUDE,
    FIELD_SPEED_LIMIT,
};

const DEFAULT_URL: &str = "http://localhost:3000";

const USAGE: &str = "Usage:
  asphalt-probe [--url BASE] query --north N --south S --east E --west W
  asphalt-probe [--url BASE] submit --image photo.jpg --lat LAT --lng LNG --boxes JSON|FILE [--speed-limit \"30 km/h\"]";

fn get_arg(flag: &str) -> Option<String> {
    std::env::args().skip_while(|a| a != flag).nth(1)
}

fn require_arg(flag: &str) -> String {
    get_arg(flag).unwrap_or_else(|| {
        eprintln!("Error: {flag} is required");
        eprintln!("{USAGE}");
        std::process::exit(1);
    })
}

fn require_f64(flag: &str) -> f64 {
    let raw = require_arg(flag);
    raw.parse().unwrap_or_else(|_| {
        eprintln!("Error: {flag} expects a number, got {raw:?}");
        std::process::exit(1);
    })
}

fn format_query_report(
    bounds: &ViewportBounds,
    records: &[HazardRecord],
    markers: &[HazardMarker],
) -> String {
    let mut out = String::new();
    out.push_str("=== Viewport ===\n");
    out.push_str(&format!(
        "  North: {}  South: {}\n  East: {}  West: {}\n",
        bounds.north, bounds.south, bounds.east, bounds.west
    ));
    if bounds.crosses_antimeridian() {
        out.push_str("  (crosses the antimeridian)\n");
    }

    let mut by_severity: BTreeMap<Severity, usize> = BTreeMap::new();
    for marker in markers {
        *by_severity.entry(marker.severity).or_default() += 1;
    }

    out.push_str("\n=== Hazards ===\n");
    out.push_str(&format!("  Records received: {}\n", records.len()));
    out.push_str(&format!("  Markers:          {}\n", markers.len()));
    out.push_str(&format!(
        "  Dropped:          {}\n",
        records.len().saturating_sub(markers.len())
    ));
    for severity in [Severity::High, Severity::Medium, Severity::Low] {
        out.push_str(&format!(
            "  {:<7} {}\n",
            format!("{severity}:"),
            by_severity.get(&severity).copied().unwrap_or(0)
        ));
    }

    if !markers.is_empty() {
        out.push_str("\n=== Markers ===\n");
        for marker in markers {
            out.push_str(&format!(
                "  {} {} [{}]\n",
                marker.id, marker.position, marker.severity
            ));
        }
    }
    out
}

fn format_receipt(receipt: &SubmissionReceipt) -> String {
    match &receipt.id {
        Some(id) => format!(
            "Stored hazard {id} ({} detection{})\n",
            receipt.detections,
            if receipt.detections == 1 { "" } else { "s" }
        ),
        None => "No detections in submission, nothing stored\n".to_string(),
    }
}

fn run_query(client: &reqwest::blocking::Client, base: &str) {
    let bounds = ViewportBounds::new(
        require_f64("--north"),
        require_f64("--south"),
        require_f64("--east"),
        require_f64("--west"),
    )
    .unwrap_or_else(|e| {
        eprintln!("Invalid bounds: {e}");
        std::process::exit(1);
    });

    let url = fetch::query_url(base, &bounds);
    eprintln!("Fetching hazards from {url}...");

    let result = client
        .get(&url)
        .send()
        .map_err(|e| FetchError::Network(e.to_string()))
        .and_then(|resp| {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .map_err(|e| FetchError::Network(e.to_string()))?;
            fetch::decode_response(status, &body)
        });

    let records = result.unwrap_or_else(|e| {
        eprintln!("Failed to fetch hazards: {e}");
        std::process::exit(1);
    });
    let markers = Normalizer::default().normalize(&records);
    print!("{}", format_query_report(&bounds, &records, &markers));
}

/// `--boxes` is inline JSON when it looks like an array, otherwise a path.
fn load_boxes(arg: &str) -> Result<String, String> {
    if arg.trim_start().starts_with('[') {
        return Ok(arg.to_string());
    }
    std::fs::read_to_string(arg).map_err(|e| format!("Failed to read {arg}: {e}"))
}

fn run_submit(client: &reqwest::blocking::Client, base: &str) {
    let image_path = require_arg("--image");
    let latitude = require_arg("--lat");
    let longitude = require_arg("--lng");
    let speed_limit = get_arg("--speed-limit");
    let boxes = load_boxes(&require_arg("--boxes")).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    });

    let image = std::fs::read(&image_path).unwrap_or_else(|e| {
        eprintln!("Failed to read {image_path}: {e}");
        std::process::exit(1);
    });

    // Same checks the server runs, so bad input fails before the upload.
    let checked = submission::check_jpeg(&image)
        .and_then(|_| submission::parse_position(&latitude, &longitude))
        .and_then(|_| submission::parse_boxes(&boxes));
    if let Err(e) = checked {
        eprintln!("Invalid submission: {e}");
        std::process::exit(1);
    }

    let image_part = reqwest::blocking::multipart::Part::bytes(image)
        .file_name("photo.jpg")
        .mime_str("image/jpeg")
        .unwrap_or_else(|e| {
            eprintln!("Failed to build upload: {e}");
            std::process::exit(1);
        });
    let mut form = reqwest::blocking::multipart::Form::new()
        .part(FIELD_IMAGE, image_part)
        .text(FIELD_BOXES, boxes)
        .text(FIELD_LATITUDE, latitude)
        .text(FIELD_LONGITUDE, longitude);
    if let Some(limit) = speed_limit {
        form = form.text(FIELD_SPEED_LIMIT, limit);
    }

    let url = format!("{}{}", base.trim_end_matches('/'), fetch::DANGERS_PATH);
    eprintln!("Submitting to {url}...");
    let resp = client.post(&url).multipart(form).send().unwrap_or_else(|e| {
        eprintln!("Failed to submit: {e}");
        std::process::exit(1);
    });

    if !resp.status().is_success() {
        let status = resp.status();
        let message = resp
            .json::<serde_json::Value>()
            .ok()
            .and_then(|v| v["error"].as_str().map(str::to_string))
            .unwrap_or_default();
        eprintln!("Server rejected submission ({status}): {message}");
        std::process::exit(1);
    }

    let receipt: SubmissionReceipt = resp.json().unwrap_or_else(|e| {
        eprintln!("Failed to parse submission response: {e}");
        std::process::exit(1);
    });
    print!("{}", format_receipt(&receipt));
}

fn main() {
    let base = get_arg("--url").unwrap_or_else(|| DEFAULT_URL.to_string());
    let client = reqwest::blocking::Client::new();

    let mode = std::env::args().skip(1).find(|a| a == "query" || a == "submit");
    match mode.as_deref() {
        Some("query") => run_query(&client, &base),
        Some("submit") => run_submit(&client, &base),
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asphalt_shared::models::{LatLng, MarkerId, RawSeverity};

    fn record(id: &str, severity: RawSeverity) -> HazardRecord {
        HazardRecord {
            id: Some(id.to_string()),
            latitude: 42.6,
            longitude: 23.3,
            severity,
        }
    }

    #[test]
    fn test_format_query_report_counts_severities() {
        let bounds = ViewportBounds::new(43.0, 42.0, 24.0, 23.0).unwrap();
        let records = vec![
            record("a", RawSeverity::Label("High".to_string())),
            record("b", RawSeverity::Level(1)),
            record("c", RawSeverity::Label("Unknown".to_string())),
        ];
        let markers = Normalizer::default().normalize(&records);
        let report = format_query_report(&bounds, &records, &markers);

        assert!(report.contains("Records received: 3"));
        assert!(report.contains("Markers:          2"));
        assert!(report.contains("Dropped:          1"));
        assert!(report.contains("High:   1"));
        assert!(report.contains("Medium: 0"));
        assert!(report.contains("Low:    1"));
        assert!(report.contains("  a (42.6, 23.3) [High]"));
        assert!(!report.contains("antimeridian"));
    }

    #[test]
    fn test_format_query_report_empty_antimeridian() {
        let bounds = ViewportBounds::new(1.0, -1.0, -179.0, 179.0).unwrap();
        let report = format_query_report(&bounds, &[], &[]);
        assert!(report.contains("(crosses the antimeridian)"));
        assert!(report.contains("Markers:          0"));
        assert!(!report.contains("=== Markers ==="));
    }

    #[test]
    fn test_format_receipt() {
        let stored = SubmissionReceipt {
            detections: 2,
            id: Some("abc".to_string()),
        };
        assert_eq!(format_receipt(&stored), "Stored hazard abc (2 detections)\n");

        let single = SubmissionReceipt {
            detections: 1,
            id: Some("abc".to_string()),
        };
        assert_eq!(format_receipt(&single), "Stored hazard abc (1 detection)\n");

        let empty = SubmissionReceipt {
            detections: 0,
            id: None,
        };
        assert_eq!(
            format_receipt(&empty),
            "No detections in submission, nothing stored\n"
        );
    }

    #[test]
    fn test_load_boxes_inline_json() {
        let json = r#"[{"class":0,"x_center":1,"y_center":1,"w":1,"h":1}]"#;
        assert_eq!(load_boxes(json).unwrap(), json);
    }

    #[test]
    fn test_load_boxes_from_missing_file() {
        assert!(load_boxes("/definitely/not/here.json").is_err());
    }

    #[test]
    fn test_marker_line_uses_marker_id() {
        let marker = HazardMarker {
            id: MarkerId::new("x#1"),
            position: LatLng::new(1.5, 2.5),
            severity: Severity::Medium,
        };
        let bounds = ViewportBounds::new(2.0, 1.0, 3.0, 2.0).unwrap();
        let report = format_query_report(&bounds, &[], &[marker]);
        assert!(report.contains("  x#1 (1.5, 2.5) [Medium]"));
    }
}
