use asphalt_shared::bounds::ViewportBounds;
use asphalt_shared::fetch::{self, FetchError, HazardSource};
use asphalt_shared::models::HazardRecord;

/// Origin the page was served from. The feed is served alongside the app.
pub fn api_base() -> Option<String> {
    web_sys::window()?.location().origin().ok()
}

/// The hazard feed over HTTP.
#[derive(Debug, Clone)]
pub struct HttpHazardSource {
    base: String,
    client: reqwest::Client,
}

impl HttpHazardSource {
    pub fn new(base: impl Into<String>) -> Self {
        HttpHazardSource {
            base: base.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url_for(&self, bounds: &ViewportBounds) -> String {
        fetch::query_url(&self.base, bounds)
    }
}

impl HazardSource for HttpHazardSource {
    async fn fetch(&self, bounds: ViewportBounds) -> Result<Vec<HazardRecord>, FetchError> {
        let resp = self
            .client
            .get(self.url_for(&bounds))
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        fetch::decode_response(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_bounds() {
        let source = HttpHazardSource::new("http://localhost:3000/");
        let bounds = ViewportBounds::new(42.7, 42.6, 23.4, 23.2).unwrap();
        assert_eq!(
            source.url_for(&bounds),
            "http://localhost:3000/dangers?north=42.7&south=42.6&east=23.4&west=23.2"
        );
    }

    #[test]
    fn test_url_for_antimeridian_bounds() {
        let source = HttpHazardSource::new("https://alerts.example");
        let bounds = ViewportBounds::new(1.0, -1.0, -179.0, 179.0).unwrap();
        assert_eq!(
            source.url_for(&bounds),
            "https://alerts.example/dangers?north=1&south=-1&east=-179&west=179"
        );
    }
}
