use crate::domain::model::{Coordinate, GeocodeError};
use crate::domain::ports::Geocoder;
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_range, validate_url, Validate};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = "Film_map";

/// 地理編碼服務設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderSettings {
    pub endpoint: String,
    pub user_agent: String,
    pub language: String,
    pub timeout_seconds: u64,
    /// 服務不可用時額外重試的次數，0 表示只試一次
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    /// 兩次請求之間的最短間隔
    pub min_interval_ms: u64,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            language: "en".to_string(),
            timeout_seconds: 10,
            retry_attempts: 0,
            retry_delay_ms: 500,
            min_interval_ms: 1000,
        }
    }
}

impl Validate for GeocoderSettings {
    fn validate(&self) -> Result<()> {
        validate_url("geocoder.endpoint", &self.endpoint)?;
        validate_non_empty_string("geocoder.user_agent", &self.user_agent)?;
        validate_range("geocoder.timeout_seconds", self.timeout_seconds, 1, 300)?;
        validate_range("geocoder.retry_attempts", self.retry_attempts, 0, 10)?;
        validate_range("geocoder.min_interval_ms", self.min_interval_ms, 0, 60_000)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    error: Option<String>,
}

/// Nominatim 相容的 HTTP 地理編碼器；同一個實例的請求共用速率限制
pub struct NominatimGeocoder {
    client: Client,
    settings: GeocoderSettings,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    pub fn new(settings: GeocoderSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            settings,
            last_request: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.settings.endpoint.trim_end_matches('/'), path)
    }

    async fn throttle(&self) {
        let interval = Duration::from_millis(self.settings.min_interval_ms);
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<T, GeocodeError> {
        self.throttle().await;

        let url = self.url(path);
        tracing::debug!("Geocoder request: {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| GeocodeError::Unavailable(e.to_string()))?;

        let status = response.status();
        match status {
            s if s.is_success() => {}
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => return Err(GeocodeError::NoMatch),
            s => return Err(GeocodeError::Unavailable(format!("HTTP {}", s))),
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GeocodeError::Unavailable(format!("invalid response body: {}", e)))
    }

    /// 只在服務暫時不可用時重試，間隔指數增加
    async fn with_retry<T, F, Fut>(
        &self,
        what: &str,
        mut call: F,
    ) -> std::result::Result<T, GeocodeError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, GeocodeError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Err(e) if e.is_transient() && attempt < self.settings.retry_attempts => {
                    let delay = Duration::from_millis(
                        self.settings.retry_delay_ms.saturating_mul(1u64 << attempt.min(16)),
                    );
                    attempt += 1;
                    tracing::debug!(
                        "🔁 {} failed ({}), retry {}/{} in {:?}",
                        what,
                        e,
                        attempt,
                        self.settings.retry_attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                outcome => return outcome,
            }
        }
    }

    async fn search(&self, place: &str) -> std::result::Result<Coordinate, GeocodeError> {
        let query = [
            ("q", place.to_string()),
            ("format", "jsonv2".to_string()),
            ("limit", "1".to_string()),
        ];
        let hits: Vec<SearchHit> = self.get_json("search", &query).await?;

        // 多筆結果時只取第一筆
        let hit = hits.into_iter().next().ok_or(GeocodeError::NoMatch)?;
        let lat = hit.lat.parse::<f64>();
        let lon = hit.lon.parse::<f64>();
        match (lat, lon) {
            (Ok(lat), Ok(lon)) => Ok(Coordinate::new(lat, lon)),
            _ => Err(GeocodeError::Unavailable(format!(
                "invalid coordinates '{}, {}'",
                hit.lat, hit.lon
            ))),
        }
    }

    async fn lookup(&self, location: Coordinate) -> std::result::Result<String, GeocodeError> {
        let query = [
            ("lat", location.lat.to_string()),
            ("lon", location.lon.to_string()),
            ("format", "jsonv2".to_string()),
            ("accept-language", self.settings.language.clone()),
        ];
        let response: ReverseResponse = self.get_json("reverse", &query).await?;

        if let Some(error) = response.error {
            tracing::debug!("Reverse geocoding returned error: {}", error);
            return Err(GeocodeError::NoMatch);
        }

        response
            .display_name
            .as_deref()
            .and_then(country_from_address)
            .ok_or(GeocodeError::NoMatch)
    }
}

/// 格式化地址的最後一段就是國家
pub fn country_from_address(address: &str) -> Option<String> {
    address
        .rsplit(", ")
        .next()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn forward(&self, place: &str) -> std::result::Result<Coordinate, GeocodeError> {
        self.with_retry("forward geocode", || self.search(place)).await
    }

    async fn reverse(&self, location: Coordinate) -> std::result::Result<String, GeocodeError> {
        self.with_retry("reverse geocode", || self.lookup(location)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn settings_for(server: &MockServer) -> GeocoderSettings {
        GeocoderSettings {
            endpoint: server.base_url(),
            min_interval_ms: 0,
            retry_delay_ms: 1,
            ..GeocoderSettings::default()
        }
    }

    #[test]
    fn test_country_from_address() {
        assert_eq!(
            country_from_address("Lviv, Lviv Oblast, 79000, Ukraine").as_deref(),
            Some("Ukraine")
        );
        assert_eq!(country_from_address("").as_deref(), None);
    }

    #[test]
    fn test_default_settings_are_valid() {
        assert!(GeocoderSettings::default().validate().is_ok());

        let bad = GeocoderSettings {
            endpoint: "nominatim".to_string(),
            ..GeocoderSettings::default()
        };
        assert!(bad.validate().is_err());
    }

    #[tokio::test]
    async fn test_forward_takes_first_hit() {
        let server = MockServer::start();
        let search = server.mock(|when, then| {
            when.method(GET)
                .path("/search")
                .query_param("q", "Los Angeles, California, USA")
                .header("user-agent", DEFAULT_USER_AGENT);
            then.status(200).json_body(serde_json::json!([
                {"lat": "34.0536909", "lon": "-118.242766", "display_name": "Los Angeles"},
                {"lat": "1.0", "lon": "1.0", "display_name": "Elsewhere"}
            ]));
        });

        let geocoder = NominatimGeocoder::new(settings_for(&server)).unwrap();
        let c = geocoder.forward("Los Angeles, California, USA").await.unwrap();

        search.assert();
        assert!((c.lat - 34.0536909).abs() < 1e-9);
        assert!((c.lon + 118.242766).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_forward_without_hits_is_no_match() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/search");
            then.status(200).json_body(serde_json::json!([]));
        });

        let geocoder = NominatimGeocoder::new(settings_for(&server)).unwrap();
        assert_eq!(geocoder.forward("Atlantis").await, Err(GeocodeError::NoMatch));
    }

    #[tokio::test]
    async fn test_unavailable_service_is_retried_then_reported() {
        let server = MockServer::start();
        let search = server.mock(|when, then| {
            when.method(GET).path("/search");
            then.status(503);
        });

        let settings = GeocoderSettings {
            retry_attempts: 2,
            ..settings_for(&server)
        };
        let geocoder = NominatimGeocoder::new(settings).unwrap();
        let outcome = geocoder.forward("Paris, France").await;

        search.assert_hits(3);
        assert!(matches!(outcome, Err(GeocodeError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_no_match_is_not_retried() {
        let server = MockServer::start();
        let search = server.mock(|when, then| {
            when.method(GET).path("/search");
            then.status(200).json_body(serde_json::json!([]));
        });

        let settings = GeocoderSettings {
            retry_attempts: 3,
            ..settings_for(&server)
        };
        let geocoder = NominatimGeocoder::new(settings).unwrap();
        let _ = geocoder.forward("Atlantis").await;

        search.assert_hits(1);
    }

    #[tokio::test]
    async fn test_reverse_returns_last_segment() {
        let server = MockServer::start();
        let reverse = server.mock(|when, then| {
            when.method(GET)
                .path("/reverse")
                .query_param("lat", "49.83")
                .query_param("lon", "24.02")
                .query_param("accept-language", "en");
            then.status(200).json_body(serde_json::json!({
                "display_name": "Rynok Square, Lviv, Lviv Oblast, 79008, Ukraine"
            }));
        });

        let geocoder = NominatimGeocoder::new(settings_for(&server)).unwrap();
        let country = geocoder.reverse(Coordinate::new(49.83, 24.02)).await;

        reverse.assert();
        assert_eq!(country.as_deref(), Ok("Ukraine"));
    }

    #[tokio::test]
    async fn test_reverse_error_payload_is_no_match() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/reverse");
            then.status(200)
                .json_body(serde_json::json!({"error": "Unable to geocode"}));
        });

        let geocoder = NominatimGeocoder::new(settings_for(&server)).unwrap();
        let country = geocoder.reverse(Coordinate::new(0.0, -160.0)).await;
        assert_eq!(country, Err(GeocodeError::NoMatch));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let settings = GeocoderSettings {
            endpoint: "http://127.0.0.1:9".to_string(),
            min_interval_ms: 0,
            timeout_seconds: 2,
            ..GeocoderSettings::default()
        };
        let geocoder = NominatimGeocoder::new(settings).unwrap();
        let outcome = geocoder.forward("Paris, France").await;
        assert!(matches!(outcome, Err(GeocodeError::Unavailable(_))));
    }
}
