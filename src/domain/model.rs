use crate::core::ranker::Ranking;
use crate::utils::error::FilmMapError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// WGS-84 座標（度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lat, self.lon)
    }
}

impl FromStr for Coordinate {
    type Err = FilmMapError;

    /// 解析使用者輸入的 "lat, long"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| FilmMapError::InvalidLocation {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            return Err(invalid("expected exactly two comma-separated numbers"));
        }

        let lat: f64 = parts[0]
            .parse()
            .map_err(|_| invalid("latitude is not a number"))?;
        let lon: f64 = parts[1]
            .parse()
            .map_err(|_| invalid("longitude is not a number"))?;

        if !(-90.0..=90.0).contains(&lat) {
            return Err(invalid("latitude must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(invalid("longitude must be between -180 and 180"));
        }

        Ok(Self { lat, lon })
    }
}

/// 從地點清單解析出的一筆電影紀錄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilmRecord {
    pub title: String,
    pub year: String,
    pub place: String,
    /// 年份括號之後的次要標題片段，例如劇集名稱
    pub episode: Option<String>,
}

impl FilmRecord {
    /// 地點字串最後一段，通常是國家
    pub fn country(&self) -> &str {
        self.place
            .rsplit(", ")
            .next()
            .map(str::trim)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    #[error("no match for query")]
    NoMatch,

    #[error("geocoding service unavailable: {0}")]
    Unavailable(String),
}

impl GeocodeError {
    /// 只有服務暫時不可用時才值得重試
    pub fn is_transient(&self) -> bool {
        matches!(self, GeocodeError::Unavailable(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedFilm {
    pub film: FilmRecord,
    pub coordinates: Result<Coordinate, GeocodeError>,
}

impl GeocodedFilm {
    pub fn resolved(&self) -> Option<Coordinate> {
        self.coordinates.as_ref().ok().copied()
    }

    pub fn is_resolved(&self) -> bool {
        self.coordinates.is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFilm {
    pub film: FilmRecord,
    pub coordinates: Coordinate,
    pub distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub location: Coordinate,
    pub year: String,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerGroup {
    SameCountry,
    Other,
}

impl MarkerGroup {
    /// 國家未知時一律歸到 Other
    pub fn classify(film: &FilmRecord, user_country: Option<&str>) -> Self {
        match user_country {
            Some(country) if !country.is_empty() && film.country() == country => {
                MarkerGroup::SameCountry
            }
            _ => MarkerGroup::Other,
        }
    }
}

/// transform 階段的結果，交給 load 畫地圖
#[derive(Debug, Clone)]
pub struct MapPlan {
    pub user: UserContext,
    pub ranking: Ranking,
    pub parsed: usize,
    pub skipped: usize,
    pub matched_year: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub output_path: String,
    pub year: String,
    pub parsed: usize,
    pub skipped: usize,
    pub matched_year: usize,
    pub resolved: usize,
    /// 因服務不可用而沒有座標的筆數
    pub unavailable: usize,
    pub selected: usize,
    /// 地圖上最近一筆的距離（公里）
    pub nearest_km: Option<f64>,
    pub same_country: usize,
    pub user_country: Option<String>,
}

impl RunSummary {
    /// 沒有任何可以標在地圖上的電影
    pub fn is_empty(&self) -> bool {
        self.selected == 0
    }
}
