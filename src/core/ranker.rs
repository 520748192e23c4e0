use crate::core::distance::geodesic_km;
use crate::domain::model::{Coordinate, FilmRecord, GeocodeError, GeocodedFilm, RankedFilm};
use crate::domain::ports::{geocode_film, Geocoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// 地圖上最多標示的電影數
pub const MAX_SELECTED: usize = 10;

/// 最終十筆要從哪個序列取
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// 依年份篩選後的原始順序取前十筆（只留有座標的）
    #[default]
    Legacy,
    /// 距離最近的十筆
    Nearest,
}

#[derive(Debug, Clone, Default)]
pub struct Ranking {
    /// 全部有座標的紀錄，由遠到近
    pub by_distance: Vec<RankedFilm>,
    /// 要畫在地圖上的紀錄
    pub selected: Vec<RankedFilm>,
    pub unresolved: Vec<FilmRecord>,
    /// 因服務不可用而失敗的筆數（不含查無結果）
    pub unavailable: usize,
}

impl Ranking {
    pub fn resolved(&self) -> usize {
        self.by_distance.len()
    }

    /// 有嘗試編碼，但每一筆都是服務不可用
    pub fn all_unavailable(&self) -> bool {
        self.unavailable > 0 && self.unavailable == self.by_distance.len() + self.unresolved.len()
    }

    pub fn nearest_km(&self) -> Option<f64> {
        self.selected
            .iter()
            .map(|r| r.distance_km)
            .min_by(|a, b| a.total_cmp(b))
    }
}

/// 對每筆紀錄做正向地理編碼，輸出順序與輸入相同
pub async fn geocode_all<G>(
    geocoder: Arc<G>,
    films: Vec<FilmRecord>,
    concurrency: usize,
) -> Vec<GeocodedFilm>
where
    G: Geocoder + ?Sized + 'static,
{
    let total = films.len();
    if concurrency <= 1 || total <= 1 {
        let mut geocoded = Vec::with_capacity(total);
        for (index, film) in films.into_iter().enumerate() {
            tracing::debug!("📍 Geocoding {}/{}: {}", index + 1, total, film.place);
            let coordinates = geocode_film(&*geocoder, &film).await;
            log_outcome(&film, &coordinates);
            geocoded.push(GeocodedFilm { film, coordinates });
        }
        return geocoded;
    }

    let permits = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();
    for (index, film) in films.iter().cloned().enumerate() {
        let geocoder = Arc::clone(&geocoder);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let coordinates = match permits.acquire_owned().await {
                Ok(_permit) => geocode_film(&*geocoder, &film).await,
                Err(_) => Err(GeocodeError::Unavailable("worker pool closed".to_string())),
            };
            (index, coordinates)
        });
    }

    let mut slots: Vec<Option<Result<Coordinate, GeocodeError>>> = vec![None; total];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, coordinates)) => slots[index] = Some(coordinates),
            Err(e) => tracing::warn!("⚠️ Geocoding task failed: {}", e),
        }
    }

    films
        .into_iter()
        .zip(slots)
        .map(|(film, slot)| {
            let coordinates = slot.unwrap_or_else(|| {
                Err(GeocodeError::Unavailable("geocoding task failed".to_string()))
            });
            log_outcome(&film, &coordinates);
            GeocodedFilm { film, coordinates }
        })
        .collect()
}

fn log_outcome(film: &FilmRecord, coordinates: &Result<Coordinate, GeocodeError>) {
    match coordinates {
        Ok(c) => tracing::debug!("✅ {} -> {}", film.place, c),
        Err(GeocodeError::NoMatch) => {
            tracing::info!("🔍 No geocode match for '{}' ({})", film.place, film.title)
        }
        Err(e @ GeocodeError::Unavailable(_)) => {
            tracing::warn!("⚠️ Could not geocode '{}': {}", film.place, e)
        }
    }
}

/// 計算距離並挑出要標示的紀錄；沒有座標的紀錄不會出現在結果中
pub fn rank(geocoded: Vec<GeocodedFilm>, user: Coordinate, policy: SelectionPolicy) -> Ranking {
    let mut in_order: Vec<Option<RankedFilm>> = Vec::with_capacity(geocoded.len());
    let mut unresolved = Vec::new();
    let mut unavailable = 0;

    for entry in geocoded {
        match entry.coordinates {
            Ok(coordinates) => in_order.push(Some(RankedFilm {
                distance_km: geodesic_km(user, coordinates),
                film: entry.film,
                coordinates,
            })),
            Err(e) => {
                if e.is_transient() {
                    unavailable += 1;
                }
                unresolved.push(entry.film);
                in_order.push(None);
            }
        }
    }

    let mut by_distance: Vec<RankedFilm> = in_order.iter().flatten().cloned().collect();
    by_distance.sort_by(|a, b| b.distance_km.total_cmp(&a.distance_km));

    let selected = match policy {
        SelectionPolicy::Legacy => in_order
            .into_iter()
            .take(MAX_SELECTED)
            .flatten()
            .collect(),
        SelectionPolicy::Nearest => by_distance
            .iter()
            .rev()
            .take(MAX_SELECTED)
            .cloned()
            .collect(),
    };

    Ranking {
        by_distance,
        selected,
        unresolved,
        unavailable,
    }
}
