use crate::adapters::map_renderer::{map_file_name, MapRenderer};
use crate::core::filter::filter_by_year;
use crate::core::parser::{parse_lines, ParseReport};
use crate::core::ranker::{geocode_all, rank, Ranking, SelectionPolicy};
use crate::core::{ConfigProvider, Geocoder, Pipeline, Storage};
use crate::domain::model::{MapPlan, RunSummary, UserContext};
use crate::utils::error::{FilmMapError, Result};
use std::path::Path;
use std::sync::Arc;

/// 讀檔解析 → 篩年份、地理編碼、排序 → 畫地圖
pub struct FilmMapPipeline<S: Storage, G: Geocoder + 'static, C: ConfigProvider> {
    storage: S,
    geocoder: Arc<G>,
    config: C,
    renderer: MapRenderer,
}

impl<S: Storage, G: Geocoder + 'static, C: ConfigProvider> FilmMapPipeline<S, G, C> {
    pub fn new(storage: S, geocoder: Arc<G>, config: C) -> Self {
        Self {
            storage,
            geocoder,
            config,
            renderer: MapRenderer::default(),
        }
    }

    pub fn with_renderer(mut self, renderer: MapRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    async fn resolve_user_country(&self) -> Option<String> {
        match self.geocoder.reverse(self.config.location()).await {
            Ok(country) => {
                tracing::info!("🌍 User country: {}", country);
                Some(country)
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ Could not determine user country ({}), all markers grouped as other",
                    e
                );
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl<S, G, C> Pipeline for FilmMapPipeline<S, G, C>
where
    S: Storage,
    G: Geocoder + 'static,
    C: ConfigProvider,
{
    async fn extract(&self) -> Result<ParseReport> {
        let input = self.config.input_path();
        tracing::info!("📂 Reading locations from: {}", input);

        let raw = self.storage.read_file(input).await?;
        let text = String::from_utf8_lossy(&raw);

        let report = parse_lines(
            &text,
            self.config.header_lines(),
            self.config.malformed_policy(),
        )?;
        tracing::info!(
            "📊 Parsed {} records ({} malformed lines skipped)",
            report.records.len(),
            report.skipped
        );
        Ok(report)
    }

    async fn transform(&self, data: ParseReport) -> Result<MapPlan> {
        let year = self.config.year();
        let parsed = data.records.len();
        let films = filter_by_year(data.records, year);
        let matched_year = films.len();
        tracing::info!("🎬 {} of {} records are from {}", matched_year, parsed, year);

        let mut user = UserContext {
            location: self.config.location(),
            year: year.to_string(),
            country: None,
        };

        if films.is_empty() {
            tracing::info!("📭 No films found for {}, skipping geocoding", year);
            return Ok(MapPlan {
                user,
                ranking: Ranking::default(),
                parsed,
                skipped: data.skipped,
                matched_year,
            });
        }

        let policy = self.config.selection_policy();
        if policy == SelectionPolicy::Legacy {
            tracing::warn!(
                "⚠️ Legacy selection: map shows the first films of the file order, not the closest ones (use --selection nearest)"
            );
        }

        tracing::info!("📡 Geocoding {} film locations", matched_year);
        let geocoded = geocode_all(
            Arc::clone(&self.geocoder),
            films,
            self.config.concurrency(),
        )
        .await;

        let ranking = rank(geocoded, user.location, policy);
        if ranking.all_unavailable() {
            tracing::error!("🚫 Geocoding service unreachable for all {} lookups", matched_year);
            return Err(FilmMapError::GeocoderUnreachable {
                attempted: matched_year,
            });
        }
        tracing::info!(
            "📍 {} resolved, {} unresolved ({} service failures), {} selected",
            ranking.resolved(),
            ranking.unresolved.len(),
            ranking.unavailable,
            ranking.selected.len()
        );

        user.country = self.resolve_user_country().await;

        Ok(MapPlan {
            user,
            ranking,
            parsed,
            skipped: data.skipped,
            matched_year,
        })
    }

    async fn load(&self, plan: MapPlan) -> Result<RunSummary> {
        let MapPlan {
            user,
            ranking,
            parsed,
            skipped,
            matched_year,
        } = plan;

        let html = self.renderer.render(&user, &ranking.selected)?;
        let counts = MapRenderer::group_counts(&user, &ranking.selected);

        let file_name = map_file_name(&user.year);
        let output_path = Path::new(self.config.output_dir())
            .join(&file_name)
            .to_string_lossy()
            .into_owned();

        self.storage.write_file(&output_path, html.as_bytes()).await?;
        tracing::info!("🗺️ Map saved: {}", output_path);

        Ok(RunSummary {
            output_path,
            year: user.year,
            parsed,
            skipped,
            matched_year,
            resolved: ranking.resolved(),
            unavailable: ranking.unavailable,
            selected: ranking.selected.len(),
            nearest_km: ranking.nearest_km(),
            same_country: counts.same_country,
            user_country: user.country,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::domain::model::{Coordinate, GeocodeError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn with_file(path: &str, content: &str) -> Self {
            let mut files = HashMap::new();
            files.insert(path.to_string(), content.as_bytes().to_vec());
            Self {
                files: Arc::new(Mutex::new(files)),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files
                .get(path)
                .cloned()
                .ok_or_else(|| FilmMapError::InputNotFound {
                    path: path.to_string(),
                })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct OfflineGeocoder;

    #[async_trait]
    impl Geocoder for OfflineGeocoder {
        async fn forward(&self, _place: &str) -> std::result::Result<Coordinate, GeocodeError> {
            Err(GeocodeError::Unavailable("connection refused".to_string()))
        }

        async fn reverse(
            &self,
            _location: Coordinate,
        ) -> std::result::Result<String, GeocodeError> {
            Err(GeocodeError::Unavailable("connection refused".to_string()))
        }
    }

    struct StaticGeocoder {
        country: Option<String>,
    }

    #[async_trait]
    impl Geocoder for StaticGeocoder {
        async fn forward(&self, place: &str) -> std::result::Result<Coordinate, GeocodeError> {
            match place {
                "Los Angeles, California, USA" => Ok(Coordinate::new(34.05, -118.24)),
                "Vancouver, British Columbia, Canada" => Ok(Coordinate::new(49.28, -123.12)),
                _ => Err(GeocodeError::NoMatch),
            }
        }

        async fn reverse(
            &self,
            _location: Coordinate,
        ) -> std::result::Result<String, GeocodeError> {
            self.country
                .clone()
                .ok_or_else(|| GeocodeError::Unavailable("offline".to_string()))
        }
    }

    fn locations_file(body: &str) -> String {
        let header: String = (0..14).map(|i| format!("CRC: header {}\n", i)).collect();
        format!("{}{}", header, body)
    }

    fn pipeline(
        body: &str,
        year: &str,
        country: Option<&str>,
    ) -> (
        FilmMapPipeline<MockStorage, StaticGeocoder, MapConfig>,
        MockStorage,
    ) {
        let storage = MockStorage::with_file("locations.txt", &locations_file(body));
        let geocoder = Arc::new(StaticGeocoder {
            country: country.map(str::to_string),
        });
        let config = MapConfig::new("locations.txt", year, Coordinate::new(34.0, -118.2));
        (
            FilmMapPipeline::new(storage.clone(), geocoder, config),
            storage,
        )
    }

    #[tokio::test]
    async fn test_full_run_writes_map() {
        let (pipeline, storage) = pipeline(
            "Inception (2010)\tLos Angeles, California, USA\n\
             Tron: Legacy (2010)\tVancouver, British Columbia, Canada\n\
             Lost City (2010)\tAtlantis\n\
             Heat (1995)\tLos Angeles, California, USA\n",
            "2010",
            Some("USA"),
        );

        let report = pipeline.extract().await.unwrap();
        assert_eq!(report.records.len(), 4);

        let plan = pipeline.transform(report).await.unwrap();
        assert_eq!(plan.matched_year, 3);
        assert_eq!(plan.ranking.selected.len(), 2);
        assert_eq!(plan.ranking.unresolved.len(), 1);
        assert_eq!(plan.user.country.as_deref(), Some("USA"));

        let summary = pipeline.load(plan).await.unwrap();
        assert_eq!(summary.selected, 2);
        assert_eq!(summary.same_country, 1);
        assert_eq!(summary.unavailable, 0);
        assert!(summary.nearest_km.is_some_and(|km| km < 10.0));
        assert!(summary.output_path.ends_with("2010_movies_map.html"));

        let html = storage.get_file(&summary.output_path).await.unwrap();
        let html = String::from_utf8(html).unwrap();
        assert!(html.contains("Inception"));
        assert!(html.contains("Tron: Legacy"));
        assert!(!html.contains("Lost City"));
    }

    #[tokio::test]
    async fn test_year_without_films_is_empty_not_error() {
        let (pipeline, _) = pipeline(
            "Heat (1995)\tLos Angeles, California, USA\n",
            "1888",
            Some("USA"),
        );

        let report = pipeline.extract().await.unwrap();
        let plan = pipeline.transform(report).await.unwrap();
        assert_eq!(plan.matched_year, 0);
        assert!(plan.ranking.selected.is_empty());

        let summary = pipeline.load(plan).await.unwrap();
        assert!(summary.is_empty());
        assert!(summary.output_path.ends_with("1888_movies_map.html"));
    }

    #[tokio::test]
    async fn test_unknown_country_groups_everything_as_other() {
        let (pipeline, _) = pipeline(
            "Inception (2010)\tLos Angeles, California, USA\n",
            "2010",
            None,
        );

        let report = pipeline.extract().await.unwrap();
        let plan = pipeline.transform(report).await.unwrap();
        let summary = pipeline.load(plan).await.unwrap();

        assert_eq!(summary.user_country, None);
        assert_eq!(summary.selected, 1);
        assert_eq!(summary.same_country, 0);
    }

    #[tokio::test]
    async fn test_offline_geocoder_is_not_an_empty_result() {
        let storage = MockStorage::with_file(
            "locations.txt",
            &locations_file(
                "Inception (2010)\tLos Angeles, California, USA\n\
                 Tron: Legacy (2010)\tVancouver, British Columbia, Canada\n",
            ),
        );
        let config = MapConfig::new("locations.txt", "2010", Coordinate::new(34.0, -118.2));
        let pipeline = FilmMapPipeline::new(storage.clone(), Arc::new(OfflineGeocoder), config);

        let report = pipeline.extract().await.unwrap();
        let err = pipeline.transform(report).await.unwrap_err();
        assert!(matches!(err, FilmMapError::GeocoderUnreachable { attempted: 2 }));
        let files = storage.files.lock().await;
        assert!(files.keys().all(|path| !path.ends_with("_movies_map.html")));
    }

    #[tokio::test]
    async fn test_missing_input_file() {
        let storage = MockStorage::with_file("other.txt", "");
        let geocoder = Arc::new(StaticGeocoder { country: None });
        let config = MapConfig::new("locations.txt", "2010", Coordinate::new(0.0, 0.0));
        let pipeline = FilmMapPipeline::new(storage, geocoder, config);

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, FilmMapError::InputNotFound { .. }));
    }
}
