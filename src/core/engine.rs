use crate::adapters::geocoder::NominatimGeocoder;
use crate::adapters::map_renderer::MapRenderer;
use crate::adapters::storage::LocalStorage;
use crate::config::MapConfig;
use crate::core::pipeline::FilmMapPipeline;
use crate::core::Pipeline;
use crate::domain::model::RunSummary;
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;
use crate::utils::validation::Validate;
use std::sync::Arc;

pub struct MapEngine<P: Pipeline> {
    pipeline: P,
    monitor: RunMonitor,
}

impl<P: Pipeline> MapEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: RunMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("🚀 Starting film map generation");

        let report = self.pipeline.extract().await?;
        self.monitor.log_stage("Parse");

        let plan = self.pipeline.transform(report).await?;
        self.monitor.log_stage("Geocode & rank");

        let summary = self.pipeline.load(plan).await?;
        self.monitor.log_stage("Render");
        self.monitor.log_final_stats();

        if summary.is_empty() {
            tracing::info!("📭 No film locations to show for {}", summary.year);
        } else {
            tracing::info!(
                "✅ {} film locations on the map ({} in the same country)",
                summary.selected,
                summary.same_country
            );
        }

        Ok(summary)
    }
}

/// 以設定為參數的進入點，沒有任何全域狀態
pub async fn run_film_map(config: MapConfig, monitor_enabled: bool) -> Result<RunSummary> {
    config.validate()?;

    let geocoder = Arc::new(NominatimGeocoder::new(config.geocoder.clone())?);
    let renderer = MapRenderer::new(config.zoom);
    let storage = LocalStorage::new(".");

    let pipeline = FilmMapPipeline::new(storage, geocoder, config).with_renderer(renderer);
    MapEngine::new_with_monitoring(pipeline, monitor_enabled)
        .run()
        .await
}
