use crate::core::parser::{MalformedPolicy, ParseReport};
use crate::core::ranker::SelectionPolicy;
use crate::domain::model::{Coordinate, FilmRecord, GeocodeError, MapPlan, RunSummary};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 遠端地理編碼服務；兩個操作都不會把錯誤往上丟成失敗的執行
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn forward(&self, place: &str) -> std::result::Result<Coordinate, GeocodeError>;
    async fn reverse(&self, location: Coordinate) -> std::result::Result<String, GeocodeError>;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_dir(&self) -> &str;
    fn year(&self) -> &str;
    fn location(&self) -> Coordinate;
    fn header_lines(&self) -> usize;
    fn malformed_policy(&self) -> MalformedPolicy;
    fn selection_policy(&self) -> SelectionPolicy;
    fn concurrency(&self) -> usize;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ParseReport>;
    async fn transform(&self, data: ParseReport) -> Result<MapPlan>;
    async fn load(&self, plan: MapPlan) -> Result<RunSummary>;
}

/// 以紀錄的地點字串做正向地理編碼
pub async fn geocode_film<G: Geocoder + ?Sized>(
    geocoder: &G,
    film: &FilmRecord,
) -> std::result::Result<Coordinate, GeocodeError> {
    geocoder.forward(&film.place).await
}
