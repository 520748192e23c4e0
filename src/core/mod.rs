pub mod distance;
pub mod engine;
pub mod filter;
pub mod parser;
pub mod pipeline;
pub mod ranker;

pub use crate::domain::model::{
    Coordinate, FilmRecord, GeocodeError, GeocodedFilm, MapPlan, RankedFilm, RunSummary,
    UserContext,
};
pub use crate::domain::ports::{ConfigProvider, Geocoder, Pipeline, Storage};
pub use crate::utils::error::Result;
