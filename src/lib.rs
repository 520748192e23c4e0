pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::CliArgs;

pub use crate::adapters::{
    geocoder::{GeocoderSettings, NominatimGeocoder},
    map_renderer::MapRenderer,
    storage::LocalStorage,
};
pub use crate::config::{toml_config::TomlConfig, MapConfig};
pub use crate::core::{
    engine::{run_film_map, MapEngine},
    pipeline::FilmMapPipeline,
};
pub use crate::utils::error::{FilmMapError, Result};
