#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::adapters::geocoder::GeocoderSettings;
use crate::core::parser::{MalformedPolicy, DEFAULT_HEADER_LINES};
use crate::core::ranker::SelectionPolicy;
use crate::domain::model::Coordinate;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_range, validate_year, Validate};

/// 單次執行所需的完整設定
#[derive(Debug, Clone)]
pub struct MapConfig {
    pub input_path: String,
    pub output_dir: String,
    pub year: String,
    pub location: Coordinate,
    pub header_lines: usize,
    pub malformed_policy: MalformedPolicy,
    pub selection_policy: SelectionPolicy,
    pub concurrency: usize,
    pub zoom: u8,
    pub geocoder: GeocoderSettings,
}

impl MapConfig {
    pub fn new(
        input_path: impl Into<String>,
        year: impl Into<String>,
        location: Coordinate,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_dir: ".".to_string(),
            year: year.into(),
            location,
            header_lines: DEFAULT_HEADER_LINES,
            malformed_policy: MalformedPolicy::default(),
            selection_policy: SelectionPolicy::default(),
            concurrency: 1,
            zoom: 5,
            geocoder: GeocoderSettings::default(),
        }
    }
}

impl ConfigProvider for MapConfig {
    fn input_path(&self) -> &str {
        &self.input_path
    }

    fn output_dir(&self) -> &str {
        &self.output_dir
    }

    fn year(&self) -> &str {
        &self.year
    }

    fn location(&self) -> Coordinate {
        self.location
    }

    fn header_lines(&self) -> usize {
        self.header_lines
    }

    fn malformed_policy(&self) -> MalformedPolicy {
        self.malformed_policy
    }

    fn selection_policy(&self) -> SelectionPolicy {
        self.selection_policy
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }
}

impl Validate for MapConfig {
    fn validate(&self) -> Result<()> {
        validate_path("input.path", &self.input_path)?;
        validate_path("output.dir", &self.output_dir)?;
        validate_year("query.year", &self.year)?;
        validate_range("ranking.concurrency", self.concurrency, 1, 16)?;
        validate_range("output.zoom", self.zoom, 1, 18)?;
        self.geocoder.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MapConfig::new("locations.txt", "2010", Coordinate::new(34.0, -118.2));
        assert!(config.validate().is_ok());
        assert_eq!(config.header_lines(), 14);
        assert_eq!(config.selection_policy(), SelectionPolicy::Legacy);
    }

    #[test]
    fn test_bad_year_fails_validation() {
        let config = MapConfig::new("locations.txt", "10", Coordinate::new(0.0, 0.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = MapConfig::new("locations.txt", "2010", Coordinate::new(0.0, 0.0));
        config.concurrency = 0;
        assert!(config.validate().is_err());
        config.concurrency = 8;
        assert!(config.validate().is_ok());
    }
}
