use crate::adapters::geocoder::GeocoderSettings;
use crate::config::MapConfig;
use crate::core::parser::{MalformedPolicy, DEFAULT_HEADER_LINES};
use crate::core::ranker::SelectionPolicy;
use crate::domain::model::Coordinate;
use crate::utils::error::{FilmMapError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// 設定檔內容；每個欄位都有預設值，命令列參數會覆蓋
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub query: QueryConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
    pub ranking: RankingConfig,
    pub geocoder: GeocoderSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub year: Option<String>,
    /// "lat, long"
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: String,
    pub header_lines: usize,
    pub on_malformed: MalformedPolicy,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: "locations.txt".to_string(),
            header_lines: DEFAULT_HEADER_LINES,
            on_malformed: MalformedPolicy::Skip,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    pub zoom: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: ".".to_string(),
            zoom: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub selection: SelectionPolicy,
    /// 同時進行的地理編碼請求數，1 表示逐筆
    pub concurrency: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            selection: SelectionPolicy::Legacy,
            concurrency: 1,
        }
    }
}

fn env_var_pattern() -> &'static Regex {
    static ENV_VAR: OnceLock<Regex> = OnceLock::new();
    ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static env var pattern"))
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FilmMapError::ConfigValidationError {
                    field: "config".to_string(),
                    message: format!("config file '{}' not found", path.display()),
                }
            } else {
                FilmMapError::IoError(e)
            }
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| FilmMapError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${NOMINATIM_URL})，找不到的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 年份與位置都必須已經填好
    pub fn into_map_config(self) -> Result<MapConfig> {
        let year = self
            .query
            .year
            .ok_or_else(|| FilmMapError::MissingConfigError {
                field: "query.year".to_string(),
            })?;
        let location: Coordinate = self
            .query
            .location
            .ok_or_else(|| FilmMapError::MissingConfigError {
                field: "query.location".to_string(),
            })?
            .parse()?;

        Ok(MapConfig {
            input_path: self.input.path,
            output_dir: self.output.dir,
            year: year.trim().to_string(),
            location,
            header_lines: self.input.header_lines,
            malformed_policy: self.input.on_malformed,
            selection_policy: self.ranking.selection,
            concurrency: self.ranking.concurrency,
            zoom: self.output.zoom,
            geocoder: self.geocoder,
        })
    }
}
