use crate::config::toml_config::TomlConfig;
use crate::core::parser::MalformedPolicy;
use crate::core::ranker::SelectionPolicy;
use crate::utils::error::Result;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "film-map")]
#[command(about = "Map film shoot locations of a given year around your position")]
pub struct CliArgs {
    /// Year to build the map for (asked interactively when omitted)
    #[arg(short, long)]
    pub year: Option<String>,

    /// Your position as "lat, long" (asked interactively when omitted)
    #[arg(short, long, allow_hyphen_values = true)]
    pub location: Option<String>,

    /// Tab-separated locations list
    #[arg(short, long)]
    pub input: Option<String>,

    /// Directory the HTML map is written to
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long)]
    pub geocoder_endpoint: Option<String>,

    #[arg(long)]
    pub user_agent: Option<String>,

    /// Which ten films end up on the map
    #[arg(long, value_enum)]
    pub selection: Option<SelectionPolicy>,

    /// What to do with lines that cannot be parsed
    #[arg(long, value_enum)]
    pub on_malformed: Option<MalformedPolicy>,

    /// Parallel geocoding requests (still rate limited)
    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(long)]
    pub retry_attempts: Option<u32>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log per-stage timing and memory usage")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

impl CliArgs {
    /// 讀取設定檔（沒有指定就用預設值），再套用命令列覆蓋
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                TomlConfig::from_file(path)?
            }
            None => TomlConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(&self, config: &mut TomlConfig) {
        if let Some(year) = &self.year {
            config.query.year = Some(year.clone());
        }
        if let Some(location) = &self.location {
            config.query.location = Some(location.clone());
        }
        if let Some(input) = &self.input {
            config.input.path = input.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if let Some(endpoint) = &self.geocoder_endpoint {
            config.geocoder.endpoint = endpoint.clone();
        }
        if let Some(user_agent) = &self.user_agent {
            config.geocoder.user_agent = user_agent.clone();
        }
        if let Some(selection) = self.selection {
            config.ranking.selection = selection;
        }
        if let Some(policy) = self.on_malformed {
            config.input.on_malformed = policy;
        }
        if let Some(concurrency) = self.concurrency {
            config.ranking.concurrency = concurrency;
        }
        if let Some(retry_attempts) = self.retry_attempts {
            config.geocoder.retry_attempts = retry_attempts;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_file_values() {
        let args = CliArgs::parse_from([
            "film-map",
            "--year",
            "2010",
            "--location",
            "-33.86, 151.2",
            "--selection",
            "nearest",
            "--on-malformed",
            "abort",
            "--concurrency",
            "3",
        ]);

        let mut config =
            TomlConfig::from_toml_str("[query]\nyear = \"1999\"\n[ranking]\nconcurrency = 1\n")
                .unwrap();
        args.apply(&mut config);

        assert_eq!(config.query.year.as_deref(), Some("2010"));
        assert_eq!(config.query.location.as_deref(), Some("-33.86, 151.2"));
        assert_eq!(config.ranking.selection, SelectionPolicy::Nearest);
        assert_eq!(config.input.on_malformed, MalformedPolicy::Abort);
        assert_eq!(config.ranking.concurrency, 3);
    }

    #[test]
    fn test_resolve_without_config_file() {
        let args = CliArgs::parse_from(["film-map", "-y", "2010"]);
        let config = args.resolve().unwrap();
        assert_eq!(config.query.year.as_deref(), Some("2010"));
        assert!(config.query.location.is_none());
        assert_eq!(config.input.path, "locations.txt");
    }
}
