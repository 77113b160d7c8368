use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::SearchSettings;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub search: SearchSettings,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    /// Zero disables the periodic index refresh.
    pub refresh_interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub default_top_n: Option<usize>,
    pub cache_capacity: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://pricewise.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
                refresh_interval_secs: 0,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            search: SearchSettings::default(),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("pricewise.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(refresh_interval_secs) = server.refresh_interval_secs {
                self.server.refresh_interval_secs = refresh_interval_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(search) = patch.search {
            self.apply_search_patch(search);
        }
    }

    fn apply_search_patch(&mut self, search: SearchPatch) {
        let settings = &mut self.search;
        if let Some(default_top_n) = search.default_top_n {
            settings.default_top_n = default_top_n;
        }
        if let Some(max_vocabulary) = search.max_vocabulary {
            settings.max_vocabulary = max_vocabulary;
        }
        if let Some(cache_capacity) = search.cache_capacity {
            settings.cache_capacity = cache_capacity;
        }

        if let Some(grouping) = search.grouping {
            let thresholds = &mut settings.grouping;
            if let Some(value) = grouping.quantity_tolerance {
                thresholds.quantity_tolerance = value;
            }
            if let Some(value) = grouping.price_ratio_min {
                thresholds.price_ratio_min = value;
            }
            if let Some(value) = grouping.price_ratio_max {
                thresholds.price_ratio_max = value;
            }
            if let Some(value) = grouping.token_overlap_min {
                thresholds.token_overlap_min = value;
            }
        }

        if let Some(ranking) = search.ranking {
            let weights = &mut settings.ranking;
            if let Some(value) = ranking.similarity_weight {
                weights.similarity = value;
            }
            if let Some(value) = ranking.price_weight {
                weights.price = value;
            }
            if let Some(value) = ranking.brand_weight {
                weights.brand = value;
            }
            if let Some(value) = ranking.unbranded_score {
                weights.unbranded_score = value;
            }
        }

        if let Some(recommendation) = search.recommendation {
            let weights = &mut settings.recommendation;
            if let Some(value) = recommendation.brand_weight {
                weights.brand = value;
            }
            if let Some(value) = recommendation.category_weight {
                weights.category = value;
            }
            if let Some(value) = recommendation.similarity_weight {
                weights.similarity = value;
            }
            if let Some(value) = recommendation.premium_penalty {
                weights.premium_penalty = value;
            }
            if let Some(value) = recommendation.min_score {
                weights.min_score = value;
            }
            if let Some(value) = recommendation.candidate_pool {
                weights.candidate_pool = value;
            }
            if let Some(value) = recommendation.default_top_n {
                weights.default_top_n = value;
            }
            if let Some(value) = recommendation.similar_price_min {
                weights.similar_price_min = value;
            }
            if let Some(value) = recommendation.similar_price_max {
                weights.similar_price_max = value;
            }
            if let Some(value) = recommendation.premium_ratio {
                weights.premium_ratio = value;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PRICEWISE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("PRICEWISE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_env("PRICEWISE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("PRICEWISE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PRICEWISE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PRICEWISE_SERVER_PORT") {
            self.server.port = parse_env("PRICEWISE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("PRICEWISE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_SERVER_REFRESH_INTERVAL_SECS") {
            self.server.refresh_interval_secs =
                parse_env("PRICEWISE_SERVER_REFRESH_INTERVAL_SECS", &value)?;
        }

        let log_level =
            read_env("PRICEWISE_LOGGING_LEVEL").or_else(|| read_env("PRICEWISE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PRICEWISE_LOGGING_FORMAT").or_else(|| read_env("PRICEWISE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("PRICEWISE_SEARCH_DEFAULT_TOP_N") {
            self.search.default_top_n = parse_env("PRICEWISE_SEARCH_DEFAULT_TOP_N", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_SEARCH_MAX_VOCABULARY") {
            self.search.max_vocabulary = parse_env("PRICEWISE_SEARCH_MAX_VOCABULARY", &value)?;
        }
        if let Some(value) = read_env("PRICEWISE_SEARCH_CACHE_CAPACITY") {
            self.search.cache_capacity = parse_env("PRICEWISE_SEARCH_CACHE_CAPACITY", &value)?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(default_top_n) = overrides.default_top_n {
            self.search.default_top_n = default_top_n;
        }
        if let Some(cache_capacity) = overrides.cache_capacity {
            self.search.cache_capacity = cache_capacity;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        self.search.validate().map_err(ConfigError::Validation)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("pricewise.toml"), PathBuf::from("config/pricewise.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
    search: Option<SearchPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    refresh_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPatch {
    default_top_n: Option<usize>,
    max_vocabulary: Option<usize>,
    cache_capacity: Option<usize>,
    grouping: Option<GroupingPatch>,
    ranking: Option<RankingPatch>,
    recommendation: Option<RecommendationPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct GroupingPatch {
    quantity_tolerance: Option<f64>,
    price_ratio_min: Option<f64>,
    price_ratio_max: Option<f64>,
    token_overlap_min: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RankingPatch {
    similarity_weight: Option<f64>,
    price_weight: Option<f64>,
    brand_weight: Option<f64>,
    unbranded_score: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationPatch {
    brand_weight: Option<f64>,
    category_weight: Option<f64>,
    similarity_weight: Option<f64>,
    premium_penalty: Option<f64>,
    min_score: Option<f64>,
    candidate_pool: Option<usize>,
    default_top_n: Option<usize>,
    similar_price_min: Option<f64>,
    similar_price_max: Option<f64>,
    premium_ratio: Option<f64>,
}
