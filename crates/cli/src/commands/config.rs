use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use pricewise_core::config::{AppConfig, LoadOptions};
use toml::Value;

/// Renders every effective setting with the layer it came from.
pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_keys) in effective_values(&config) {
        let source =
            field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(format!("- {key_path} = {value} (source: {source})"));
    }

    lines.join("\n")
}

type Entry = (&'static str, String, &'static [&'static str]);

fn entry(key_path: &'static str, value: impl ToString, env_keys: &'static [&'static str]) -> Entry {
    (key_path, value.to_string(), env_keys)
}

fn effective_values(config: &AppConfig) -> Vec<Entry> {
    let search = &config.search;
    vec![
        entry("database.url", &config.database.url, &["PRICEWISE_DATABASE_URL"]),
        entry(
            "database.max_connections",
            config.database.max_connections,
            &["PRICEWISE_DATABASE_MAX_CONNECTIONS"],
        ),
        entry(
            "database.timeout_secs",
            config.database.timeout_secs,
            &["PRICEWISE_DATABASE_TIMEOUT_SECS"],
        ),
        entry(
            "server.bind_address",
            &config.server.bind_address,
            &["PRICEWISE_SERVER_BIND_ADDRESS"],
        ),
        entry("server.port", config.server.port, &["PRICEWISE_SERVER_PORT"]),
        entry(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs,
            &["PRICEWISE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        entry(
            "server.refresh_interval_secs",
            config.server.refresh_interval_secs,
            &["PRICEWISE_SERVER_REFRESH_INTERVAL_SECS"],
        ),
        entry(
            "logging.level",
            &config.logging.level,
            &["PRICEWISE_LOGGING_LEVEL", "PRICEWISE_LOG_LEVEL"],
        ),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            &["PRICEWISE_LOGGING_FORMAT", "PRICEWISE_LOG_FORMAT"],
        ),
        entry("search.default_top_n", search.default_top_n, &["PRICEWISE_SEARCH_DEFAULT_TOP_N"]),
        entry("search.max_vocabulary", search.max_vocabulary, &["PRICEWISE_SEARCH_MAX_VOCABULARY"]),
        entry("search.cache_capacity", search.cache_capacity, &["PRICEWISE_SEARCH_CACHE_CAPACITY"]),
        entry("search.grouping.price_ratio_min", search.grouping.price_ratio_min, &[]),
        entry("search.grouping.price_ratio_max", search.grouping.price_ratio_max, &[]),
        entry("search.grouping.token_overlap_min", search.grouping.token_overlap_min, &[]),
        entry("search.ranking.similarity", search.ranking.similarity, &[]),
        entry("search.ranking.price", search.ranking.price, &[]),
        entry("search.ranking.brand", search.ranking.brand, &[]),
        entry("search.recommendation.min_score", search.recommendation.min_score, &[]),
        entry("search.recommendation.default_top_n", search.recommendation.default_top_n, &[]),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("pricewise.toml"), PathBuf::from("config/pricewise.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if config_file_doc.is_some_and(|doc| contains_path(doc, key_path)) {
        let file_path = config_file_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        return format!("file ({file_path})");
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    key_path
        .split('.')
        .try_fold(root, |current, key| current.get(key))
        .is_some()
}
