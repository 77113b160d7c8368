pub mod config;
pub mod doctor;
pub mod import;
pub mod lookup;
pub mod migrate;
pub mod recommend;
pub mod search;
pub mod seed;

use std::future::Future;
use std::sync::Arc;

use pricewise_core::config::{AppConfig, LoadOptions};
use pricewise_core::errors::ApplicationError;
use pricewise_core::search::SearchService;
use pricewise_db::{connect_with_config, migrations, DbPool, SqlCatalogRepository};
use serde::Serialize;
use serde_json::Value;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_DB_CONNECTIVITY: u8 = 4;
pub const EXIT_PERSISTENCE: u8 = 5;
pub const EXIT_NOT_FOUND: u8 = 6;

/// (error class, message, exit code)
pub(crate) type CommandFailure = (&'static str, String, u8);

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::finish(command, message.into(), None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: &impl Serialize,
    ) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self::finish(command, message.into(), Some(value)),
            Err(error) => Self::failure(
                command,
                "serialization",
                format!("failed to serialize command data: {error}"),
                EXIT_RUNTIME,
            ),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    fn finish(command: &str, message: String, data: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message,
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Loads configuration, starts a single-threaded runtime and drives `body`
/// to completion, folding every failure into a structured outcome.
pub(crate) fn run_with_config<F, Fut>(command: &'static str, body: F) -> CommandResult
where
    F: FnOnce(AppConfig) -> Fut,
    Fut: Future<Output = Result<CommandResult, CommandFailure>>,
{
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            );
        }
    };

    match runtime.block_on(body(config)) {
        Ok(result) => result,
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(command, error_class, message, exit_code)
        }
    }
}

/// Connects and applies pending migrations so every command sees the schema.
pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, CommandFailure> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), EXIT_PERSISTENCE))?;
    Ok(pool)
}

pub(crate) async fn build_index(
    pool: &DbPool,
    config: &AppConfig,
) -> Result<SearchService, CommandFailure> {
    let source = Arc::new(SqlCatalogRepository::new(pool.clone()));
    let service = SearchService::new(source, config.search.clone());
    service.refresh().await.map_err(application_failure)?;
    Ok(service)
}

pub(crate) fn application_failure(error: ApplicationError) -> CommandFailure {
    if error.is_not_found() {
        ("not_found", error.to_string(), EXIT_NOT_FOUND)
    } else {
        ("persistence", error.to_string(), EXIT_PERSISTENCE)
    }
}
