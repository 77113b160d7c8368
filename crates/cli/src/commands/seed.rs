use crate::commands::{open_database, run_with_config, CommandResult, EXIT_PERSISTENCE};
use pricewise_db::{SampleCatalog, SqlCatalogRepository};

pub fn run() -> CommandResult {
    run_with_config("seed", |config| async move {
        let pool = open_database(&config).await?;
        let repo = SqlCatalogRepository::new(pool.clone());

        let seeded = SampleCatalog::load(&repo)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), EXIT_PERSISTENCE))?;
        pool.close().await;

        Ok(CommandResult::success_with_data(
            "seed",
            format!("loaded {} sample listings across {} stores", seeded.products, seeded.stores),
            &seeded,
        ))
    })
}
