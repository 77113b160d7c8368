use std::fs;
use std::path::Path;

use pricewise_db::{CatalogRepository, NewCatalogRecord, SqlCatalogRepository};
use serde::Serialize;

use crate::commands::{
    open_database, run_with_config, CommandResult, EXIT_CONFIG, EXIT_PERSISTENCE,
};

#[derive(Debug, Serialize)]
struct ImportSummary {
    imported: usize,
    total_listings: u64,
    stores: usize,
}

/// Loads a JSON array of listings (each naming its `store_name`) into the
/// catalog database.
pub fn run(path: &Path) -> CommandResult {
    let listings = match read_listings(path) {
        Ok(listings) => listings,
        Err(message) => {
            return CommandResult::failure("import", "invalid_input", message, EXIT_CONFIG);
        }
    };

    run_with_config("import", |config| async move {
        let pool = open_database(&config).await?;
        let repo = SqlCatalogRepository::new(pool.clone());
        let persistence = |error: pricewise_db::RepositoryError| {
            ("persistence", error.to_string(), EXIT_PERSISTENCE)
        };

        let imported = listings.len();
        for listing in listings {
            repo.insert(listing).await.map_err(persistence)?;
        }
        let summary = ImportSummary {
            imported,
            total_listings: repo.count().await.map_err(persistence)?,
            stores: repo.list_stores().await.map_err(persistence)?.len(),
        };
        pool.close().await;

        Ok(CommandResult::success_with_data(
            "import",
            format!("imported {imported} listings from `{}`", path.display()),
            &summary,
        ))
    })
}

fn read_listings(path: &Path) -> Result<Vec<NewCatalogRecord>, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("could not read `{}`: {error}", path.display()))?;
    let listings: Vec<NewCatalogRecord> = serde_json::from_str(&raw)
        .map_err(|error| format!("could not parse `{}`: {error}", path.display()))?;

    if let Some(position) = listings.iter().position(|listing| listing.store_name.trim().is_empty())
    {
        return Err(format!("listing {position} in `{}` has no store_name", path.display()));
    }
    Ok(listings)
}
