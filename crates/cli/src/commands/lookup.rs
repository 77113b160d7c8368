use pricewise_core::domain::product::ProductId;

use crate::commands::{
    application_failure, build_index, open_database, run_with_config, CommandResult,
};

pub fn run(product_id: i64) -> CommandResult {
    run_with_config("lookup", |config| async move {
        let pool = open_database(&config).await?;
        let service = build_index(&pool, &config).await?;
        pool.close().await;

        let record = service.lookup(ProductId(product_id)).map_err(application_failure)?;
        Ok(CommandResult::success_with_data(
            "lookup",
            format!("product {product_id} is `{}` at {}", record.name, record.store_name),
            &record,
        ))
    })
}
