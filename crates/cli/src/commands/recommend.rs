use pricewise_core::domain::product::ProductId;

use crate::commands::{
    application_failure, build_index, open_database, run_with_config, CommandResult,
};

pub fn run(product_id: i64, top_n: Option<usize>) -> CommandResult {
    run_with_config("recommend", |config| async move {
        let pool = open_database(&config).await?;
        let service = build_index(&pool, &config).await?;
        pool.close().await;

        let recommendations =
            service.recommend(ProductId(product_id), top_n).map_err(application_failure)?;
        Ok(CommandResult::success_with_data(
            "recommend",
            format!("{} recommendations for product {product_id}", recommendations.len()),
            &recommendations,
        ))
    })
}
