use crate::commands::{build_index, open_database, run_with_config, CommandResult};

pub fn run(query: &str, top_n: Option<usize>) -> CommandResult {
    run_with_config("search", |config| async move {
        let pool = open_database(&config).await?;
        let service = build_index(&pool, &config).await?;
        pool.close().await;

        let results = service.search(query, top_n);
        Ok(CommandResult::success_with_data(
            "search",
            format!("{} groups matched `{query}`", results.len()),
            &results,
        ))
    })
}
