use bazaar_db::{seed_catalog, InMemoryProductCatalog, ProductCatalog};

use crate::commands::{block_on_runtime, CommandResult};

pub fn run() -> CommandResult {
    let runtime = match block_on_runtime("catalog") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let listed = runtime.block_on(async {
        let catalog = InMemoryProductCatalog::default();
        seed_catalog(&catalog).await?;
        catalog.list().await
    });

    match listed {
        Ok(products) => match serde_json::to_value(&products) {
            Ok(data) => CommandResult::success_with_data(
                "catalog",
                format!("{} demo listings", products.len()),
                Some(data),
            ),
            Err(error) => CommandResult::failure("catalog", "serialization", error.to_string(), 5),
        },
        Err(error) => CommandResult::failure("catalog", "catalog_seed", error.to_string(), 4),
    }
}
