use staybook_db::DemoDataset;

use crate::commands::{build_runtime, load_config, open_migrated, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated(&config).await?;

        let outcome = match DemoDataset::load(&pool).await {
            Ok(seeded) => match DemoDataset::verify(&pool).await {
                Ok(true) => Ok(seeded),
                Ok(false) => Err((
                    "seed_verification",
                    "demo accounts or properties are missing after load".to_string(),
                    6u8,
                )),
                Err(error) => Err(("seed_verification", error.to_string(), 6u8)),
            },
            Err(error) => Err(("seed_execution", error.to_string(), 5u8)),
        };

        pool.close().await;
        outcome
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", seed_message(seeded.accounts_seeded)),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn seed_message(accounts_seeded: usize) -> String {
    let listings = DemoDataset::properties()
        .into_iter()
        .map(|property| format!("  - {}: {} (host {})", property.id.0, property.title, property.owner_id.0))
        .collect::<Vec<_>>();
    format!(
        "demo dataset loaded: {accounts_seeded} accounts, {} listings\n{}",
        listings.len(),
        listings.join("\n")
    )
}
