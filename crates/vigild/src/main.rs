#![forbid(unsafe_code)]

mod cli;
mod startup;

use std::path::Path;

use anyhow::Result;
use infrastructure::config::ServiceConfig;

use cli::Command;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::parse();

    match cli.command {
        Some(Command::Version) => {
            println!("vigild {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }

        Some(Command::Validate) => {
            let config = ServiceConfig::load(Path::new(&cli.config))?;
            println!(
                "configuration OK: {} rule(s), store backend {:?}",
                config.rules.len(),
                config.store.backend
            );
            Ok(())
        }

        None => startup::run(&cli).await,
    }
}
