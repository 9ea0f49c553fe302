use anyhow::{bail, Context};
use clap::Parser;
use mev_core::config::AppConfig;
use mev_core::model::OperationRecord;
use mev_core::store::{InMemoryCatalog, OperationRegistry};
use mev_core::InputValidator;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "mev-validate")]
#[command(about = "Validate submitted inputs against an operation definition", long_about = None)]
struct Args {
    /// Operation definition (JSON)
    operation: PathBuf,

    /// Submitted inputs keyed by input name (JSON)
    inputs: PathBuf,
}

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();

    let config = AppConfig::load()?;
    let registry = config.resource_type_registry();
    log::info!("Resource type registry: {} types", registry.len());

    let catalog = match &config.catalog.path {
        Some(path) => InMemoryCatalog::load_snapshot(path)?,
        None => {
            log::warn!("No catalog snapshot configured; every resource reference will fail");
            InMemoryCatalog::new()
        }
    };

    let record: OperationRecord = read_json(&args.operation)?;
    let operations = OperationRegistry::new();
    let operation = match operations.ingest(&record, &registry) {
        Ok(op) => op,
        Err(e) => bail!("Operation definition rejected: {}", e),
    };

    let payload: Map<String, Value> = read_json(&args.inputs)?;
    let context = config.submission_context();
    log::info!(
        "Validating inputs for '{}' as user {} in workspace {}",
        operation.name,
        context.user_id,
        context.workspace_id
    );

    match InputValidator::new(&catalog).validate_submission(&operation, &payload, &context) {
        Ok(values) => {
            println!("{}", serde_json::to_string_pretty(&values)?);
            Ok(())
        }
        Err(errors) => {
            println!("{}", serde_json::to_string_pretty(&errors)?);
            log::error!("{}", errors);
            std::process::exit(1);
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_take_two_paths() {
        let args = Args::try_parse_from(["mev-validate", "op.json", "inputs.json"]).unwrap();
        assert_eq!(args.operation, PathBuf::from("op.json"));
        assert_eq!(args.inputs, PathBuf::from("inputs.json"));
    }

    #[test]
    fn test_args_reject_missing_or_extra_paths() {
        assert!(Args::try_parse_from(["mev-validate", "op.json"]).is_err());
        assert!(Args::try_parse_from(["mev-validate"]).is_err());
        assert!(Args::try_parse_from(["mev-validate", "a.json", "b.json", "c.json"]).is_err());
    }
}
