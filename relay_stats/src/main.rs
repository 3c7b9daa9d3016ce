use std::path::PathBuf;

use anyhow::{Context, Result};
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use chrono::TimeDelta;
use clap::Parser;
use relay_stats::insights::query_statistics;
use relay_stats::tfstate::TerraformState;
use tabled::settings::Style;
use tabled::Table;
use tracing::info;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct CliArgs {
    /// Path to terraform tfstate
    tfstate_path: PathBuf,
    /// How many hours of logs to aggregate
    #[arg(long, default_value_t = 12, value_parser = clap::value_parser!(i64).range(1..))]
    hours: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    let text = tokio::fs::read_to_string(&args.tfstate_path)
        .await
        .with_context(|| format!("could not read {}", args.tfstate_path.display()))?;
    let state = TerraformState::from_json(&text).context("could not deserialize TF state")?;
    let functions = state.lambda_functions();
    info!(count = functions.len(), "found lambda functions in state");

    let region_provider = RegionProviderChain::default_provider().or_else("us-east-1");
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(region_provider)
        .load()
        .await;
    let client = aws_sdk_cloudwatchlogs::Client::new(&sdk_config);

    let window = TimeDelta::try_hours(args.hours).context("--hours is out of range")?;
    let statistics = query_statistics(&client, &functions, window).await?;

    let mut table = Table::new(statistics);
    table.with(Style::psql());
    println!("Results:\n{table}");

    Ok(())
}
