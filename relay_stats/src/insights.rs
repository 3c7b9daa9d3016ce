use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use aws_sdk_cloudwatchlogs::types::{QueryStatus, ResultField};
use aws_sdk_cloudwatchlogs::Client;
use chrono::{TimeDelta, Utc};
use tabled::Tabled;
use tracing::{debug, info, warn};

use crate::tfstate::LambdaFunction;

const LOG_GROUP_PREFIX: &str = "/aws/lambda/";
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Averages of every `REPORT` line, grouped by log group and configured
/// memory. Covers both the plain text and the JSON log formats.
pub const STATS_QUERY: &str = r#"filter @type = "REPORT"
  | fields coalesce(@duration, record.metrics.durationMs) as DurationInMS,
      coalesce(@billedDuration, record.metrics.billedDurationMs) as BilledDurationInMS,
      coalesce(@memorySize / 1000000, record.metrics.memorySizeMB) as MemorySetInMB,
      coalesce(@maxMemoryUsed / 1000000, record.metrics.maxMemoryUsedMB) as MemoryUsedInMB,
      @log
  | stats avg(DurationInMS) as avgDurationMs,
      avg(BilledDurationInMS) as avgBilledDurationMs,
      avg(MemoryUsedInMB) as avgMemoryMB
    by @log, MemorySetInMB
  | limit 100"#;

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct FunctionStatistics {
    #[tabled(rename = "module")]
    pub module_name: String,
    #[tabled(rename = "function")]
    pub function_name: String,
    #[tabled(rename = "memory set (MB)", display_with = "two_decimals")]
    pub memory_set: f32,
    #[tabled(rename = "avg duration (ms)", display_with = "two_decimals")]
    pub duration: f32,
    #[tabled(rename = "avg billed (ms)", display_with = "two_decimals")]
    pub billed_duration: f32,
    #[tabled(rename = "avg memory used (MB)", display_with = "two_decimals")]
    pub memory_used: f32,
}

fn two_decimals(value: &f32) -> String {
    format!("{value:.2}")
}

pub fn log_group_name(function_name: &str) -> String {
    format!("{LOG_GROUP_PREFIX}{function_name}")
}

/// `@log` values look like `123456789012:/aws/lambda/<function>`.
pub fn function_from_log(log: &str) -> Option<&str> {
    let (_, group) = log.split_once(':')?;
    group.strip_prefix(LOG_GROUP_PREFIX)
}

fn number(row: &[ResultField], name: &str) -> Option<f32> {
    row.iter()
        .find(|field| field.field() == Some(name))?
        .value()?
        .parse()
        .ok()
}

fn map_row(row: &[ResultField], functions: &[LambdaFunction]) -> Option<FunctionStatistics> {
    let log = row.iter().find(|field| field.field() == Some("@log"))?.value()?;
    let function_name = function_from_log(log)?;
    let function = functions.iter().find(|f| f.function_name == function_name)?;

    Some(FunctionStatistics {
        module_name: function.module_name.clone(),
        function_name: function.function_name.clone(),
        memory_set: number(row, "MemorySetInMB")?,
        duration: number(row, "avgDurationMs")?,
        billed_duration: number(row, "avgBilledDurationMs")?,
        memory_used: number(row, "avgMemoryMB")?,
    })
}

/// Maps query rows back to the functions of the state file, sorted by module
/// then configured memory. Rows that cannot be mapped are logged and dropped.
pub fn map_results(
    rows: &[Vec<ResultField>],
    functions: &[LambdaFunction],
) -> Vec<FunctionStatistics> {
    let mut statistics: Vec<FunctionStatistics> = rows
        .iter()
        .filter_map(|row| {
            let mapped = map_row(row, functions);
            if mapped.is_none() {
                warn!(?row, "skipping result row");
            }
            mapped
        })
        .collect();
    statistics.sort_by(|a, b| {
        a.module_name
            .cmp(&b.module_name)
            .then_with(|| a.function_name.cmp(&b.function_name))
            .then_with(|| a.memory_set.total_cmp(&b.memory_set))
    });
    statistics
}

/// Runs [`STATS_QUERY`] over the functions' log groups for the trailing
/// `window` and waits for it to complete.
pub async fn query_statistics(
    client: &Client,
    functions: &[LambdaFunction],
    window: TimeDelta,
) -> Result<Vec<FunctionStatistics>> {
    if functions.is_empty() {
        bail!("no lambda functions to query");
    }

    let end_time = Utc::now();
    let start_time = end_time
        .checked_sub_signed(window)
        .ok_or_else(|| anyhow!("could not calculate start time"))?;

    let mut start_query = client
        .start_query()
        .start_time(start_time.timestamp())
        .end_time(end_time.timestamp())
        .query_string(STATS_QUERY);
    for function in functions {
        start_query = start_query.log_group_names(log_group_name(&function.function_name));
    }
    let started = start_query
        .send()
        .await
        .context("could not start logs insights query")?;
    let query_id = started
        .query_id()
        .ok_or_else(|| anyhow!("logs insights returned no query id"))?;
    info!(query_id, functions = functions.len(), "started logs insights query");

    // queries never finish instantly, so the first check waits a moment
    tokio::time::sleep(Duration::from_secs(1)).await;
    let output = loop {
        let output = client
            .get_query_results()
            .query_id(query_id)
            .send()
            .await
            .context("could not get query results")?;
        match output.status() {
            Some(QueryStatus::Scheduled | QueryStatus::Running) => {
                debug!(query_id, "query still running");
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            Some(QueryStatus::Complete) => break output,
            Some(status) => bail!("query {query_id} ended as {}", status.as_str()),
            None => bail!("query {query_id} has no status"),
        }
    };

    Ok(map_results(output.results(), functions))
}
