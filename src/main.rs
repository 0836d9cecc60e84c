use lake_datasource::frame::Frame;
use lake_datasource::{
    DataQueryRequest, HealthStatus, LakeConfig, LakeDatasource, LakeQuery, ScopedVar, ScopedVars,
    TimeRange,
};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lake-datasource")]
#[command(about = "Query a Zed lake and shape the results into chartable frames")]
#[command(version)]
struct Args {
    /// Lake service URL (or set LAKE_URL env var)
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the lake is reachable and report its version
    Test,
    /// List the pools in the lake
    Pools,
    /// Run a single query target
    Query {
        /// Pool to read from, in pool[@branch] form
        #[arg(short, long)]
        pool: Option<String>,

        /// Field holding the time of each record
        #[arg(short, long, default_value = "ts")]
        time_field: String,

        /// Query text placed between the range filter and the sort
        #[arg(short, long, default_value = "*")]
        query_text: String,

        /// Start of the range (default: one hour before --to)
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// End of the range (default: now)
        #[arg(long)]
        to: Option<DateTime<Utc>>,

        /// Template variable, as name=value (repeatable)
        #[arg(long = "var")]
        vars: Vec<String>,

        /// Print the frame as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Run every target of a JSON request file concurrently
    Request {
        /// Path to a request with targets, range and scopedVars
        path: PathBuf,

        /// Print results as JSON instead of tables
        #[arg(long)]
        json: bool,
    },
}

fn parse_vars(raw: &[String]) -> Result<ScopedVars> {
    let mut vars = ScopedVars::new();
    for item in raw {
        let (name, value) = item
            .split_once('=')
            .ok_or_else(|| anyhow!("Variable '{}' must be written as name=value", item))?;
        vars.insert(name.to_string(), ScopedVar::new(value));
    }
    Ok(vars)
}

fn print_frame(frame: &Frame) -> Result<()> {
    for notice in &frame.notices {
        println!("[{}] {}", frame.ref_id, notice.text);
    }
    if !frame.fields.is_empty() {
        println!("[{}]\n{}", frame.ref_id, frame.to_dataframe()?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match args.url {
        Some(url) => LakeConfig::new(url),
        None => LakeConfig::from_env(),
    };
    info!("Using lake at {}", config.url);
    let datasource = LakeDatasource::from_config(&config)?;

    match args.command {
        Commands::Test => {
            let result = datasource.test_datasource().await;
            println!("{}", result.message);
            if let Some(details) = &result.details {
                println!("  {}", details.verbose_message);
            }
            if result.status == HealthStatus::Error {
                bail!("Health check failed");
            }
        }
        Commands::Pools => {
            for pool in datasource.pools().await? {
                println!("{}", pool);
            }
        }
        Commands::Query {
            pool,
            time_field,
            query_text,
            from,
            to,
            vars,
            json,
        } => {
            let to = to.unwrap_or_else(Utc::now);
            let from = from.unwrap_or(to - Duration::hours(1));
            let mut target = LakeQuery::new("A")
                .with_time_field(time_field)
                .with_query_text(query_text);
            target.pool = pool;

            let frame = datasource
                .query_target(&target, &TimeRange::new(from, to), &parse_vars(&vars)?)
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&frame)?);
            } else {
                print_frame(&frame)?;
            }
        }
        Commands::Request { path, json } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let request: DataQueryRequest = serde_json::from_str(&text)
                .with_context(|| format!("Invalid request in {}", path.display()))?;

            let response = datasource.query(request).await;
            let failures = response.data.iter().filter(|r| r.error.is_some()).count();

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                for result in &response.data {
                    match (&result.frame, &result.error) {
                        (Some(frame), _) => print_frame(frame)?,
                        (None, Some(err)) => println!("[{}] error: {}", result.ref_id, err.message),
                        (None, None) => {}
                    }
                }
            }

            if failures > 0 {
                bail!("{} of {} target(s) failed", failures, response.data.len());
            }
        }
    }

    Ok(())
}
