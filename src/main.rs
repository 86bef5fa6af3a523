//! Timestream Datasource CLI
//!
//! - `serve`: run the HTTP API for a dashboard host
//! - `query`: run one query and print its frames
//! - `cancel`: cancel a running query
//! - `health`: check the connection
//! - `init-config`: print a default config file
//!
//! `--fixture` replays recorded service responses instead of calling the
//! live service, which needs the `aws` feature.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use timestream_datasource::api::{serve, AppState};
use timestream_datasource::config::{generate_default_config, Config, LoggingConfig};
use timestream_datasource::datasource::{
    Datasource, HealthStatus, QueryDataRequest, ResourceMethod, ResourceResponse,
};
use timestream_datasource::frame::{table, Frame};
use timestream_datasource::models::{DataQuery, DatasourceSettings, FormatOption, TimeRange};
use timestream_datasource::runner::{FixtureRunner, QueryRunner};

#[derive(Parser)]
#[command(name = "timestream-datasource")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Timestream backend for dashboard hosts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Recorded service responses to replay, one file per page
    #[arg(long, global = true)]
    fixture: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one query and print its frames
    Query {
        /// Query text; macros such as $__timeFilter are expanded
        query: String,
        /// Result layout
        #[arg(short, long, value_enum, default_value = "table")]
        format: Layout,
        /// Time range ending now (e.g. 15m, 6h, 7d)
        #[arg(short, long, default_value = "1h")]
        last: String,
        /// Fetch every page before printing
        #[arg(short, long)]
        wait: bool,
        /// Keep printing continuation pages as they arrive
        #[arg(long, conflicts_with = "wait")]
        follow: bool,
        #[arg(long)]
        database: Option<String>,
        #[arg(long)]
        table: Option<String>,
        #[arg(long)]
        measure: Option<String>,
        #[arg(long, default_value = "1024")]
        max_data_points: i64,
        /// Print frames as JSON instead of text tables
        #[arg(long)]
        json: bool,
    },

    /// Cancel a running query
    Cancel {
        query_id: String,
    },

    /// Check the connection to the query service
    Health,

    /// Print a default config file
    InitConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum Layout {
    Table,
    TimeSeries,
}

impl From<Layout> for FormatOption {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Table => FormatOption::Table,
            Layout::TimeSeries => FormatOption::TimeSeries,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig = cli.command {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_tracing(&config.logging);

    let settings = config.datasource.settings();
    let runner = build_runner(&cli.fixture, &settings).await?;
    let datasource = Datasource::new(config.datasource.uid.clone(), settings, runner)
        .with_tick(config.streaming.tick());

    match cli.command {
        Commands::Serve { host, port } => {
            let mut api_config = config.api.clone();
            if let Some(host) = host {
                api_config.host = host;
            }
            if let Some(port) = port {
                api_config.port = port;
            }
            tracing::info!("Starting datasource API v{}", env!("CARGO_PKG_VERSION"));
            let state = AppState::new(Arc::new(datasource), api_config.clone());
            serve(state, &api_config).await?;
        }
        Commands::Query {
            query,
            format,
            last,
            wait,
            follow,
            database,
            table,
            measure,
            max_data_points,
            json,
        } => {
            let range = TimeRange::last(parse_duration(&last)?);
            let document = serde_json::json!({
                "rawQuery": query,
                "database": database.unwrap_or_default(),
                "table": table.unwrap_or_default(),
                "measure": measure.unwrap_or_default(),
                "waitForResult": wait,
                "format": FormatOption::from(format),
            });
            let request = QueryDataRequest {
                queries: vec![DataQuery {
                    ref_id: "A".to_string(),
                    time_range: range,
                    max_data_points,
                    json: document,
                    ..Default::default()
                }],
            };

            let mut response = datasource.query_data(&request).await;
            let Some(result) = response.responses.remove("A") else {
                anyhow::bail!("no response for query");
            };
            if let Some(error) = result.error {
                let source = result
                    .error_source
                    .map(|s| format!("{:?}", s).to_lowercase())
                    .unwrap_or_default();
                anyhow::bail!("query failed ({}): {}", source, error);
            }

            let query_id = result
                .frames
                .first()
                .and_then(|f| f.custom_meta())
                .filter(|m| m.has_more())
                .map(|m| m.query_id.clone());
            for frame in &result.frames {
                print_frame(frame, json)?;
            }

            match query_id {
                Some(query_id) if follow => {
                    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
                    let datasource = Arc::new(datasource);
                    let run = {
                        let datasource = Arc::clone(&datasource);
                        tokio::spawn(async move { datasource.run_stream(&query_id, tx).await })
                    };
                    while let Some(frame) = rx.recv().await {
                        print_frame(&frame, json)?;
                    }
                    run.await??;
                }
                Some(query_id) => {
                    eprintln!(
                        "more pages available for query {} (use --wait or --follow)",
                        query_id
                    );
                }
                None => {}
            }
        }
        Commands::Cancel { query_id } => {
            let body = serde_json::to_vec(&serde_json::json!({ "queryId": query_id }))?;
            match datasource
                .call_resource("cancel", ResourceMethod::Post, &body)
                .await?
            {
                ResourceResponse::Text(text) => println!("{}", text),
                ResourceResponse::Json(value) => println!("{}", value),
            }
        }
        Commands::Health => {
            let result = datasource.check_health().await;
            println!("{}", result.message);
            if result.status == HealthStatus::Error {
                std::process::exit(1);
            }
        }
        Commands::InitConfig => {}
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("timestream_datasource={},tower_http=info", logging.level).into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn build_runner(
    fixtures: &[PathBuf],
    settings: &DatasourceSettings,
) -> anyhow::Result<Arc<dyn QueryRunner>> {
    if fixtures.is_empty() {
        return service_runner(settings).await;
    }
    let runner = FixtureRunner::from_files(fixtures)
        .context("loading recorded responses")?
        .repeat_last();
    Ok(Arc::new(runner))
}

#[cfg(feature = "aws")]
async fn service_runner(settings: &DatasourceSettings) -> anyhow::Result<Arc<dyn QueryRunner>> {
    let runner = timestream_datasource::runner::TimestreamRunner::connect(settings).await?;
    Ok(Arc::new(runner))
}

#[cfg(not(feature = "aws"))]
async fn service_runner(_settings: &DatasourceSettings) -> anyhow::Result<Arc<dyn QueryRunner>> {
    anyhow::bail!("built without the `aws` feature; pass --fixture to replay recorded responses")
}

fn print_frame(frame: &Frame, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(frame)?);
    } else {
        if !frame.name.is_empty() {
            println!("{}", frame.name);
        }
        println!("{}", table::render(frame));
    }
    Ok(())
}

fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim().to_lowercase();

    if let Some(seconds) = s.strip_suffix('s') {
        Ok(Duration::seconds(seconds.parse()?))
    } else if let Some(minutes) = s.strip_suffix('m') {
        Ok(Duration::minutes(minutes.parse()?))
    } else if let Some(hours) = s.strip_suffix('h') {
        Ok(Duration::hours(hours.parse()?))
    } else if let Some(days) = s.strip_suffix('d') {
        Ok(Duration::days(days.parse()?))
    } else if let Some(weeks) = s.strip_suffix('w') {
        Ok(Duration::weeks(weeks.parse()?))
    } else {
        anyhow::bail!("Invalid duration format: {}. Use: 30s, 15m, 6h, 7d, 2w", s)
    }
}
