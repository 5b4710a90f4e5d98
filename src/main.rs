//! CLI entry point for the service & ridership dashboard generator.
//!
//! Provides subcommands for generating the full dashboard document,
//! summarizing a single line's service regimes, and listing the lines in a
//! route directory.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use service_ridership_dashboard::analyzers::aggregate::group_routes_by_line;
use service_ridership_dashboard::analyzers::analyzer::{
    generate_dashboard, load_routes, summarize_line,
};
use service_ridership_dashboard::analyzers::writetos3::publish_snapshot;
use service_ridership_dashboard::{
    config::DashboardConfig,
    fetch::SourceReader,
    output::{print_json, write_snapshot},
    service_date::ServiceDay,
};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "service_ridership_dashboard")]
#[command(about = "Builds weekly service and ridership series for a transit dashboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the dashboard document and write a dated snapshot
    Generate {
        /// Directory or base URL holding routes.csv, service/ and ridership/
        #[arg(short, long, value_name = "DIR_OR_URL")]
        data: String,

        /// JSON run configuration
        #[arg(short, long)]
        config: String,

        /// Last service date of the run (defaults to today's service date)
        #[arg(long)]
        end_date: Option<NaiveDate>,

        /// Directory to write <date>.json and latest.json into
        #[arg(short, long, default_value = "dashboard")]
        output_dir: String,

        /// Optional: S3 bucket name to upload the snapshot to (e.g., "my-bucket")
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Optional: Gzip compress the JSON before uploading to S3
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Maximum number of concurrent record loads
        #[arg(long, default_value_t = 5)]
        concurrency: usize,
    },
    /// Summarize the current, one-year-ago and baseline regimes of one line
    Summarize {
        #[arg(short, long, value_name = "DIR_OR_URL")]
        data: String,

        #[arg(short, long)]
        config: String,

        /// Line id as listed in routes.csv
        #[arg(short, long)]
        line: String,

        /// Reference date (defaults to the configured end date, then today)
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long, default_value_t = 5)]
        concurrency: usize,
    },
    /// List the lines and routes in a route directory
    ListLines {
        #[arg(short, long, value_name = "DIR_OR_URL")]
        data: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/service_ridership_dashboard.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("service_ridership_dashboard.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut clock = ServiceDay::default();

    match cli.command {
        Commands::Generate {
            data,
            config,
            end_date,
            output_dir,
            s3_bucket,
            gzip,
            concurrency,
        } => {
            let config = DashboardConfig::load(&config)?;
            let end_date = end_date
                .or(config.end_date)
                .unwrap_or_else(|| clock.today());
            let config = config.with_end_date(end_date);

            let reader = Arc::new(SourceReader::new(&data)?);
            let document = generate_dashboard(reader, &config, concurrency).await?;

            let snapshot = write_snapshot(Path::new(&output_dir), end_date, &document)?;
            info!(path = %snapshot.display(), lines = document.line_data.len(), "Dashboard written");

            if let Some(bucket) = s3_bucket {
                let aws = aws_config::load_from_env().await;
                let s3 = aws_sdk_s3::Client::new(&aws);
                publish_snapshot(&s3, &bucket, end_date, &document, gzip).await?;
            } else {
                info!("S3 bucket not specified, skipping upload");
            }
        }
        Commands::Summarize {
            data,
            config,
            line,
            date,
            concurrency,
        } => {
            let config = DashboardConfig::load(&config)?;
            let date = date.or(config.end_date).unwrap_or_else(|| clock.today());

            let reader = Arc::new(SourceReader::new(&data)?);
            let regimes = summarize_line(reader, &config, &line, date, concurrency).await?;

            print_json(&regimes)?;
        }
        Commands::ListLines { data } => {
            let reader = SourceReader::new(&data)?;
            let routes = load_routes(&reader).await?;
            let lines = group_routes_by_line(&routes);

            info!(total = lines.len(), "Line list loaded");

            for (line_id, line_routes) in &lines {
                let route_ids: Vec<&str> = line_routes.iter().map(|r| r.route_id.as_str()).collect();
                let name = line_routes
                    .first()
                    .map(|r| r.line_long_name.as_str())
                    .unwrap_or("");

                info!(
                    line_id = %line_id,
                    line_name = %name,
                    routes = %route_ids.join(","),
                    "Line"
                );
            }
        }
    }

    Ok(())
}
