use crate::analyzers::aggregate::{LineRecords, assemble_dashboard, group_routes_by_line};
use crate::analyzers::service_levels::build_line_history;
use crate::analyzers::types::{
    DashboardDocument, RawServiceRow, RidershipEntry, RouteInfo, ServiceRegimes,
};
use crate::config::DashboardConfig;
use crate::error::DashboardResult;
use crate::fetch::{HttpClient, SourceReader};
use crate::parser::{parse_ridership, parse_routes, parse_service_rows};
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, debug, info};

pub const ROUTES_FILE: &str = "routes.csv";

pub fn service_path(route_id: &str) -> String {
    format!("service/route_id={route_id}.csv")
}

pub fn ridership_path(line_id: &str) -> String {
    format!("ridership/line_id={line_id}.csv")
}

type RecordParser<T> = fn(&[u8], &str, &str) -> DashboardResult<Vec<T>>;

/// Loads the route → line directory. Unlike per-route files it must exist.
pub async fn load_routes<C: HttpClient>(reader: &SourceReader<C>) -> Result<Vec<RouteInfo>> {
    let bytes = reader
        .read(ROUTES_FILE)
        .await?
        .with_context(|| format!("{} not found", reader.locate(ROUTES_FILE)))?;

    let routes = parse_routes(&bytes, ROUTES_FILE)?;
    info!(routes = routes.len(), "Route directory loaded");
    Ok(routes)
}

/// Reads and parses one file per id with at most `concurrency` reads in
/// flight. Each task owns its id and returns its own rows; the results are
/// joined by id once every task has finished. Missing files yield no rows.
async fn load_per_id<C, T>(
    reader: Arc<SourceReader<C>>,
    ids: Vec<String>,
    concurrency: usize,
    path_for: fn(&str) -> String,
    parse: RecordParser<T>,
) -> Result<HashMap<String, Vec<T>>>
where
    C: HttpClient + 'static,
    T: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = Vec::with_capacity(ids.len());

    for id in ids {
        let sem = semaphore.clone();
        let reader = reader.clone();
        let span = tracing::debug_span!("load_records", id = %id);

        tasks.push(tokio::spawn(
            async move {
                let _permit = sem.acquire_owned().await?;
                let path = path_for(&id);

                let rows = match reader.read(&path).await? {
                    Some(bytes) => parse(&bytes, &id, &path)?,
                    None => {
                        debug!(path = %path, "No records, treating as empty history");
                        Vec::new()
                    }
                };
                anyhow::Ok((id, rows))
            }
            .instrument(span),
        ));
    }

    let mut results = HashMap::with_capacity(tasks.len());
    for task in tasks {
        let (id, rows) = task.await??;
        results.insert(id, rows);
    }
    Ok(results)
}

/// Loads scheduled service and ridership for every line in the directory.
#[tracing::instrument(skip(reader, routes), fields(routes = routes.len()))]
pub async fn load_line_records<C: HttpClient + 'static>(
    reader: Arc<SourceReader<C>>,
    routes: &[RouteInfo],
    concurrency: usize,
) -> Result<Vec<LineRecords>> {
    let by_line = group_routes_by_line(routes);

    let route_ids = routes.iter().map(|r| r.route_id.clone()).collect();
    let line_ids = by_line.keys().cloned().collect();

    let mut service: HashMap<String, Vec<RawServiceRow>> = load_per_id(
        reader.clone(),
        route_ids,
        concurrency,
        service_path,
        parse_service_rows,
    )
    .await?;
    let mut ridership: HashMap<String, Vec<RidershipEntry>> =
        load_per_id(reader, line_ids, concurrency, ridership_path, parse_ridership).await?;

    let records = by_line
        .into_iter()
        .filter_map(|(line_id, line_routes)| {
            let line = line_routes.first()?.line_info();
            let service_rows = line_routes
                .iter()
                .flat_map(|r| service.remove(&r.route_id).unwrap_or_default())
                .collect();

            Some(LineRecords {
                line,
                route_ids: line_routes.iter().map(|r| r.route_id.clone()).collect(),
                service_rows,
                ridership: ridership.remove(&line_id).unwrap_or_default(),
            })
        })
        .collect();

    Ok(records)
}

/// Loads every record from `reader` and assembles the dashboard document.
#[tracing::instrument(skip(reader, config), fields(start = %config.start_date))]
pub async fn generate_dashboard<C: HttpClient + 'static>(
    reader: Arc<SourceReader<C>>,
    config: &DashboardConfig,
    concurrency: usize,
) -> Result<DashboardDocument> {
    config.validate()?;

    let routes = load_routes(reader.as_ref()).await?;
    let lines = load_line_records(reader, &routes, concurrency).await?;
    info!(lines = lines.len(), "Records loaded, assembling dashboard");

    let document = assemble_dashboard(config, lines, Utc::now())?;
    Ok(document)
}

/// Summarizes the three regimes of a single line at `date`.
#[tracing::instrument(skip(reader, config))]
pub async fn summarize_line<C: HttpClient + 'static>(
    reader: Arc<SourceReader<C>>,
    config: &DashboardConfig,
    line_id: &str,
    date: NaiveDate,
    concurrency: usize,
) -> Result<ServiceRegimes> {
    config.validate_parameters()?;

    let routes: Vec<RouteInfo> = load_routes(reader.as_ref())
        .await?
        .into_iter()
        .filter(|r| r.line_id == line_id)
        .collect();
    let line = routes
        .first()
        .with_context(|| format!("line '{line_id}' is not in the route directory"))?
        .line_info();

    let route_ids = routes.iter().map(|r| r.route_id.clone()).collect();
    let rows: Vec<RawServiceRow> = load_per_id(
        reader,
        route_ids,
        concurrency,
        service_path,
        parse_service_rows,
    )
    .await?
    .into_values()
    .flatten()
    .collect();

    let history = build_line_history(&line, &rows);
    let regimes = config
        .summarizer()
        .summarize_regimes(&history, date, config.baseline_date)
        .with_context(|| format!("summarizing line '{line_id}'"))?;

    Ok(regimes)
}
