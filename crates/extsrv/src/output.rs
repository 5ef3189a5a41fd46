use std::collections::BTreeMap;
use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use extsrv_adapter::HealthStatus;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
pub struct ServiceStatus<'a> {
    pub service: &'a str,
    pub status: &'static str,
    pub serving: bool,
}

impl<'a> ServiceStatus<'a> {
    pub fn new(service: &'a str, status: HealthStatus) -> Self {
        Self {
            service,
            status: status.name(),
            serving: status == HealthStatus::Serving,
        }
    }
}

/// One health answer, e.g. from `check` or a `watch` update.
pub fn print_status(service: &str, status: HealthStatus, format: OutputFormat) {
    let row = ServiceStatus::new(service, status);
    match format {
        OutputFormat::Json => print_json(&row),
        OutputFormat::Table => print_table(&[row]),
        OutputFormat::Pretty => println!("{}: {}", display_service(row.service), row.status),
    }
}

pub fn print_statuses(statuses: &BTreeMap<String, HealthStatus>, format: OutputFormat) {
    let rows: Vec<ServiceStatus<'_>> = statuses
        .iter()
        .map(|(service, status)| ServiceStatus::new(service, *status))
        .collect();
    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => print_table(&rows),
        OutputFormat::Pretty => {
            for row in &rows {
                println!("{}: {}", display_service(row.service), row.status);
            }
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(rows: &[ServiceStatus<'_>]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["SERVICE", "STATUS"]);
    for row in rows {
        table.add_row(vec![display_service(row.service), row.status]);
    }
    println!("{table}");
}

/// The empty service name means "the server as a whole".
fn display_service(service: &str) -> &str {
    if service.is_empty() {
        "(server)"
    } else {
        service
    }
}
