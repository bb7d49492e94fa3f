//! `camwatch check`: one-shot discovery report.
//!
//! Builds the device table exactly as the daemon does at startup (live
//! resolution, then cache, then unknown) and prints it. Device health
//! never affects the exit code.

use std::fmt::Write;

use owo_colors::OwoColorize;
use tabled::Tabled;

use camwatch_config::Config;
use camwatch_core::{AddressSource, DeviceReport, Monitor};

use crate::cli::{CheckArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Bus address")]
    bus_address: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Symlink target")]
    target: String,
}

impl From<&DeviceReport> for DeviceRow {
    fn from(r: &DeviceReport) -> Self {
        Self {
            device: r.path.display().to_string(),
            bus_address: r
                .bus_address
                .as_ref()
                .map_or_else(|| "-".into(), ToString::to_string),
            source: r.source.to_string(),
            status: if r.healthy { "EXISTS" } else { "MISSING" },
            target: if r.is_symlink {
                r.resolved_path.display().to_string()
            } else {
                "-".into()
            },
        }
    }
}

pub async fn handle(config: &Config, args: &CheckArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let watchdog = config.to_watchdog_config()?;
    let cache_file = watchdog.cache_file.clone();
    let mut monitor = Monitor::new(watchdog, config.resolver(), config.driver_control())?;

    let reports = monitor.discover().await;

    if args.json {
        output::print_output(&output::render_json(&reports)?);
        return Ok(());
    }

    let rows: Vec<DeviceRow> = reports.iter().map(DeviceRow::from).collect();
    output::print_output(&output::render_table(&rows));
    output::print_output(&summary(&reports, output::should_color(global.color)));
    output::print_output(&format!("cache: {}", cache_file.display()));
    Ok(())
}

fn summary(reports: &[DeviceReport], color: bool) -> String {
    let present = reports.iter().filter(|r| r.healthy).count();
    let unknown = reports
        .iter()
        .filter(|r| r.source == AddressSource::Unknown)
        .count();

    let mut line = format!("{present}/{} cameras present", reports.len());
    if unknown > 0 {
        let _ = write!(line, ", {unknown} without a bus address");
    }

    match (color, present == reports.len() && unknown == 0) {
        (false, _) => line,
        (true, true) => line.green().to_string(),
        (true, false) => line.yellow().to_string(),
    }
}
