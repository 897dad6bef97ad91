use std::path::Path;

use log::info;
use serde::Serialize;

use crate::{
    cache::LocalRepository,
    model::{CheckStatus, DependencySnapshot},
};

const VERSION: i64 = 1;

#[derive(Debug, Serialize)]
struct Report<'a> {
    version: i64,
    snapshot: u64,
    dependencies: Vec<ReportEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct ReportEntry<'a> {
    group: &'a str,
    artifact: &'a str,
    version: &'a str,
    packaging: &'a str,
    status: CheckStatus,
    local_path: String,
    exists_locally: bool,
    exists_in_remote: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upload_url: Option<&'a str>,
}

pub fn render_report(
    snapshot: &DependencySnapshot,
    local: &LocalRepository,
) -> Result<String, toml::ser::Error> {
    let dependencies = snapshot
        .records()
        .iter()
        .map(|record| {
            let coordinate = record.coordinate();
            ReportEntry {
                group: coordinate.group(),
                artifact: coordinate.artifact(),
                version: coordinate.version(),
                packaging: coordinate.packaging(),
                status: record.status(),
                local_path: local
                    .actual_or_expected_path(record)
                    .display()
                    .to_string(),
                exists_locally: local.local_file_exists(record),
                exists_in_remote: record.exists_in_remote(),
                error: record.error_message(),
                upload_url: record.upload_url.as_deref(),
            }
        })
        .collect();

    toml::to_string_pretty(&Report {
        version: VERSION,
        snapshot: snapshot.version(),
        dependencies,
    })
}

pub fn write_report(
    snapshot: &DependencySnapshot,
    local: &LocalRepository,
    path: &Path,
) -> anyhow::Result<()> {
    std::fs::write(path, render_report(snapshot, local)?)?;
    info!("Wrote report to {}", path.display());
    Ok(())
}
