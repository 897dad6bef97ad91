use std::path::Path;

use anyhow::bail;
use log::{debug, info, warn};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    check::CheckSummary,
    model::{CheckStatus, DependencySnapshot, StatusUpdate},
    report::write_report,
    Pomcheck,
};

/// Handler to modules command
pub fn do_modules(pomcheck: &Pomcheck) -> anyhow::Result<()> {
    let scan = pomcheck.scan();
    for descriptor in &scan.descriptors {
        println!("{}", descriptor);
    }
    for warning in &scan.warnings {
        eprintln!("warning: {}", warning);
    }
    Ok(())
}

/// Handler to list command
pub fn do_list(pomcheck: &Pomcheck) -> anyhow::Result<()> {
    let snapshot = pomcheck.snapshot();
    let local = pomcheck.local_repository();
    for record in snapshot.records() {
        let presence = if local.local_file_exists(record) {
            "local"
        } else {
            "absent"
        };
        println!(
            "{}\t{}\t{}",
            record.coordinate(),
            presence,
            local.actual_or_expected_path(record).display()
        );
    }
    info!(
        "{} distinct dependencies, local repository {}",
        snapshot.len(),
        local.location().display()
    );
    Ok(())
}

/// Handler to check command
/// Scans the project, checks every dependency and optionally writes a report
pub async fn do_check(pomcheck: &Pomcheck, report: Option<&Path>) -> anyhow::Result<()> {
    let mut snapshot = pomcheck.snapshot();

    if pomcheck.repository().enabled {
        run_check(pomcheck, &mut snapshot).await?;
    } else {
        info!("Remote repository is disabled, skipping the availability check");
    }

    if let Some(report) = report {
        write_report(&snapshot, pomcheck.local_repository(), report)?;
    }
    Ok(())
}

/// Handler to upload command
/// Checks every dependency first, then uploads the ones missing remotely
pub async fn do_upload(pomcheck: &Pomcheck, dry_run: bool) -> anyhow::Result<()> {
    if !pomcheck.repository().enabled {
        bail!("Remote repository is disabled, nothing can be uploaded");
    }
    let mut snapshot = pomcheck.snapshot();
    run_check(pomcheck, &mut snapshot).await?;

    let summary = pomcheck.upload(&mut snapshot, dry_run).await?;
    if summary.failed > 0 {
        bail!("{} upload(s) failed", summary.failed);
    }
    Ok(())
}

async fn run_check(
    pomcheck: &Pomcheck,
    snapshot: &mut DependencySnapshot,
) -> anyhow::Result<CheckSummary> {
    let cancel = CancellationToken::new();
    let interrupt = cancel_on_ctrl_c(cancel.clone());

    let (sender, receiver) = mpsc::unbounded_channel();
    let progress = tokio::spawn(report_progress(snapshot.clone(), receiver));

    let result = pomcheck.check(snapshot, &cancel, Some(sender)).await;
    interrupt.abort();
    let _ = progress.await;

    let summary = result?;
    if cancel.is_cancelled() {
        bail!("Interrupted after {} of {} check(s)", summary.total(), snapshot.len());
    }
    Ok(summary)
}

fn cancel_on_ctrl_c(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, waiting for running checks to finish");
            cancel.cancel();
        }
    })
}

/// Follows the checker's updates on a copy of the snapshot.
async fn report_progress(
    mut view: DependencySnapshot,
    mut updates: mpsc::UnboundedReceiver<StatusUpdate>,
) {
    let total = view.len();
    let mut finished = 0;
    while let Some(update) = updates.recv().await {
        if !view.apply(&update) {
            debug!("Ignoring update for {} at {}", update.coordinate, update.index);
            continue;
        }
        if !update.status.is_finished() {
            continue;
        }
        finished += 1;
        match (update.status, &update.error_message) {
            (CheckStatus::Error, Some(message)) => {
                warn!(
                    "[{}/{}] {} {}: {}",
                    finished, total, update.coordinate, update.status, message
                )
            }
            _ => info!("[{}/{}] {} {}", finished, total, update.coordinate, update.status),
        }
    }
}
