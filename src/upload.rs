use std::{
    fmt::{Display, Formatter},
    path::Path,
};

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    cache::LocalRepository,
    model::{coordinate::POM_PACKAGING, CheckStatus, Coordinate, DependencySnapshot},
    repository::{RemoteError, RepositoryConnection},
};

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub uploaded: usize,
    /// Dry runs only: what would have been uploaded.
    pub planned: usize,
    /// Selected and missing remotely, but not present in the local repository either.
    pub unavailable: usize,
    pub failed: usize,
}

impl Display for UploadSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.planned > 0 {
            write!(f, "{} would be uploaded, ", self.planned)?;
        }
        write!(
            f,
            "{} uploaded, {} not available locally, {} failed",
            self.uploaded, self.unavailable, self.failed
        )
    }
}

/// Uploads every selected record that is missing remotely and present locally.
///
/// Artifacts other than poms are uploaded together with their local `.pom`, when there is one.
/// A failed upload is recorded on its record and doesn't stop the others. With `dry_run` nothing
/// is sent and nothing is recorded.
pub async fn upload_missing<C: RepositoryConnection>(
    snapshot: &mut DependencySnapshot,
    connection: &C,
    local: &LocalRepository,
    dry_run: bool,
) -> UploadSummary {
    let mut summary = UploadSummary::default();

    for record in snapshot.records_mut() {
        if !record.selected || record.status() != CheckStatus::Missing {
            continue;
        }
        let path = local.actual_or_expected_path(record);
        if !path.is_file() {
            debug!("{} is not in the local repository", record.coordinate());
            summary.unavailable += 1;
            continue;
        }

        let coordinate = record.coordinate().clone();
        let pom = companion_pom(&coordinate, local);

        if dry_run {
            info!("Would upload {} from {}", coordinate, path.display());
            if let Some((pom_coordinate, pom_path)) = &pom {
                info!("Would upload {} from {}", pom_coordinate, pom_path.display());
            }
            summary.planned += 1;
            continue;
        }

        let result = async {
            let url = upload_file(connection, &coordinate, &path).await?;
            if let Some((pom_coordinate, pom_path)) = &pom {
                upload_file(connection, pom_coordinate, pom_path).await?;
            }
            Ok::<_, UploadError>(url)
        }
        .await;

        match result {
            Ok(url) => {
                info!("Uploaded {} to {}", coordinate, url);
                record.upload_url = Some(url);
                summary.uploaded += 1;
            }
            Err(err) => {
                warn!("Could not upload {}: {}", coordinate, err);
                record.fail_upload(err.to_string());
                summary.failed += 1;
            }
        }
    }

    info!("Upload finished: {}", summary);
    summary
}

fn companion_pom(
    coordinate: &Coordinate,
    local: &LocalRepository,
) -> Option<(Coordinate, std::path::PathBuf)> {
    if coordinate.packaging() == POM_PACKAGING {
        return None;
    }
    let pom = coordinate.with_packaging(POM_PACKAGING);
    let path = local.expected_path(&pom);
    path.is_file().then_some((pom, path))
}

async fn upload_file<C: RepositoryConnection>(
    connection: &C,
    coordinate: &Coordinate,
    path: &Path,
) -> Result<String, UploadError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| UploadError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(connection.upload(coordinate, bytes).await?)
}
