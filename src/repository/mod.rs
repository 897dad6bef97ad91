mod http;

use std::{
    fmt::{Debug, Formatter},
    future::Future,
    time::Duration,
};

use thiserror::Error;

use crate::model::Coordinate;

pub use http::HttpRepository;

/// Remote repository settings. Read-only while a batch runs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub repository_id: Option<String>,
    pub enabled: bool,
}

impl RepositoryConfig {
    /// Url, username and password are all required.
    pub fn is_valid(&self) -> bool {
        !self.url.trim().is_empty()
            && !self.username.trim().is_empty()
            && !self.password.trim().is_empty()
    }

    /// `<url>/repository/<id>/`, or `<url>/` without a repository id.
    pub fn base_url(&self) -> String {
        let url = self.url.trim().trim_end_matches('/');
        match self
            .repository_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
        {
            Some(id) => format!("{url}/repository/{id}/"),
            None => format!("{url}/"),
        }
    }

    pub fn artifact_url(&self, coordinate: &Coordinate) -> String {
        format!("{}{}", self.base_url(), coordinate.to_url_path())
    }
}

impl Debug for RepositoryConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("repository_id", &self.repository_id)
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("No response within {0:?}")]
    Timeout(Duration),
    #[error("Unexpected HTTP status {status} for {url}")]
    UnexpectedStatus { status: u16, url: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Existence queries and uploads against a remote artifact repository.
///
/// Shared by all concurrent checks of a batch.
pub trait RepositoryConnection: Send + Sync + 'static {
    fn exists(
        &self,
        coordinate: &Coordinate,
    ) -> impl Future<Output = Result<bool, RemoteError>> + Send;

    /// Uploads `bytes` as `coordinate` and returns the url it was stored at.
    fn upload(
        &self,
        coordinate: &Coordinate,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<String, RemoteError>> + Send;
}
