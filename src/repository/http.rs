use std::time::Duration;

use log::{debug, trace};
use reqwest::{Client, StatusCode};

use crate::model::Coordinate;

use super::{RemoteError, RepositoryConfig, RepositoryConnection};

/// Talks to a Nexus-style repository over HTTP with basic authentication.
pub struct HttpRepository {
    client: Client,
    config: RepositoryConfig,
}

impl HttpRepository {
    pub fn new(config: RepositoryConfig, timeout: Duration) -> Result<HttpRepository, RemoteError> {
        let client = Client::builder()
            .user_agent(concat!("pomcheck/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(HttpRepository { client, config })
    }
}

impl RepositoryConnection for HttpRepository {
    async fn exists(&self, coordinate: &Coordinate) -> Result<bool, RemoteError> {
        let url = self.config.artifact_url(coordinate);
        trace!("HEAD {}", url);
        let response = self
            .client
            .head(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(RemoteError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            }),
        }
    }

    async fn upload(&self, coordinate: &Coordinate, bytes: Vec<u8>) -> Result<String, RemoteError> {
        let url = self.config.artifact_url(coordinate);
        debug!("PUT {} ({} bytes)", url, bytes.len());
        let response = self
            .client
            .put(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(url)
        } else {
            Err(RemoteError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            })
        }
    }
}
