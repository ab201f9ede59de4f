use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tracing::debug;
use url::Url;

use super::report::parse_report;
use crate::error::ClientError;
use crate::models::{ActionRequest, ActionResponse, HostReport};

/// Fetches one host's stats report.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn fetch_report(&self, host: &str) -> Result<HostReport, ClientError>;
}

/// Issues one admin action against a host.
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn send_action(
        &self,
        host: &str,
        request: &ActionRequest,
    ) -> Result<ActionResponse, ClientError>;
}

#[async_trait]
impl<T: StatsSource + ?Sized> StatsSource for Arc<T> {
    async fn fetch_report(&self, host: &str) -> Result<HostReport, ClientError> {
        (**self).fetch_report(host).await
    }
}

#[async_trait]
impl<T: ActionSink + ?Sized> ActionSink for Arc<T> {
    async fn send_action(
        &self,
        host: &str,
        request: &ActionRequest,
    ) -> Result<ActionResponse, ClientError> {
        (**self).send_action(host, request).await
    }
}

/// Basic auth for the stats page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Where the stats page lives on every load balancer of a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsEndpoint {
    pub port: u16,
    /// Stats URI as configured in HAProxy, e.g. `/haproxy?stats`.
    pub base_path: String,
    pub credentials: Option<Credentials>,
}

impl StatsEndpoint {
    /// Admin form URL for `host`, the target of enable/disable posts.
    pub fn admin_url(&self, host: &str) -> Result<Url, ClientError> {
        self.build_url(host, "")
    }

    /// CSV export URL for `host`.
    pub fn stats_url(&self, host: &str) -> Result<Url, ClientError> {
        self.build_url(host, ";csv")
    }

    fn build_url(&self, host: &str, suffix: &str) -> Result<Url, ClientError> {
        let raw = format!("http://{}:{}{}{}", host, self.port, self.base_path, suffix);
        Url::parse(&raw).map_err(|source| ClientError::InvalidUrl {
            host: host.to_string(),
            source,
        })
    }
}

/// HTTP client for the stats page and its admin form.
///
/// The target host is passed on every call; the client holds no per-host state.
#[derive(Debug, Clone)]
pub struct HaproxyClient {
    client: reqwest::Client,
    endpoint: StatsEndpoint,
}

impl HaproxyClient {
    /// Build the HTTP client. `timeout` bounds each request.
    pub fn new(endpoint: StatsEndpoint, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()?;

        Ok(Self { client, endpoint })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.endpoint.credentials {
            Some(creds) => request.basic_auth(&creds.username, Some(&creds.password)),
            None => request,
        }
    }
}

#[async_trait]
impl StatsSource for HaproxyClient {
    async fn fetch_report(&self, host: &str) -> Result<HostReport, ClientError> {
        let url = self.endpoint.stats_url(host)?;
        debug!("Fetching stats from {}", url);

        let response = self.authorize(self.client.get(url.clone())).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::UnexpectedStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        parse_report(&body)
    }
}

#[async_trait]
impl ActionSink for HaproxyClient {
    async fn send_action(
        &self,
        host: &str,
        request: &ActionRequest,
    ) -> Result<ActionResponse, ClientError> {
        let url = self.endpoint.admin_url(host)?;
        debug!(
            "POST {} s={} b={} action={}",
            url, request.server, request.proxy, request.action
        );

        let response = self
            .authorize(self.client.post(url))
            .form(&request.form())
            .send()
            .await?;

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!("Unreadable admin response body from {}: {}", host, e);
                String::new()
            }
        };

        Ok(ActionResponse {
            success: status.is_success(),
            status: status.as_u16(),
            body,
        })
    }
}
