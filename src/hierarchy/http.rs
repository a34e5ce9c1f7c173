//! HTTP client for the hierarchy lookup service.

use crate::config::{Config, HIERARCHY_ID_PLACEHOLDER};
use crate::error::BoxError;
use crate::hierarchy::{Hierarchy, HierarchySource};
use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use std::time::Duration;

/// Fetches hierarchies with `GET <endpoint>`, the hierarchy id substituted for the
/// `{hierarchy_id}` placeholder.
pub struct HttpHierarchySource {
    http: Client,
    endpoint: String,
}

impl HttpHierarchySource {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.hierarchy_endpoint.clone(), config.hierarchy_timeout)
    }

    #[must_use]
    pub fn url_for(&self, hierarchy_id: &str) -> String {
        self.endpoint.replace(HIERARCHY_ID_PLACEHOLDER, hierarchy_id)
    }

    fn get(&self, hierarchy_id: &str) -> Result<Hierarchy> {
        let url = self.url_for(hierarchy_id);
        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .with_context(|| format!("Failed to fetch {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow!(
                "hierarchy service error {status}: {}",
                body.chars().take(200).collect::<String>()
            ));
        }

        response
            .json()
            .with_context(|| format!("Failed to parse response from {url}"))
    }
}

impl HierarchySource for HttpHierarchySource {
    fn fetch_hierarchy(&self, hierarchy_id: &str) -> Result<Hierarchy, BoxError> {
        self.get(hierarchy_id).map_err(|e| format!("{e:#}").into())
    }
}
