//! HTTP client for the Nomad Variables and Jobs API.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::models::{
    JobParseRequest, JobRegisterRequest, JobRegisterResponse, Variable, VariableMetadata,
};

/// Default agent address, same as the Nomad CLI.
pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:4646";

/// Namespace wildcard accepted by list endpoints.
pub const ALL_NAMESPACES: &str = "*";

const TOKEN_HEADER: &str = "X-Nomad-Token";

/// Connection settings, mirroring the `NOMAD_*` environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub address: String,
    pub token: Option<String>,
    pub region: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            token: None,
            region: None,
        }
    }
}

/// Nomad HTTP API client
#[derive(Debug, Clone)]
pub struct NomadClient {
    client: reqwest::Client,
    address: String,
    region: Option<String>,
}

impl NomadClient {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns error if the token is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(token)
                .map_err(|e| Error::Config(format!("invalid Nomad token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(TOKEN_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            address: config.address.trim_end_matches('/').to_string(),
            region: config.region.clone(),
        })
    }

    /// Agent address this client talks to.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.address)
    }

    fn with_region(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.region {
            Some(region) => request.query(&[("region", region.as_str())]),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = self.with_region(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // =========================================================================
    // Variables
    // =========================================================================

    /// List variable metadata under a path prefix.
    #[instrument(skip(self))]
    pub async fn list_variables(
        &self,
        prefix: &str,
        namespace: &str,
    ) -> Result<Vec<VariableMetadata>> {
        let endpoint = "/v1/vars";
        let request = self
            .client
            .get(self.url(endpoint))
            .query(&[("prefix", prefix), ("namespace", namespace)]);

        // Nomad answers an empty listing with `null` on some versions
        let listed: Option<Vec<VariableMetadata>> = self.send(endpoint, request).await?;
        let listed = listed.unwrap_or_default();
        debug!(count = listed.len(), "Listed variables");
        Ok(listed)
    }

    /// Read a single variable, including its items.
    #[instrument(skip(self))]
    pub async fn read_variable(&self, path: &str, namespace: &str) -> Result<Variable> {
        let endpoint = format!("/v1/var/{}", path.trim_start_matches('/'));
        let request = self
            .client
            .get(self.url(&endpoint))
            .query(&[("namespace", namespace)]);

        match self.send(&endpoint, request).await {
            Err(Error::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(Error::VariableNotFound {
                    path: path.to_string(),
                })
            }
            other => other,
        }
    }

    /// Create or overwrite a variable.
    #[instrument(
        skip(self, variable),
        fields(path = %variable.path, namespace = %variable.namespace)
    )]
    pub async fn upsert_variable(&self, variable: &Variable) -> Result<Variable> {
        let endpoint = format!("/v1/var/{}", variable.path.trim_start_matches('/'));
        let request = self
            .client
            .put(self.url(&endpoint))
            .query(&[("namespace", variable.namespace.as_str())])
            .json(variable);

        let stored: Variable = self.send(&endpoint, request).await?;
        debug!(modify_index = stored.modify_index, "Stored variable");
        Ok(stored)
    }

    // =========================================================================
    // Jobs
    // =========================================================================

    /// Parse a job specification written in HCL into its JSON form.
    #[instrument(skip(self, job_hcl))]
    pub async fn parse_job(&self, job_hcl: &str) -> Result<Map<String, Value>> {
        let endpoint = "/v1/jobs/parse";
        let request = self.client.post(self.url(endpoint)).json(&JobParseRequest {
            job_hcl,
            canonicalize: true,
        });
        self.send(endpoint, request).await
    }

    /// Register (create or update) a job.
    #[instrument(skip(self, job))]
    pub async fn register_job(&self, job: &Map<String, Value>) -> Result<JobRegisterResponse> {
        let endpoint = "/v1/jobs";
        let request = self
            .client
            .post(self.url(endpoint))
            .json(&JobRegisterRequest { job });
        self.send(endpoint, request).await
    }
}
