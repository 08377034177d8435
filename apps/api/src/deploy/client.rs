//! Hosting API client: the only code that talks to Netlify.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const NETLIFY_API_BASE: &str = "https://api.netlify.com/api/v1";
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum HostingError {
    #[error("hosting API token is not configured")]
    MissingToken,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("hosting API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("could not decode hosting API response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSite {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub ssl_url: Option<String>,
}

/// A deploy as reported by the hosting API. Only the fields the orchestrator reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDeploy {
    pub id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub deploy_ssl_url: Option<String>,
    #[serde(default)]
    pub deploy_url: Option<String>,
    #[serde(default)]
    pub ssl_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl RemoteDeploy {
    /// Public URL by preference: deploy SSL, deploy, site SSL, site.
    pub fn public_url(&self) -> Option<&str> {
        [
            &self.deploy_ssl_url,
            &self.deploy_url,
            &self.ssl_url,
            &self.url,
        ]
        .into_iter()
        .filter_map(|u| u.as_deref())
        .find(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateSite {
    Created(RemoteSite),
    /// The name is taken, typically by a concurrent create.
    Conflict,
}

#[async_trait]
pub trait HostingApi: Send + Sync {
    async fn list_sites(&self) -> Result<Vec<RemoteSite>, HostingError>;

    async fn create_site(&self, name: &str) -> Result<CreateSite, HostingError>;

    /// Uploads a zipped site as a new deploy of `site_id`.
    async fn upload_deploy(
        &self,
        site_id: &str,
        archive: Vec<u8>,
    ) -> Result<RemoteDeploy, HostingError>;

    async fn get_deploy(&self, deploy_id: &str) -> Result<RemoteDeploy, HostingError>;
}

#[derive(Debug, Serialize)]
struct CreateSiteRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct NetlifyErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct NetlifyClient {
    client: Client,
    token: String,
    base_url: String,
}

impl NetlifyClient {
    pub fn new(token: String) -> Result<Self, HostingError> {
        if token.trim().is_empty() {
            return Err(HostingError::MissingToken);
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            token,
            base_url: NETLIFY_API_BASE.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Sends a request and returns the body of a successful response.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<String, HostingError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, body));
        }
        Ok(body)
    }
}

fn api_error(status: StatusCode, body: String) -> HostingError {
    let message = serde_json::from_str::<NetlifyErrorBody>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    HostingError::Api {
        status: status.as_u16(),
        message,
    }
}

fn decode<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, HostingError> {
    serde_json::from_str(body).map_err(|e| HostingError::Decode(e.to_string()))
}

#[async_trait]
impl HostingApi for NetlifyClient {
    async fn list_sites(&self) -> Result<Vec<RemoteSite>, HostingError> {
        let body = self
            .execute(
                self.client
                    .get(self.endpoint("sites"))
                    .query(&[("filter", "all")]),
            )
            .await?;
        let sites: Vec<RemoteSite> = decode(&body)?;
        debug!("Hosting account has {} sites", sites.len());
        Ok(sites)
    }

    async fn create_site(&self, name: &str) -> Result<CreateSite, HostingError> {
        let request = self
            .client
            .post(self.endpoint("sites"))
            .json(&CreateSiteRequest { name });

        match self.execute(request).await {
            Ok(body) => Ok(CreateSite::Created(decode(&body)?)),
            Err(HostingError::Api { status: 422, .. }) => Ok(CreateSite::Conflict),
            Err(e) => Err(e),
        }
    }

    async fn upload_deploy(
        &self,
        site_id: &str,
        archive: Vec<u8>,
    ) -> Result<RemoteDeploy, HostingError> {
        let request = self
            .client
            .post(self.endpoint(&format!("sites/{site_id}/deploys")))
            .header(reqwest::header::CONTENT_TYPE, "application/zip")
            .body(archive);
        let body = self.execute(request).await?;
        decode(&body)
    }

    async fn get_deploy(&self, deploy_id: &str) -> Result<RemoteDeploy, HostingError> {
        let body = self
            .execute(self.client.get(self.endpoint(&format!("deploys/{deploy_id}"))))
            .await?;
        decode(&body)
    }
}
