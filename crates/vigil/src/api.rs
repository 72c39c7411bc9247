use std::{future::Future, pin::Pin};

use common::artifacts::ContractRecord;
use derive_more::{Display, Error, From};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{AuthenticationConfig, CompilerConfig};

/// Compiler settings attached to an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct CompilerPayload {
    /// Whether the optimizer was enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimizations_used: Option<bool>,

    /// Optimizer runs count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimizations_count: Option<u32>,

    /// Target EVM version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evm_version: Option<String>,
}

impl From<&CompilerConfig> for CompilerPayload {
    fn from(config: &CompilerConfig) -> Self {
        Self {
            optimizations_used: config.optimizer_enabled,
            optimizations_count: config.optimizer_runs,
            evm_version: config.evm_version.clone(),
        }
    }
}

/// JSON request body used to upload contracts of a single project.
#[derive(Debug, Serialize)]
pub(crate) struct UploadContractsRequest<'a> {
    /// All detected contracts, including the ones not bound to any network.
    pub contracts: &'a [ContractRecord],

    /// Compiler settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<&'a CompilerPayload>,

    /// Deployment tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<&'a str>,
}

/// Contract deployment acknowledged by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct PushedContract {
    /// Contract address.
    pub address: String,

    /// Network identifier.
    #[serde(alias = "networkId")]
    pub network_id: String,
}

/// Structured error reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct ServerError {
    /// Machine-readable error identifier.
    pub slug: String,

    /// Human-readable error message.
    pub message: String,
}

/// JSON response body of a contracts upload.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct UploadContractsResponse {
    /// Acknowledged contract deployments.
    #[serde(default)]
    pub contracts: Vec<PushedContract>,

    /// Upload error, if any.
    #[serde(default)]
    pub error: Option<ServerError>,
}

/// Errors that prevent a request from completing.
#[derive(Debug, Display, From, Error)]
pub(crate) enum RequestError {
    /// HTTP client error.
    Http(reqwest::Error),

    /// Response body is not a valid JSON.
    #[display(fmt = "unexpected response body: {}", _0)]
    Json(serde_json::Error),
}

/// Future returned by [`ContractApi`] methods.
pub(crate) type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RequestError>> + 'a>>;

/// Remote API used to push contracts.
pub(crate) trait ContractApi {
    /// Upload contracts of the `project` owned by `account`.
    fn upload_contracts<'a>(
        &'a self,
        account: &'a str,
        project: &'a str,
        request: &'a UploadContractsRequest<'a>,
    ) -> ApiFuture<'a, UploadContractsResponse>;
}

/// [`ContractApi`] implementation backed by an HTTP client.
pub(crate) struct RestClient {
    /// HTTP client.
    client: Client,

    /// API server path, without a trailing slash.
    server_path: String,

    /// Authentication token.
    token: String,
}

impl RestClient {
    /// Create new client for the provided server.
    pub fn new(server_path: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            server_path: server_path.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
        }
    }

    /// Create new client using the stored credentials.
    pub fn from_config(auth_config: &AuthenticationConfig) -> Self {
        Self::new(auth_config.server_path(), auth_config.token())
    }
}

impl ContractApi for RestClient {
    fn upload_contracts<'a>(
        &'a self,
        account: &'a str,
        project: &'a str,
        request: &'a UploadContractsRequest<'a>,
    ) -> ApiFuture<'a, UploadContractsResponse> {
        Box::pin(async move {
            let url = format!(
                "{}/api/v1/account/{account}/project/{project}/contracts",
                self.server_path
            );

            debug!(%url, contracts = request.contracts.len(), "uploading contracts");

            // Error responses carry a structured error in the body,
            // so the status code is not checked here.
            let response = self
                .client
                .post(url)
                .bearer_auth(&self.token)
                .json(request)
                .send()
                .await?;

            debug!(status = %response.status(), "upload finished");

            let body = response.bytes().await?;

            Ok(serde_json::from_slice(&body)?)
        })
    }
}
