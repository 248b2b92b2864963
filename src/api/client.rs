use log::{debug, error};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::app_config::ApiConfig;
use crate::errors::ApiError;

use super::models::{
    ErrorBody, LoginRequest, LoginResponse, ModelsResponse, ReadmeResponse, SubtitleFile, TreeItem, TreeRequest,
    TreeResponse,
};

/// Client for the translation service's plain JSON endpoints
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// Base URL of the service API, without trailing slash
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Optional bearer token
    token: Option<String>,
}

impl ApiClient {
    /// Create a client from the connection settings
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            base_url,
            client,
            token: config.bearer_token().map(str::to_string),
        })
    }

    /// Use `token` for subsequent requests
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List subtitle files available to translate
    pub async fn list_files(&self) -> Result<Vec<SubtitleFile>, ApiError> {
        let response = self.send(self.client.get(self.endpoint("files"))).await?;
        read_json(response).await
    }

    /// List model identifiers installed on the service
    pub async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        let response = self.send(self.client.get(self.endpoint("models"))).await?;
        let models: ModelsResponse = read_json(response).await?;
        Ok(models.into_models())
    }

    /// Fetch the service's guide text
    pub async fn readme(&self) -> Result<String, ApiError> {
        let response = self.send(self.client.get(self.endpoint("readme"))).await?;
        let readme: ReadmeResponse = read_json(response).await?;
        Ok(readme.content)
    }

    /// List the folder at `path` (relative to the media mount)
    pub async fn browse(&self, path: &str) -> Result<Vec<TreeItem>, ApiError> {
        let request = self.client.post(self.endpoint("tree")).json(&TreeRequest { path });
        let response = self.send(request).await?;
        let tree: TreeResponse = read_json(response).await?;
        Ok(tree.items)
    }

    /// Exchange a password for a bearer token. The token is not stored.
    pub async fn login(&self, password: &str) -> Result<String, ApiError> {
        let request = self.client.post(self.endpoint("login")).json(&LoginRequest { password });
        let response = self.send(request).await?;
        let login: LoginResponse = read_json(response).await?;
        Ok(login.token)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send the request with authentication and map non-success statuses to errors
    async fn send(&self, mut request: RequestBuilder) -> Result<Response, ApiError> {
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!("Translation service request failed: {}", e);
            ApiError::from(e)
        })?;

        let status = response.status();
        debug!("{} {}", status, response.url());
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await
            .unwrap_or_else(|_| "Failed to get error response text".to_string());
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::best_message)
            .unwrap_or(body);

        error!("Translation service error ({}): {}", status, message);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::AuthenticationError(message)),
            _ => Err(ApiError::ApiError { status_code: status.as_u16(), message }),
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        let preview: String = text.chars().take(500).collect();
        error!("Failed to parse translation service response: {}. Raw response (first 500 chars): {}", e, preview);
        ApiError::ParseError(e.to_string())
    })
}
