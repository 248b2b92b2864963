/*!
 * Request and response bodies of the translation service's JSON endpoints.
 */

use serde::{Deserialize, Serialize};

/// A subtitle file found on the service's media mount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleFile {
    /// Absolute path on the service host
    pub path: String,
    /// File name
    pub name: String,
    /// Path relative to the media mount, `/`-separated
    pub relative: String,
}

/// One entry of a folder listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeItem {
    /// Display name; directories end with `/`
    pub name: String,
    /// Path relative to the media mount
    pub path: String,
    /// Whether the entry is a directory
    pub is_dir: bool,
    /// Whether the entry is a subtitle file
    pub is_srt: bool,
}

/// Response of `POST /tree`
#[derive(Debug, Deserialize)]
pub(crate) struct TreeResponse {
    pub items: Vec<TreeItem>,
}

/// Request body of `POST /tree`
#[derive(Debug, Serialize)]
pub(crate) struct TreeRequest<'a> {
    pub path: &'a str,
}

/// Response of `GET /readme`
#[derive(Debug, Deserialize)]
pub(crate) struct ReadmeResponse {
    pub content: String,
}

/// Request body of `POST /login`
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub password: &'a str,
}

/// Response of `POST /login`
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
}

/// `GET /models` answers with a bare list on some deployments and an
/// object on others
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ModelsResponse {
    List(Vec<String>),
    Wrapped { models: Vec<String> },
}

impl ModelsResponse {
    pub fn into_models(self) -> Vec<String> {
        match self {
            ModelsResponse::List(models) => models,
            ModelsResponse::Wrapped { models } => models,
        }
    }
}

/// Error body the service sends with non-success statuses
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Most specific message available
    pub fn best_message(self) -> Option<String> {
        self.details
            .filter(|d| !d.trim().is_empty())
            .or(self.error)
            .or(self.message)
    }
}
