/*!
 * Session data types.
 *
 * These structures describe a translation request, the messages the service
 * pushes over the stream, and the read-only view of a session handed to
 * front-ends.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::SessionError;

/// Lifecycle status of a translation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Nothing has been requested yet
    #[default]
    Idle,
    /// A front-end is fetching catalogs (files, models); the controller never enters it
    Loading,
    /// A stream is open and the job is running
    Translating,
    /// The service reported the output file
    Complete,
    /// The service reported an error or the stream was lost
    Failed,
}

impl SessionStatus {
    /// Whether no further events are processed in this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Complete | SessionStatus::Failed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Loading => write!(f, "loading"),
            SessionStatus::Translating => write!(f, "translating"),
            SessionStatus::Complete => write!(f, "complete"),
            SessionStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(SessionStatus::Idle),
            "loading" => Ok(SessionStatus::Loading),
            "translating" => Ok(SessionStatus::Translating),
            "complete" => Ok(SessionStatus::Complete),
            "failed" => Ok(SessionStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid session status: {}", s)),
        }
    }
}

/// Opaque identifier of one opened stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(Uuid);

impl StreamId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.0.to_string();
        write!(f, "{}", &id[..8])
    }
}

/// Parameters of one translation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    /// Path of the subtitle file on the service's media mount
    pub file: String,
    /// Target language code
    pub lang: String,
    /// Free-form context passed to the model (show name, tone, ...)
    pub context: Option<String>,
    /// Model identifier
    pub model: String,
    /// Translate only this many lines (test mode)
    pub test_limit: Option<u32>,
}

impl TranslationRequest {
    /// Create a request without context or test limit
    pub fn new(file: impl Into<String>, lang: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            lang: lang.into(),
            context: None,
            model: model.into(),
            test_limit: None,
        }
    }

    /// Set the context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the test-mode line limit
    pub fn with_test_limit(mut self, limit: u32) -> Self {
        self.test_limit = Some(limit);
        self
    }

    /// Check the fields the service cannot do without
    pub fn validate(&self) -> Result<(), SessionError> {
        let missing_file = self.file.trim().is_empty();
        let missing_lang = self.lang.trim().is_empty();
        match (missing_file, missing_lang) {
            (true, true) => Err(SessionError::Validation("Please select a file and target language".to_string())),
            (true, false) => Err(SessionError::Validation("Please select a file".to_string())),
            (false, true) => Err(SessionError::Validation("Please select a target language".to_string())),
            (false, false) => Ok(()),
        }
    }

    /// Query parameters for the streaming translate endpoint.
    /// Blank optional fields are left out rather than sent empty.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("path", self.file.clone()),
            ("lang", self.lang.trim().to_string()),
        ];

        if let Some(context) = self.context.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            pairs.push(("context", context.to_string()));
        }

        let model = self.model.trim();
        if !model.is_empty() {
            pairs.push(("model", model.to_string()));
        }

        if let Some(limit) = self.test_limit {
            pairs.push(("test", limit.to_string()));
        }

        pairs
    }
}

/// One message pushed by the service over the translation stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Real progress of the job
    Progress {
        percent: f64,
    },
    /// A line of job output
    Log {
        message: String,
    },
    /// The job finished; the service may not report a file if none was written
    Complete {
        #[serde(default)]
        output_file: Option<String>,
    },
    /// The job failed
    Error {
        message: String,
    },
}

impl StreamMessage {
    /// Parse one raw stream payload
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        serde_json::from_str(raw.trim()).map_err(|e| {
            SessionError::MalformedEvent(format!("{} (payload: {})", e, truncate_payload(raw, 120)))
        })
    }
}

/// Clamp a reported percentage into `0..=100`
pub fn clamp_percent(percent: f64) -> u8 {
    if percent.is_nan() {
        return 0;
    }
    percent.round().clamp(0.0, 100.0) as u8
}

fn truncate_payload(raw: &str, max_chars: usize) -> String {
    if raw.chars().count() <= max_chars {
        raw.to_string()
    } else {
        format!("{}...", raw.chars().take(max_chars).collect::<String>())
    }
}

/// Read-only view of a session at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Current status
    pub status: SessionStatus,
    /// Real progress reported by the service
    pub progress_percent: u8,
    /// Progress to display, never below `progress_percent`
    pub display_percent: u8,
    /// Every log line of the session, oldest first
    pub log_lines: Vec<String>,
    /// Produced file, only when complete
    pub output_file: Option<String>,
    /// Whether a stream is currently open
    pub stream_open: bool,
}
