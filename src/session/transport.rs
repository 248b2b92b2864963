/*!
 * Stream transport for translation sessions.
 *
 * The controller only sees two small traits: a `StreamOpener` that starts a
 * stream for a request, and the `StreamHandle` it gets back. The production
 * opener reads server-sent events with reqwest-eventsource on a tokio task
 * and forwards every payload as a `StreamSignal` tagged with its stream id.
 * The task never touches session state.
 */

use futures::StreamExt;
use log::{debug, warn};
use reqwest::{Client, Response, StatusCode};
use reqwest_eventsource::{Event, EventSource, RequestBuilderExt};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::api::models::ErrorBody;
use crate::app_config::ApiConfig;
use crate::errors::{ApiError, SessionError};

use super::models::{StreamId, TranslationRequest};

/// What happened on a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalKind {
    /// A raw message payload
    Message(String),
    /// The stream broke or ended without a terminal message
    Failed(String),
    /// The service refused to start the stream; carries its explanation
    Rejected(String),
}

/// A stream occurrence, tagged with the stream it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSignal {
    pub stream_id: StreamId,
    pub kind: SignalKind,
}

impl StreamSignal {
    /// A message payload from `stream_id`
    pub fn message(stream_id: StreamId, data: impl Into<String>) -> Self {
        Self { stream_id, kind: SignalKind::Message(data.into()) }
    }

    /// A transport failure on `stream_id`
    pub fn failed(stream_id: StreamId, reason: impl Into<String>) -> Self {
        Self { stream_id, kind: SignalKind::Failed(reason.into()) }
    }

    /// The service answered `stream_id`'s request with an error status
    pub fn rejected(stream_id: StreamId, message: impl Into<String>) -> Self {
        Self { stream_id, kind: SignalKind::Rejected(message.into()) }
    }
}

/// Handle to an open stream
pub trait StreamHandle: Send {
    /// Stop delivering events. Must be safe to call more than once.
    fn close(&mut self);
}

/// Opens one stream per translation request
pub trait StreamOpener {
    /// Handle type returned for an opened stream
    type Handle: StreamHandle;

    /// Start streaming `request`; every signal must carry `stream_id`
    fn open(&mut self, stream_id: StreamId, request: &TranslationRequest) -> Result<Self::Handle, SessionError>;
}

/// Server-sent event opener for the service's `/translate` endpoint
pub struct SseStreamOpener {
    /// Base URL of the service API
    base_url: String,
    /// HTTP client without a read timeout
    client: Client,
    /// Optional bearer token
    token: Option<String>,
    /// Where stream tasks deliver their signals
    signals: UnboundedSender<StreamSignal>,
}

impl SseStreamOpener {
    /// Create an opener delivering into `signals`
    pub fn new(config: &ApiConfig, signals: UnboundedSender<StreamSignal>) -> Result<Self, ApiError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            base_url,
            client,
            token: config.bearer_token().map(str::to_string),
            signals,
        })
    }

    /// URL of the streaming translate endpoint
    pub fn translate_url(&self) -> String {
        format!("{}/translate", self.base_url)
    }
}

impl StreamOpener for SseStreamOpener {
    type Handle = SseStreamHandle;

    fn open(&mut self, stream_id: StreamId, request: &TranslationRequest) -> Result<Self::Handle, SessionError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SessionError::Transport(format!("no async runtime available: {}", e)))?;

        let mut builder = self.client
            .get(self.translate_url())
            .query(&request.query_pairs());
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let mut source = builder
            .eventsource()
            .map_err(|e| SessionError::Transport(format!("could not build stream request: {:?}", e)))?;
        // A dropped stream means the session failed; never reconnect behind the controller's back.
        source.set_retry_policy(Box::new(reqwest_eventsource::retry::Never));

        debug!("Opening stream {} to {}", stream_id, self.translate_url());
        let task = runtime.spawn(pump_events(stream_id, source, self.signals.clone()));

        Ok(SseStreamHandle { task: Some(task) })
    }
}

/// Handle to a stream task; closing aborts the task
pub struct SseStreamHandle {
    task: Option<JoinHandle<()>>,
}

impl StreamHandle for SseStreamHandle {
    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SseStreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Forward stream events until the stream fails or the receiver goes away
async fn pump_events(stream_id: StreamId, mut source: EventSource, signals: UnboundedSender<StreamSignal>) {
    loop {
        let signal = match source.next().await {
            Some(Ok(Event::Open)) => {
                debug!("Stream {} connected", stream_id);
                continue;
            },
            Some(Ok(Event::Message(message))) => StreamSignal::message(stream_id, message.data),
            Some(Err(reqwest_eventsource::Error::StreamEnded)) | None => {
                StreamSignal::failed(stream_id, "stream ended before the job finished")
            },
            Some(Err(reqwest_eventsource::Error::InvalidStatusCode(status, response))) => {
                let message = rejection_message(status, response).await;
                warn!("Stream {} rejected: {}", stream_id, message);
                StreamSignal::rejected(stream_id, message)
            },
            Some(Err(e)) => {
                warn!("Stream {} failed: {}", stream_id, e);
                StreamSignal::failed(stream_id, e.to_string())
            },
        };

        let stop = !matches!(signal.kind, SignalKind::Message(_));
        if signals.send(signal).is_err() || stop {
            break;
        }
    }

    source.close();
}

/// Describe an error status, using the service's error body when it has one
async fn rejection_message(status: StatusCode, response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::best_message)
        .unwrap_or_else(|| body.trim().to_string());

    if detail.is_empty() {
        format!("service rejected the request ({})", status.as_u16())
    } else {
        format!("service rejected the request ({}): {}", status.as_u16(), detail)
    }
}
