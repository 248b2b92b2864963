/*!
 * Session controller for live translation sessions.
 *
 * This module handles:
 * - Starting a session and superseding the previous one
 * - Classifying stream messages and folding them into session state
 * - Detecting terminal conditions and tearing the stream down
 * - Notifying observers after every change
 *
 * Every method takes `&mut self` and none of them await, so stream signals
 * are applied strictly one at a time. A signal is only applied when its
 * stream id matches the open stream; anything from a closed or superseded
 * stream is dropped.
 */

use log::{debug, info, warn};

use crate::errors::SessionError;

use super::models::{clamp_percent, SessionSnapshot, SessionStatus, StreamId, StreamMessage, TranslationRequest};
use super::observer::{SessionEvent, SessionObserver};
use super::transport::{SignalKind, StreamHandle, StreamOpener, StreamSignal};

const SUCCESS_LINE: &str = "✓ Translation completed successfully!";

/// The open stream and the id its signals carry
struct ActiveStream<H> {
    id: StreamId,
    handle: H,
}

/// Owns at most one translation session and its stream
pub struct SessionController<O: StreamOpener> {
    /// Opens streams for new sessions
    opener: O,
    /// Current status
    status: SessionStatus,
    /// Real progress, non-decreasing within a session
    progress_percent: u8,
    /// Timer-driven display progress, never fed back into `progress_percent`
    cosmetic_percent: u8,
    /// Session log, append-only
    log_lines: Vec<String>,
    /// Produced file, only when complete
    output_file: Option<String>,
    /// Open stream, if any
    active_stream: Option<ActiveStream<O::Handle>>,
    /// Change subscribers
    observers: Vec<Box<dyn SessionObserver>>,
}

impl<O: StreamOpener> SessionController<O> {
    /// Create an idle controller
    pub fn new(opener: O) -> Self {
        Self {
            opener,
            status: SessionStatus::Idle,
            progress_percent: 0,
            cosmetic_percent: 0,
            log_lines: Vec::new(),
            output_file: None,
            active_stream: None,
            observers: Vec::new(),
        }
    }

    /// Register an observer for every subsequent change
    pub fn subscribe(&mut self, observer: impl SessionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    /// Percentage to show: real progress, raised by cosmetic progress while running
    pub fn display_percent(&self) -> u8 {
        self.progress_percent.max(self.cosmetic_percent)
    }

    pub fn log_lines(&self) -> &[String] {
        &self.log_lines
    }

    pub fn output_file(&self) -> Option<&str> {
        self.output_file.as_deref()
    }

    pub fn active_stream_id(&self) -> Option<StreamId> {
        self.active_stream.as_ref().map(|stream| stream.id)
    }

    pub fn is_stream_open(&self) -> bool {
        self.active_stream.is_some()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            progress_percent: self.progress_percent,
            display_percent: self.display_percent(),
            log_lines: self.log_lines.clone(),
            output_file: self.output_file.clone(),
            stream_open: self.is_stream_open(),
        }
    }

    /// Start a new session for `request`, superseding any current one.
    ///
    /// An invalid request is rejected before anything changes. Otherwise the
    /// previous stream is closed, state is reset, and exactly one new stream
    /// is opened. If the stream cannot be opened the session fails right away.
    pub fn start(&mut self, request: TranslationRequest) -> Result<StreamId, SessionError> {
        if let Err(e) = request.validate() {
            warn!("Rejected translation request: {}", e);
            return Err(e);
        }

        self.teardown();

        let stream_id = StreamId::new();
        let display_before = self.display_percent();
        self.progress_percent = 0;
        self.cosmetic_percent = 0;
        self.output_file = None;
        if self.display_percent() != display_before {
            self.emit(SessionEvent::ProgressChanged(0));
        }
        self.append_log(format!("Starting translation of {} to {}...", request.file, request.lang.trim()));
        self.set_status(SessionStatus::Translating);

        match self.opener.open(stream_id, &request) {
            Ok(handle) => {
                info!("Session stream {} opened for {} ({})", stream_id, request.file, request.lang.trim());
                self.active_stream = Some(ActiveStream { id: stream_id, handle });
                Ok(stream_id)
            },
            Err(e) => {
                warn!("Failed to open session stream: {}", e);
                self.append_log(format!("ERROR: could not connect to the translation service: {}", e));
                self.set_status(SessionStatus::Failed);
                Err(e)
            },
        }
    }

    /// Apply one signal from the transport
    pub fn dispatch(&mut self, signal: StreamSignal) {
        match signal.kind {
            SignalKind::Message(raw) => self.on_event(signal.stream_id, &raw),
            SignalKind::Failed(reason) => self.on_transport_error(signal.stream_id, &reason),
            SignalKind::Rejected(message) => self.on_stream_rejected(signal.stream_id, &message),
        }
    }

    /// Handle one raw message from stream `stream_id`
    pub fn on_event(&mut self, stream_id: StreamId, raw: &str) {
        if !self.is_active(stream_id) {
            debug!("Ignoring event from stale stream {}", stream_id);
            return;
        }

        let message = match StreamMessage::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!("{}", e);
                return;
            },
        };

        match message {
            StreamMessage::Progress { percent } => self.apply_progress(clamp_percent(percent)),
            StreamMessage::Log { message } => self.append_log(message),
            StreamMessage::Complete { output_file } => self.complete(output_file),
            StreamMessage::Error { message } => {
                warn!("Translation failed on stream {}: {}", stream_id, SessionError::Remote(message.clone()));
                self.fail(format!("ERROR: {}", message));
            },
        }
    }

    /// Handle a low-level failure of stream `stream_id`
    pub fn on_transport_error(&mut self, stream_id: StreamId, reason: &str) {
        if !self.is_active(stream_id) {
            debug!("Ignoring transport error from stale stream {}: {}", stream_id, reason);
            return;
        }

        warn!("Stream {} lost: {}", stream_id, SessionError::Transport(reason.to_string()));
        self.fail(format!("ERROR: connection to the translation service was lost ({})", reason));
    }

    /// Handle the service refusing stream `stream_id` outright (error status)
    pub fn on_stream_rejected(&mut self, stream_id: StreamId, message: &str) {
        if !self.is_active(stream_id) {
            debug!("Ignoring rejection of stale stream {}: {}", stream_id, message);
            return;
        }

        warn!("Stream {} refused: {}", stream_id, SessionError::Remote(message.to_string()));
        self.fail(format!("ERROR: {}", message));
    }

    /// Close the open stream, if any. Never changes the status.
    pub fn teardown(&mut self) {
        if let Some(mut stream) = self.active_stream.take() {
            stream.handle.close();
            debug!("Closed session stream {}", stream.id);
        }
    }

    /// Raise cosmetic progress by `step`, up to `cap`.
    /// Returns whether anything was applied.
    pub fn advance_cosmetic_progress(&mut self, step: u8, cap: u8) -> bool {
        if self.status != SessionStatus::Translating || !self.is_stream_open() {
            return false;
        }

        let cap = cap.min(100);
        let next = self.cosmetic_percent.saturating_add(step).min(cap);
        if next <= self.cosmetic_percent {
            return false;
        }

        let display_before = self.display_percent();
        self.cosmetic_percent = next;
        if self.display_percent() != display_before {
            self.emit(SessionEvent::ProgressChanged(self.display_percent()));
        }
        true
    }

    fn is_active(&self, stream_id: StreamId) -> bool {
        self.active_stream_id() == Some(stream_id)
    }

    fn apply_progress(&mut self, percent: u8) {
        if self.status != SessionStatus::Translating {
            return;
        }

        // Out-of-order delivery must not move the bar backward.
        if percent <= self.progress_percent {
            return;
        }

        let display_before = self.display_percent();
        self.progress_percent = percent;
        if self.display_percent() != display_before {
            self.emit(SessionEvent::ProgressChanged(self.display_percent()));
        }
    }

    fn complete(&mut self, output_file: Option<String>) {
        self.output_file = output_file;
        let display_before = self.display_percent();
        self.progress_percent = 100;
        if display_before != 100 {
            self.emit(SessionEvent::ProgressChanged(100));
        }
        self.append_log(SUCCESS_LINE.to_string());
        self.set_status(SessionStatus::Complete);
        self.teardown();

        if let Some(output_file) = self.output_file.clone() {
            info!("Translation complete: {}", output_file);
            self.emit(SessionEvent::OutputReady(output_file));
        } else {
            info!("Translation complete (no output file reported)");
        }
    }

    fn fail(&mut self, line: String) {
        self.append_log(line);
        self.set_status(SessionStatus::Failed);
        self.teardown();
    }

    fn append_log(&mut self, line: String) {
        self.log_lines.push(line.clone());
        self.emit(SessionEvent::LogAppended(line));
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.status != status {
            debug!("Session status {} -> {}", self.status, status);
            self.status = status;
            self.emit(SessionEvent::StatusChanged(status));
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        for observer in self.observers.iter_mut() {
            observer.notify(&event);
        }
    }
}

impl<O: StreamOpener> Drop for SessionController<O> {
    fn drop(&mut self) {
        self.teardown();
    }
}
