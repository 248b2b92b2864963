/*!
 * Dispatch loop for a session controller.
 *
 * The driver owns the controller and the receiving end of the signal
 * channel that stream tasks write into, and feeds signals to the controller
 * one at a time. When cosmetic progress is enabled it also runs the ticker.
 */

use log::debug;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::app_config::{Config, ProgressConfig};
use crate::errors::{ApiError, SessionError};

use super::controller::SessionController;
use super::models::{SessionStatus, StreamId, TranslationRequest};
use super::transport::{SseStreamOpener, StreamOpener, StreamSignal};

/// Runs a controller against its signal channel
pub struct SessionDriver<O: StreamOpener> {
    controller: SessionController<O>,
    signals: UnboundedReceiver<StreamSignal>,
    cosmetic: Option<ProgressConfig>,
}

impl SessionDriver<SseStreamOpener> {
    /// Build a driver talking server-sent events to the configured service
    pub fn connect(config: &Config) -> Result<Self, ApiError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let opener = SseStreamOpener::new(&config.api, sender)?;
        Ok(Self::new(SessionController::new(opener), receiver).with_cosmetic_progress(&config.progress))
    }
}

impl<O: StreamOpener> SessionDriver<O> {
    /// Drive `controller` with signals read from `signals`
    pub fn new(controller: SessionController<O>, signals: UnboundedReceiver<StreamSignal>) -> Self {
        Self {
            controller,
            signals,
            cosmetic: None,
        }
    }

    /// Enable the cosmetic progress ticker if `config` asks for it
    pub fn with_cosmetic_progress(mut self, config: &ProgressConfig) -> Self {
        self.cosmetic = config.enabled.then(|| config.clone());
        self
    }

    pub fn controller(&self) -> &SessionController<O> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut SessionController<O> {
        &mut self.controller
    }

    /// Start a new session on the controller
    pub fn start(&mut self, request: TranslationRequest) -> Result<StreamId, SessionError> {
        self.controller.start(request)
    }

    /// Apply every signal already queued without waiting. Returns how many were applied.
    pub fn pump_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(signal) = self.signals.try_recv() {
            self.controller.dispatch(signal);
            applied += 1;
        }
        applied
    }

    /// Process signals until the current session leaves its stream behind,
    /// then return the resulting status.
    pub async fn run_until_terminal(&mut self) -> SessionStatus {
        let (step, cap, max_duration) = match &self.cosmetic {
            Some(config) => (config.step, config.cap, Duration::from_secs(config.max_duration_secs)),
            None => (0, 0, Duration::ZERO),
        };
        let mut ticker = self.cosmetic.as_ref().map(|config| {
            let period = Duration::from_millis(config.interval_ms.max(1));
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let started = Instant::now();

        while self.controller.is_stream_open() {
            tokio::select! {
                signal = self.signals.recv() => match signal {
                    Some(signal) => self.controller.dispatch(signal),
                    None => {
                        // Every sender is gone, so nothing can reach the open stream's session any more.
                        if let Some(stream_id) = self.controller.active_stream_id() {
                            self.controller.on_transport_error(stream_id, "event channel closed");
                        }
                    },
                },
                _ = next_tick(&mut ticker) => {
                    if started.elapsed() >= max_duration {
                        debug!("Cosmetic progress stopped after {:?}", max_duration);
                        ticker = None;
                    } else {
                        self.controller.advance_cosmetic_progress(step, cap);
                    }
                },
            }
        }

        self.controller.status()
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        },
        None => std::future::pending::<()>().await,
    }
}
