/*!
 * Live translation sessions.
 *
 * This module provides:
 * - The session controller and its state machine
 * - The server-sent event transport feeding it
 * - A driver running the dispatch loop
 * - Change notifications for front-ends
 */

pub mod controller;
pub mod driver;
pub mod models;
pub mod observer;
pub mod transport;

// Re-export main types
pub use controller::SessionController;
pub use driver::SessionDriver;
pub use models::{SessionSnapshot, SessionStatus, StreamId, StreamMessage, TranslationRequest};
pub use observer::{SessionEvent, SessionObserver};
pub use transport::{SignalKind, SseStreamOpener, StreamHandle, StreamOpener, StreamSignal};
