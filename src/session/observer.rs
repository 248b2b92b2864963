/*!
 * Change notifications for front-ends watching a session.
 */

use tokio::sync::mpsc::UnboundedSender;

use super::models::SessionStatus;

/// A change to a session, emitted after the state has been updated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The status moved to a new value
    StatusChanged(SessionStatus),
    /// The displayed percentage changed
    ProgressChanged(u8),
    /// A line was appended to the session log
    LogAppended(String),
    /// The job produced this output file
    OutputReady(String),
}

/// Receives every change made to a session
pub trait SessionObserver: Send {
    /// Called once per change, in the order the changes happened
    fn notify(&mut self, event: &SessionEvent);
}

/// Forward events to an async consumer. A closed receiver is not an error:
/// the view that owned it has simply gone away.
impl SessionObserver for UnboundedSender<SessionEvent> {
    fn notify(&mut self, event: &SessionEvent) {
        let _ = self.send(event.clone());
    }
}
