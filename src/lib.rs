/*!
 * # subremote - remote subtitle translation client
 *
 * A Rust library and CLI for driving a remote subtitle-translation service
 * and watching its jobs live.
 *
 * ## Features
 *
 * - Browse subtitle files and installed models on the service
 * - Start a translation job and follow it over server-sent events
 * - Monotonic progress even when events arrive out of order
 * - A new request always supersedes the previous one cleanly
 * - Optional cosmetic progress while the service is silent
 * - Bearer token authentication
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `api`: Client for the service's JSON endpoints
 * - `session`: Live translation sessions:
 *   - `session::controller`: Session state machine
 *   - `session::transport`: Server-sent event transport
 *   - `session::driver`: Dispatch loop feeding the controller
 *   - `session::observer`: Change notifications for front-ends
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod api;
pub mod session;
pub mod errors;

// Re-export main types for easier usage
pub use app_config::Config;
pub use api::ApiClient;
pub use session::{SessionController, SessionDriver, SessionEvent, SessionObserver, SessionStatus, TranslationRequest};
pub use errors::{ApiError, SessionError};
