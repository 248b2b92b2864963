/*!
 * Client for the translation service's catalog endpoints.
 *
 * These are plain request/response calls: subtitle files, installed models,
 * the guide text, folder browsing and login. The streaming translate
 * endpoint lives in `session::transport`.
 */

pub mod client;
pub mod models;

pub use client::ApiClient;
pub use models::{SubtitleFile, TreeItem};
