/*!
 * Tests for the JSON endpoint client against a local server
 */

use anyhow::Result;
use subremote::api::ApiClient;
use subremote::errors::ApiError;
use crate::common::config_for;
use crate::common::test_server::{json_response, spawn_server};

/// Test listing subtitle files
#[tokio::test]
async fn test_list_files_withValidResponse_shouldParseEntries() -> Result<()> {
    let server = spawn_server(|_| json_response(200, r#"[
        {"path":"/mnt/media/Show/ep1.en.srt","name":"ep1.en.srt","relative":"Show/ep1.en.srt"},
        {"path":"/mnt/media/movie.srt","name":"movie.srt","relative":"movie.srt"}
    ]"#)).await;
    let client = ApiClient::new(&config_for(&server.base_url).api)?;

    let files = client.list_files().await?;

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].name, "ep1.en.srt");
    assert_eq!(files[0].relative, "Show/ep1.en.srt");
    assert_eq!(server.recorded()[0].request_line(), "GET /api/files HTTP/1.1");
    Ok(())
}

/// Test listing models in both response shapes
#[tokio::test]
async fn test_list_models_withEitherShape_shouldReturnNames() -> Result<()> {
    let bare = spawn_server(|_| json_response(200, r#"["gemma2:27b","gemma2:9b"]"#)).await;
    let client = ApiClient::new(&config_for(&bare.base_url).api)?;
    assert_eq!(client.list_models().await?, vec!["gemma2:27b", "gemma2:9b"]);

    let wrapped = spawn_server(|_| json_response(200, r#"{"models":["qwen2.5:14b"]}"#)).await;
    let client = ApiClient::new(&config_for(&wrapped.base_url).api)?;
    assert_eq!(client.list_models().await?, vec!["qwen2.5:14b"]);
    Ok(())
}

/// Test fetching the guide text
#[tokio::test]
async fn test_readme_shouldReturnContent() -> Result<()> {
    let server = spawn_server(|_| json_response(200, r##"{"content":"# Guide\nUse it."}"##)).await;
    let client = ApiClient::new(&config_for(&server.base_url).api)?;

    assert_eq!(client.readme().await?, "# Guide\nUse it.");
    Ok(())
}

/// Test that the configured token is sent as a bearer header
#[tokio::test]
async fn test_requests_withToken_shouldSendBearerHeader() -> Result<()> {
    let server = spawn_server(|_| json_response(200, "[]")).await;
    let mut config = config_for(&server.base_url);
    config.api.token = "secret-token".to_string();
    let client = ApiClient::new(&config.api)?;

    client.list_files().await?;

    let recorded = server.recorded();
    assert_eq!(recorded[0].header("authorization").as_deref(), Some("Bearer secret-token"));
    Ok(())
}

/// Test that no authorization header is sent without a token
#[tokio::test]
async fn test_requests_withoutToken_shouldNotAuthenticate() -> Result<()> {
    let server = spawn_server(|_| json_response(200, "[]")).await;
    let client = ApiClient::new(&config_for(&server.base_url).api)?;

    client.list_files().await?;

    assert!(server.recorded()[0].header("authorization").is_none());
    Ok(())
}

/// Test logging in
#[tokio::test]
async fn test_login_withCorrectPassword_shouldReturnToken() -> Result<()> {
    let server = spawn_server(|request| {
        if request.body.contains(r#""password":"123456789""#) {
            json_response(200, r#"{"token":"jwt-abc"}"#)
        } else {
            json_response(401, r#"{"error":"Wrong password"}"#)
        }
    }).await;
    let client = ApiClient::new(&config_for(&server.base_url).api)?;

    assert_eq!(client.login("123456789").await?, "jwt-abc");
    assert_eq!(server.recorded()[0].request_line(), "POST /api/login HTTP/1.1");

    match client.login("wrong").await {
        Err(ApiError::AuthenticationError(message)) => assert_eq!(message, "Wrong password"),
        other => panic!("Expected authentication error, got {:?}", other),
    }
    Ok(())
}

/// Test that a token obtained at runtime is used afterwards
#[tokio::test]
async fn test_with_token_shouldOverrideConfiguredToken() -> Result<()> {
    let server = spawn_server(|_| json_response(200, r#"{"content":""}"#)).await;
    let client = ApiClient::new(&config_for(&server.base_url).api)?.with_token("fresh");

    client.readme().await?;

    assert_eq!(server.recorded()[0].header("authorization").as_deref(), Some("Bearer fresh"));
    Ok(())
}

/// Test browsing a folder
#[tokio::test]
async fn test_browse_shouldPostPathAndParseItems() -> Result<()> {
    let server = spawn_server(|_| json_response(200, r#"{"items":[
        {"name":"Season 1/","path":"Show/Season 1","isDir":true,"isSrt":false},
        {"name":"ep1.srt","path":"Show/ep1.srt","isDir":false,"isSrt":true}
    ]}"#)).await;
    let client = ApiClient::new(&config_for(&server.base_url).api)?;

    let items = client.browse("Show").await?;

    assert_eq!(items.len(), 2);
    assert!(items[0].is_dir);
    assert!(items[1].is_srt);
    let recorded = server.recorded();
    assert_eq!(recorded[0].request_line(), "POST /api/tree HTTP/1.1");
    assert_eq!(recorded[0].body, r#"{"path":"Show"}"#);
    Ok(())
}

/// Test that error bodies are surfaced with their most specific message
#[tokio::test]
async fn test_error_status_withDetails_shouldReturnApiError() -> Result<()> {
    let server = spawn_server(|_| {
        json_response(500, r#"{"error":"Error en traducción","details":"ollama not running"}"#)
    }).await;
    let client = ApiClient::new(&config_for(&server.base_url).api)?;

    match client.list_files().await {
        Err(ApiError::ApiError { status_code, message }) => {
            assert_eq!(status_code, 500);
            assert_eq!(message, "ollama not running");
        },
        other => panic!("Expected API error, got {:?}", other),
    }
    Ok(())
}

/// Test that a non-JSON error body is passed through verbatim
#[tokio::test]
async fn test_error_status_withPlainBody_shouldKeepBody() -> Result<()> {
    let server = spawn_server(|_| json_response(404, "Not here")).await;
    let client = ApiClient::new(&config_for(&server.base_url).api)?;

    match client.readme().await {
        Err(ApiError::ApiError { status_code, message }) => {
            assert_eq!(status_code, 404);
            assert_eq!(message, "Not here");
        },
        other => panic!("Expected API error, got {:?}", other),
    }
    Ok(())
}

/// Test that an unexpected body is a parse error
#[tokio::test]
async fn test_invalid_json_shouldReturnParseError() -> Result<()> {
    let server = spawn_server(|_| json_response(200, r#"{"unexpected":true}"#)).await;
    let client = ApiClient::new(&config_for(&server.base_url).api)?;

    assert!(matches!(client.list_files().await, Err(ApiError::ParseError(_))));
    Ok(())
}

/// Test that an unreachable service is a connection error
#[tokio::test]
async fn test_unreachable_service_shouldReturnConnectionError() -> Result<()> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);

    let client = ApiClient::new(&config_for(&format!("http://{}/api", addr)).api)?;

    assert!(matches!(client.list_files().await, Err(ApiError::ConnectionError(_))));
    Ok(())
}

/// Test that a malformed base URL is rejected up front
#[test]
fn test_new_withInvalidUrl_shouldFail() {
    let config = config_for("not a url");
    assert!(matches!(ApiClient::new(&config.api), Err(ApiError::InvalidUrl(_))));
}

/// Test trailing slashes in the base URL
#[test]
fn test_new_withTrailingSlash_shouldNormalizeBaseUrl() {
    let config = config_for("http://localhost:5000/api/");
    let client = ApiClient::new(&config.api).unwrap();
    assert_eq!(client.base_url(), "http://localhost:5000/api");
}
