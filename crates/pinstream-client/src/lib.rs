use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use pinstream_core::{InspectionResult, PinError, PinResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use url::Url;

pub const INSPECT_FAILED_MESSAGE: &str = "Failed to inspect pin";
pub const CHECK_FAILED_MESSAGE: &str = "Failed to check Pinterest URL. Please try again.";

const USER_AGENT: &str = "pinstream/0.1";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// The two endpoints the session controller talks to.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `POST /inspect` with the normalized pin URL.
    async fn inspect(&self, url: &str) -> PinResult<InspectionResult>;

    /// `GET /download` address for a video; building it performs no request.
    fn download_url(&self, video_url: &str, filename: &str) -> Url;
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    inspect_endpoint: Url,
    download_endpoint: Url,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> PinResult<Self> {
        let base = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(base)
            .map_err(|err| PinError::Config(format!("invalid backend url '{base}': {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PinError::Config(format!(
                "backend url must use http or https: {base}"
            )));
        }

        let endpoint = |path: &str| {
            Url::parse(&format!("{base}/{path}"))
                .map_err(|err| PinError::Config(format!("invalid backend endpoint: {err}")))
        };

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|err| PinError::Config(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            inspect_endpoint: endpoint("inspect")?,
            download_endpoint: endpoint("download")?,
        })
    }

    /// Fetches a download address and streams the body into `destination`.
    ///
    /// The body lands in a `.part` sibling that is renamed on success and removed
    /// on failure. An existing `destination` is never overwritten. Returns the
    /// number of bytes written.
    pub async fn save_download(&self, url: &Url, destination: &Path) -> PinResult<u64> {
        if tokio::fs::try_exists(destination).await.unwrap_or(false) {
            return Err(PinError::Download(format!(
                "{} already exists",
                destination.display()
            )));
        }

        let mut response = self
            .client
            .get(url.clone())
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|err| PinError::Download(format!("request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message =
                backend_error_message(&body).unwrap_or_else(|| format!("status={status}"));
            tracing::warn!(%status, %message, "download rejected by backend");
            return Err(PinError::Download(message));
        }

        let partial = partial_path(destination);
        let written = match stream_to_file(&mut response, &partial).await {
            Ok(written) => written,
            Err(err) => {
                let _ = tokio::fs::remove_file(&partial).await;
                tracing::warn!(error = %err, path = %destination.display(), "download aborted");
                return Err(err);
            }
        };
        if let Err(err) = tokio::fs::rename(&partial, destination).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(PinError::Download(format!(
                "failed to move download into {}: {err}",
                destination.display()
            )));
        }

        tracing::info!(bytes = written, path = %destination.display(), "download saved");
        Ok(written)
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn inspect(&self, url: &str) -> PinResult<InspectionResult> {
        tracing::info!(url, "inspecting pin");
        let response = self
            .client
            .post(self.inspect_endpoint.clone())
            .header("Accept", "application/json")
            .json(&InspectRequest { url })
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "inspect request failed");
                PinError::InspectionFailed(CHECK_FAILED_MESSAGE.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message =
                backend_error_message(&body).unwrap_or_else(|| INSPECT_FAILED_MESSAGE.to_string());
            tracing::warn!(%status, %message, "inspect rejected by backend");
            return Err(PinError::InspectionFailed(message));
        }

        response.json::<InspectionResult>().await.map_err(|err| {
            tracing::warn!(error = %err, "inspect response parse failed");
            PinError::InspectionFailed(CHECK_FAILED_MESSAGE.to_string())
        })
    }

    fn download_url(&self, video_url: &str, filename: &str) -> Url {
        let mut url = self.download_endpoint.clone();
        url.set_query(Some(&format!(
            "video_url={}&filename={}",
            encode_component(video_url),
            encode_component(filename)
        )));
        url
    }
}

#[derive(Debug, Serialize)]
struct InspectRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

fn backend_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()?
        .error
        .filter(|message| !message.trim().is_empty())
}

/// Sibling path the body streams into until the transfer completes.
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

async fn stream_to_file(response: &mut reqwest::Response, path: &Path) -> PinResult<u64> {
    let mut file = tokio::fs::File::create(path).await.map_err(|err| {
        PinError::Download(format!("failed to create {}: {err}", path.display()))
    })?;

    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await.map_err(|err| {
        PinError::Download(format!("transfer interrupted after {written} bytes: {err}"))
    })? {
        file.write_all(&chunk)
            .await
            .map_err(|err| PinError::Download(format!("write failed: {err}")))?;
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|err| PinError::Download(format!("write failed: {err}")))?;
    Ok(written)
}

fn encode_component(value: &str) -> String {
    // Form serialization escapes a literal `+` as %2B, so any `+` left is a space.
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn client_for(server: &mockito::ServerGuard) -> BackendClient {
        BackendClient::new(&server.url(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_backend_urls() {
        assert!(matches!(
            BackendClient::new("not a url", Duration::from_secs(1)),
            Err(PinError::Config(_))
        ));
        assert!(matches!(
            BackendClient::new("ftp://files.example.com", Duration::from_secs(1)),
            Err(PinError::Config(_))
        ));
    }

    #[test]
    fn test_download_url_encodes_both_parameters() {
        let client = BackendClient::new("http://localhost:5000/", Duration::from_secs(1)).unwrap();
        let url = client.download_url(
            "https://v1.pinimg.com/videos/a b.mp4?x=1&y=2",
            "My_Pin__.mp4",
        );

        assert_eq!(url.path(), "/download");
        assert!(!url.as_str().contains("a b"));
        assert!(!url.as_str().contains("?x=1&y=2"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                (
                    "video_url".to_string(),
                    "https://v1.pinimg.com/videos/a b.mp4?x=1&y=2".to_string()
                ),
                ("filename".to_string(), "My_Pin__.mp4".to_string()),
            ]
        );
    }

    #[test]
    fn test_endpoints_keep_base_path_prefix() {
        let client =
            BackendClient::new("https://tools.example.com/pins/", Duration::from_secs(1)).unwrap();
        let url = client.download_url("https://x/v.mp4", "v.mp4");
        assert_eq!(url.path(), "/pins/download");
        assert_eq!(client.inspect_endpoint.path(), "/pins/inspect");
    }

    #[tokio::test]
    async fn test_inspect_posts_url_and_parses_metadata() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/inspect")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({ "url": "https://pinterest.com/pin/123" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "success": true,
                    "metadata": {
                        "title": "My Pin!!",
                        "video_url": "https://x/v.mp4",
                        "site_name": "Pinterest"
                    },
                    "downloadable": true
                })
                .to_string(),
            )
            .create_async()
            .await;

        let result = client_for(&server)
            .inspect("https://pinterest.com/pin/123")
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(result.downloadable);
        assert_eq!(result.metadata.video_url(), Some("https://x/v.mp4"));
        assert_eq!(result.metadata.title.as_deref(), Some("My Pin!!"));
    }

    #[tokio::test]
    async fn test_inspect_surfaces_backend_error_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/inspect")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"Please provide a valid Pinterest pin URL"}"#)
            .create_async()
            .await;

        let result = client_for(&server)
            .inspect("https://pinterest.com/pin/1")
            .await;
        assert_eq!(
            result,
            Err(PinError::InspectionFailed(
                "Please provide a valid Pinterest pin URL".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_inspect_falls_back_to_generic_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/inspect")
            .with_status(500)
            .with_body("<html>Internal Server Error</html>")
            .create_async()
            .await;

        let result = client_for(&server)
            .inspect("https://pinterest.com/pin/1")
            .await;
        match result {
            Err(PinError::InspectionFailed(msg)) => {
                assert_eq!(msg, INSPECT_FAILED_MESSAGE);
                assert!(!msg.contains("html"));
            }
            _ => panic!("Expected InspectionFailed error"),
        }
    }

    #[tokio::test]
    async fn test_inspect_reports_unreadable_success_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/inspect")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let result = client_for(&server)
            .inspect("https://pinterest.com/pin/1")
            .await;
        assert_eq!(
            result,
            Err(PinError::InspectionFailed(CHECK_FAILED_MESSAGE.to_string()))
        );
    }

    #[tokio::test]
    async fn test_inspect_reports_unreachable_backend() {
        let client = BackendClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let result = client.inspect("https://pinterest.com/pin/1").await;
        assert_eq!(
            result,
            Err(PinError::InspectionFailed(CHECK_FAILED_MESSAGE.to_string()))
        );
    }

    #[tokio::test]
    async fn test_save_download_writes_body_to_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/download")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("video_url".into(), "https://x/v.mp4".into()),
                Matcher::UrlEncoded("filename".into(), "clip.mp4".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "video/mp4")
            .with_body(vec![7u8; 4096])
            .create_async()
            .await;

        let client = client_for(&server);
        let url = client.download_url("https://x/v.mp4", "clip.mp4");
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("clip.mp4");

        let written = client.save_download(&url, &destination).await.unwrap();

        mock.assert_async().await;
        assert_eq!(written, 4096);
        assert_eq!(std::fs::read(&destination).unwrap(), vec![7u8; 4096]);
    }

    #[tokio::test]
    async fn test_save_download_reports_backend_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/download")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(
                r#"{"error":"Failed to download video. The video may be protected or unavailable."}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let url = client.download_url("https://x/v.mp4", "clip.mp4");
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("clip.mp4");

        let result = client.save_download(&url, &destination).await;
        match result {
            Err(PinError::Download(msg)) => assert!(msg.contains("protected or unavailable")),
            _ => panic!("Expected Download error"),
        }
        assert!(!destination.exists());
    }

    #[test]
    fn test_download_url_percent_encodes_spaces() {
        let client = BackendClient::new("http://localhost:5000", Duration::from_secs(1)).unwrap();
        let url = client.download_url("https://x/my clip.mp4", "a+b.mp4");
        let query = url.query().unwrap();

        assert!(query.contains("my%20clip.mp4"));
        assert!(query.ends_with("filename=a%2Bb.mp4"));
        assert!(!query.contains('+'));
    }

    #[tokio::test]
    async fn test_save_download_removes_partial_file_when_body_is_cut_short() {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nContent-Length: 4096\r\n\r\n",
                )
                .await
                .unwrap();
            socket.write_all(&[1u8; 100]).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        let client =
            BackendClient::new(&format!("http://{address}"), Duration::from_secs(5)).unwrap();
        let url = client.download_url("https://x/v.mp4", "clip.mp4");
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("clip.mp4");

        let result = client.save_download(&url, &destination).await;
        server.await.unwrap();

        match result {
            Err(PinError::Download(msg)) => assert!(msg.contains("transfer interrupted")),
            other => panic!("Expected Download error, got {other:?}"),
        }
        assert!(!destination.exists());
        assert!(!dir.path().join("clip.mp4.part").exists());
    }

    #[tokio::test]
    async fn test_save_download_never_overwrites_existing_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/download")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("new bytes")
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server);
        let url = client.download_url("https://x/v.mp4", "pinterest_video.mp4");
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("pinterest_video.mp4");
        std::fs::write(&destination, b"earlier").unwrap();

        let result = client.save_download(&url, &destination).await;

        mock.assert_async().await;
        match result {
            Err(PinError::Download(msg)) => assert!(msg.contains("already exists")),
            other => panic!("Expected Download error, got {other:?}"),
        }
        assert_eq!(std::fs::read(&destination).unwrap(), b"earlier");
    }
}
