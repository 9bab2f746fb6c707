//! HTTP client for the visit API's collection endpoint.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use vigil_core::{ApiError, RawRecord};

use crate::api::VisitApi;
use crate::config::ClientConfig;

/// reqwest-backed [`VisitApi`].
///
/// `GET <base_url>` lists records; `PATCH <base_url>/<id>` moves one record's
/// `last_verified_date` forward.
pub struct HttpVisitApi {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct AcknowledgeBody<'a> {
    last_verified_date: &'a str,
}

impl HttpVisitApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ApiError::unknown(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::timeout()
    } else if err.is_decode() {
        ApiError::validation(err.to_string())
    } else if err.is_connect() || err.is_request() {
        ApiError::network(err.to_string())
    } else {
        ApiError::unknown(err.to_string())
    }
}

#[async_trait]
impl VisitApi for HttpVisitApi {
    async fn fetch_records(&self) -> Result<Vec<RawRecord>, ApiError> {
        info!(url = %self.base_url, "fetching monitored records");
        let resp = self
            .client
            .get(&self.base_url)
            .send()
            .await
            .map_err(transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16()));
        }

        let records: Vec<RawRecord> = resp.json().await.map_err(transport_error)?;
        info!(count = records.len(), "fetched monitored records");
        Ok(records)
    }

    async fn acknowledge(&self, id: u64, last_verified_date: &str) -> Result<(), ApiError> {
        let url = format!("{}/{id}", self.base_url);
        info!(url = %url, "sending acknowledgment");
        let resp = self
            .client
            .patch(&url)
            .json(&AcknowledgeBody { last_verified_date })
            .send()
            .await
            .map_err(transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;
    use vigil_core::ErrorKind;

    const RECORDS: &str = r#"[
        {"id": 1, "name": "João Silva", "cpf": "123.456.789-01", "active": true,
         "last_verified_date": "2025/11/20 10:00:00", "verify_frequency_in_days": 3},
        {"id": 2, "name": "Maria Santos", "cpf": "98765432100", "active": false,
         "last_verified_date": null, "verify_frequency_in_days": 7}
    ]"#;

    fn header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    /// Read one full HTTP/1.1 request (headers plus content-length body).
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = header_end(&buf) {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Answer exactly one request with a canned response; yields the request text.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        (format!("http://{addr}/api/monitored"), handle)
    }

    fn client(base_url: &str, timeout: Duration) -> HttpVisitApi {
        HttpVisitApi::new(&ClientConfig::new(base_url, timeout)).unwrap()
    }

    #[tokio::test]
    async fn fetch_decodes_records() {
        let (url, server) = serve_once("200 OK", RECORDS).await;
        let records = client(&url, Duration::from_secs(5)).fetch_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identity_code, "123.456.789-01");
        assert!(!records[1].active);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/monitored "), "{request}");
    }

    #[tokio::test]
    async fn acknowledge_sends_patch_with_timestamp() {
        let (url, server) = serve_once("200 OK", "{}").await;
        client(&url, Duration::from_secs(5))
            .acknowledge(42, "2025/11/25 12:00:00")
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("PATCH /api/monitored/42 "), "{request}");
        assert!(request.contains(r#"{"last_verified_date":"2025/11/25 12:00:00"}"#));
    }

    #[tokio::test]
    async fn not_found_is_permanent() {
        let (url, _server) = serve_once("404 Not Found", "{}").await;
        let err = client(&url, Duration::from_secs(5))
            .acknowledge(9, "2025/11/25 12:00:00")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Server);
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn server_error_is_retryable() {
        let (url, _server) = serve_once("503 Service Unavailable", "{}").await;
        let err = client(&url, Duration::from_secs(5)).fetch_records().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Server);
        assert_eq!(err.status, Some(503));
        assert!(err.retryable);
    }

    #[tokio::test]
    async fn malformed_body_is_validation_error() {
        let (url, _server) = serve_once("200 OK", "not json").await;
        let err = client(&url, Duration::from_secs(5)).fetch_records().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{addr}"), Duration::from_secs(5))
            .fetch_records()
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let err = client(&format!("http://{addr}"), Duration::from_millis(100))
            .fetch_records()
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
    }

    #[test]
    fn trims_trailing_slash() {
        let api = client("http://localhost:4000/", Duration::from_secs(1));
        assert_eq!(api.base_url(), "http://localhost:4000");
    }
}
