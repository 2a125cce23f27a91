//! HTTP client for the baseline-update endpoint.

use std::future::Future;
use std::time::Duration;

use pixreview_core::promote::{BaselinePromoter, PromoteError, PromotionRequest};
use reqwest::header::ACCEPT;

/// Posts promotion requests as JSON to the fixtures endpoint. Any 2xx
/// response counts as success.
#[derive(Debug, Clone)]
pub struct HttpPromoter {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPromoter {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint: endpoint.into() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl BaselinePromoter for HttpPromoter {
    fn promote(&self, request: &PromotionRequest) -> impl Future<Output = Result<(), PromoteError>> + Send {
        let pending = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .json(request);
        let endpoint = self.endpoint.clone();
        async move {
            let response = pending
                .send()
                .await
                .map_err(|e| PromoteError::Transport(e.to_string()))?;
            let status = response.status();
            tracing::debug!(%endpoint, %status, "baseline update answered");
            if status.is_success() {
                Ok(())
            } else {
                Err(PromoteError::Status(status.as_u16()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accepts one connection, captures the request, answers with `status_line`.
    async fn one_shot_server(status_line: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/fixtures.json", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            while !String::from_utf8_lossy(&raw).contains('}') {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            let reply = format!("{status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(reply.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        });
        (url, handle)
    }

    fn request() -> PromotionRequest {
        PromotionRequest { test: "test1".to_owned(), hash: "deadbeef".to_owned() }
    }

    #[tokio::test]
    async fn posts_json_and_accepts_2xx() {
        let (url, server) = one_shot_server("HTTP/1.1 200 OK").await;
        let promoter = HttpPromoter::new(url, Duration::from_secs(5)).unwrap();

        promoter.promote(&request()).await.unwrap();

        let seen = server.await.unwrap().to_ascii_lowercase();
        assert!(seen.starts_with("post /fixtures.json"), "got {seen}");
        assert!(seen.contains("accept: application/json"));
        assert!(seen.contains("content-type: application/json"));
        assert!(seen.contains(r#"{"test":"test1","hash":"deadbeef"}"#));
    }

    #[tokio::test]
    async fn non_2xx_is_a_status_error() {
        let (url, server) = one_shot_server("HTTP/1.1 409 Conflict").await;
        let promoter = HttpPromoter::new(url, Duration::from_secs(5)).unwrap();
        assert_eq!(promoter.promote(&request()).await, Err(PromoteError::Status(409)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/fixtures.json", listener.local_addr().unwrap());
        drop(listener);
        let promoter = HttpPromoter::new(url, Duration::from_secs(5)).unwrap();
        assert!(matches!(promoter.promote(&request()).await, Err(PromoteError::Transport(_))));
    }
}
