use std::time::Duration;

use anyhow::Context;
use joinwatch_types::{Point, RegionId};
use serde::Serialize;

use super::Automation;

#[derive(Debug, Serialize)]
struct TriggerPayload<'a> {
    region: &'a str,
    x: i32,
    y: i32,
    text: &'a str,
}

/// POSTs each trigger as JSON
#[derive(Clone)]
pub struct WebhookAutomation {
    url: String,
    client: reqwest::Client,
}

impl WebhookAutomation {
    pub fn new(url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { url, client })
    }
}

#[async_trait::async_trait]
impl Automation for WebhookAutomation {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn perform_action(
        &self,
        region: &RegionId,
        anchor: Point,
        text: &str,
    ) -> anyhow::Result<()> {
        let payload = TriggerPayload {
            region: region.as_str(),
            x: anchor.x,
            y: anchor.y,
            text,
        };

        self.client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .context("Failed to send trigger to webhook")?
            .error_for_status()
            .context("Webhook rejected trigger")?;

        tracing::debug!("[ACTION] webhook accepted {region}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_payload_shape() {
        let region = RegionId::for_cell(0, 2, 3);
        let payload = TriggerPayload {
            region: region.as_str(),
            x: 10,
            y: 20,
            text: "들어왔습니다",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["region"], "monitor_0_cell_2_3");
        assert_eq!(json["x"], 10);
        assert_eq!(json["text"], "들어왔습니다");
    }

    #[tokio::test]
    async fn test_posts_to_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            // read until the JSON body has arrived
            while !String::from_utf8_lossy(&received).contains("monitor_0_cell_0_1") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 204 No Content\r\ncontent-length: 0\r\n\r\n")
                .await
                .unwrap();
            String::from_utf8_lossy(&received).to_string()
        });

        let automation =
            WebhookAutomation::new(format!("http://{addr}/hook"), Duration::from_secs(5)).unwrap();
        automation
            .perform_action(&RegionId::for_cell(0, 0, 1), Point::new(3, 4), "들어왔습니다")
            .await
            .unwrap();

        let request = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(request.starts_with("POST /hook"));
        assert!(request.contains("\"x\":3"));
    }
}
