//! HTTP client used by the CLI subcommands to talk to a running service.

use crate::error_handling::types::ClientError;
use crate::web_interface::types::StartRequest;
use std::time::Duration;

pub struct ApiClient {
    base: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    async fn into_json(response: reqwest::Response) -> Result<serde_json::Value, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    pub async fn start(&self, request: &StartRequest) -> Result<serde_json::Value, ClientError> {
        let response = self
            .http
            .post(format!("{}/sessions", self.base))
            .json(request)
            .send()
            .await?;
        Self::into_json(response).await
    }

    pub async fn status(&self, id: &str) -> Result<serde_json::Value, ClientError> {
        let response = self
            .http
            .get(format!("{}/sessions/{}/status", self.base, id))
            .send()
            .await?;
        Self::into_json(response).await
    }

    pub async fn stop(&self, id: &str) -> Result<serde_json::Value, ClientError> {
        let response = self
            .http
            .delete(format!("{}/sessions/{}", self.base, id))
            .send()
            .await?;
        Self::into_json(response).await
    }

    pub async fn receivers(&self) -> Result<serde_json::Value, ClientError> {
        let response = self
            .http
            .get(format!("{}/receivers", self.base))
            .send()
            .await?;
        Self::into_json(response).await
    }
}

/// `start`: create a session, then poll until the stream looks fresh.
pub async fn run_start(api: &str, request: StartRequest) -> Result<(), ClientError> {
    let client = ApiClient::new(api);
    let created = client.start(&request).await?;
    let id = created["id"].as_str().unwrap_or_default().to_string();
    println!(
        "Session: {}  HLS: {}",
        id,
        created["hls_url"].as_str().unwrap_or("(pending)")
    );
    println!("Waiting for segments...");

    for _ in 0..20 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let status = client.status(&id).await?;
        if let Some(age) = status["last_segment_age_ms"].as_u64() {
            if age < 8_000 {
                println!("Streaming looks fresh.");
                return Ok(());
            }
        }
        if status["state"] == "error" {
            println!(
                "Session entered error state: {}",
                status["error"]["message"].as_str().unwrap_or("unknown")
            );
            return Ok(());
        }
    }
    println!("No fresh segments yet; check `status {}` later.", id);
    Ok(())
}

pub async fn run_status(api: &str, id: &str) -> Result<(), ClientError> {
    let status = ApiClient::new(api).status(id).await?;
    println!("{}", serde_json::to_string_pretty(&status).unwrap_or_default());
    Ok(())
}

pub async fn run_stop(api: &str, id: &str) -> Result<(), ClientError> {
    ApiClient::new(api).stop(id).await?;
    println!("Stopped.");
    Ok(())
}

pub async fn run_receivers(api: &str) -> Result<(), ClientError> {
    let receivers = ApiClient::new(api).receivers().await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&receivers).unwrap_or_default()
    );
    Ok(())
}
