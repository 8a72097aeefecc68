//! HTTP client for communicating with shikayatd.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use shikayat_common::types::{Complaint, ComplaintStats, ComplaintUpdate};
use std::time::Duration;

const DEFAULT_URL: &str = "http://127.0.0.1:7180";

/// Receipt returned by the daemon after a successful submission.
#[derive(Debug, Deserialize)]
pub struct Receipt {
    pub tracking_id: String,
    pub issue_type: String,
    pub severity: String,
    pub department: String,
    pub status: String,
    pub confidence: f64,
}

#[derive(Debug, Deserialize)]
pub struct LoginReply {
    pub token: String,
    pub principal: PrincipalReply,
}

#[derive(Debug, Deserialize)]
pub struct PrincipalReply {
    pub username: String,
    pub full_name: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_language: Option<String>,
    pub district: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Client for the daemon's HTTP API.
pub struct ShikayatdClient {
    base_url: String,
    client: reqwest::Client,
}

impl ShikayatdClient {
    /// Discover the daemon URL.
    ///
    /// Priority:
    /// 1. Explicit --url flag
    /// 2. $SHIKAYATD_URL environment variable
    /// 3. http://127.0.0.1:7180 (default)
    pub fn discover_url(explicit_url: Option<&str>) -> String {
        if let Some(url) = explicit_url {
            return url.trim_end_matches('/').to_string();
        }
        if let Ok(url) = std::env::var("SHIKAYATD_URL") {
            return url.trim_end_matches('/').to_string();
        }
        DEFAULT_URL.to_string()
    }

    pub fn new(explicit_url: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: Self::discover_url(explicit_url),
            client,
        })
    }

    pub async fn health(&self) -> Result<serde_json::Value> {
        let resp = self
            .client
            .get(format!("{}/v1/health", self.base_url))
            .send()
            .await
            .with_context(|| format!("daemon unavailable at {}", self.base_url))?;
        Self::json_or_error(resp).await
    }

    pub async fn submit(&self, body: &SubmitBody) -> Result<Receipt> {
        let resp = self
            .client
            .post(format!("{}/v1/complaints", self.base_url))
            .json(body)
            .send()
            .await
            .with_context(|| format!("daemon unavailable at {}", self.base_url))?;
        Self::json_or_error(resp).await
    }

    pub async fn track(&self, tracking_id: &str) -> Result<Complaint> {
        let resp = self
            .client
            .get(format!("{}/v1/complaints/{}", self.base_url, tracking_id))
            .send()
            .await
            .with_context(|| format!("daemon unavailable at {}", self.base_url))?;
        Self::json_or_error(resp).await
    }

    pub async fn history(&self, tracking_id: &str) -> Result<Vec<ComplaintUpdate>> {
        let resp = self
            .client
            .get(format!(
                "{}/v1/complaints/{}/history",
                self.base_url, tracking_id
            ))
            .send()
            .await
            .with_context(|| format!("daemon unavailable at {}", self.base_url))?;
        Self::json_or_error(resp).await
    }

    pub async fn list(&self, query: &[(&str, String)]) -> Result<Vec<Complaint>> {
        let resp = self
            .client
            .get(format!("{}/v1/complaints", self.base_url))
            .query(query)
            .send()
            .await
            .with_context(|| format!("daemon unavailable at {}", self.base_url))?;
        Self::json_or_error(resp).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginReply> {
        let resp = self
            .client
            .post(format!("{}/v1/admin/login", self.base_url))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .with_context(|| format!("daemon unavailable at {}", self.base_url))?;
        Self::json_or_error(resp).await
    }

    pub async fn transition(
        &self,
        token: &str,
        tracking_id: &str,
        new_status: &str,
        note: &str,
    ) -> Result<ComplaintUpdate> {
        let resp = self
            .client
            .post(format!(
                "{}/v1/admin/complaints/{}/status",
                self.base_url, tracking_id
            ))
            .bearer_auth(token)
            .json(&serde_json::json!({ "new_status": new_status, "note": note }))
            .send()
            .await
            .with_context(|| format!("daemon unavailable at {}", self.base_url))?;
        Self::json_or_error(resp).await
    }

    pub async fn export_csv(&self) -> Result<String> {
        let resp = self
            .client
            .get(format!("{}/v1/export/csv", self.base_url))
            .send()
            .await
            .with_context(|| format!("daemon unavailable at {}", self.base_url))?;
        if !resp.status().is_success() {
            return Err(Self::status_error(resp).await);
        }
        resp.text().await.context("failed to read CSV body")
    }

    pub async fn export_document(&self, tracking_id: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(format!(
                "{}/v1/complaints/{}/document",
                self.base_url, tracking_id
            ))
            .send()
            .await
            .with_context(|| format!("daemon unavailable at {}", self.base_url))?;
        if !resp.status().is_success() {
            return Err(Self::status_error(resp).await);
        }
        Ok(resp.bytes().await.context("failed to read document body")?.to_vec())
    }

    pub async fn stats(&self) -> Result<ComplaintStats> {
        let resp = self
            .client
            .get(format!("{}/v1/stats", self.base_url))
            .send()
            .await
            .with_context(|| format!("daemon unavailable at {}", self.base_url))?;
        Self::json_or_error(resp).await
    }

    async fn json_or_error<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        if !resp.status().is_success() {
            return Err(Self::status_error(resp).await);
        }
        resp.json().await.context("failed to decode daemon response")
    }

    async fn status_error(resp: reqwest::Response) -> anyhow::Error {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if body.is_empty() {
            anyhow!("daemon returned {}", status)
        } else {
            anyhow!("daemon returned {}: {}", status, body)
        }
    }
}
