use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;

const TOKEN_HEADER: &str = "X-OpenInSafari-Token";

/// `GET /ping` answer.
#[derive(Debug, Deserialize)]
pub struct Ping {
    pub ok: bool,
    pub version: String,
    pub client_ip: String,
    pub allowed: bool,
    pub token_ok: bool,
}

/// `POST /open` answer, success or failure.
#[derive(Debug, Deserialize)]
pub struct OpenReply {
    pub ok: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

pub struct RelayClient {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl RelayClient {
    pub fn new(server: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base: server.trim_end_matches('/').to_owned(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn with_token(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(t) => req.header(TOKEN_HEADER, t),
            None => req,
        }
    }

    pub async fn ping(&self) -> Result<Ping> {
        let req = self.with_token(self.http.get(format!("{}/ping", self.base)));
        let resp = req.send().await.context("ping relay")?;
        resp.json().await.context("decode ping response")
    }

    /// Error statuses still carry a JSON body, so they decode into `OpenReply`.
    pub async fn open(&self, url: &str) -> Result<OpenReply> {
        let req = self.with_token(self.http.post(format!("{}/open", self.base)));
        let resp = req
            .json(&json!({ "url": url }))
            .send()
            .await
            .context("send open request")?;
        let status = resp.status();
        resp.json()
            .await
            .with_context(|| format!("decode open response (HTTP {status})"))
    }
}
