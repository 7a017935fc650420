use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::RemoteFetcher;
use crate::config::RemoteConfig;
use crate::error::FetchError;

/// Longest error body kept in a [`FetchError::Status`] message.
const MAX_ERROR_BODY: usize = 512;

/// HTTP fetcher for JSON endpoints.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
}

impl HttpFetcher {
  pub fn new(config: &RemoteConfig, token: Option<String>) -> Result<Self> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    if let Some(token) = token {
      let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| eyre!("Invalid access token: {}", e))?;
      value.set_sensitive(true);
      headers.insert(AUTHORIZATION, value);
    }

    let client = reqwest::Client::builder()
      .default_headers(headers)
      .user_agent(config.user_agent.clone())
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
  async fn request(&self, url: &str) -> Result<Value, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
      url: url.to_string(),
      message: e.to_string(),
    })?;

    let transport = |e: reqwest::Error| FetchError::Transport {
      url: url.to_string(),
      message: e.to_string(),
    };

    debug!(%url, "GET");
    let response = self.client.get(parsed).send().await.map_err(transport)?;
    let status = response.status();
    let body = response.text().await.map_err(transport)?;

    if !status.is_success() {
      return Err(FetchError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        message: excerpt(&body),
      });
    }

    serde_json::from_str(&body).map_err(|e| FetchError::Decode(format!("{}: {}", url, e)))
  }
}

fn excerpt(body: &str) -> String {
  let body = body.trim();
  match body.char_indices().nth(MAX_ERROR_BODY) {
    Some((end, _)) => format!("{}...", &body[..end]),
    None => body.to_string(),
  }
}
