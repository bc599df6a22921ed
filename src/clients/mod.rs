pub mod orchestrator;

use reqwest::{Client, Response, Url};
use serde_json::Value;
use std::time::Duration;

/// Failures that happen before a usable JSON body is in hand.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("base URL {0:?} cannot address an endpoint")]
    InvalidBaseUrl(String),
    #[error("GET {path} returned a body that is not JSON: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub struct ApiClient {
    pub base_url: String,
    http: Client,
}

impl ApiClient {
    /// `timeout` of `None` leaves reqwest's default (no overall timeout).
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }

        Ok(Self {
            base_url: base_url.into(),
            http: builder.build()?,
        })
    }

    /// Appends `path` to the base URL as one escaped segment.
    pub fn url(&self, path: &str) -> Result<Url, ClientError> {
        let invalid = || ClientError::InvalidBaseUrl(self.base_url.clone());
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push(path);
        Ok(url)
    }

    pub async fn get(&self, path: &str) -> Result<Response, ClientError> {
        let resp = self
            .http
            .get(self.url(path)?)
            .header("Accept", "application/json")
            .send()
            .await?;
        Ok(resp)
    }
}

pub async fn read_json(path: &str, resp: Response) -> Result<Value, ClientError> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|source| ClientError::Decode {
        path: path.to_string(),
        source,
    })
}
