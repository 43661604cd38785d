//! HTTP implementation of the conversation backend

use super::{ByteStream, ChatBackend, HistoryMessage, TransportError, TurnRequest};
use crate::config::ClientConfig;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, Response, Url};
use serde::Deserialize;
use std::time::Duration;

const STREAM_PATH: &str = "chat_stream";
const HISTORY_PATH: &str = "get-all";
const THREADS_PATH: &str = "get-threads";

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    messages: Vec<HistoryMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadListResponse {
    thread_list: Vec<String>,
}

/// Backend reached over HTTP, streaming turns as `text/event-stream`
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    request_timeout: Duration,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        // No overall timeout: it would cut long streams short.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::connect(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.backend_url.clone(),
            request_timeout: config.request_timeout,
        })
    }

    /// Request target for a turn: the input is one path segment, the
    /// continuation token a query parameter
    pub fn stream_url(&self, request: &TurnRequest) -> Result<Url, TransportError> {
        let mut url = self.endpoint(&[STREAM_PATH, &request.input])?;
        if let Some(token) = &request.continuation {
            url.query_pairs_mut()
                .append_pair("checkpoint_id", token.as_str());
        }
        Ok(url)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                TransportError::connect(format!("Backend URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;
        let response = ensure_success(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::protocol(format!("Failed to parse response: {e}")))
    }
}

async fn ensure_success(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::status(format!("HTTP {status}: {body}")))
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn open_stream(&self, request: &TurnRequest) -> Result<ByteStream, TransportError> {
        let url = self.stream_url(request)?;
        tracing::debug!(url = %url, "Opening turn stream");

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;
        let response = ensure_success(response).await?;

        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| TransportError::from_reqwest(&e))),
        ))
    }

    async fn thread_history(&self, thread_id: &str) -> Result<Vec<HistoryMessage>, TransportError> {
        let mut url = self.endpoint(&[HISTORY_PATH])?;
        url.query_pairs_mut().append_pair("thread_id", thread_id);
        let response: HistoryResponse = self.get_json(url).await?;
        tracing::debug!(thread_id = %thread_id, count = response.messages.len(), "Fetched thread history");
        Ok(response.messages)
    }

    async fn thread_list(&self) -> Result<Vec<String>, TransportError> {
        let url = self.endpoint(&[THREADS_PATH])?;
        let response: ThreadListResponse = self.get_json(url).await?;
        Ok(response.thread_list)
    }
}
