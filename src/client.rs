//! HTTP client for the mirror backend.
//!
//! # Endpoints
//!
//! | Method | Path | Body | Returns |
//! |--------|------|------|---------|
//! | `POST` | `/ingest/sample` | multipart `subject_id` | arbitrary JSON |
//! | `POST` | `/ingest/files` | multipart `subject_id`, `files[]` | arbitrary JSON |
//! | `POST` | `/ingest/urls` | multipart `subject_id`, `urls[]` | arbitrary JSON |
//! | `POST` | `/chat` | JSON [`ChatRequest`] | [`ChatReply`] |
//! | `GET`  | `/facts/{subject_id}` | none | [`FactsDocument`] |
//! | `POST` | `/facts/{subject_id}` | JSON [`SaveFactsRequest`] | [`SaveFactsResponse`] |
//!
//! Non-2xx statuses and non-JSON bodies are errors, never silently dropped.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::models::{
    ChatReply, ChatRequest, FactsDocument, SaveFactsRequest, SaveFactsResponse, UploadFile,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid base URL '{0}'")]
    InvalidUrl(String),

    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone)]
pub struct MirrorClient {
    http: Client,
    base: Url,
}

impl MirrorClient {
    pub fn new(config: &ServerConfig) -> ClientResult<Self> {
        let base = Url::parse(config.base_url.trim())
            .map_err(|_| ClientError::InvalidUrl(config.base_url.clone()))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.base_url.clone()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Builds `{base}/{segments...}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ClientError::InvalidUrl(self.base.to_string()))?;
            path.pop_if_empty();
            for s in segments {
                path.push(s);
            }
        }
        Ok(url)
    }

    /// Resolves a server-relative link (such as a chat `audio_url`) against the base URL.
    pub fn resolve(&self, link: &str) -> ClientResult<Url> {
        self.base
            .join(link)
            .map_err(|_| ClientError::InvalidUrl(link.to_string()))
    }

    pub async fn ingest_sample(&self, subject_id: &str) -> ClientResult<Value> {
        let url = self.endpoint(&["ingest", "sample"])?;
        let form = Form::new().text("subject_id", subject_id.to_string());
        self.send(self.http.post(url.clone()).multipart(form), &url)
            .await
    }

    pub async fn ingest_files(&self, subject_id: &str, files: &[UploadFile]) -> ClientResult<Value> {
        let url = self.endpoint(&["ingest", "files"])?;
        let mut form = Form::new().text("subject_id", subject_id.to_string());
        for f in files {
            let part = Part::bytes(f.bytes.clone()).file_name(f.file_name.clone());
            form = form.part("files", part);
        }
        debug!(subject_id, files = files.len(), "uploading files");
        self.send(self.http.post(url.clone()).multipart(form), &url)
            .await
    }

    pub async fn ingest_urls(&self, subject_id: &str, urls: &[String]) -> ClientResult<Value> {
        let url = self.endpoint(&["ingest", "urls"])?;
        let mut form = Form::new().text("subject_id", subject_id.to_string());
        for u in urls {
            form = form.text("urls", u.clone());
        }
        self.send(self.http.post(url.clone()).multipart(form), &url)
            .await
    }

    pub async fn chat(&self, request: &ChatRequest) -> ClientResult<ChatReply> {
        let url = self.endpoint(&["chat"])?;
        self.send(self.http.post(url.clone()).json(request), &url)
            .await
    }

    pub async fn get_facts(&self, subject_id: &str) -> ClientResult<FactsDocument> {
        let url = self.endpoint(&["facts", subject_id])?;
        self.send(self.http.get(url.clone()), &url).await
    }

    pub async fn save_facts(
        &self,
        subject_id: &str,
        request: &SaveFactsRequest,
    ) -> ClientResult<SaveFactsResponse> {
        let url = self.endpoint(&["facts", subject_id])?;
        self.send(self.http.post(url.clone()).json(request), &url)
            .await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &Url,
    ) -> ClientResult<T> {
        debug!(%url, "sending request");

        let response = request.send().await.map_err(|source| ClientError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.to_string(),
                source,
            })?;

        if !status.is_success() {
            warn!(%url, %status, "request rejected");
            return Err(ClientError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| ClientError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// Reads a local file into an [`UploadFile`] named after its final path component.
pub async fn read_upload(path: &Path) -> ClientResult<UploadFile> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ClientError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(UploadFile { file_name, bytes })
}
