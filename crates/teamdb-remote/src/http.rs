//! HTTP remote store client

use crate::codec;
use crate::retry::RetryPolicy;
use crate::store::{RemoteError, RemoteResult, RemoteStore, ResultUpload};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use teamdb_core::{IndexEntry, Record, SubmissionData};
use tracing::{debug, error};

pub const DEFAULT_BASE_URL: &str = "https://viewer.gcsim.workers.dev";

const API_KEY_HEADER: &str = "API-KEY";
const VIEWER_KEY_HEADER: &str = "VIEWER_KEY";

/// Per-request timeouts, by call kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timeouts {
    pub submission: Duration,
    pub index: Duration,
    pub upload: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            submission: Duration::from_secs(2),
            index: Duration::from_secs(10),
            upload: Duration::from_secs(30),
        }
    }
}

pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeouts: Timeouts,
    retry: RetryPolicy,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            timeouts: Timeouts::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn api_key(&self, stage: &'static str) -> RemoteResult<&str> {
        self.api_key
            .as_deref()
            .ok_or(RemoteError::MissingApiKey(stage))
    }
}

#[derive(Deserialize)]
struct KeyResponse {
    id: String,
}

#[derive(Deserialize)]
struct BlobResponse {
    data: String,
}

/// Fail on anything but 200, keeping the body for diagnostics.
async fn expect_ok(stage: &'static str, response: Response) -> RemoteResult<Response> {
    let status = response.status();
    if status.as_u16() != 200 {
        let body = response.text().await.unwrap_or_default();
        error!("{} failed with {}: {}", stage, status, body);
        return Err(RemoteError::Status {
            stage,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

async fn decode_json<T: serde::de::DeserializeOwned>(
    stage: &'static str,
    response: Response,
) -> RemoteResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| RemoteError::InvalidResponse {
        stage,
        message: e.to_string(),
    })
}

#[async_trait::async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_index(&self) -> RemoteResult<Vec<IndexEntry>> {
        const STAGE: &str = "fetch index";
        let url = self.url("index");
        self.retry
            .run(STAGE, || async {
                let response = self
                    .client
                    .get(&url)
                    .timeout(self.timeouts.index)
                    .send()
                    .await?;
                decode_json(STAGE, expect_ok(STAGE, response).await?).await
            })
            .await
    }

    async fn fetch_submission(&self, reference: &str) -> RemoteResult<SubmissionData> {
        const STAGE: &str = "fetch submission";
        let url = self.url(codec::share_id(reference));
        debug!("fetching submission {}", url);
        let blob: BlobResponse = self
            .retry
            .run(STAGE, || async {
                let response = self
                    .client
                    .get(&url)
                    .timeout(self.timeouts.submission)
                    .send()
                    .await?;
                decode_json(STAGE, expect_ok(STAGE, response).await?).await
            })
            .await?;
        codec::decode_submission(&blob.data)
    }

    async fn upload_result(
        &self,
        upload: &ResultUpload,
        advisory_key: &str,
    ) -> RemoteResult<String> {
        const STAGE: &str = "upload result";
        let api_key = self.api_key(STAGE)?;
        let url = self.url("key");
        let key: KeyResponse = self
            .retry
            .run(STAGE, || async {
                let response = self
                    .client
                    .post(&url)
                    .header("content-type", "application/json")
                    .header(API_KEY_HEADER, api_key)
                    .header(VIEWER_KEY_HEADER, advisory_key)
                    .timeout(self.timeouts.upload)
                    .json(upload)
                    .send()
                    .await?;
                decode_json(STAGE, expect_ok(STAGE, response).await?).await
            })
            .await?;
        Ok(key.id)
    }

    async fn upload_index(&self, records: &[Record]) -> RemoteResult<()> {
        const STAGE: &str = "upload index";
        let api_key = self.api_key(STAGE)?;
        let url = self.url("db");
        self.retry
            .run(STAGE, || async {
                let response = self
                    .client
                    .post(&url)
                    .header("content-type", "application/json")
                    .header(API_KEY_HEADER, api_key)
                    .timeout(self.timeouts.upload)
                    .json(records)
                    .send()
                    .await?;
                expect_ok(STAGE, response).await?;
                Ok::<(), RemoteError>(())
            })
            .await
    }
}
