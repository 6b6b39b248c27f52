//! Thin HTTP client for the remote Post Tracker API.
//!
//! Responsibility:
//! - Base URL handling (`API_BASE_URL` + relative endpoint paths)
//! - Session cookie store (the API authenticates by cookie)
//! - Request-Id generation (`x-request-id`) for correlation with server logs
//! - Mapping non-2xx responses into `RepoError::Status`
//!
//! Notes:
//! - No client-wide timeout: the SSE stream is long-lived. Plain requests get
//!   `Config::request_timeout` applied per request instead.
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, header};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::repos::error::{RepoError, RepoResult};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const LAST_EVENT_ID_HEADER: &str = "last-event-id";

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
}

#[derive(serde::Deserialize)]
struct MessageBody {
    message: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> RepoResult<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            http,
            base_url: normalize_base(config.api_base_url.clone()),
            request_timeout: config.request_timeout,
        })
    }

    /// Resolve an API path such as `api/post` against the base URL.
    pub fn endpoint(&self, path: &str) -> RepoResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, path: &str) -> RepoResult<RequestBuilder> {
        let url = self.endpoint(path)?;
        let request_id = Uuid::new_v4();
        tracing::debug!(%method, %url, %request_id, "api request");

        Ok(self
            .http
            .request(method, url)
            .header(REQUEST_ID_HEADER, request_id.to_string()))
    }

    pub async fn get_json<Q, T>(&self, path: &str, query: &Q) -> RepoResult<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .request(Method::GET, path)?
            .query(query)
            .timeout(self.request_timeout)
            .send()
            .await?;

        read_json(resp).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> RepoResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .request(Method::POST, path)?
            .json(body)
            .timeout(self.request_timeout)
            .send()
            .await?;

        read_json(resp).await
    }

    /// POST whose response body is ignored on success.
    pub async fn post_unit<B>(&self, path: &str, body: &B) -> RepoResult<()>
    where
        B: Serialize + ?Sized,
    {
        let resp = self
            .request(Method::POST, path)?
            .json(body)
            .timeout(self.request_timeout)
            .send()
            .await?;

        ensure_success(resp).await.map(|_| ())
    }

    /// Open a `text/event-stream` response. The caller owns the body stream.
    pub async fn open_event_stream(
        &self,
        path: &str,
        last_event_id: Option<&str>,
    ) -> RepoResult<Response> {
        let mut req = self
            .request(Method::GET, path)?
            .header(header::ACCEPT, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache");
        if let Some(id) = last_event_id {
            req = req.header(LAST_EVENT_ID_HEADER, id);
        }

        let resp = req.send().await?;

        ensure_success(resp).await
    }
}

fn normalize_base(mut url: Url) -> Url {
    // Url::join は末尾 '/' が無いと最後のセグメントを置き換える
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

async fn ensure_success(resp: Response) -> RepoResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(RepoError::Status {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> RepoResult<T> {
    let resp = ensure_success(resp).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// `{"message": "..."}` bodies are unwrapped; anything else is kept verbatim.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<MessageBody>(body) {
        Ok(b) => b.message,
        Err(_) => body.trim().to_string(),
    }
}
