//! HTTP transport for the `/write` and `/query` endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, header::CONTENT_TYPE};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::{Error, Result, buffer::WriteSink};

/// Issues requests against the server; everything on the wire goes through
/// [`send`](HttpClient::send).
#[derive(Debug)]
pub(crate) struct HttpClient {
    base_url: Url,
    http_client: reqwest::Client,
}

impl HttpClient {
    pub(crate) fn new(host: &str, port: u16) -> Result<Self> {
        let base_url = Url::parse(&format!("http://{host}:{port}")).map_err(Error::BaseUrl)?;
        Ok(Self {
            base_url,
            http_client: reqwest::Client::new(),
        })
    }

    /// Issue one request and decode the response body.
    ///
    /// A `204 No Content` decodes to [`Value::Null`], a JSON content type to
    /// the parsed value, anything else to the raw text. A status of 300 or
    /// above becomes [`Error::Api`], carrying the decoded body's `error`
    /// field when present.
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<String>,
    ) -> Result<Value> {
        let url = self.base_url.join(path)?;
        let mut req = self.http_client.request(method.clone(), url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.body(body);
        }
        let resp = req
            .send()
            .await
            .map_err(|src| Error::request_send(method, path, src))?;

        let status = resp.status();
        let json = is_json(&resp);
        let payload = if status == StatusCode::NO_CONTENT {
            Value::Null
        } else if json {
            resp.json().await.map_err(Error::Json)?
        } else {
            Value::String(resp.text().await.map_err(Error::Text)?)
        };

        if status.as_u16() >= 300 {
            return Err(Error::Api {
                code: status,
                message: error_message(payload),
            });
        }
        Ok(payload)
    }
}

fn is_json(resp: &reqwest::Response) -> bool {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

/// Server errors arrive as `{"error": "..."}`; fall back to the whole body.
fn error_message(payload: Value) -> String {
    match payload {
        Value::String(text) => text,
        Value::Object(ref map) => match map.get("error").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => payload.to_string(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// The write endpoint wire contract:
/// `POST /write?db=<database>&rp=<retention policy>&precision=ms` with a
/// newline-joined line-protocol batch as the body.
#[derive(Debug)]
pub(crate) struct WriteEndpoint {
    http: Arc<HttpClient>,
    database: String,
    retention_policy: String,
}

impl WriteEndpoint {
    pub(crate) fn new(
        http: Arc<HttpClient>,
        database: impl Into<String>,
        retention_policy: impl Into<String>,
    ) -> Self {
        Self {
            http,
            database: database.into(),
            retention_policy: retention_policy.into(),
        }
    }
}

#[async_trait]
impl WriteSink for WriteEndpoint {
    async fn send_batch(&self, body: String) -> Result<()> {
        debug!(bytes = body.len(), "sending line protocol batch");
        self.http
            .send(
                Method::POST,
                "/write",
                &[
                    ("db", self.database.as_str()),
                    ("rp", self.retention_policy.as_str()),
                    ("precision", "ms"),
                ],
                Some(body),
            )
            .await
            .map(drop)
    }
}
