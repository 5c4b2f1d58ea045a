#![deny(rust_2018_idioms)]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    clippy::explicit_iter_loop,
    clippy::use_self
)]

//! # influxdb1_client
//!
//! A client for the InfluxDB 1.x HTTP API: the [line protocol][lp] write
//! path and the InfluxQL query interface.
//!
//! [`write`](Client::write) buffers points in memory and flushes them as one
//! batch when a size or time threshold is crossed, so high-frequency metric
//! emission amortizes per-request overhead while a point is never held
//! longer than the configured time threshold. Queries come back either
//! normalized into row-oriented [`Record`]s or as the server's raw columnar
//! [`Series`].
//!
//! [lp]: https://docs.influxdata.com/influxdb/v1.4/write_protocols/line_protocol_reference/
//!
//! ## Example
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), influxdb1_client::Error> {
//! use influxdb1_client::{Client, Config, RetentionPolicy};
//!
//! let client = Client::new(
//!     Config::default()
//!         .with_database("metrics")
//!         .with_retention_policy(RetentionPolicy::new("one_day").with_duration("1d")),
//! )?;
//!
//! // One-time provisioning of the database and retention policy.
//! client.initialize().await?;
//!
//! // Buffered: returns immediately, flushes in the background.
//! client.write("cpu,server=server1 value=0.31");
//!
//! let rows = client.query("SELECT \"value\" FROM \"cpu\"").await?;
//! # drop(rows);
//! # Ok(())
//! # }
//! ```

mod buffer;
mod config;
mod http;
mod query;
mod time;

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use tracing::debug;

pub use crate::config::{Config, RetentionPolicy};
pub use crate::query::{QueryResponse, Record, Series, StatementResult};

use crate::buffer::{WriteBuffer, WriteSink};
use crate::http::{HttpClient, WriteEndpoint};
use crate::time::{SystemProvider, TimeProvider};

/// Primary error type for the [`Client`]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configured host and port do not form a valid URL
    #[error("base URL error: {0}")]
    BaseUrl(#[source] url::ParseError),

    /// A request path could not be joined onto the base URL
    #[error("request URL error: {0}")]
    RequestUrl(#[from] url::ParseError),

    /// The request could not be sent or the connection failed
    #[error("failed to send {method} {path} request: {source}")]
    RequestSend {
        /// HTTP method of the failed request
        method: Method,
        /// Request path relative to the base URL
        path: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The response body could not be parsed as JSON
    #[error("failed to parse JSON response: {0}")]
    Json(#[source] reqwest::Error),

    /// The response body could not be read as text
    #[error("failed to parse plaintext response: {0}")]
    Text(#[source] reqwest::Error),

    /// The server responded with a status of 300 or above
    #[error("server responded with error [{code}]: {message}")]
    Api {
        /// HTTP status code of the response
        code: StatusCode,
        /// Server-provided error text when available
        message: String,
    },

    /// A 2xx query response embedded a top-level `error` field
    #[error("query returned an error: {0}")]
    Query(String),

    /// A decoded response did not match the expected shape
    #[error("failed to decode query response: {0}")]
    ResponseFormat(#[from] serde_json::Error),

    /// The client configuration failed validation
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    fn request_send(method: Method, path: impl Into<String>, source: reqwest::Error) -> Self {
        Self::RequestSend {
            method,
            path: path.into(),
            source,
        }
    }
}

/// A specialized `Result` for client errors.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Client to a server speaking the InfluxDB 1.x HTTP API.
///
/// Holds the write buffer and its flush scheduler; both are owned
/// exclusively by this instance. Buffered flush transmissions run detached,
/// so [`write`](Self::write) must be called from within a Tokio runtime.
#[derive(Debug)]
pub struct Client {
    config: Config,
    http: Arc<HttpClient>,
    sink: Arc<WriteEndpoint>,
    buffer: WriteBuffer,
    time: Arc<dyn TimeProvider>,
}

impl Client {
    /// Create a new [`Client`], validating `config` first.
    ///
    /// # Example
    /// ```
    /// # use influxdb1_client::{Client, Config};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), influxdb1_client::Error> {
    /// let client = Client::new(Config::default().with_database("metrics"))?;
    /// # drop(client);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: Config) -> Result<Self> {
        Self::new_with_time(config, Arc::new(SystemProvider::new()))
    }

    fn new_with_time(config: Config, time: Arc<dyn TimeProvider>) -> Result<Self> {
        config.validate()?;
        let http = Arc::new(HttpClient::new(&config.host, config.port)?);
        let sink = Arc::new(WriteEndpoint::new(
            Arc::clone(&http),
            &config.database,
            &config.retention_policy.name,
        ));
        let buffer = WriteBuffer::new(
            config.max_buffer_size,
            config.max_buffer_time,
            Arc::clone(&sink) as Arc<dyn WriteSink>,
            Arc::clone(&time),
        );
        Ok(Self {
            config,
            http,
            sink,
            buffer,
            time,
        })
    }

    /// Replace the hook invoked with errors from background flush
    /// transmissions.
    ///
    /// The default hook logs the error for operator visibility. Failures of
    /// buffered flushes surface nowhere else: by the time transmission
    /// happens the corresponding [`write`](Self::write) calls have long
    /// returned. The failed batch is dropped, not retried; wrap the hook if
    /// a higher layer wants retry semantics.
    pub fn with_error_hook<F>(self, hook: F) -> Self
    where
        F: Fn(Error) + Send + Sync + 'static,
    {
        self.buffer.set_error_hook(Arc::new(hook));
        self
    }

    /// Buffer one point in [line protocol] form, with the current time in
    /// milliseconds appended as its timestamp.
    ///
    /// Returns immediately. The point is transmitted together with its
    /// neighbors once more than [`Config::max_buffer_size`] points are
    /// buffered or [`Config::max_buffer_time`] has elapsed since the buffer
    /// became non-empty, whichever comes first.
    ///
    /// [line protocol]: https://docs.influxdata.com/influxdb/v1.4/write_protocols/line_protocol_reference/
    pub fn write(&self, point: impl AsRef<str>) {
        self.buffer.write(point.as_ref());
    }

    /// Send one point immediately, bypassing the buffer.
    ///
    /// The same timestamp-appension rule as [`write`](Self::write) applies.
    /// Resolves when the transmission completes and surfaces its error to
    /// the caller, unlike buffered writes.
    pub async fn write_immediate(&self, point: impl AsRef<str>) -> Result<()> {
        let line = format!("{} {}", point.as_ref(), self.time.now_millis());
        self.sink.send_batch(line).await
    }

    /// Run an administrative statement (`CREATE DATABASE`,
    /// `CREATE RETENTION POLICY`, `SHOW ...`) with no database scoping or
    /// epoch qualifiers, returning the decoded response unconverted.
    ///
    /// [`QueryResponse::records`] can be applied to the result when the
    /// statement returns rows.
    pub async fn execute(&self, statement: &str) -> Result<QueryResponse> {
        debug!(statement, "executing statement");
        let payload = self
            .http
            .send(Method::GET, "/query", &[("q", statement)], None)
            .await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Run a `SELECT` statement scoped to the configured database with
    /// millisecond epoch formatting, normalized into one [`Record`] per row.
    ///
    /// Fails with [`Error::Query`] when the server accepts the request but
    /// embeds an `error` field in the response.
    pub async fn query(&self, statement: &str) -> Result<Vec<Record>> {
        Ok(self.run_query(statement).await?.records())
    }

    /// Like [`query`](Self::query), but hands back the raw first [`Series`]
    /// unchanged instead of normalizing it. `None` for an empty result set.
    pub async fn query_raw(&self, statement: &str) -> Result<Option<Series>> {
        Ok(self.run_query(statement).await?.into_series())
    }

    async fn run_query(&self, statement: &str) -> Result<QueryResponse> {
        debug!(statement, "running query");
        let payload = self
            .http
            .send(
                Method::GET,
                "/query",
                &[
                    ("db", self.config.database.as_str()),
                    ("epoch", "ms"),
                    ("q", statement),
                ],
                None,
            )
            .await?;
        let mut response: QueryResponse = serde_json::from_value(payload)?;
        if let Some(message) = response.error.take() {
            return Err(Error::Query(message));
        }
        Ok(response)
    }

    /// Provision the configured database and retention policy.
    ///
    /// Optional and explicitly awaited: issues `CREATE DATABASE` and, when
    /// the retention policy carries a duration, `CREATE RETENTION POLICY`
    /// with the configured attributes. Both statements are idempotent on
    /// the server.
    pub async fn initialize(&self) -> Result<()> {
        self.execute(&format!(r#"CREATE DATABASE "{}""#, self.config.database))
            .await?;

        let rp = &self.config.retention_policy;
        if let Some(duration) = &rp.duration {
            let mut statement = format!(
                r#"CREATE RETENTION POLICY "{}" ON "{}" DURATION {duration} REPLICATION {}"#,
                rp.name, self.config.database, rp.replication
            );
            if let Some(shard_duration) = &rp.shard_duration {
                statement.push_str(&format!(" SHARD DURATION {shard_duration}"));
            }
            if rp.default {
                statement.push_str(" DEFAULT");
            }
            self.execute(&statement).await?;
        }
        Ok(())
    }
}
