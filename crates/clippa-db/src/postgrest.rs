//! PostgREST (Supabase) job store client.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info_span, Instrument};

use clippa_models::{Job, JobStatus, JobUpdate};

use crate::error::{DbError, DbResult};
use crate::metrics::record_request;
use crate::retry::{with_retry, RetryConfig};
use crate::store::JobStore;

/// PostgREST client configuration.
#[derive(Debug, Clone)]
pub struct PostgrestConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub base_url: String,
    /// Service role key, sent as `apikey` and bearer token
    pub service_key: String,
    pub table: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
}

impl PostgrestConfig {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            service_key: service_key.into(),
            table: "jobs".to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> DbResult<Self> {
        let base_url = std::env::var("SUPABASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DbError::config("SUPABASE_URL not set"))?;
        let service_key = std::env::var("SUPABASE_SERVICE_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DbError::config("SUPABASE_SERVICE_KEY not set"))?;

        let connect_timeout_secs: u64 = std::env::var("DB_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            table: std::env::var("JOBS_TABLE").unwrap_or_else(|_| "jobs".to_string()),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
            ..Self::new(base_url, service_key)
        })
    }
}

#[derive(Serialize)]
struct NewJobRow<'a> {
    id: &'a str,
    user_id: &'a str,
    status: JobStatus,
    progress: u8,
}

/// [`JobStore`] backed by a PostgREST table.
#[derive(Clone)]
pub struct PostgrestJobStore {
    http: Client,
    config: PostgrestConfig,
    table_url: String,
}

impl PostgrestJobStore {
    pub fn new(config: PostgrestConfig) -> DbResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("clippa-db/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let table_url = format!(
            "{}/rest/v1/{}",
            config.base_url.trim_end_matches('/'),
            config.table
        );

        Ok(Self {
            http,
            config,
            table_url,
        })
    }

    pub fn from_env() -> DbResult<Self> {
        Self::new(PostgrestConfig::from_env()?)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
    }

    /// Send with retry, mapping non-success statuses to errors.
    async fn execute<F>(&self, operation: &str, job_id: Option<&str>, build: F) -> DbResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let span = match job_id {
            Some(id) => info_span!("db_request", operation = %operation, job_id = %id),
            None => info_span!("db_request", operation = %operation),
        };

        let start = Instant::now();
        let result = with_retry(&self.config.retry, operation, || async {
            let response = self.authed(build()).send().await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let retry_after_ms = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            let body = response.text().await.unwrap_or_default();
            Err(match DbError::from_http_status(status.as_u16(), body) {
                DbError::RateLimited(_) => DbError::RateLimited(retry_after_ms.unwrap_or(0)),
                other => other,
            })
        })
        .instrument(span)
        .await;

        let status = match &result {
            Ok(response) => response.status().as_u16(),
            Err(e) => e.http_status().unwrap_or(0),
        };
        record_request(operation, status, start.elapsed().as_millis() as f64);

        result
    }

    fn id_filter(id: &str) -> [(&'static str, String); 1] {
        [("id", format!("eq.{}", id))]
    }
}

#[async_trait]
impl JobStore for PostgrestJobStore {
    async fn create_job(&self, id: &str, user_id: &str) -> DbResult<()> {
        let row = NewJobRow {
            id,
            user_id,
            status: JobStatus::Processing,
            progress: 0,
        };
        self.execute("create_job", Some(id), || {
            self.http
                .post(&self.table_url)
                .header("Prefer", "return=minimal")
                .json(&row)
        })
        .await?;
        debug!(job_id = %id, "Created job record");
        Ok(())
    }

    async fn update_job(&self, id: &str, update: &JobUpdate) -> DbResult<()> {
        if update.is_empty() {
            return Ok(());
        }
        self.execute("update_job", Some(id), || {
            self.http
                .patch(&self.table_url)
                .query(&Self::id_filter(id))
                .header("Prefer", "return=minimal")
                .json(update)
        })
        .await?;
        Ok(())
    }

    async fn get_job(&self, id: &str) -> DbResult<Option<Job>> {
        let response = self
            .execute("get_job", Some(id), || {
                self.http
                    .get(&self.table_url)
                    .query(&Self::id_filter(id))
                    .query(&[("select", "*")])
            })
            .await?;
        let rows: Vec<Job> = response.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn delete_job(&self, id: &str) -> DbResult<()> {
        self.execute("delete_job", Some(id), || {
            self.http
                .delete(&self.table_url)
                .query(&Self::id_filter(id))
                .header("Prefer", "return=minimal")
        })
        .await?;
        Ok(())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let filter = format!("lt.{}", cutoff.to_rfc3339_opts(SecondsFormat::Millis, true));
        let response = self
            .execute("purge_jobs", None, || {
                self.http
                    .delete(&self.table_url)
                    .query(&[("created_at", filter.as_str()), ("select", "id")])
                    .header("Prefer", "return=representation")
            })
            .await?;
        let rows: Vec<serde_json::Value> = response.json().await?;
        Ok(rows.len() as u64)
    }
}
