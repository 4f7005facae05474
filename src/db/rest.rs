// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Hosted backend client (PostgREST-style REST, object storage, functions).
//!
//! Handles:
//! - Table reads/writes under `/rest/v1/{table}`
//! - Conditional inserts via `on_conflict` + `resolution=ignore-duplicates`
//! - Image uploads under `/storage/v1/object/{bucket}/{path}`
//! - Function calls under `/functions/v1/{name}`

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use super::{Backend, Direction, Filter, InsertOutcome, ObjectStore, Oracle, Query};
use crate::config::Config;
use crate::error::{AppError, Result};

/// Client for the hosted backend.
#[derive(Clone)]
pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl RestBackend {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client setup failed: {}", e)))?;

        tracing::info!(backend = %config.backend_url, "Backend client initialized");

        Ok(Self {
            http,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, urlencoding::encode(table))
    }

    /// Request with the API key and the user's (or anonymous) bearer token.
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
    }

    /// Send a request, mapping transport failures and error statuses.
    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;
        check_response(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Decode(e.to_string()))
    }
}

/// Check response status and return an error if not successful.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::CONFLICT {
        return Err(AppError::Conflict(body));
    }

    tracing::warn!(status = status.as_u16(), body = %body, "Backend request failed");
    Err(AppError::Database(format!("HTTP {}: {}", status, body)))
}

/// Query-string parameters for a [`Query`].
fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = query
        .filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq(column, value) => (column.clone(), format!("eq.{}", scalar(value))),
            Filter::In(column, values) => {
                let items: Vec<String> = values.iter().map(list_item).collect();
                (column.clone(), format!("in.({})", items.join(",")))
            }
            Filter::ILike(column, pattern) => (column.clone(), format!("ilike.{}", pattern)),
        })
        .collect();

    if !query.order.is_empty() {
        let order: Vec<String> = query
            .order
            .iter()
            .map(|(column, direction)| match direction {
                Direction::Ascending => format!("{}.asc", column),
                Direction::Descending => format!("{}.desc", column),
            })
            .collect();
        params.push(("order".to_string(), order.join(",")));
    }

    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }

    params
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Element of an `in.(...)` list; strings are double-quoted.
fn list_item(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => other.to_string(),
    }
}

/// Total row count from a `Content-Range: 0-24/25` (or `*/0`) header.
fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse().ok()
}

fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl Backend for RestBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(query_params(query));

        let request = self
            .request(Method::GET, &self.table_url(table))
            .query(&params);
        self.send_json(request).await
    }

    async fn count(&self, table: &str, query: &Query) -> Result<u64> {
        let request = self
            .request(Method::HEAD, &self.table_url(table))
            .header("Prefer", "count=exact")
            .query(&query_params(query));
        let response = self.send(request).await?;

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| AppError::Decode("Missing or invalid Content-Range".to_string()))
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
        let request = self
            .request(Method::POST, &self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&rows);
        self.send_json(request).await
    }

    async fn insert_unique(
        &self,
        table: &str,
        row: Value,
        conflict_columns: &[&str],
    ) -> Result<InsertOutcome> {
        let request = self
            .request(Method::POST, &self.table_url(table))
            .header("Prefer", "return=representation,resolution=ignore-duplicates")
            .query(&[("on_conflict", conflict_columns.join(","))])
            .json(&vec![row]);

        match self.send_json::<Vec<Value>>(request).await {
            Ok(mut rows) => match rows.pop() {
                Some(row) => Ok(InsertOutcome::Inserted(row)),
                None => Ok(InsertOutcome::Duplicate),
            },
            // A constraint not covered by `on_conflict` still means "already there"
            Err(AppError::Conflict(body)) => {
                tracing::debug!(table, body = %body, "Insert rejected by unique constraint");
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(e),
        }
    }

    async fn update(&self, table: &str, patch: Value, query: &Query) -> Result<Vec<Value>> {
        let request = self
            .request(Method::PATCH, &self.table_url(table))
            .header("Prefer", "return=representation")
            .query(&query_params(query))
            .json(&patch);
        self.send_json(request).await
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<u64> {
        let request = self
            .request(Method::DELETE, &self.table_url(table))
            .header("Prefer", "return=representation")
            .query(&query_params(query));
        let rows: Vec<Value> = self.send_json(request).await?;
        Ok(rows.len() as u64)
    }
}

#[async_trait]
impl ObjectStore for RestBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            urlencoding::encode(bucket),
            encode_object_path(path)
        );
        let request = self
            .request(Method::POST, &url)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        self.send(request).await?;

        tracing::debug!(bucket, path, "Object uploaded");
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            urlencoding::encode(bucket),
            encode_object_path(path)
        )
    }
}

#[async_trait]
impl Oracle for RestBackend {
    async fn invoke(&self, function: &str, body: Value) -> Result<Value> {
        let url = format!(
            "{}/functions/v1/{}",
            self.base_url,
            urlencoding::encode(function)
        );
        let request = self.request(Method::POST, &url).json(&body);

        // Any failure reaching the function is retryable for the caller
        self.send_json(request).await.map_err(|e| match e {
            AppError::Database(msg) => AppError::Transport(format!("{} failed: {}", function, msg)),
            other => other,
        })
    }
}
