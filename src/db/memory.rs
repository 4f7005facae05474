// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process backend for tests and offline use.
//!
//! Tables live in a `DashMap` keyed by table name. A table's shard lock is
//! held for the whole of each write, so `insert_unique` is a true
//! check-and-insert. Generated `created_at` stamps are strictly increasing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering as AtomicOrdering};

use super::{Backend, Direction, Filter, InsertOutcome, ObjectStore, Query};
use crate::error::{AppError, Result};
use crate::time_utils::format_utc_rfc3339;

/// In-memory tables plus object storage.
pub struct MemoryBackend {
    tables: DashMap<String, Vec<Value>>,
    objects: DashMap<String, Vec<u8>>,
    next_id: AtomicI64,
    last_stamp_micros: AtomicI64,
    offline: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            objects: DashMap::new(),
            next_id: AtomicI64::new(1),
            last_stamp_micros: AtomicI64::new(0),
            offline: AtomicBool::new(false),
        }
    }

    /// While offline every call fails with [`AppError::Transport`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Stored bytes of an uploaded object.
    pub fn object(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.objects
            .get(&object_key(bucket, path))
            .map(|entry| entry.value().clone())
    }

    /// Number of rows currently in `table`.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map(|rows| rows.len()).unwrap_or(0)
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(AppError::Transport(
                "Backend not reachable (offline mode)".to_string(),
            ));
        }
        Ok(())
    }

    /// Next creation stamp, strictly after every stamp handed out before.
    fn next_stamp(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_micros();
        let prev = self
            .last_stamp_micros
            .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        let micros = now.max(prev + 1);
        DateTime::from_timestamp_micros(micros).unwrap_or_else(Utc::now)
    }

    /// Fill in `id` and `created_at` the way the hosted store's defaults do.
    fn prepare_row(&self, row: Value) -> Result<Value> {
        let Value::Object(mut map) = row else {
            return Err(AppError::Validation("Row must be a JSON object".to_string()));
        };
        if !map.contains_key("id") {
            let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
            map.insert("id".to_string(), Value::from(id));
        }
        if !map.contains_key("created_at") {
            map.insert(
                "created_at".to_string(),
                Value::String(format_utc_rfc3339(self.next_stamp())),
            );
        }
        Ok(Value::Object(map))
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
        self.check_online()?;

        let mut rows: Vec<Value> = match self.tables.get(table) {
            Some(rows) => rows
                .iter()
                .filter(|row| matches_all(row, &query.filters))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        if !query.order.is_empty() {
            rows.sort_by(|a, b| {
                for (column, direction) in &query.order {
                    let ord = compare_values(field(a, column), field(b, column));
                    let ord = match direction {
                        Direction::Ascending => ord,
                        Direction::Descending => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        tracing::debug!(table, rows = rows.len(), "memory select");
        Ok(rows)
    }

    async fn count(&self, table: &str, query: &Query) -> Result<u64> {
        self.check_online()?;

        let count = self
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(row, &query.filters))
                    .count()
            })
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
        self.check_online()?;

        let mut stored = self.tables.entry(table.to_string()).or_default();
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let row = self.prepare_row(row)?;
            stored.push(row.clone());
            inserted.push(row);
        }
        Ok(inserted)
    }

    async fn insert_unique(
        &self,
        table: &str,
        row: Value,
        conflict_columns: &[&str],
    ) -> Result<InsertOutcome> {
        self.check_online()?;

        let mut stored = self.tables.entry(table.to_string()).or_default();
        let duplicate = stored.iter().any(|existing| {
            conflict_columns
                .iter()
                .all(|col| values_equal(field(existing, col), field(&row, col)))
        });
        if duplicate {
            tracing::debug!(table, ?conflict_columns, "memory insert skipped (duplicate)");
            return Ok(InsertOutcome::Duplicate);
        }

        let row = self.prepare_row(row)?;
        stored.push(row.clone());
        Ok(InsertOutcome::Inserted(row))
    }

    async fn update(&self, table: &str, patch: Value, query: &Query) -> Result<Vec<Value>> {
        self.check_online()?;

        let Value::Object(patch) = patch else {
            return Err(AppError::Validation("Patch must be a JSON object".to_string()));
        };

        let Some(mut stored) = self.tables.get_mut(table) else {
            return Ok(Vec::new());
        };
        let mut updated = Vec::new();
        for row in stored.iter_mut() {
            if !matches_all(row, &query.filters) {
                continue;
            }
            if let Value::Object(map) = row {
                apply_patch(map, &patch);
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<u64> {
        self.check_online()?;

        let Some(mut stored) = self.tables.get_mut(table) else {
            return Ok(0);
        };
        let before = stored.len();
        stored.retain(|row| !matches_all(row, &query.filters));
        Ok((before - stored.len()) as u64)
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<()> {
        self.check_online()?;
        self.objects.insert(object_key(bucket, path), bytes);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{}", object_key(bucket, path))
    }
}

fn object_key(bucket: &str, path: &str) -> String {
    format!("{}/{}", bucket, path)
}

fn apply_patch(row: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        row.insert(key.clone(), value.clone());
    }
}

fn field<'a>(row: &'a Value, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

fn matches_all(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Eq(column, value) => values_equal(field(row, column), value),
        Filter::In(column, values) => values.iter().any(|v| values_equal(field(row, column), v)),
        Filter::ILike(column, pattern) => field(row, column)
            .as_str()
            .is_some_and(|text| ilike(text, pattern)),
    })
}

/// Equality with integer/float normalization.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over column values; timestamps compare as instants.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(tx), Ok(ty)) => tx.cmp(&ty),
                _ => x.cmp(y),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// SQL `ILIKE` with `%` wildcards.
fn ilike(text: &str, pattern: &str) -> bool {
    let text = text.to_lowercase();
    let pattern = pattern.to_lowercase();
    let parts: Vec<&str> = pattern.split('%').collect();
    if parts.len() == 1 {
        return text == pattern;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !text.starts_with(first) {
        return false;
    }
    let mut rest = &text[first.len()..];
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ilike_patterns() {
        assert!(ilike("Find Three Black Bikes", "%black%"));
        assert!(ilike("black", "black"));
        assert!(ilike("Blackbird", "black%"));
        assert!(!ilike("Blackbird", "%bike%"));
        assert!(ilike("a-b-c", "a%b%c"));
        assert!(!ilike("ab", "a%b%c"));
    }

    #[test]
    fn test_values_equal_normalizes_numbers() {
        assert!(values_equal(&json!(3), &json!(3.0)));
        assert!(!values_equal(&json!(3), &json!("3")));
    }

    #[test]
    fn test_compare_values_orders_timestamps_as_instants() {
        let earlier = json!("2024-01-01T10:00:00+02:00");
        let later = json!("2024-01-01T09:00:00Z");
        assert_eq!(compare_values(&earlier, &later), Ordering::Less);
    }

    #[tokio::test]
    async fn test_insert_fills_id_and_increasing_created_at() {
        let db = MemoryBackend::new();
        let rows = db
            .insert("t", vec![json!({"a": 1}), json!({"a": 2})])
            .await
            .unwrap();

        assert_ne!(rows[0]["id"], rows[1]["id"]);
        let t0 = DateTime::parse_from_rfc3339(rows[0]["created_at"].as_str().unwrap()).unwrap();
        let t1 = DateTime::parse_from_rfc3339(rows[1]["created_at"].as_str().unwrap()).unwrap();
        assert!(t0 < t1);
    }

    #[tokio::test]
    async fn test_insert_unique_detects_duplicate() {
        let db = MemoryBackend::new();
        let row = json!({"quest_id": 1, "user_id": "u1"});

        let first = db
            .insert_unique("completion", row.clone(), &["quest_id", "user_id"])
            .await
            .unwrap();
        let second = db
            .insert_unique("completion", row, &["quest_id", "user_id"])
            .await
            .unwrap();

        assert!(matches!(first, InsertOutcome::Inserted(_)));
        assert_eq!(second, InsertOutcome::Duplicate);
        assert_eq!(db.row_count("completion"), 1);
    }

    #[tokio::test]
    async fn test_select_filters_order_and_limit() {
        let db = MemoryBackend::new();
        db.insert(
            "submission",
            vec![
                json!({"user_id": "a", "subquest_id": 1}),
                json!({"user_id": "b", "subquest_id": 2}),
                json!({"user_id": "a", "subquest_id": 3}),
            ],
        )
        .await
        .unwrap();

        let query = Query::new()
            .eq("user_id", "a")
            .order_by("subquest_id", Direction::Descending)
            .limit(1);
        let rows = db.select("submission", &query).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["subquest_id"], 3);

        let query = Query::new().is_in("subquest_id", [1, 2]);
        assert_eq!(db.count("submission", &query).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_returns_patched_rows() {
        let db = MemoryBackend::new();
        db.insert(
            "achievement",
            vec![
                json!({"user_id": "a", "announced": false}),
                json!({"user_id": "a", "announced": true}),
            ],
        )
        .await
        .unwrap();

        let query = Query::new().eq("user_id", "a").eq("announced", false);
        let updated = db
            .update("achievement", json!({"announced": true}), &query)
            .await
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["announced"], true);
        assert_eq!(db.count("achievement", &query).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offline_fails_with_transport_error() {
        let db = MemoryBackend::new();
        db.set_offline(true);

        let err = db.select("quest", &Query::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
        assert!(err.is_retryable());
    }
}
