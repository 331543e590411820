//! Cloud Firestore backend for the document store gateway.
//!
//! Talks to the Firestore REST v1 API: document get/patch/delete plus
//! `:runQuery` structured queries with `EQUAL` and `IN` field filters. Field
//! values are mapped between JSON and Firestore's typed value envelope.
//!
//! The client holds a shared [`GcpTokenProvider`]; every call attaches a
//! bearer token from it.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Map, Value, json};

use crate::gcp::GcpTokenProvider;

use super::{DocumentStore, Fields, MEMBERSHIP_BATCH_LIMIT, Record, StoreError};

const API_BASE: &str = "https://firestore.googleapis.com/v1";

/// Firestore-backed document store.
pub struct FirestoreStore {
    client: reqwest::Client,
    project_id: String,
    tokens: Arc<GcpTokenProvider>,
}

impl FirestoreStore {
    /// Create a store for the given project, sharing a token provider.
    #[must_use]
    pub fn new(project_id: String, tokens: Arc<GcpTokenProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            project_id,
            tokens,
        }
    }

    fn database_path(&self) -> String {
        format!("projects/{}/databases/(default)", self.project_id)
    }

    fn documents_root(&self) -> String {
        format!("{}/documents", self.database_path())
    }

    async fn bearer(&self) -> Result<String, StoreError> {
        self.tokens
            .access_token()
            .await
            .map_err(|e| StoreError::Credentials(e.to_string()))
    }

    async fn run_query(&self, query: Value) -> Result<Vec<Record>, StoreError> {
        let token = self.bearer().await?;
        let url = format!("{API_BASE}/{}:runQuery", self.documents_root());
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "structuredQuery": query }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        // runQuery streams one JSON object per matched document, plus
        // bookkeeping entries without a "document" key.
        let entries: Vec<Value> = response.json().await?;
        entries
            .iter()
            .filter_map(|entry| entry.get("document"))
            .map(decode_document)
            .collect()
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError> {
        let token = self.bearer().await?;
        let url = format!("{API_BASE}/{}/{collection}/{id}", self.documents_root());
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        let document: Value = response.json().await?;
        decode_document(&document).map(Some)
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[(&str, Value)],
    ) -> Result<Vec<Record>, StoreError> {
        let mut query = json!({ "from": [{ "collectionId": collection }] });
        if !filters.is_empty() {
            let conditions: Vec<Value> = filters
                .iter()
                .map(|(field, value)| field_filter(field, "EQUAL", encode_value(value)))
                .collect();
            query["where"] = json!({
                "compositeFilter": { "op": "AND", "filters": conditions }
            });
        }
        self.run_query(query).await
    }

    async fn query_in(
        &self,
        collection: &str,
        field: &str,
        values: &[Value],
    ) -> Result<Vec<Record>, StoreError> {
        if values.len() > MEMBERSHIP_BATCH_LIMIT {
            return Err(StoreError::MembershipTooWide(values.len()));
        }

        let members: Vec<Value> = values.iter().map(encode_value).collect();
        let mut query = json!({ "from": [{ "collectionId": collection }] });
        query["where"] = json!({
            "fieldFilter": {
                "field": { "fieldPath": field },
                "op": "IN",
                "value": { "arrayValue": { "values": members } },
            }
        });
        self.run_query(query).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        self.run_query(json!({ "from": [{ "collectionId": collection }] }))
            .await
    }

    async fn insert(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let token = self.bearer().await?;
        let url = format!("{API_BASE}/{}/{collection}", self.documents_root());
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "fields": encode_fields(&fields) }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        let document: Value = response.json().await?;
        let record = decode_document(&document)?;
        Ok(record.id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let token = self.bearer().await?;
        let mut url = format!(
            "{API_BASE}/{}/{collection}/{id}?currentDocument.exists=true",
            self.documents_root()
        );
        // Restrict the patch to the named fields; everything else is untouched.
        for field in fields.keys() {
            url.push_str("&updateMask.fieldPaths=");
            url.push_str(&urlencoding::encode(field));
        }

        let response = self
            .client
            .patch(&url)
            .bearer_auth(token)
            .json(&json!({ "fields": encode_fields(&fields) }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::Missing {
                collection: collection.to_owned(),
                id: id.to_owned(),
            });
        }
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let token = self.bearer().await?;
        let url = format!("{API_BASE}/{}/{collection}/{id}", self.documents_root());
        let response = self.client.delete(&url).bearer_auth(token).send().await?;

        // Firestore deletes are idempotent; an absent document still succeeds.
        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(rejected(response).await);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let token = self.bearer().await?;
        let url = format!("{API_BASE}/{}", self.database_path());
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        Ok(())
    }
}

async fn rejected(response: reqwest::Response) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    StoreError::Rejected(format!("{status}: {body}"))
}

fn field_filter(field: &str, op: &str, value: Value) -> Value {
    json!({
        "fieldFilter": {
            "field": { "fieldPath": field },
            "op": op,
            "value": value,
        }
    })
}

/// Encode a JSON value into Firestore's typed value envelope.
fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => n.as_i64().map_or_else(
            || json!({ "doubleValue": n.as_f64() }),
            |i| json!({ "integerValue": i.to_string() }),
        ),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_map(map) } }),
    }
}

fn encode_map(map: &Map<String, Value>) -> Value {
    let fields: Map<String, Value> = map
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect();
    Value::Object(fields)
}

fn encode_fields(fields: &Fields) -> Value {
    encode_map(fields)
}

/// Decode a Firestore typed value back into plain JSON.
fn decode_value(value: &Value) -> Value {
    let Some(envelope) = value.as_object() else {
        return Value::Null;
    };

    if let Some((kind, inner)) = envelope.iter().next() {
        match kind.as_str() {
            "booleanValue" | "doubleValue" | "stringValue" => inner.clone(),
            "integerValue" => inner
                .as_str()
                .and_then(|s| s.parse::<i64>().ok())
                .map_or(Value::Null, Value::from),
            "timestampValue" => inner.clone(),
            "arrayValue" => {
                let items = inner
                    .get("values")
                    .and_then(Value::as_array)
                    .map(|vs| vs.iter().map(decode_value).collect())
                    .unwrap_or_default();
                Value::Array(items)
            }
            "mapValue" => {
                let fields = inner
                    .get("fields")
                    .and_then(Value::as_object)
                    .map(|m| m.iter().map(|(k, v)| (k.clone(), decode_value(v))).collect())
                    .unwrap_or_default();
                Value::Object(fields)
            }
            _ => Value::Null,
        }
    } else {
        Value::Null
    }
}

fn decode_document(document: &Value) -> Result<Record, StoreError> {
    let name = document
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Corrupt {
            collection: "<unknown>".to_owned(),
            reason: "document without a name".to_owned(),
        })?;
    let id = name.rsplit('/').next().unwrap_or(name).to_owned();

    let fields: Fields = document
        .get("fields")
        .and_then(Value::as_object)
        .map(|m| m.iter().map(|(k, v)| (k.clone(), decode_value(v))).collect())
        .unwrap_or_default();

    Ok(Record { id, fields })
}
