//! Supabase (PostgREST) record store.
//!
//! Endpoint: {SUPABASE_URL}/rest/v1/{table}
//! Auth: `apikey` header plus Bearer token, both the project key

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::domain::CallRecord;

use super::{CallHistory, RecordStore};

/// Supabase table client
pub struct SupabaseStore {
    base_url: String,
    key: String,
    table: String,
    client: reqwest::Client,
}

impl SupabaseStore {
    /// Create a new client
    pub fn new(base_url: String, key: String, table: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            key,
            table,
            client: reqwest::Client::new(),
        }
    }

    /// Build the table URL
    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
    }

    /// Fetch rows matching PostgREST query parameters
    async fn select(&self, query: &[(&str, String)]) -> Result<Vec<CallRecord>> {
        let response = self
            .authorized(self.client.get(self.table_url()))
            .query(query)
            .send()
            .await
            .context("Failed to query Supabase")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Supabase error ({}): {}", status, text)
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .context("Failed to parse Supabase response")?;

        Ok(parse_rows(rows))
    }
}

/// Keep rows that match the call record schema, skipping the rest
fn parse_rows(rows: Vec<Value>) -> Vec<CallRecord> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<CallRecord>(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping malformed call record row");
                None
            }
        })
        .collect()
}

#[async_trait]
impl RecordStore for SupabaseStore {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn insert_call_record(&self, record: &CallRecord) -> Result<()> {
        let response = self
            .authorized(self.client.post(self.table_url()))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .context("Failed to send call record to Supabase")?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Supabase error ({}): {}", status, text)
        }
    }
}

#[async_trait]
impl CallHistory for SupabaseStore {
    async fn recent(&self, limit: usize) -> Result<Vec<CallRecord>> {
        self.select(&[
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ])
        .await
    }

    async fn find(&self, call_id: &str) -> Result<Option<CallRecord>> {
        let mut rows = self
            .select(&[
                ("select", "*".to_string()),
                ("call_ID", format!("eq.{}", call_id)),
                ("order", "created_at.desc".to_string()),
                ("limit", "1".to_string()),
            ])
            .await?;
        Ok(rows.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_url() {
        let store = SupabaseStore::new(
            "https://abc.supabase.co/".to_string(),
            "KEY".to_string(),
            "AssortHealthChatHistory".to_string(),
        );
        assert_eq!(
            store.table_url(),
            "https://abc.supabase.co/rest/v1/AssortHealthChatHistory"
        );
    }

    #[test]
    fn test_parse_rows_skips_malformed() {
        let good = json!({
            "id": 12,
            "created_at": "2025-03-17T12:00:00Z",
            "from": "agent",
            "call_logs": "[2025-03-17 12:00:00] AGENT:\nHello\n\n",
            "call_ID": "room-1",
            "patient_info": {
                "name": "Jane", "dob": "NULL", "insurance": "NULL", "referral": "NULL",
                "complaint": "NULL", "address": "NULL", "phone": "NULL", "email": "NULL"
            }
        });
        let foreign = json!({
            "created_at": "2025-03-17T12:00:00Z",
            "from": "Shahil",
            "call_logs": "Testing",
            "call_ID": "1234567890",
            "patient_info": { "name": "John Doe", "age": 30, "gender": "Male" }
        });
        let bad = json!({
            "from": "agent",
            "call_logs": "Testing",
            "patient_info": "n/a"
        });

        let records = parse_rows(vec![good, foreign, bad]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].call_id, "room-1");
        assert_eq!(records[0].patient_info.name, "Jane");
        // Unknown intake keys are dropped, missing ones read as unset
        assert_eq!(records[1].patient_info.name, "John Doe");
        assert_eq!(records[1].patient_info.dob, crate::domain::UNSET);
    }
}
