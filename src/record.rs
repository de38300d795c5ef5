//! Evidence record model.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

/// Transaction id placeholder for records not yet submitted on chain.
pub(crate) const PENDING_TX: &str = "pending";

/// Confirmation state, derived from the transaction id.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RecordStatus {
    Pending,
    Confirmed,
}

impl RecordStatus {
    pub(crate) fn for_transaction(transaction_id: &str) -> Self {
        if transaction_id.is_empty() || transaction_id == PENDING_TX {
            RecordStatus::Pending
        } else {
            RecordStatus::Confirmed
        }
    }
}

/// A single persisted evidence record.
///
/// Only `transaction_id` and `status` ever change after creation, and they
/// change together.
///
/// Deserialization is lenient so files written by other tools still load:
/// `null` string fields read as empty, non-string scalars are stringified,
/// and an unrecognized status is dropped and re-derived by [`normalize`].
///
/// [`normalize`]: EvidenceRecord::normalize
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EvidenceRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub(crate) id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub(crate) hash: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub(crate) timestamp: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub(crate) metadata: String,
    #[serde(default = "pending_tx", deserialize_with = "lenient_transaction_id")]
    pub(crate) transaction_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub(crate) image_path: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub(crate) base64_image: String,
    #[serde(default, deserialize_with = "lenient_status")]
    status: Option<RecordStatus>,
}

fn pending_tx() -> String {
    PENDING_TX.to_string()
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(value_to_string)
}

fn lenient_transaction_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let tx = value_to_string(Value::deserialize(deserializer)?);
    Ok(if tx.is_empty() { pending_tx() } else { tx })
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<RecordStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl EvidenceRecord {
    /// Build a fresh record with a new id and the current UTC timestamp.
    ///
    /// An absent or empty transaction id becomes `"pending"`.
    pub(crate) fn create(
        hash: &str,
        metadata: Option<&str>,
        transaction_id: Option<&str>,
        image_path: &str,
        base64_image: &str,
    ) -> Self {
        let transaction_id = transaction_id
            .filter(|tx| !tx.is_empty())
            .unwrap_or(PENDING_TX)
            .to_string();
        let status = RecordStatus::for_transaction(&transaction_id);
        Self {
            id: Uuid::new_v4().to_string(),
            hash: hash.to_string(),
            timestamp: now_timestamp(),
            metadata: metadata.unwrap_or_default().to_string(),
            transaction_id,
            image_path: image_path.to_string(),
            base64_image: base64_image.to_string(),
            status: Some(status),
        }
    }

    pub(crate) fn status(&self) -> RecordStatus {
        self.status
            .unwrap_or_else(|| RecordStatus::for_transaction(&self.transaction_id))
    }

    /// Fill in the chain transaction id; the record becomes confirmed.
    pub(crate) fn confirm(&mut self, transaction_id: &str) {
        self.transaction_id = transaction_id.to_string();
        self.status = Some(RecordStatus::Confirmed);
    }

    /// Re-derive the status from the transaction id. A stored status that
    /// contradicts the transaction id is replaced.
    pub(crate) fn normalize(&mut self) {
        let derived = RecordStatus::for_transaction(&self.transaction_id);
        match self.status {
            Some(stored) if stored != derived => {
                warn!(
                    id = %self.id,
                    transaction_id = %self.transaction_id,
                    stored = ?stored,
                    "stored status contradicts transaction id, re-deriving"
                );
            }
            _ => {}
        }
        self.status = Some(derived);
    }
}

/// ISO-8601 UTC timestamp with millisecond precision, e.g.
/// `2026-02-05T00:00:00.000Z`.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmed_when_transaction_id_given() {
        let record = EvidenceRecord::create(
            "hash123",
            Some("metadata"),
            Some("tx123"),
            "/path/image.jpg",
            "base64data",
        );
        assert_eq!(record.hash, "hash123");
        assert_eq!(record.transaction_id, "tx123");
        assert_eq!(record.status(), RecordStatus::Confirmed);
        assert!(Uuid::parse_str(&record.id).is_ok());
    }

    #[test]
    fn pending_when_transaction_id_missing_or_empty() {
        for tx in [None, Some("")] {
            let record = EvidenceRecord::create("hash123", None, tx, "/p", "b");
            assert_eq!(record.transaction_id, PENDING_TX);
            assert_eq!(record.status(), RecordStatus::Pending);
            assert_eq!(record.metadata, "");
        }
    }

    #[test]
    fn ids_are_unique() {
        let a = EvidenceRecord::create("h", None, None, "/p", "b");
        let b = EvidenceRecord::create("h", None, None, "/p", "b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn timestamp_has_millisecond_precision_and_z_suffix() {
        let ts = now_timestamp();
        let bytes = ts.as_bytes();
        assert_eq!(ts.len(), 24, "{ts}");
        assert_eq!(bytes[4], b'-');
        assert_eq!(bytes[10], b'T');
        assert_eq!(bytes[19], b'.');
        assert!(ts.ends_with('Z'));
        assert!(ts[20..23].bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn confirm_sets_transaction_and_status_together() {
        let mut record = EvidenceRecord::create("h", None, None, "/p", "b");
        record.confirm("tx456");
        assert_eq!(record.transaction_id, "tx456");
        assert_eq!(record.status(), RecordStatus::Confirmed);
    }

    #[test]
    fn serializes_camel_case_fields_and_lowercase_status() {
        let record = EvidenceRecord::create("h", Some("m"), None, "/p", "b");
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["transactionId"], "pending");
        assert_eq!(value["imagePath"], "/p");
        assert_eq!(value["base64Image"], "b");
        assert_eq!(value["status"], "pending");
    }

    #[test]
    fn sparse_record_derives_missing_fields() {
        let raw = r#"{"id":"1","hash":"hash1","timestamp":"2026-02-05T00:00:00Z"}"#;
        let mut record: EvidenceRecord = serde_json::from_str(raw).expect("parse");
        record.normalize();
        assert_eq!(record.transaction_id, PENDING_TX);
        assert_eq!(record.status(), RecordStatus::Pending);
        assert_eq!(record.metadata, "");
    }

    #[test]
    fn null_and_non_string_fields_load_leniently() {
        let raw = r#"{"id":2,"hash":"h2","metadata":null,"imagePath":null,"transactionId":null}"#;
        let mut record: EvidenceRecord = serde_json::from_str(raw).expect("parse");
        record.normalize();
        assert_eq!(record.id, "2");
        assert_eq!(record.metadata, "");
        assert_eq!(record.image_path, "");
        assert_eq!(record.transaction_id, PENDING_TX);
        assert_eq!(record.status(), RecordStatus::Pending);
    }

    #[test]
    fn unknown_status_is_re_derived() {
        let raw = r#"{"id":"1","transactionId":"tx9","status":"mined"}"#;
        let mut record: EvidenceRecord = serde_json::from_str(raw).expect("parse");
        record.normalize();
        assert_eq!(record.status(), RecordStatus::Confirmed);
    }

    #[test]
    fn contradicting_status_follows_transaction_id() {
        let raw = r#"{"id":"1","transactionId":"pending","status":"confirmed"}"#;
        let mut record: EvidenceRecord = serde_json::from_str(raw).expect("parse");
        record.normalize();
        assert_eq!(record.status(), RecordStatus::Pending);

        let raw = r#"{"id":"2","transactionId":"0xabc","status":"pending"}"#;
        let mut record: EvidenceRecord = serde_json::from_str(raw).expect("parse");
        record.normalize();
        assert_eq!(record.status(), RecordStatus::Confirmed);
    }
}
