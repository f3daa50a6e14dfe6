use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Completed,
    Pending,
}

/// A transaction as handed over by the scraper. Date, amount, description and
/// status are kept as raw JSON so that a missing or wrongly typed value
/// survives deserialization and only that record is rejected during
/// normalization. A wrongly typed optional field is read as absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    #[serde(default)]
    pub date: Option<Value>,
    #[serde(default, alias = "chargedAmount")]
    pub amount: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub original_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub original_currency: Option<String>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub memo: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

// Some institutions send their reference number as a JSON number.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// A record that is not even an object is kept whole in `raw`, it then fails
// normalization like any other malformed record.
fn lenient_txns<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<RawTransaction>, D::Error> {
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .map(|value| match serde_json::from_value(value.clone()) {
            Ok(txn) => txn,
            Err(_) => RawTransaction { raw: Some(value), ..Default::default() },
        })
        .collect())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawAccountBatch {
    pub account_number: String,
    #[serde(default, deserialize_with = "lenient_txns")]
    pub txns: Vec<RawTransaction>,
}

/// Result of scraping one set of credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawAccountResult {
    pub company_id: String,
    pub success: bool,
    #[serde(default)]
    pub accounts: Vec<RawAccountBatch>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl RawAccountResult {
    pub fn succeeded(company_id: &str, accounts: Vec<RawAccountBatch>) -> Self {
        Self {
            company_id: company_id.to_string(),
            success: true,
            accounts,
            error_type: None,
            error_message: None,
        }
    }

    pub fn failed(company_id: &str, error_type: &str, error_message: &str) -> Self {
        Self {
            company_id: company_id.to_string(),
            success: false,
            accounts: Vec::new(),
            error_type: Some(error_type.to_string()),
            error_message: Some(error_message.to_string()),
        }
    }

    pub fn transaction_count(&self) -> usize {
        self.accounts.iter().map(|a| a.txns.len()).sum()
    }
}

/// Canonical, backend-agnostic transaction. Never mutated after normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRow {
    pub date: String,
    pub amount: f64,
    pub original_amount: Option<f64>,
    pub original_currency: Option<String>,
    pub description: String,
    pub category: Option<String>,
    pub status: TransactionStatus,
    pub memo: Option<String>,
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
    pub company_id: String,
    pub account: String,
    pub hash: String,
    pub unique_id: String,
}

impl TransactionRow {
    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }
}

/// Which of the two dedup keys a backend matches existing rows on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DedupKey {
    #[default]
    UniqueId,
    Hash,
}

impl DedupKey {
    pub fn of<'a>(&self, row: &'a TransactionRow) -> &'a str {
        match self {
            DedupKey::UniqueId => &row.unique_id,
            DedupKey::Hash => &row.hash,
        }
    }

    pub fn warn_if_deprecated(&self, backend: &str) {
        if let DedupKey::Hash = self {
            tracing::warn!(backend, "Deduplicating on the legacy transaction hash is deprecated, switch dedup_key to unique_id");
        }
    }
}
