use models::{error::Error, transactions::{RawAccountResult, RawTransaction, TransactionRow, TransactionStatus}};
use serde_json::Value;

use crate::hash::{amount_value, canonical_description, date_text, derive_hash, derive_unique_id};

/// A raw transaction that was dropped because its keys could not be derived.
#[derive(Debug, Clone)]
pub struct NormalizeFailure {
    pub company_id: String,
    pub account: String,
    pub error: Error,
    pub raw: RawTransaction,
}

impl NormalizeFailure {
    pub fn context(&self) -> String {
        format!("normalize {}/{}", self.company_id, self.account)
    }

    /// The error with the offending payload attached, for the error channel.
    pub fn diagnostic(&self) -> Error {
        let payload = serde_json::to_string(&self.raw).unwrap_or_else(|_| format!("{:?}", self.raw));
        self.error.with_payload(&payload)
    }
}

#[derive(Debug, Default)]
pub struct Normalized {
    pub transactions: Vec<TransactionRow>,
    pub failures: Vec<NormalizeFailure>,
}

// An absent status means the transaction has settled.
fn status(raw: &RawTransaction) -> Result<TransactionStatus, Error> {
    match &raw.status {
        None | Some(Value::Null) => Ok(TransactionStatus::default()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|_| Error::malformed("status", format!("`{}` is not a known status", value))),
    }
}

pub fn build_row(raw: &RawTransaction, company_id: &str, account: &str) -> Result<TransactionRow, Error> {
    let hash = derive_hash(raw, company_id, account)?;
    let unique_id = derive_unique_id(raw, company_id, account)?;

    Ok(TransactionRow {
        date: date_text(raw)?.to_string(),
        amount: amount_value(raw)?,
        original_amount: raw.original_amount,
        original_currency: raw.original_currency.clone(),
        description: canonical_description(raw)?.to_string(),
        category: raw.category.clone(),
        status: status(raw)?,
        memo: raw.memo.clone(),
        identifier: raw.identifier.clone(),
        raw: raw.raw.clone(),
        company_id: company_id.to_string(),
        account: account.to_string(),
        hash,
        unique_id,
    })
}

// Rows keep the input order, so one institution's accounts stay together.
pub fn normalize(results: &[RawAccountResult]) -> Normalized {
    let mut normalized = Normalized::default();

    for result in results.iter().filter(|r| r.success) {
        for batch in &result.accounts {
            for raw in &batch.txns {
                match build_row(raw, &result.company_id, &batch.account_number) {
                    Ok(row) => normalized.transactions.push(row),
                    Err(error) => {
                        tracing::error!(company = %result.company_id, account = %batch.account_number, %error, "Dropping malformed transaction");
                        normalized.failures.push(NormalizeFailure {
                            company_id: result.company_id.clone(),
                            account: batch.account_number.clone(),
                            error,
                            raw: raw.clone(),
                        });
                    }
                }
            }
        }
    }

    tracing::info!(
        results = results.len(),
        transactions = normalized.transactions.len(),
        failures = normalized.failures.len(),
        "Normalized scrape results"
    );
    normalized
}

#[cfg(test)]
mod tests {
    use models::transactions::RawAccountBatch;
    use serde_json::json;
    use tracing_test::traced_test;

    use super::*;

    fn txn(date: Option<&str>, amount: f64, description: &str) -> RawTransaction {
        RawTransaction {
            date: date.map(|d| json!(d)),
            amount: Some(json!(amount)),
            description: Some(json!(description)),
            ..Default::default()
        }
    }

    fn batch(account: &str, txns: Vec<RawTransaction>) -> RawAccountBatch {
        RawAccountBatch { account_number: account.to_string(), txns }
    }

    #[test]
    #[traced_test]
    fn test_malformed_transaction_is_dropped() {
        let txns = vec![
            txn(Some("2024-01-01"), 1.0, "one"),
            txn(Some("2024-01-02"), 2.0, "two"),
            txn(None, 3.0, "three"),
            txn(Some("2024-01-04"), 4.0, "four"),
            txn(Some("2024-01-05"), 5.0, "five"),
        ];
        let results = vec![RawAccountResult::succeeded("leumi", vec![batch("100", txns)])];

        let normalized = normalize(&results);

        assert_eq!(normalized.transactions.len(), 4);
        assert_eq!(normalized.failures.len(), 1);
        let failure = &normalized.failures[0];
        assert_eq!(failure.context(), "normalize leumi/100");
        assert_eq!(failure.raw.description, Some(json!("three")));
        assert!(failure.diagnostic().to_string().contains("\"description\":\"three\""));
        assert!(logs_contain("Dropping malformed transaction"));
    }

    #[test]
    fn test_wrongly_typed_amount_is_dropped() {
        let json = r#"[{"companyId": "leumi", "success": true, "accounts": [{"accountNumber": "100", "txns": [
            {"date": "2024-01-01", "chargedAmount": -1, "description": "one"},
            {"date": "2024-01-02", "chargedAmount": -2, "description": "two"},
            {"date": "2024-01-03", "chargedAmount": "-40", "description": "three"},
            {"date": "2024-01-04", "chargedAmount": -4, "description": "four"},
            {"date": "2024-01-05", "chargedAmount": -5, "description": "five"}
        ]}]}]"#;
        let results: Vec<RawAccountResult> = serde_json::from_str(json).unwrap();

        let normalized = normalize(&results);

        let kept: Vec<_> = normalized.transactions.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(kept, vec!["one", "two", "four", "five"]);
        assert_eq!(normalized.failures.len(), 1);
        assert!(normalized.failures[0].error.is_malformed());
        assert!(normalized.failures[0].diagnostic().to_string().contains("\"amount\":\"-40\""));
    }

    #[test]
    fn test_unknown_status_and_non_object_records_are_dropped() {
        let mut settled = txn(Some("2024-01-01"), 1.0, "one");
        settled.status = Some(json!("settled"));
        let not_an_object = RawTransaction { raw: Some(json!(42)), ..Default::default() };
        let results = vec![RawAccountResult::succeeded("leumi", vec![batch("100", vec![
            settled,
            not_an_object,
            txn(Some("2024-01-02"), 2.0, "two"),
        ])])];

        let normalized = normalize(&results);

        assert_eq!(normalized.transactions.len(), 1);
        assert_eq!(normalized.transactions[0].status, TransactionStatus::Completed);
        let errors: Vec<_> = normalized.failures.iter().map(|f| f.error.to_string()).collect();
        assert_eq!(errors, vec![
            "Malformed transaction, field `status` `\"settled\"` is not a known status",
            "Malformed transaction, field `date` is missing",
        ]);
    }

    #[test]
    fn test_failed_results_contribute_nothing() {
        let results = vec![
            RawAccountResult::failed("max", "TIMEOUT", "scrape timed out"),
            RawAccountResult::succeeded("leumi", vec![batch("100", vec![txn(Some("2024-01-01"), 1.0, "one")])]),
        ];

        let normalized = normalize(&results);

        assert_eq!(normalized.transactions.len(), 1);
        assert!(normalized.failures.is_empty());
        assert_eq!(normalized.transactions[0].company_id, "leumi");
    }

    #[test]
    fn test_grouping_and_fields_are_preserved() {
        let mut pending = txn(Some("2024-02-01T10:00:00+02:00"), -9.9, " Pizza ");
        pending.status = Some(json!("pending"));
        pending.memo = Some("table 4".to_string());
        let results = vec![
            RawAccountResult::succeeded("isracard", vec![
                batch("1", vec![txn(Some("2024-02-01"), 1.0, "a"), pending]),
                batch("2", vec![txn(Some("2024-02-02"), 2.0, "b")]),
            ]),
            RawAccountResult::succeeded("leumi", vec![batch("3", vec![txn(Some("2024-02-03"), 3.0, "c")])]),
        ];

        let rows = normalize(&results).transactions;

        let accounts: Vec<_> = rows.iter().map(|r| (r.company_id.as_str(), r.account.as_str())).collect();
        assert_eq!(accounts, vec![("isracard", "1"), ("isracard", "1"), ("isracard", "2"), ("leumi", "3")]);
        assert_eq!(rows[1].description, "Pizza");
        assert!(rows[1].is_pending());
        assert_eq!(rows[1].memo.as_deref(), Some("table 4"));
        assert_eq!(rows[1].unique_id, "2024-02-01_isracard_1_-9.90_Pizza_table 4");
        assert_eq!(rows[1].hash, derive_hash(&results[0].accounts[0].txns[1], "isracard", "1").unwrap());
    }

    #[test]
    fn test_empty_input() {
        let normalized = normalize(&[]);
        assert!(normalized.transactions.is_empty());
        assert!(normalized.failures.is_empty());
    }
}
