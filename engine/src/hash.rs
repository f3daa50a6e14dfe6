use chrono::{DateTime, NaiveDate};
use models::{error::Error, transactions::RawTransaction};
use serde_json::Value;
use sha2::{Digest, Sha256};

// Both keys are persisted by backends as their dedup contract. Changing how
// any part is canonicalized or joined re-keys every stored transaction.

/// The trimmed date text as sent by the scraper.
pub(crate) fn date_text(raw: &RawTransaction) -> Result<&str, Error> {
    let date = match &raw.date {
        None | Some(Value::Null) => return Err(Error::malformed("date", "is missing")),
        Some(Value::String(date)) => date.trim(),
        Some(other) => return Err(Error::malformed("date", format!("must be a string, got `{}`", other))),
    };
    if date.is_empty() {
        return Err(Error::malformed("date", "is empty"));
    }
    Ok(date)
}

fn canonical_date(raw: &RawTransaction) -> Result<String, Error> {
    let date = date_text(raw)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Ok(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(d) => Ok(d.format("%Y-%m-%d").to_string()),
        Err(_) => Err(Error::malformed("date", format!("`{}` is not an ISO-8601 date", date))),
    }
}

pub(crate) fn amount_value(raw: &RawTransaction) -> Result<f64, Error> {
    match &raw.amount {
        None | Some(Value::Null) => Err(Error::malformed("amount", "is missing")),
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|amount| amount.is_finite())
            .ok_or_else(|| Error::malformed("amount", format!("`{}` is not a finite number", n))),
        Some(other) => Err(Error::malformed("amount", format!("must be a number, got `{}`", other))),
    }
}

fn canonical_amount(raw: &RawTransaction) -> Result<String, Error> {
    amount_value(raw).map(format_amount)
}

fn format_amount(amount: f64) -> String {
    // -0.00 and 0.00 must produce the same key
    let s = format!("{:.2}", amount);
    if s == "-0.00" { "0.00".to_string() } else { s }
}

pub(crate) fn canonical_description(raw: &RawTransaction) -> Result<&str, Error> {
    let description = match &raw.description {
        None | Some(Value::Null) => return Err(Error::malformed("description", "is missing")),
        Some(Value::String(description)) => description.trim(),
        Some(other) => return Err(Error::malformed("description", format!("must be a string, got `{}`", other))),
    };
    if description.is_empty() {
        return Err(Error::malformed("description", "is blank"));
    }
    Ok(description)
}

fn memo(raw: &RawTransaction) -> &str {
    raw.memo.as_deref().map(str::trim).unwrap_or("")
}

/// Legacy dedup key: SHA-256 over date, amount, description, memo, company and
/// account. Cannot tell apart two identical-looking charges on the same day.
pub fn derive_hash(raw: &RawTransaction, company_id: &str, account: &str) -> Result<String, Error> {
    let date = canonical_date(raw)?;
    let amount = canonical_amount(raw)?;
    let description = canonical_description(raw)?;

    let mut hasher = Sha256::new();
    // Length-prefixed, so no choice of field contents can shift a boundary.
    for part in [date.as_str(), amount.as_str(), description, memo(raw), company_id, account] {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    Ok(hex::encode(hasher.finalize()))
}

// `_` separates the parts of a unique id; inside a part it is escaped.
fn escape(part: &str) -> String {
    part.replace('\\', "\\\\").replace('_', "\\_")
}

/// Dedup key that prefers the institution's own reference number. Without one
/// it falls back to description and memo, plus the original amount when the
/// charge was converted.
pub fn derive_unique_id(raw: &RawTransaction, company_id: &str, account: &str) -> Result<String, Error> {
    let date = canonical_date(raw)?;
    let amount = canonical_amount(raw)?;
    let description = canonical_description(raw)?;

    let mut parts = vec![date, escape(company_id), escape(account), amount];
    match raw.identifier.as_deref().map(str::trim) {
        Some(identifier) if !identifier.is_empty() => parts.push(escape(identifier)),
        _ => {
            parts.push(escape(description));
            parts.push(escape(memo(raw)));
            if let Some(original) = raw.original_amount.filter(|o| o.is_finite()) {
                let original = format_amount(original);
                if original != parts[3] {
                    parts.push(original);
                }
            }
        }
    }

    Ok(parts.join("_"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn txn(date: &str, amount: f64, description: &str) -> RawTransaction {
        RawTransaction {
            date: Some(json!(date)),
            amount: Some(json!(amount)),
            description: Some(json!(description)),
            ..Default::default()
        }
    }

    #[test]
    fn test_keys_are_deterministic() {
        let t = txn("2024-01-15T22:00:00.000Z", -42.5, "Coffee");
        let h1 = derive_hash(&t, "hapoalim", "12-345").unwrap();
        let h2 = derive_hash(&t.clone(), "hapoalim", "12-345").unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);

        let u1 = derive_unique_id(&t, "hapoalim", "12-345").unwrap();
        let u2 = derive_unique_id(&t, "hapoalim", "12-345").unwrap();
        assert_eq!(u1, u2);
        assert_eq!(u1, "2024-01-15_hapoalim_12-345_-42.50_Coffee_");
    }

    #[test]
    fn test_keys_depend_on_company_and_account() {
        let t = txn("2024-01-15", 10.0, "Rent");
        assert_ne!(derive_hash(&t, "a", "1").unwrap(), derive_hash(&t, "b", "1").unwrap());
        assert_ne!(derive_hash(&t, "a", "1").unwrap(), derive_hash(&t, "a", "2").unwrap());
        assert_ne!(derive_unique_id(&t, "a", "1").unwrap(), derive_unique_id(&t, "a", "2").unwrap());
    }

    #[test]
    fn test_unique_id_separates_same_day_ties() {
        let mut a = txn("2024-03-01", 25.0, "Parking");
        let mut b = a.clone();
        a.identifier = Some("1001".to_string());
        b.identifier = Some("1002".to_string());

        assert_eq!(derive_hash(&a, "max", "9").unwrap(), derive_hash(&b, "max", "9").unwrap());
        assert_ne!(derive_unique_id(&a, "max", "9").unwrap(), derive_unique_id(&b, "max", "9").unwrap());
    }

    #[test]
    fn test_unique_id_uses_original_amount_when_converted() {
        let mut t = txn("2024-03-01", 37.1, "Amazon");
        t.original_amount = Some(10.0);
        assert_eq!(derive_unique_id(&t, "max", "9").unwrap(), "2024-03-01_max_9_37.10_Amazon__10.00");

        t.original_amount = Some(37.1);
        assert_eq!(derive_unique_id(&t, "max", "9").unwrap(), "2024-03-01_max_9_37.10_Amazon_");
    }

    #[test]
    fn test_whitespace_does_not_change_keys() {
        let a = txn("2024-03-01", 5.0, "Bakery");
        let b = txn(" 2024-03-01 ", 5.0, "  Bakery ");
        assert_eq!(derive_hash(&a, "c", "1").unwrap(), derive_hash(&b, "c", "1").unwrap());
        assert_eq!(derive_unique_id(&a, "c", "1").unwrap(), derive_unique_id(&b, "c", "1").unwrap());
    }

    #[test]
    fn test_negative_zero_amount_is_normalized() {
        let a = txn("2024-03-01", 0.0, "Fee waiver");
        let b = txn("2024-03-01", -0.0, "Fee waiver");
        assert_eq!(derive_hash(&a, "c", "1").unwrap(), derive_hash(&b, "c", "1").unwrap());
    }

    #[test]
    fn test_missing_or_invalid_fields_are_rejected() {
        let mut t = txn("2024-03-01", 5.0, "Bakery");
        t.date = None;
        assert!(derive_hash(&t, "c", "1").unwrap_err().is_malformed());
        assert!(derive_unique_id(&t, "c", "1").unwrap_err().is_malformed());

        let t = txn("yesterday", 5.0, "Bakery");
        assert!(derive_hash(&t, "c", "1").unwrap_err().is_malformed());

        let mut t = txn("2024-03-01", 5.0, "Bakery");
        t.amount = Some(json!("-40"));
        let err = derive_unique_id(&t, "c", "1").unwrap_err();
        assert_eq!(err.to_string(), "Malformed transaction, field `amount` must be a number, got `\"-40\"`");

        let mut t = txn("2024-03-01", 5.0, "Bakery");
        t.date = Some(json!(20240301));
        assert!(derive_hash(&t, "c", "1").unwrap_err().is_malformed());

        let mut t = txn("2024-03-01", 5.0, "Bakery");
        t.description = Some(json!({"text": "Bakery"}));
        assert!(derive_hash(&t, "c", "1").unwrap_err().is_malformed());

        let t = txn("2024-03-01", 5.0, "   ");
        let err = derive_hash(&t, "c", "1").unwrap_err();
        assert_eq!(err.to_string(), "Malformed transaction, field `description` is blank");
    }

    #[test]
    fn test_hash_field_boundaries_cannot_shift() {
        let a = txn("2024-03-01", 5.0, "x|y");
        let mut b = txn("2024-03-01", 5.0, "x");
        b.memo = Some("y|".to_string());

        assert_ne!(derive_hash(&a, "c", "1").unwrap(), derive_hash(&b, "c", "1").unwrap());
    }

    #[test]
    fn test_unique_id_identifier_cannot_pose_as_description() {
        let mut a = txn("2024-03-01", 5.0, "Parking");
        a.identifier = Some("Coffee_".to_string());
        let b = txn("2024-03-01", 5.0, "Coffee");

        let (a, b) = (derive_unique_id(&a, "c", "1").unwrap(), derive_unique_id(&b, "c", "1").unwrap());
        assert_ne!(a, b);
        assert_eq!(a, "2024-03-01_c_1_5.00_Coffee\\_");
        assert_eq!(b, "2024-03-01_c_1_5.00_Coffee_");
    }

    #[test]
    fn test_unique_id_underscores_inside_fields_are_escaped() {
        let mut a = txn("2024-03-01", 5.0, "a_b");
        a.memo = Some(String::new());
        let mut b = txn("2024-03-01", 5.0, "a");
        b.memo = Some("b_".to_string());

        assert_ne!(derive_unique_id(&a, "c", "1").unwrap(), derive_unique_id(&b, "c", "1").unwrap());
        assert_eq!(derive_unique_id(&a, "c", "acc_1").unwrap(), "2024-03-01_c_acc\\_1_5.00_a\\_b_");
    }
}
