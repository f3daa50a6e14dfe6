use models::transactions::{TransactionRow, TransactionStatus};
use serde::{Deserialize, Serialize};


/// One line of the CSV file. Column order is the header order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CsvRow {
    pub date: String,
    pub amount: f64,
    #[serde(default)]
    pub original_amount: Option<f64>,
    #[serde(default)]
    pub original_currency: Option<String>,
    pub description: String,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub status: TransactionStatus,
    #[serde(rename = "company")]
    pub company_id: String,
    pub account: String,
    #[serde(default)]
    pub identifier: Option<String>,
    pub hash: String,
    pub unique_id: String,
}

impl From<&TransactionRow> for CsvRow {
    fn from(row: &TransactionRow) -> Self {
        Self {
            date: row.date.clone(),
            amount: row.amount,
            original_amount: row.original_amount,
            original_currency: row.original_currency.clone(),
            description: row.description.clone(),
            memo: row.memo.clone(),
            category: row.category.clone(),
            status: row.status,
            company_id: row.company_id.clone(),
            account: row.account.clone(),
            identifier: row.identifier.clone(),
            hash: row.hash.clone(),
            unique_id: row.unique_id.clone(),
        }
    }
}
