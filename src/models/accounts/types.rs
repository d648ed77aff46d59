use serde::{Deserialize, Serialize};

use crate::store::Record;

/// Account categories in chart-of-accounts display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

impl AccountType {
    pub const ALL: [AccountType; 5] = [
        AccountType::Asset,
        AccountType::Liability,
        AccountType::Equity,
        AccountType::Income,
        AccountType::Expense,
    ];

    /// Case-insensitive parse of the stored type string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asset" => Some(AccountType::Asset),
            "liability" => Some(AccountType::Liability),
            "equity" => Some(AccountType::Equity),
            "income" => Some(AccountType::Income),
            "expense" => Some(AccountType::Expense),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "asset",
            AccountType::Liability => "liability",
            AccountType::Equity => "equity",
            AccountType::Income => "income",
            AccountType::Expense => "expense",
        }
    }
}

/// One account of the chart of accounts. `parent_id` is `None` for roots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub code: String,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl Account {
    /// Adapter from an open store record. `None` when id, code, name or type
    /// are missing or unreadable.
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Account {
            id: record.id.clone()?,
            code: record.get_str("code")?.to_string(),
            name: record.get_str("name")?.to_string(),
            account_type: AccountType::parse(record.get_str("type")?)?,
            parent_id: record.get_str("parent_id").map(str::to_string),
        })
    }
}
