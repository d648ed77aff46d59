//! Ledger-transaction CSV import.
//!
//! Rows are parsed and validated independently; account references are
//! resolved by name or code against the chart of accounts loaded once per
//! import session, and only leaf accounts are accepted as operands. The
//! batch commits all-or-nothing: a single invalid row blocks the import.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde_json::Value;

use crate::errors::ImportError;
use crate::models::accounts::{Account, AccountTree};
use crate::store::{AuthProvider, DataStore, Fields, Record};

use super::tokenizer::{CsvRow, CsvTable, FieldSpec};
use super::types::{ParsedRow, invalid_count};

pub const MAX_AMOUNT: f64 = 1_000_000_000.0;

const FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "date", aliases: &[], required: true },
    FieldSpec { name: "type", aliases: &["transaction_type"], required: true },
    FieldSpec { name: "amount", aliases: &["value"], required: true },
    FieldSpec { name: "description", aliases: &["memo", "note"], required: false },
    FieldSpec { name: "account_from", aliases: &["from_account", "from"], required: false },
    FieldSpec { name: "account_to", aliases: &["to_account", "to"], required: false },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Sale,
    Purchase,
    Payment,
    Expense,
    Transfer,
}

impl TransactionType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sale" => Some(TransactionType::Sale),
            "purchase" => Some(TransactionType::Purchase),
            "payment" => Some(TransactionType::Payment),
            "expense" => Some(TransactionType::Expense),
            "transfer" => Some(TransactionType::Transfer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Sale => "sale",
            TransactionType::Purchase => "purchase",
            TransactionType::Payment => "payment",
            TransactionType::Expense => "expense",
            TransactionType::Transfer => "transfer",
        }
    }
}

/// Candidate transaction assembled from one row. Carries both the raw
/// account references as typed by the user and the resolved ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionDraft {
    pub date: Option<NaiveDate>,
    pub tx_type: Option<TransactionType>,
    pub amount: Option<f64>,
    pub description: String,
    pub account_from: String,
    pub account_to: String,
    pub account_from_id: Option<String>,
    pub account_to_id: Option<String>,
}

pub struct TransactionImporter {
    index: HashMap<String, Account>,
    tree: AccountTree,
}

impl TransactionImporter {
    /// Build the per-session lookup index (case-insensitive name and code)
    /// and the hierarchy used for the leaf-account rule.
    pub fn new(accounts: &[Account]) -> Self {
        let mut index = HashMap::new();
        for account in accounts {
            index.insert(lookup_key(&account.name), account.clone());
            index.insert(lookup_key(&account.code), account.clone());
        }
        TransactionImporter { index, tree: AccountTree::build(accounts) }
    }

    /// Pure function of the input text and the loaded chart of accounts:
    /// parsing the same text twice yields identical rows.
    pub fn parse(&self, text: &str) -> Result<Vec<ParsedRow<TransactionDraft>>, ImportError> {
        let table = CsvTable::parse(text, FIELDS)?;
        Ok(table.rows().iter().map(|row| self.parse_row(&table, row)).collect())
    }

    fn parse_row(&self, table: &CsvTable, row: &CsvRow) -> ParsedRow<TransactionDraft> {
        let mut draft = TransactionDraft::default();
        let mut errors = Vec::new();

        if let Some(raw) = table.cell(row, "date") {
            match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => draft.date = Some(date),
                Err(_) => errors.push(format!("Invalid date '{raw}' (expected YYYY-MM-DD)")),
            }
        }

        if let Some(raw) = table.cell(row, "type") {
            match TransactionType::parse(raw) {
                Some(tx_type) => draft.tx_type = Some(tx_type),
                None => errors.push(format!(
                    "Invalid type '{raw}' (expected sale, purchase, payment, expense or transfer)"
                )),
            }
        }

        if let Some(raw) = table.cell(row, "amount") {
            match raw.parse::<f64>() {
                Ok(amount) if !(amount > 0.0) => {
                    errors.push(format!("Amount must be positive, got '{raw}'"));
                }
                Ok(amount) if amount > MAX_AMOUNT => {
                    errors.push(format!("Amount {raw} exceeds the maximum of {MAX_AMOUNT}"));
                }
                Ok(amount) => draft.amount = Some(amount),
                Err(_) => errors.push(format!("Invalid amount '{raw}'")),
            }
        }

        draft.description = table.cell(row, "description").unwrap_or_default().to_string();
        draft.account_from = table.cell(row, "account_from").unwrap_or_default().to_string();
        draft.account_to = table.cell(row, "account_to").unwrap_or_default().to_string();

        if !draft.account_from.is_empty() {
            draft.account_from_id = self.resolve_account(&draft.account_from, &mut errors);
        }
        if !draft.account_to.is_empty() {
            draft.account_to_id = self.resolve_account(&draft.account_to, &mut errors);
        }

        if let Some(tx_type) = draft.tx_type {
            check_structure(tx_type, &draft, &mut errors);
        }

        for issue in schema_issues(&draft, &errors) {
            if !errors.contains(&issue) {
                errors.push(issue);
            }
        }

        ParsedRow { row_number: row.row_number, draft, errors }
    }

    /// Name-or-code lookup with the leaf-account invariant: a parent account
    /// is a hard error, never silently coerced to one of its children.
    fn resolve_account(&self, reference: &str, errors: &mut Vec<String>) -> Option<String> {
        match self.index.get(&lookup_key(reference)) {
            Some(account) if self.tree.is_leaf(&account.id) => Some(account.id.clone()),
            Some(account) => {
                errors.push(format!("'{}' is a parent account and cannot be used", account.name));
                None
            }
            None => {
                errors.push(format!("Unknown account '{reference}'"));
                None
            }
        }
    }

    /// Batch commit. Refuses while any row is invalid; otherwise sends one
    /// atomic batch insert and surfaces a store rejection untouched.
    pub async fn commit<S, A>(
        &self,
        store: &S,
        auth: &A,
        rows: &[ParsedRow<TransactionDraft>],
    ) -> Result<Vec<Record>, ImportError>
    where
        S: DataStore,
        A: AuthProvider,
    {
        auth.current_identity().ok_or(ImportError::NotAuthenticated)?;

        let invalid_rows = invalid_count(rows);
        if invalid_rows > 0 {
            return Err(ImportError::Blocked { invalid_rows });
        }
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let payloads = rows.iter().map(|row| payload_for(&row.draft)).collect();
        let created = store.batch_insert("transactions", payloads).await?;
        log::info!("imported {} transaction(s)", created.len());
        Ok(created)
    }
}

fn lookup_key(reference: &str) -> String {
    reference.trim().to_lowercase()
}

/// Per-type structural rules over the assembled draft.
fn check_structure(tx_type: TransactionType, draft: &TransactionDraft, errors: &mut Vec<String>) {
    match tx_type {
        TransactionType::Transfer => {
            if draft.account_from.is_empty() || draft.account_to.is_empty() {
                errors.push("Transfer requires both account_from and account_to".to_string());
            } else if let (Some(from), Some(to)) = (&draft.account_from_id, &draft.account_to_id) {
                if from == to {
                    errors.push("Transfer requires two distinct accounts".to_string());
                }
            }
        }
        TransactionType::Sale | TransactionType::Payment => {
            if draft.account_to.is_empty() {
                errors.push(format!("account_to is required for {}", tx_type.as_str()));
            }
        }
        TransactionType::Purchase | TransactionType::Expense => {
            if draft.account_from.is_empty() {
                errors.push(format!("account_from is required for {}", tx_type.as_str()));
            }
        }
    }
}

/// Full-schema re-validation of the assembled candidate. Only reports what
/// no field-specific message already covers: a field that failed to parse
/// keeps its parse error and is not flagged missing on top.
fn schema_issues(draft: &TransactionDraft, errors: &[String]) -> Vec<String> {
    let mentions = |needle: &str| errors.iter().any(|e| e.to_ascii_lowercase().contains(needle));
    let mut issues = Vec::new();
    if draft.date.is_none() && !mentions("date") {
        issues.push("Missing date".to_string());
    }
    if draft.tx_type.is_none() && !mentions("type") {
        issues.push("Missing type".to_string());
    }
    if draft.amount.is_none() && !mentions("amount") {
        issues.push("Missing amount".to_string());
    }
    if draft.account_from.is_empty() && draft.account_to.is_empty() && !mentions("account") {
        issues.push("At least one account reference is required".to_string());
    }
    if draft.description.chars().count() > 500 {
        issues.push("Description too long (max 500 characters)".to_string());
    }
    issues
}

fn payload_for(draft: &TransactionDraft) -> Fields {
    let mut payload = Fields::new();
    if let Some(date) = draft.date {
        payload.insert("date".to_string(), Value::String(date.to_string()));
    }
    if let Some(tx_type) = draft.tx_type {
        payload.insert("type".to_string(), Value::String(tx_type.as_str().to_string()));
    }
    if let Some(amount) = draft.amount {
        if let Some(number) = serde_json::Number::from_f64(amount) {
            payload.insert("amount".to_string(), Value::Number(number));
        }
    }
    if !draft.description.is_empty() {
        payload.insert("description".to_string(), Value::String(draft.description.clone()));
    }
    payload.insert(
        "account_from_id".to_string(),
        draft.account_from_id.clone().map(Value::String).unwrap_or(Value::Null),
    );
    payload.insert(
        "account_to_id".to_string(),
        draft.account_to_id.clone().map(Value::String).unwrap_or(Value::Null),
    );
    payload
}
