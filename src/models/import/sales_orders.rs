//! Sales-order CSV import, the nested-line-item variant.
//!
//! Each row carries its line items inside one cell: sub-records separated by
//! `;`, sub-fields by `|` (`product|quantity|unit_price|discount`). Every
//! sub-record is resolved and validated independently with the same rules as
//! top-level fields; row totals are aggregated from the valid sub-records
//! only. The commit gate is the same all-or-nothing rule as for
//! transactions.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde_json::Value;

use crate::errors::ImportError;
use crate::store::{AuthProvider, DataStore, Fields, Record};

use super::tokenizer::{CsvRow, CsvTable, FieldSpec, split_subrecords};
use super::types::{ParsedRow, invalid_count};

pub const MAX_QUANTITY: u32 = 1_000_000;
pub const MAX_UNIT_PRICE: f64 = 1_000_000_000.0;

const FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "order_number", aliases: &["order", "number"], required: true },
    FieldSpec { name: "date", aliases: &["order_date"], required: true },
    FieldSpec { name: "customer", aliases: &["customer_name", "client"], required: true },
    FieldSpec { name: "status", aliases: &[], required: false },
    FieldSpec { name: "items", aliases: &["line_items", "lines"], required: true },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Reference data the importer resolves against, loaded once per session.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl Customer {
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Customer {
            id: record.id.clone()?,
            name: record.get_str("name")?.to_string(),
            email: record.get_str("email").unwrap_or_default().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub sku: String,
}

impl Product {
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Product {
            id: record.id.clone()?,
            name: record.get_str("name")?.to_string(),
            sku: record.get_str("sku").unwrap_or_default().to_string(),
        })
    }
}

/// One resolved and validated line item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItemDraft {
    pub product: String,
    pub product_id: Option<String>,
    pub quantity: u32,
    pub unit_price: f64,
    pub discount: f64,
}

impl LineItemDraft {
    pub fn line_total(&self) -> f64 {
        self.quantity as f64 * self.unit_price - self.discount
    }
}

/// Candidate sales order assembled from one row. Totals are computed from
/// the valid line items only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesOrderDraft {
    pub order_number: String,
    pub date: Option<NaiveDate>,
    pub customer: String,
    pub customer_id: Option<String>,
    pub status: OrderStatus,
    pub items: Vec<LineItemDraft>,
    pub subtotal: f64,
    pub discount_total: f64,
    pub total: f64,
}

pub struct SalesOrderImporter {
    customers: HashMap<String, Customer>,
    products: HashMap<String, Product>,
}

impl SalesOrderImporter {
    /// Index customers by name and email, products by name and SKU, all
    /// case-insensitive.
    pub fn new(customers: &[Customer], products: &[Product]) -> Self {
        let mut customer_index = HashMap::new();
        for customer in customers {
            customer_index.insert(lookup_key(&customer.name), customer.clone());
            if !customer.email.is_empty() {
                customer_index.insert(lookup_key(&customer.email), customer.clone());
            }
        }
        let mut product_index = HashMap::new();
        for product in products {
            product_index.insert(lookup_key(&product.name), product.clone());
            if !product.sku.is_empty() {
                product_index.insert(lookup_key(&product.sku), product.clone());
            }
        }
        SalesOrderImporter { customers: customer_index, products: product_index }
    }

    pub fn parse(&self, text: &str) -> Result<Vec<ParsedRow<SalesOrderDraft>>, ImportError> {
        let table = CsvTable::parse(text, FIELDS)?;
        Ok(table.rows().iter().map(|row| self.parse_row(&table, row)).collect())
    }

    fn parse_row(&self, table: &CsvTable, row: &CsvRow) -> ParsedRow<SalesOrderDraft> {
        let mut draft = SalesOrderDraft::default();
        let mut errors = Vec::new();

        match table.cell(row, "order_number") {
            Some(number) => draft.order_number = number.to_string(),
            None => errors.push("Missing order number".to_string()),
        }

        match table.cell(row, "date") {
            Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => draft.date = Some(date),
                Err(_) => errors.push(format!("Invalid date '{raw}' (expected YYYY-MM-DD)")),
            },
            None => errors.push("Missing date".to_string()),
        }

        match table.cell(row, "customer") {
            Some(reference) => {
                draft.customer = reference.to_string();
                match self.customers.get(&lookup_key(reference)) {
                    Some(customer) => draft.customer_id = Some(customer.id.clone()),
                    None => errors.push(format!("Unknown customer '{reference}'")),
                }
            }
            None => errors.push("Missing customer".to_string()),
        }

        if let Some(raw) = table.cell(row, "status") {
            match OrderStatus::parse(raw) {
                Some(status) => draft.status = status,
                None => errors.push(format!(
                    "Invalid status '{raw}' (expected pending, confirmed, shipped, delivered or cancelled)"
                )),
            }
        }

        match table.cell(row, "items") {
            Some(cell) => self.parse_items(cell, &mut draft, &mut errors),
            None => errors.push("Order has no items".to_string()),
        }

        let subtotal: f64 =
            draft.items.iter().map(|item| item.quantity as f64 * item.unit_price).sum();
        let discount_total: f64 = draft.items.iter().map(|item| item.discount).sum();
        draft.subtotal = subtotal;
        draft.discount_total = discount_total;
        draft.total = subtotal - discount_total;

        ParsedRow { row_number: row.row_number, draft, errors }
    }

    /// Resolve and validate each sub-record of the items cell. Valid items
    /// land on the draft; invalid ones only leave a positioned error.
    fn parse_items(&self, cell: &str, draft: &mut SalesOrderDraft, errors: &mut Vec<String>) {
        let subrecords = split_subrecords(cell);
        if subrecords.is_empty() {
            errors.push("Order has no items".to_string());
            return;
        }

        for (position, sub) in subrecords.iter().enumerate() {
            let label = position + 1;
            match self.parse_item(sub) {
                Ok(item) => draft.items.push(item),
                Err(message) => errors.push(format!("Item {label}: {message}")),
            }
        }
    }

    fn parse_item(&self, sub: &[String]) -> Result<LineItemDraft, String> {
        if sub.len() < 3 {
            return Err(format!(
                "expected product|quantity|unit_price[|discount], got {} field(s)",
                sub.len()
            ));
        }

        let reference = sub[0].as_str();
        let product = self
            .products
            .get(&lookup_key(reference))
            .ok_or_else(|| format!("Unknown product '{reference}'"))?;

        let quantity: u32 = sub[1]
            .parse()
            .ok()
            .filter(|&q| q > 0)
            .ok_or_else(|| format!("Invalid quantity '{}'", sub[1]))?;
        if quantity > MAX_QUANTITY {
            return Err(format!("Quantity {quantity} exceeds the maximum of {MAX_QUANTITY}"));
        }

        let unit_price: f64 = sub[2]
            .parse()
            .ok()
            .filter(|&p| p > 0.0)
            .ok_or_else(|| format!("Invalid unit price '{}'", sub[2]))?;
        if unit_price > MAX_UNIT_PRICE {
            return Err(format!("Unit price {unit_price} exceeds the maximum of {MAX_UNIT_PRICE}"));
        }

        let discount: f64 = match sub.get(3) {
            Some(raw) if !raw.is_empty() => raw
                .parse()
                .ok()
                .filter(|&d| d >= 0.0)
                .ok_or_else(|| format!("Invalid discount '{raw}'"))?,
            _ => 0.0,
        };
        let line_subtotal = quantity as f64 * unit_price;
        if discount > line_subtotal {
            return Err(format!("Discount {discount} exceeds the line subtotal {line_subtotal}"));
        }

        Ok(LineItemDraft {
            product: reference.to_string(),
            product_id: Some(product.id.clone()),
            quantity,
            unit_price,
            discount,
        })
    }

    /// Batch commit: orders first in one atomic batch, then each order's
    /// line items carrying the platform-assigned order id. Refuses while any
    /// row is invalid.
    pub async fn commit<S, A>(
        &self,
        store: &S,
        auth: &A,
        rows: &[ParsedRow<SalesOrderDraft>],
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

        let payloads = rows.iter().map(|row| order_payload(&row.draft)).collect();
        let orders = store.batch_insert("sales_orders", payloads).await?;

        let mut line_items = 0;
        for (row, order) in rows.iter().zip(&orders) {
            let Some(order_id) = &order.id else {
                return Err(ImportError::Store(crate::store::StoreError::Validation(
                    "store returned an order without id".to_string(),
                )));
            };
            let items = row.draft.items.iter().map(|item| item_payload(order_id, item)).collect();
            line_items += store.batch_insert("sales_line_items", items).await?.len();
        }

        log::info!("imported {} order(s) with {line_items} line item(s)", orders.len());
        Ok(orders)
    }
}

fn lookup_key(reference: &str) -> String {
    reference.trim().to_lowercase()
}

fn order_payload(draft: &SalesOrderDraft) -> Fields {
    let mut payload = Fields::new();
    payload.insert("order_number".to_string(), Value::String(draft.order_number.clone()));
    if let Some(date) = draft.date {
        payload.insert("date".to_string(), Value::String(date.to_string()));
    }
    payload.insert(
        "customer_id".to_string(),
        draft.customer_id.clone().map(Value::String).unwrap_or(Value::Null),
    );
    payload.insert("status".to_string(), Value::String(draft.status.as_str().to_string()));
    insert_number(&mut payload, "subtotal", draft.subtotal);
    insert_number(&mut payload, "discount_total", draft.discount_total);
    insert_number(&mut payload, "total", draft.total);
    payload
}

fn item_payload(order_id: &str, item: &LineItemDraft) -> Fields {
    let mut payload = Fields::new();
    payload.insert("sales_order_id".to_string(), Value::String(order_id.to_string()));
    payload.insert(
        "product_id".to_string(),
        item.product_id.clone().map(Value::String).unwrap_or(Value::Null),
    );
    payload.insert("quantity".to_string(), Value::Number(item.quantity.into()));
    insert_number(&mut payload, "unit_price", item.unit_price);
    insert_number(&mut payload, "discount", item.discount);
    insert_number(&mut payload, "line_total", item.line_total());
    payload
}

fn insert_number(payload: &mut Fields, field: &str, value: f64) {
    if let Some(number) = serde_json::Number::from_f64(value) {
        payload.insert(field.to_string(), Value::Number(number));
    }
}
