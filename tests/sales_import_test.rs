//! Sales-order CSV import tests — nested line-item grammar, reference
//! resolution by name/SKU/email, total aggregation, and the two-phase commit
//! that wires line items to the platform-assigned order ids.

mod common;

use ledgerkit::errors::ImportError;
use ledgerkit::models::import::all_valid;
use ledgerkit::models::import::sales_orders::{
    Customer, OrderStatus, Product, SalesOrderImporter,
};

use common::{MemoryStore, signed_in};

fn importer() -> SalesOrderImporter {
    SalesOrderImporter::new(
        &[
            Customer {
                id: "c1".to_string(),
                name: "Acme Corp".to_string(),
                email: "orders@acme.io".to_string(),
            },
            Customer {
                id: "c2".to_string(),
                name: "Globex".to_string(),
                email: String::new(),
            },
        ],
        &[
            Product { id: "p1".to_string(), name: "Widget".to_string(), sku: "WID-1".to_string() },
            Product { id: "p2".to_string(), name: "Gadget".to_string(), sku: "GAD-1".to_string() },
        ],
    )
}

#[test]
fn parses_nested_line_items_and_aggregates_totals() {
    let rows = importer()
        .parse(
            "order_number,date,customer,status,items\n\
             SO-1,2026-04-01,Acme Corp,confirmed,\"Widget|2|10.00|1.50;Gadget|1|5\"\n",
        )
        .expect("parse failed");

    assert!(all_valid(&rows), "errors: {:?}", rows);
    let order = &rows[0].draft;
    assert_eq!(order.order_number, "SO-1");
    assert_eq!(order.customer_id.as_deref(), Some("c1"));
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.items[0].product_id.as_deref(), Some("p1"));
    assert_eq!(order.items[0].quantity, 2);
    assert_eq!(order.subtotal, 25.0);
    assert_eq!(order.discount_total, 1.5);
    assert_eq!(order.total, 23.5);
}

#[test]
fn products_resolve_by_sku_and_customers_by_email() {
    let rows = importer()
        .parse(
            "order_number,date,customer,items\n\
             SO-2,2026-04-01,ORDERS@ACME.IO,wid-1|1|10\n",
        )
        .expect("parse failed");

    assert!(all_valid(&rows), "errors: {:?}", rows);
    assert_eq!(rows[0].draft.customer_id.as_deref(), Some("c1"));
    assert_eq!(rows[0].draft.items[0].product_id.as_deref(), Some("p1"));
}

#[test]
fn status_defaults_to_pending_when_absent() {
    let rows = importer()
        .parse("order_number,date,customer,items\nSO-3,2026-04-01,Globex,Widget|1|10\n")
        .expect("parse failed");
    assert!(all_valid(&rows), "errors: {:?}", rows);
    assert_eq!(rows[0].draft.status, OrderStatus::Pending);
}

#[test]
fn invalid_status_is_rejected() {
    let rows = importer()
        .parse("order_number,date,customer,status,items\nSO-4,2026-04-01,Globex,teleported,Widget|1|10\n")
        .expect("parse failed");
    assert!(rows[0].errors.iter().any(|e| e.starts_with("Invalid status 'teleported'")));
}

#[test]
fn unknown_customer_is_a_row_error() {
    let rows = importer()
        .parse("order_number,date,customer,items\nSO-5,2026-04-01,Initech,Widget|1|10\n")
        .expect("parse failed");
    assert_eq!(rows[0].errors, vec!["Unknown customer 'Initech'".to_string()]);
}

#[test]
fn sub_record_errors_carry_their_item_position() {
    let rows = importer()
        .parse(
            "order_number,date,customer,items\n\
             SO-6,2026-04-01,Globex,\"Widget|1|10;Doohickey|1|10;Gadget|0|5;Widget|1|10|99\"\n",
        )
        .expect("parse failed");

    let errors = &rows[0].errors;
    assert!(errors.iter().any(|e| e.starts_with("Item 2: Unknown product 'Doohickey'")), "{errors:?}");
    assert!(errors.iter().any(|e| e.starts_with("Item 3: Invalid quantity '0'")), "{errors:?}");
    assert!(errors.iter().any(|e| e.starts_with("Item 4: Discount 99")), "{errors:?}");
    // valid items still land on the draft; totals only count those
    assert_eq!(rows[0].draft.items.len(), 1);
    assert_eq!(rows[0].draft.subtotal, 10.0);
}

#[test]
fn malformed_sub_record_is_rejected() {
    let rows = importer()
        .parse("order_number,date,customer,items\nSO-7,2026-04-01,Globex,Widget|2\n")
        .expect("parse failed");
    assert!(rows[0].errors.iter().any(|e| e.contains("expected product|quantity|unit_price")));
}

#[test]
fn empty_items_cell_is_rejected() {
    let rows = importer()
        .parse("order_number,date,customer,items\nSO-8,2026-04-01,Globex,\n")
        .expect("parse failed");
    assert_eq!(rows[0].errors, vec!["Order has no items".to_string()]);
}

// ────────────────────────────────────────────────────────────────────
// Commit
// ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn commit_inserts_orders_then_their_line_items() {
    let store = MemoryStore::with_default_keys();
    let importer = importer();
    let rows = importer
        .parse(
            "order_number,date,customer,items\n\
             SO-10,2026-04-01,Acme Corp,\"Widget|2|10|1;Gadget|1|5\"\n\
             SO-11,2026-04-02,Globex,Widget|3|10\n",
        )
        .expect("parse failed");

    let orders = importer.commit(&store, &signed_in(), &rows).await.expect("commit failed");

    assert_eq!(orders.len(), 2);
    assert_eq!(store.count("sales_orders"), 2);
    assert_eq!(store.count("sales_line_items"), 3);

    let first_order_id = orders[0].id.clone().unwrap();
    let items = store.records("sales_line_items");
    let first_items: Vec<_> = items
        .iter()
        .filter(|i| i.get_str("sales_order_id") == Some(first_order_id.as_str()))
        .collect();
    assert_eq!(first_items.len(), 2);
    assert_eq!(first_items[0].get_str("product_id"), Some("p1"));
    assert_eq!(first_items[0].get("line_total"), Some(&serde_json::json!(19.0)));

    let order_record = &store.records("sales_orders")[0];
    assert_eq!(order_record.get_str("customer_id"), Some("c1"));
    assert_eq!(order_record.get("total"), Some(&serde_json::json!(24.0)));
}

#[tokio::test]
async fn commit_is_blocked_while_any_row_is_invalid() {
    let store = MemoryStore::with_default_keys();
    let importer = importer();
    let rows = importer
        .parse(
            "order_number,date,customer,items\n\
             SO-20,2026-04-01,Acme Corp,Widget|1|10\n\
             SO-21,2026-04-02,Nobody,Widget|1|10\n",
        )
        .expect("parse failed");

    let result = importer.commit(&store, &signed_in(), &rows).await;

    assert!(matches!(result, Err(ImportError::Blocked { invalid_rows: 1 })));
    assert_eq!(store.batch_calls(), 0);
    assert_eq!(store.count("sales_orders"), 0);
    assert_eq!(store.count("sales_line_items"), 0);
}

#[tokio::test]
async fn duplicate_order_number_in_store_surfaces_the_raw_store_error() {
    let store = MemoryStore::with_default_keys();
    store.seed(
        "sales_orders",
        common::fields(&[("order_number", serde_json::json!("SO-30"))]),
    );
    let importer = importer();
    let rows = importer
        .parse("order_number,date,customer,items\nSO-30,2026-04-01,Globex,Widget|1|10\n")
        .expect("parse failed");

    let result = importer.commit(&store, &signed_in(), &rows).await;

    assert!(matches!(
        result,
        Err(ImportError::Store(ledgerkit::store::StoreError::ConstraintViolation { .. }))
    ));
    assert_eq!(store.count("sales_orders"), 1, "batch left the store unchanged");
    assert_eq!(store.count("sales_line_items"), 0);
}
