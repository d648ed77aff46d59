//! Static per-collection restore configuration.
//!
//! `COLLECTIONS` is the fixed backup/restore order — a topological sort of
//! the reference graph, leaves first. Restore walks it top to bottom, so a
//! remapped field always points at a collection that was already processed.

/// A foreign-key-like field and the collection its old id lives in.
#[derive(Debug, Clone, Copy)]
pub struct Remap {
    pub field: &'static str,
    pub references: &'static str,
}

const fn remap(field: &'static str, references: &'static str) -> Remap {
    Remap { field, references }
}

/// One row of the restore configuration table.
///
/// - `stripped`: references outside the snapshot closure (the owning user),
///   always removed before write, never remapped.
/// - `optional_remap`: in-closure references that may legally be null; an
///   unresolved old id degrades to null instead of failing the record.
/// - `required_remap`: in-closure references that must resolve; a miss
///   rejects the whole record.
/// - `unique_key`: natural key deciding insert-vs-update on restore.
#[derive(Debug, Clone, Copy)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub stripped: &'static [&'static str],
    pub optional_remap: &'static [Remap],
    pub required_remap: &'static [Remap],
    pub unique_key: Option<&'static str>,
}

pub const COLLECTIONS: &[CollectionSpec] = &[
    CollectionSpec {
        name: "accounts",
        stripped: &["user_id"],
        optional_remap: &[remap("parent_id", "accounts")],
        required_remap: &[],
        unique_key: Some("code"),
    },
    CollectionSpec {
        name: "product_categories",
        stripped: &["user_id"],
        optional_remap: &[],
        required_remap: &[],
        unique_key: Some("name"),
    },
    CollectionSpec {
        name: "vendors",
        stripped: &["user_id"],
        optional_remap: &[],
        required_remap: &[],
        unique_key: Some("email"),
    },
    CollectionSpec {
        name: "customers",
        stripped: &["user_id"],
        optional_remap: &[],
        required_remap: &[],
        unique_key: Some("email"),
    },
    CollectionSpec {
        name: "employees",
        stripped: &["user_id"],
        optional_remap: &[],
        required_remap: &[],
        unique_key: Some("employee_number"),
    },
    CollectionSpec {
        name: "products",
        stripped: &["user_id"],
        optional_remap: &[
            remap("category_id", "product_categories"),
            remap("vendor_id", "vendors"),
        ],
        required_remap: &[],
        unique_key: Some("sku"),
    },
    CollectionSpec {
        name: "sales_orders",
        stripped: &["user_id"],
        optional_remap: &[],
        required_remap: &[remap("customer_id", "customers")],
        unique_key: Some("order_number"),
    },
    CollectionSpec {
        name: "sales_line_items",
        stripped: &["user_id"],
        optional_remap: &[],
        required_remap: &[
            remap("sales_order_id", "sales_orders"),
            remap("product_id", "products"),
        ],
        unique_key: None,
    },
    CollectionSpec {
        name: "purchase_orders",
        stripped: &["user_id"],
        optional_remap: &[],
        required_remap: &[remap("vendor_id", "vendors")],
        unique_key: Some("order_number"),
    },
    CollectionSpec {
        name: "purchase_line_items",
        stripped: &["user_id"],
        optional_remap: &[],
        required_remap: &[
            remap("purchase_order_id", "purchase_orders"),
            remap("product_id", "products"),
        ],
        unique_key: None,
    },
    CollectionSpec {
        name: "stock_movements",
        stripped: &["user_id"],
        optional_remap: &[],
        required_remap: &[remap("product_id", "products")],
        unique_key: None,
    },
    CollectionSpec {
        name: "transactions",
        stripped: &["user_id"],
        // a non-transfer transaction legally has one null side
        optional_remap: &[
            remap("account_from_id", "accounts"),
            remap("account_to_id", "accounts"),
        ],
        required_remap: &[],
        unique_key: None,
    },
    CollectionSpec {
        name: "payroll",
        stripped: &["user_id"],
        optional_remap: &[],
        required_remap: &[remap("employee_id", "employees")],
        unique_key: None,
    },
];

pub fn spec_for(name: &str) -> Option<&'static CollectionSpec> {
    COLLECTIONS.iter().find(|spec| spec.name == name)
}
