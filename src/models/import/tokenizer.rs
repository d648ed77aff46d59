//! Delimited-text tokenizing shared by all importers.
//!
//! The first line is a header whose tokens are matched case-insensitively
//! and alias-tolerantly against the importer's field table (`accountfrom`,
//! `account_from` and `fromaccount` all name the same column). Values may be
//! double-quoted to escape the comma. Nested-list cells use `;` between
//! sub-records and `|` between sub-fields.

use std::collections::HashMap;

use crate::errors::ImportError;

/// A column the importer understands: canonical field name, accepted header
/// aliases beyond the spelling variants `normalize` already folds away, and
/// whether the column must be present in the header.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub required: bool,
}

impl FieldSpec {
    fn matches(&self, header: &str) -> bool {
        let token = normalize(header);
        token == normalize(self.name) || self.aliases.iter().any(|a| normalize(a) == token)
    }
}

/// Case-fold and drop separators so `Account_From`, `account from` and
/// `accountfrom` compare equal.
fn normalize(header: &str) -> String {
    header
        .trim()
        .chars()
        .filter(|c| !matches!(*c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// One data line, positionally split.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub row_number: usize,
    cells: Vec<String>,
}

/// Header-addressed view of a parsed document. Cells are reached through
/// [`CsvTable::cell`] by canonical field name.
#[derive(Debug, Clone)]
pub struct CsvTable {
    columns: HashMap<&'static str, usize>,
    rows: Vec<CsvRow>,
}

impl CsvTable {
    pub fn parse(text: &str, fields: &[FieldSpec]) -> Result<CsvTable, ImportError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let mut columns = HashMap::new();
        for field in fields {
            let position = headers.iter().position(|h| field.matches(h));
            match position {
                Some(index) => {
                    columns.insert(field.name, index);
                }
                None if field.required => {
                    return Err(ImportError::MissingHeader(field.name.to_string()));
                }
                None => {}
            }
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let cells: Vec<String> = record.iter().map(str::to_string).collect();
            if cells.iter().all(|c| c.is_empty()) {
                continue;
            }
            rows.push(CsvRow { row_number: rows.len() + 1, cells });
        }

        Ok(CsvTable { columns, rows })
    }

    pub fn rows(&self) -> &[CsvRow] {
        &self.rows
    }

    /// The trimmed cell for `field` on `row`; `None` when the column is
    /// absent from the header or the cell is empty.
    pub fn cell<'a>(&self, row: &'a CsvRow, field: &str) -> Option<&'a str> {
        let &index = self.columns.get(field)?;
        row.cells.get(index).map(String::as_str).filter(|c| !c.is_empty())
    }
}

/// Split a nested-list cell: `;` separates sub-records, `|` separates the
/// sub-fields of each. Empty sub-records are dropped.
pub fn split_subrecords(cell: &str) -> Vec<Vec<String>> {
    cell.split(';')
        .map(str::trim)
        .filter(|sub| !sub.is_empty())
        .map(|sub| sub.split('|').map(|f| f.trim().to_string()).collect())
        .collect()
}
