/// One parsed line of an import document: the row number shown to the user,
/// the candidate entity as far as it could be assembled, and every problem
/// found with it. An empty error list means the row may be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow<T> {
    pub row_number: usize,
    pub draft: T,
    pub errors: Vec<String>,
}

impl<T> ParsedRow<T> {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn invalid_count<T>(rows: &[ParsedRow<T>]) -> usize {
    rows.iter().filter(|row| !row.is_valid()).count()
}

/// The commit gate: a batch commits only when every row is clean. One bad
/// row blocks the whole import — imports are user-correctable before commit,
/// unlike restores.
pub fn all_valid<T>(rows: &[ParsedRow<T>]) -> bool {
    invalid_count(rows) == 0
}
