//! Hierarchical account resolver.
//!
//! Builds a parent→children index and the leaf set over a flat account list.
//! Only leaf accounts are valid operands for ledger entries; every entry
//! point that accepts an account (manual selection, CSV resolution,
//! transaction creation) checks against this tree. Traversal is pure data —
//! no rendering concerns here.

use std::collections::HashMap;

use super::types::{Account, AccountType};

/// One step of a depth-first walk over the chart of accounts.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountNode<'a> {
    pub depth: usize,
    pub account: &'a Account,
}

#[derive(Debug, Clone)]
pub struct AccountTree {
    accounts: Vec<Account>,
    by_id: HashMap<String, usize>,
    children: HashMap<String, Vec<usize>>,
}

impl AccountTree {
    pub fn build(accounts: &[Account]) -> Self {
        let accounts = accounts.to_vec();
        let by_id: HashMap<String, usize> = accounts
            .iter()
            .enumerate()
            .map(|(idx, a)| (a.id.clone(), idx))
            .collect();

        let mut children: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, account) in accounts.iter().enumerate() {
            if let Some(parent_id) = &account.parent_id {
                children.entry(parent_id.clone()).or_default().push(idx);
            }
        }
        for list in children.values_mut() {
            list.sort_by(|&a, &b| accounts[a].code.cmp(&accounts[b].code));
        }

        AccountTree { accounts, by_id, children }
    }

    /// An account is a leaf when no other account names it as parent.
    pub fn is_leaf(&self, id: &str) -> bool {
        !self.children.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Account> {
        self.by_id.get(id).map(|&idx| &self.accounts[idx])
    }

    pub fn children_of(&self, id: &str) -> Vec<&Account> {
        self.children
            .get(id)
            .map(|list| list.iter().map(|&idx| &self.accounts[idx]).collect())
            .unwrap_or_default()
    }

    pub fn leaves(&self) -> Vec<&Account> {
        self.accounts.iter().filter(|a| self.is_leaf(&a.id)).collect()
    }

    /// Depth-first traversal grouped by account type, code-ordered within
    /// each group. Children follow their parent regardless of their own type.
    pub fn walk(&self) -> Vec<AccountNode<'_>> {
        let mut out = Vec::new();
        for account_type in AccountType::ALL {
            let mut roots: Vec<usize> = self
                .accounts
                .iter()
                .enumerate()
                .filter(|(_, a)| {
                    a.account_type == account_type
                        && a.parent_id
                            .as_deref()
                            .is_none_or(|p| !self.by_id.contains_key(p))
                })
                .map(|(idx, _)| idx)
                .collect();
            roots.sort_by(|&a, &b| self.accounts[a].code.cmp(&self.accounts[b].code));
            for root in roots {
                self.push_subtree(root, 0, &mut out);
            }
        }
        out
    }

    fn push_subtree<'a>(&'a self, idx: usize, depth: usize, out: &mut Vec<AccountNode<'a>>) {
        let account = &self.accounts[idx];
        out.push(AccountNode { depth, account });
        if let Some(child_indexes) = self.children.get(&account.id) {
            for &child in child_indexes {
                self.push_subtree(child, depth + 1, out);
            }
        }
    }
}
