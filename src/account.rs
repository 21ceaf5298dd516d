//! The account hierarchy, held in an arena and addressed by integer index so
//! that parent references never need to alias back into a shared mutable
//! structure (no `Rc`/`RefCell`, no lifetimes tying the tree to the
//! transactions that populate it).

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::amount::Amount;
use crate::error::{Kind, LedgerError};

/// Index of an [`Account`] within an [`AccountTree`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub usize);

/// A node in the account hierarchy.
#[derive(Debug)]
pub struct Account {
    pub name: String,
    pub parent: Option<AccountId>,
    /// Children in insertion order, used as the final ordering tie-break.
    pub children: Vec<AccountId>,
    child_index: HashMap<String, AccountId>,
    /// Net balance per currency, aggregated over this subtree.
    pub balances: HashMap<char, Amount>,
    /// This account's share of its parent's balance, per currency. Unset
    /// when the parent's balance in that currency is zero.
    pub proportions: HashMap<char, Amount>,
    /// Earliest entry time observed anywhere in this subtree.
    pub earliest_time: Option<NaiveDate>,
}

impl Account {
    fn new(name: String, parent: Option<AccountId>) -> Self {
        Account {
            name,
            parent,
            children: Vec::new(),
            child_index: HashMap::new(),
            balances: HashMap::new(),
            proportions: HashMap::new(),
            earliest_time: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Splits an account path on `:` or the full-width `：`.
pub fn split_path(path: &str) -> Vec<String> {
    path.split(['：', ':'])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// The reserved name of the arena's root node; never appears in input.
pub const ROOT_NAME: &str = "root";

/// The rooted, arena-backed account hierarchy.
#[derive(Debug)]
pub struct AccountTree {
    arena: Vec<Account>,
}

impl AccountTree {
    pub fn new() -> Self {
        AccountTree {
            arena: vec![Account::new(ROOT_NAME.to_string(), None)],
        }
    }

    pub fn root(&self) -> AccountId {
        AccountId(0)
    }

    pub fn get(&self, id: AccountId) -> &Account {
        &self.arena[id.0]
    }

    pub fn get_mut(&mut self, id: AccountId) -> &mut Account {
        &mut self.arena[id.0]
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.len() <= 1
    }

    /// Resolves (auto-vivifying as needed) the account identified by a raw
    /// path string, splitting it on `:`/`：`.
    pub fn resolve(&mut self, path: &str) -> Result<AccountId, LedgerError> {
        let parts = split_path(path);
        if parts.is_empty() {
            return Err(LedgerError::new(Kind::BadAccount, format!("`{path}`")));
        }
        let mut cur = self.root();
        for part in parts {
            cur = self.child(cur, &part);
        }
        Ok(cur)
    }

    fn child(&mut self, parent: AccountId, name: &str) -> AccountId {
        if let Some(&id) = self.arena[parent.0].child_index.get(name) {
            return id;
        }
        let id = AccountId(self.arena.len());
        self.arena.push(Account::new(name.to_string(), Some(parent)));
        let parent_node = &mut self.arena[parent.0];
        parent_node.children.push(id);
        parent_node.child_index.insert(name.to_string(), id);
        id
    }

    /// The dot-path from root to `id`, joined with `:`, excluding the root
    /// node itself.
    pub fn path_string(&self, id: AccountId) -> String {
        let mut parts = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            let node = self.get(c);
            if node.is_root() {
                break;
            }
            parts.push(node.name.clone());
            cur = node.parent;
        }
        parts.reverse();
        parts.join(":")
    }

    /// The top-level ancestor of `id` (the direct child of root on the path
    /// to `id`), or `id` itself if it already is a top-level account.
    pub fn top_level(&self, id: AccountId) -> AccountId {
        let mut cur = id;
        loop {
            let node = self.get(cur);
            match node.parent {
                Some(p) if !self.get(p).is_root() => cur = p,
                Some(_) => return cur,
                None => return cur,
            }
        }
    }

    /// Ancestors of `id`, from `id` itself up to and including the root.
    pub fn ancestors(&self, id: AccountId) -> impl Iterator<Item = AccountId> + '_ {
        let mut cur = Some(id);
        std::iter::from_fn(move || {
            let out = cur;
            cur = out.and_then(|c| self.get(c).parent);
            out
        })
    }

    pub fn iter_ids(&self) -> impl Iterator<Item = AccountId> {
        (0..self.arena.len()).map(AccountId)
    }
}

impl Default for AccountTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_ascii_and_fullwidth_colons() {
        assert_eq!(split_path("支出:数码"), vec!["支出", "数码"]);
        assert_eq!(split_path("支出：数码"), vec!["支出", "数码"]);
    }

    #[test]
    fn resolve_is_idempotent_and_auto_vivifies() {
        let mut tree = AccountTree::new();
        let a = tree.resolve("支出:数码:手机").unwrap();
        let b = tree.resolve("支出:数码:手机").unwrap();
        assert_eq!(a, b);
        assert_eq!(tree.path_string(a), "支出:数码:手机");
        assert_eq!(tree.len(), 4); // root + 3 levels
    }

    #[test]
    fn empty_path_is_bad_account() {
        let mut tree = AccountTree::new();
        assert!(tree.resolve("   ").is_err());
    }

    #[test]
    fn top_level_of_nested_account() {
        let mut tree = AccountTree::new();
        let id = tree.resolve("资产:现金:钱包").unwrap();
        let top = tree.top_level(id);
        assert_eq!(tree.get(top).name, "资产");
    }
}
