//! Computes each account's share of its parent's balance, per currency
//! (§4.5), via a depth-first post-order walk of the tree.

use num_traits::Zero;

use crate::account::{AccountId, AccountTree};

/// Populates `proportions` for every non-root account: the raw signed
/// ratio `child.balance[c] / parent.balance[c]`, left unset when the
/// parent's balance in that currency is zero (P4).
pub fn compute(tree: &mut AccountTree) {
    let root = tree.root();
    for &child in tree.get(root).children.clone().iter() {
        visit(tree, child);
    }
}

fn visit(tree: &mut AccountTree, id: AccountId) {
    let parent = tree.get(id).parent.expect("non-root account has a parent");
    let parent_balances = tree.get(parent).balances.clone();
    let child_balances = tree.get(id).balances.clone();

    let mut proportions = std::collections::HashMap::new();
    for (currency, child_bal) in &child_balances {
        if let Some(parent_bal) = parent_balances.get(currency) {
            if !parent_bal.is_zero() {
                proportions.insert(*currency, child_bal / parent_bal);
            }
        }
    }
    tree.get_mut(id).proportions = proportions;

    for child in tree.get(id).children.clone() {
        visit(tree, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::accumulate;
    use crate::tokenizer::tokenize;
    use crate::transaction::parse_transactions;
    use num_traits::ToPrimitive;
    use pretty_assertions::assert_eq;

    #[test]
    fn computes_exact_third_proportion() {
        let input = "2024-01-01 split\n支出:a ¥1\n支出:b ¥1\n支出:c ¥1\n资产:现金 ¥-3\n";
        let blocks = tokenize(input);
        let mut tree = crate::account::AccountTree::new();
        let xacts = parse_transactions(&blocks, &mut tree).unwrap();
        accumulate(&mut tree, &xacts).unwrap();
        compute(&mut tree);

        let expense = tree.resolve("支出").unwrap();
        let a = tree.resolve("支出:a").unwrap();
        let prop = tree.get(a).proportions[&'¥'].clone();
        assert_eq!(prop.to_f64().unwrap(), 1.0 / 3.0);
        let _ = expense;
    }

    #[test]
    fn unset_when_parent_balance_zero() {
        let input = "2024-01-01 wash\n支出:a ¥1\n支出:b ¥-1\n";
        let blocks = tokenize(input);
        let mut tree = crate::account::AccountTree::new();
        let xacts = parse_transactions(&blocks, &mut tree).unwrap();
        accumulate(&mut tree, &xacts).unwrap();
        compute(&mut tree);

        let a = tree.resolve("支出:a").unwrap();
        assert!(tree.get(a).proportions.get(&'¥').is_none());
    }
}
