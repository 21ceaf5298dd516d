//! Accumulates parsed transactions into the account tree, checking the
//! per-transaction zero-sum invariant and the share-price account sign
//! invariant as it goes.

use num_traits::Zero;

use crate::account::{AccountId, AccountTree};
use crate::amount::Amount;
use crate::classify;
use crate::error::{Kind, LedgerError};
use crate::transaction::Transaction;

/// Walks every transaction's entries into the account tree, updating
/// per-currency balances up each entry's ancestor chain (I1), and checking
/// invariants (P1, P3) as each transaction completes.
pub fn accumulate(tree: &mut AccountTree, transactions: &[Transaction]) -> Result<(), LedgerError> {
    for xact in transactions {
        check_zero_sum(xact)?;

        let mut touched_ancestors: Vec<AccountId> = Vec::new();
        for entry in &xact.entries {
            for ancestor in tree.ancestors(entry.account).collect::<Vec<_>>() {
                let node = tree.get_mut(ancestor);
                let bal = node
                    .balances
                    .entry(entry.currency)
                    .or_insert_with(Amount::zero);
                *bal += &entry.amount;
                if node.earliest_time.is_none_or(|t| entry.time < t) {
                    node.earliest_time = Some(entry.time);
                }
                touched_ancestors.push(ancestor);
            }
        }

        for ancestor in touched_ancestors {
            check_share_sign(tree, ancestor)?;
        }
    }
    Ok(())
}

fn check_zero_sum(xact: &Transaction) -> Result<(), LedgerError> {
    use std::collections::HashMap;
    let mut sums: HashMap<char, Amount> = HashMap::new();
    for e in &xact.entries {
        *sums.entry(e.currency).or_insert_with(Amount::zero) += &e.amount;
    }
    if sums.values().any(|s| !s.is_zero()) {
        return Err(LedgerError::new(
            Kind::NotBalanced,
            format!("{} {}", xact.header_date, xact.description),
        ));
    }
    Ok(())
}

fn check_share_sign(tree: &AccountTree, id: AccountId) -> Result<(), LedgerError> {
    let node = tree.get(id);
    if !classify::share_price_pattern().is_match(&node.name) {
        return Ok(());
    }
    let parent_negative = node
        .parent
        .is_some_and(|p| tree.get(p).name.starts_with('-'));
    let negative_polarity = node.name.starts_with('-') || parent_negative;

    for amount in node.balances.values() {
        let ok = if negative_polarity {
            amount <= &Amount::zero()
        } else {
            amount >= &Amount::zero()
        };
        if !ok {
            return Err(LedgerError::new(
                Kind::ShareAccountSign,
                format!("{} balance {}", tree.path_string(id), amount),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use crate::transaction::parse_transactions;
    use num_traits::ToPrimitive;
    use pretty_assertions::assert_eq;

    #[test]
    fn aggregates_up_the_ancestor_chain() {
        let input = "2024-01-01 lunch\n支出:餐饮:午餐 ¥50\n资产:现金 ¥-50\n";
        let blocks = tokenize(input);
        let mut tree = AccountTree::new();
        let xacts = parse_transactions(&blocks, &mut tree).unwrap();
        accumulate(&mut tree, &xacts).unwrap();

        let expense_top = tree.resolve("支出").unwrap();
        assert_eq!(tree.get(expense_top).balances[&'¥'].to_f64().unwrap(), 50.0);
        let root = tree.root();
        assert_eq!(tree.get(root).balances[&'¥'].to_f64().unwrap(), 0.0);
    }

    #[test]
    fn rejects_unbalanced_transaction() {
        let input = "2024-01-01 lunch\n支出:餐饮 ¥50\n资产:现金 ¥-40\n";
        let blocks = tokenize(input);
        let mut tree = AccountTree::new();
        let xacts = parse_transactions(&blocks, &mut tree).unwrap();
        assert!(accumulate(&mut tree, &xacts).is_err());
    }

    #[test]
    fn enforces_share_sign_invariant() {
        let input = "2024-01-01 buy shares\n资产:股票:10.000 ¥-5\n资产:现金 ¥5\n";
        let blocks = tokenize(input);
        let mut tree = AccountTree::new();
        let xacts = parse_transactions(&blocks, &mut tree).unwrap();
        // positive-polarity share account with a negative balance must fail.
        assert!(accumulate(&mut tree, &xacts).is_err());
    }
}
