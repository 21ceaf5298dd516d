//! Emits the ordered, zero-suppressed, width-aware tree report (§4.6).

use std::cmp::Ordering;
use std::fmt::Write as _;

use chrono::Duration;
use console::measure_text_width;
use num_traits::Zero;

use crate::account::{AccountId, AccountTree};
use crate::amount::{self, Amount, format_fixed};
use crate::classify;
use crate::misc::today;

const INDENT_UNIT: &str = " │    ";
const FAR_FUTURE_DAYS: i64 = 365;

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str(INDENT_UNIT);
    }
}

fn all_zero(tree: &AccountTree, id: AccountId) -> bool {
    tree.get(id).balances.values().all(Zero::is_zero)
}

fn is_far_future(tree: &AccountTree, id: AccountId) -> bool {
    match tree.get(id).earliest_time {
        Some(t) => t - today() > Duration::days(FAR_FUTURE_DAYS),
        None => false,
    }
}

/// A subtree is suppressed when every balance in it is zero, unless it is
/// `protected` (its top-level ancestor is in the never-skip set) AND it has
/// children of its own — protected leaves still follow plain suppression.
fn should_suppress(tree: &AccountTree, id: AccountId, protected: bool) -> bool {
    if !all_zero(tree, id) {
        return false;
    }
    if protected && !tree.get(id).children.is_empty() {
        return false;
    }
    true
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum GroupOrder {
    Alpha,
    YearMonthAsc,
    SharePriceDesc,
    BalanceDesc,
}

fn total_balance(tree: &AccountTree, id: AccountId) -> Amount {
    tree.get(id)
        .balances
        .values()
        .fold(Amount::zero(), |acc, v| acc + v)
}

fn group_order(tree: &AccountTree, parent: AccountId, depth: usize) -> GroupOrder {
    let parent_node = tree.get(parent);
    if parent_node.balances.len() == 1 && parent_node.balances.contains_key(&classify::SYNTHETIC_UNIT) {
        return GroupOrder::Alpha;
    }

    let non_zero: Vec<AccountId> = parent_node
        .children
        .iter()
        .copied()
        .filter(|&c| !all_zero(tree, c))
        .collect();
    let all_leaf = !non_zero.is_empty() && non_zero.iter().all(|&c| tree.get(c).children.is_empty());

    if all_leaf && non_zero.iter().all(|&c| classify::year_month_token_pattern().is_match(&tree.get(c).name)) {
        return GroupOrder::YearMonthAsc;
    }
    if all_leaf && non_zero.iter().all(|&c| classify::share_price_pattern().is_match(&tree.get(c).name)) {
        return GroupOrder::SharePriceDesc;
    }
    if depth == 0 {
        return GroupOrder::Alpha;
    }
    GroupOrder::BalanceDesc
}

fn share_price_of(tree: &AccountTree, id: AccountId) -> Amount {
    amount::parse_amount(&tree.get(id).name).unwrap_or_else(|_| Amount::zero())
}

/// Orders `ids` (siblings under `parent`) per the cascade in §4.6: fixed
/// top-level priority first (only meaningful when `parent` is the root),
/// then the group-level scheme chosen by [`group_order`], with ties
/// resolved by original (insertion) order via a stable sort.
fn order_siblings(tree: &AccountTree, parent: AccountId, depth: usize, is_top_level: bool, ids: &mut [AccountId]) {
    let scheme = group_order(tree, parent, depth);
    ids.sort_by(|&a, &b| {
        if is_top_level {
            let pa = classify::top_level_priority(&tree.get(a).name);
            let pb = classify::top_level_priority(&tree.get(b).name);
            let by_priority = match (pa, pb) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => x.cmp(&y),
            };
            if by_priority != Ordering::Equal {
                return by_priority;
            }
        }
        match scheme {
            GroupOrder::Alpha | GroupOrder::YearMonthAsc => tree.get(a).name.cmp(&tree.get(b).name),
            GroupOrder::SharePriceDesc => share_price_of(tree, b).cmp(&share_price_of(tree, a)),
            GroupOrder::BalanceDesc => total_balance(tree, b).cmp(&total_balance(tree, a)),
        }
    });
}

/// Renders the full tree report.
pub fn render(tree: &AccountTree, no_amount: bool) -> String {
    let mut out = String::new();
    let root = tree.root();
    let mut top = tree.get(root).children.clone();
    order_siblings(tree, root, 0, true, &mut top);
    render_siblings(tree, &top, 0, &mut out, no_amount);
    out
}

fn render_siblings(tree: &AccountTree, ids: &[AccountId], depth: usize, out: &mut String, no_amount: bool) {
    let mut displayed = Vec::new();
    let mut skipped_future = false;
    for &id in ids {
        if is_far_future(tree, id) {
            skipped_future = true;
            continue;
        }
        let protected = classify::is_never_skip_top_level(&tree.get(tree.top_level(id)).name);
        if should_suppress(tree, id, protected) {
            continue;
        }
        displayed.push(id);
    }

    let width = displayed
        .iter()
        .map(|&id| measure_text_width(&tree.get(id).name))
        .max()
        .unwrap_or(0);

    for &id in &displayed {
        render_line(tree, id, depth, width, out, no_amount);
        let protected = classify::is_never_skip_top_level(&tree.get(tree.top_level(id)).name);
        let mut children = tree.get(id).children.clone();
        order_siblings(tree, id, depth + 1, false, &mut children);
        render_siblings_inner(tree, &children, depth + 1, protected, out, no_amount);
    }

    if skipped_future {
        indent(depth, out);
        out.push_str("[...]\n");
    }
}

/// Like [`render_siblings`], but threading the `protected` flag down from
/// the top-level ancestor instead of recomputing a root-relative ordering.
fn render_siblings_inner(
    tree: &AccountTree,
    ids: &[AccountId],
    depth: usize,
    protected: bool,
    out: &mut String,
    no_amount: bool,
) {
    let mut displayed = Vec::new();
    let mut skipped_future = false;
    for &id in ids {
        if is_far_future(tree, id) {
            skipped_future = true;
            continue;
        }
        if should_suppress(tree, id, protected) {
            continue;
        }
        displayed.push(id);
    }

    let width = displayed
        .iter()
        .map(|&id| measure_text_width(&tree.get(id).name))
        .max()
        .unwrap_or(0);

    for &id in &displayed {
        render_line(tree, id, depth, width, out, no_amount);
        let mut children = tree.get(id).children.clone();
        order_siblings(tree, id, depth + 1, false, &mut children);
        render_siblings_inner(tree, &children, depth + 1, protected, out, no_amount);
    }

    if skipped_future {
        indent(depth, out);
        out.push_str("[...]\n");
    }
}

fn render_line(tree: &AccountTree, id: AccountId, depth: usize, width: usize, out: &mut String, no_amount: bool) {
    let node = tree.get(id);
    indent(depth, out);
    let name_width = measure_text_width(&node.name);
    out.push_str(&node.name);
    for _ in name_width..width {
        out.push(' ');
    }

    let is_share_leaf = classify::share_price_pattern().is_match(&node.name);
    let mut currencies: Vec<&char> = node.balances.keys().collect();
    currencies.sort();

    for currency in currencies {
        let balance = &node.balances[currency];
        out.push(' ');
        if is_share_leaf {
            if !no_amount {
                let price = share_price_of(tree, id);
                let shares = if price.is_zero() { Amount::zero() } else { balance / &price };
                let _ = write!(out, "{}*{}", format_fixed(&price, 3), format_fixed(&shares, 3));
            }
            if let Some(prop) = node.proportions.get(currency) {
                let percent = prop * Amount::from_integer(100.into());
                if !no_amount {
                    out.push(' ');
                }
                let _ = write!(out, "{}%", format_fixed(&percent, 3));
            }
        } else {
            let digits = if *currency == classify::SYNTHETIC_UNIT { 0 } else { 2 };
            if !no_amount {
                let _ = write!(out, "{}{}", currency, format_fixed(balance, digits));
            }
            if let Some(prop) = node.proportions.get(currency) {
                let percent = prop * Amount::from_integer(100.into());
                if !no_amount {
                    out.push(' ');
                }
                let _ = write!(out, "{}%", format_fixed(&percent, 3));
            }
        }
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::accumulate;
    use crate::proportion;
    use crate::tokenizer::tokenize;
    use crate::transaction::parse_transactions;

    fn build(input: &str) -> AccountTree {
        let blocks = tokenize(input);
        let mut tree = AccountTree::new();
        let xacts = parse_transactions(&blocks, &mut tree).unwrap();
        accumulate(&mut tree, &xacts).unwrap();
        proportion::compute(&mut tree);
        tree
    }

    #[test]
    fn renders_nonzero_accounts_with_proportion() {
        let tree = build("2024-01-01 lunch\n支出:餐饮 ¥50\n资产:现金 ¥-50\n");
        let report = render(&tree, false);
        assert!(report.contains("支出"));
        assert!(report.contains("资产"));
        assert!(report.contains('%'));
    }

    #[test]
    fn suppresses_all_zero_subtree_outside_never_skip() {
        // a top-level account with only one entry followed by its exact
        // reversal nets to zero and is not in the never-skip set.
        let tree = build(
            "2024-01-01 a\n其他:x ¥1\n资产:现金 ¥-1\n\n2024-01-02 b\n其他:x ¥-1\n资产:现金 ¥1\n",
        );
        let report = render(&tree, false);
        assert!(!report.contains("其他"));
    }

    #[test]
    fn never_skip_top_level_stays_even_when_zero() {
        let tree = build(
            "2024-01-01 a\n保险:寿险 ¥1\n资产:现金 ¥-1\n\n2024-01-02 b\n保险:寿险 ¥-1\n资产:现金 ¥1\n",
        );
        let report = render(&tree, false);
        assert!(report.contains("保险"));
    }

    #[test]
    fn no_amount_hides_balance_but_keeps_proportion() {
        let tree = build("2024-01-01 lunch\n支出:a ¥1\n支出:b ¥1\n资产:现金 ¥-2\n");
        let report = render(&tree, true);
        assert!(!report.contains("¥1.00"));
        assert!(report.contains('%'));
    }

    #[test]
    fn no_amount_hides_share_price_but_keeps_proportion() {
        let tree = build("2024-01-01 buy\n基金:股票:12.340 ¥1000\n资产:现金 ¥-1000\n");
        let with_amount = render(&tree, false);
        assert!(with_amount.contains("12.340*"));
        let no_amount = render(&tree, true);
        assert!(!no_amount.contains("12.340*"));
        assert!(no_amount.contains('%'));
    }
}
