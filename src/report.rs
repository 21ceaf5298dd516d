//! The `--props` and `--monthly` alternate reports (§4.7): a date-ordered
//! list of transactions touching item-kind accounts, and per-month expense
//! totals grouped by currency.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use comfy_table::{Table, presets};

use crate::account::AccountTree;
use crate::amount::{Amount, format_fixed};
use crate::classify;
use crate::transaction::Transaction;

/// Renders the date-ordered list of transactions that touch any item-kind
/// account, showing date, description, and the touched account paths.
pub fn props_report(tree: &AccountTree, transactions: &[Transaction]) -> String {
    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_header(vec!["date", "description", "accounts"]);

    for xact in transactions {
        let touched: Vec<String> = xact
            .entries
            .iter()
            .filter(|e| !e.synthetic)
            .filter(|e| {
                let node = tree.get(e.account);
                classify::is_item_kind(&node.name)
            })
            .map(|e| tree.path_string(e.account))
            .collect();
        if touched.is_empty() {
            continue;
        }
        table.add_row(vec![
            xact.header_date.format("%Y-%m-%d").to_string(),
            xact.description.clone(),
            touched.join(", "),
        ]);
    }

    table.to_string()
}

/// Renders per-calendar-month totals, grouped by currency, of entries
/// booked directly under the expense top-level.
pub fn monthly_report(tree: &AccountTree, transactions: &[Transaction]) -> String {
    let mut totals: BTreeMap<(String, char), Amount> = BTreeMap::new();

    for xact in transactions {
        for entry in &xact.entries {
            if entry.synthetic {
                continue;
            }
            let top = tree.top_level(entry.account);
            if tree.get(top).name != classify::EXPENSE_TOP_LEVEL {
                continue;
            }
            let month = entry.time.format("%Y-%m").to_string();
            let key = (month, entry.currency);
            totals
                .entry(key)
                .and_modify(|a| *a += &entry.amount)
                .or_insert_with(|| entry.amount.clone());
        }
    }

    let mut out = String::new();
    for ((month, currency), total) in &totals {
        let _ = writeln!(out, "{month} {currency}{}", format_fixed(total, 2));
    }
    out
}
