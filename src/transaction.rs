//! Parses tokenized blocks into transactions, resolving account paths,
//! applying the inline-date override and the `YYMM` liability-leaf time
//! rule, and synthesizing the virtual entries that track item inventory.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::account::AccountTree;
use crate::amount::{self, Amount, sign_of};
use crate::classify;
use crate::error::{Kind, LedgerError};
use crate::misc::parse_date;
use crate::tokenizer::Block;
use crate::account::AccountId;

/// A single booking within a transaction.
#[derive(Debug, Clone)]
pub struct Entry {
    pub account: AccountId,
    pub currency: char,
    pub amount: Amount,
    pub description: String,
    pub tags: HashSet<String>,
    pub time: NaiveDate,
    pub synthetic: bool,
}

/// A parsed transaction: a description, its entries, and the effective time
/// window (widened by any inline-date overrides on its entries).
#[derive(Debug, Clone)]
pub struct Transaction {
    pub description: String,
    pub header_date: NaiveDate,
    pub time_from: NaiveDate,
    pub time_to: NaiveDate,
    pub entries: Vec<Entry>,
}

fn tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<([^>]+)>").unwrap())
}

fn inline_date_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@(\d{4}[-/.]\d{2}[-/.]\d{2})").unwrap())
}

fn extract_tags(description: &str) -> HashSet<String> {
    tag_pattern()
        .captures_iter(description)
        .map(|c| c[1].to_string())
        .collect()
}

fn extract_inline_date(description: &str) -> Result<Option<NaiveDate>, LedgerError> {
    match inline_date_pattern().captures(description) {
        Some(c) => Ok(Some(parse_date(&c[1])?)),
        None => Ok(None),
    }
}

/// Splits off the first whitespace-delimited token from `s`, returning the
/// token and the remainder (with leading whitespace stripped). `None` if `s`
/// has no non-whitespace content.
fn split_leading_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.find(char::is_whitespace) {
        Some(idx) => Some((&s[..idx], s[idx..].trim_start())),
        None => Some((s, "")),
    }
}

fn is_comment(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with('#') || t.starts_with("//")
}

/// Parses every block into a transaction, in block order (already
/// chronologically stable-sorted by the tokenizer), checking header-date
/// monotonicity and auto-vivifying account paths in `tree`.
pub fn parse_transactions(
    blocks: &[Block],
    tree: &mut AccountTree,
) -> Result<Vec<Transaction>, LedgerError> {
    let mut out = Vec::with_capacity(blocks.len());
    let mut prev_date: Option<NaiveDate> = None;

    for block in blocks {
        let xact = parse_block(block, tree, prev_date)?;
        prev_date = Some(xact.header_date);
        out.push(xact);
    }
    Ok(out)
}

fn parse_block(
    block: &Block,
    tree: &mut AccountTree,
    prev_date: Option<NaiveDate>,
) -> Result<Transaction, LedgerError> {
    let header = &block.lines[0];
    let (date_tok, description) = header
        .split_once(char::is_whitespace)
        .map(|(d, rest)| (d, rest.trim()))
        .ok_or_else(|| LedgerError::new(Kind::BadHeader, block.text()))?;

    let header_date = parse_date(date_tok)
        .map_err(|_| LedgerError::new(Kind::BadHeader, block.text()))?;

    if let Some(prev) = prev_date {
        if header_date < prev {
            return Err(LedgerError::new(Kind::BadTime, block.text()));
        }
    }

    let mut entries = Vec::new();
    for line in block.lines.iter().skip(1) {
        if is_comment(line) {
            continue;
        }
        parse_entry_line(line, header_date, description, tree, &mut entries)?;
    }

    let time_from = entries
        .iter()
        .map(|e| e.time)
        .min()
        .unwrap_or(header_date)
        .min(header_date);
    let time_to = entries
        .iter()
        .map(|e| e.time)
        .max()
        .unwrap_or(header_date)
        .max(header_date);

    Ok(Transaction {
        description: xact_description.to_string(),
        header_date,
        time_from,
        time_to,
        entries,
    })
}

fn parse_entry_line(
    line: &str,
    header_date: NaiveDate,
    xact_description: &str,
    tree: &mut AccountTree,
    entries: &mut Vec<Entry>,
) -> Result<(), LedgerError> {
    let (account_field, rest) = split_leading_token(line)
        .ok_or_else(|| LedgerError::new(Kind::BadEntry, line.to_string()))?;
    let (amount_field, description) = match split_leading_token(rest) {
        Some((amt, d)) => (amt, d.trim().to_string()),
        None => return Err(LedgerError::new(Kind::BadEntry, line.to_string())),
    };

    let account = tree.resolve(account_field)?;

    let mut chars = amount_field.chars();
    let currency = chars
        .next()
        .ok_or_else(|| LedgerError::new(Kind::BadEntry, line.to_string()))?;
    let expr: String = chars.collect();
    let amount = amount::parse_amount(&expr)?;

    let tags = extract_tags(&description);
    let inline_date = extract_inline_date(&description)?;

    let time = if let Some(d) = inline_date {
        d
    } else if is_yymm_liability(tree, account) {
        yymm_to_date(&tree.get(account).name, header_date)
    } else {
        header_date
    };

    entries.push(Entry {
        account,
        currency,
        amount: amount.clone(),
        description: description.clone(),
        tags: tags.clone(),
        time,
        synthetic: false,
    });

    synthesize_item_virtuals(tree, account, currency, &amount, xact_description, &tags, time, entries)?;

    Ok(())
}

fn is_yymm_liability(tree: &AccountTree, id: AccountId) -> bool {
    let node = tree.get(id);
    if !classify::yymm_pattern().is_match(&node.name) {
        return false;
    }
    let top = tree.top_level(id);
    tree.get(top).name == classify::LIABILITIES_TOP_LEVEL
}

fn yymm_to_date(leaf: &str, fallback: NaiveDate) -> NaiveDate {
    // leaf is a 4-digit YYMM token, e.g. "2407" for 2024-07.
    if leaf.len() == 4 {
        if let (Ok(yy), Ok(mm)) = (leaf[0..2].parse::<i32>(), leaf[2..4].parse::<u32>()) {
            let year = 2000 + yy;
            if let Some(d) = NaiveDate::from_ymd_opt(year, mm, 1) {
                return d;
            }
        }
    }
    fallback
}

/// Synthesizes the two virtual entries for item-kind expense bookings
/// (§4.3 step 5), unless tagged `<!item>`. The synthesized entries carry the
/// transaction's own header description, not the triggering entry's.
#[allow(clippy::too_many_arguments)]
fn synthesize_item_virtuals(
    tree: &mut AccountTree,
    account: AccountId,
    _currency: char,
    amount: &Amount,
    xact_description: &str,
    tags: &HashSet<String>,
    time: NaiveDate,
    entries: &mut Vec<Entry>,
) -> Result<(), LedgerError> {
    if tags.contains(classify::NO_ITEM_TAG) {
        return Ok(());
    }
    let node = tree.get(account);
    let Some(parent) = node.parent else { return Ok(()) };
    let kind = node.name.clone();
    if !classify::is_item_kind(&kind) || tree.get(parent).name != classify::EXPENSE_TOP_LEVEL {
        return Ok(());
    }

    let sign = sign_of(amount);
    let unit_amount = Amount::from_integer(sign.into());
    let neg_unit_amount = Amount::from_integer((-sign).into());

    let available_path = format!(
        "物品:可用:{kind}:{}",
        time.format("%Y-%m-%d")
    );
    let available = tree.resolve(&available_path)?;
    entries.push(Entry {
        account: available,
        currency: classify::SYNTHETIC_UNIT,
        amount: unit_amount,
        description: xact_description.to_string(),
        tags: tags.clone(),
        time,
        synthetic: true,
    });

    let purchased_path = format!("物品:购买:{kind}");
    let purchased = tree.resolve(&purchased_path)?;
    entries.push(Entry {
        account: purchased,
        currency: classify::SYNTHETIC_UNIT,
        amount: neg_unit_amount,
        description: xact_description.to_string(),
        tags: tags.clone(),
        time,
        synthetic: true,
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_simple_balanced_transaction() {
        let input = "2024-01-01 lunch\n支出:餐饮 ¥50\n资产:现金 ¥-50\n";
        let blocks = tokenize(input);
        let mut tree = AccountTree::new();
        let xacts = parse_transactions(&blocks, &mut tree).unwrap();
        assert_eq!(xacts.len(), 1);
        assert_eq!(xacts[0].entries.len(), 2);
        assert_eq!(xacts[0].entries[0].currency, '¥');
    }

    #[test]
    fn rejects_out_of_order_blocks() {
        let input = "2024-01-02 a\n支出:餐饮 ¥1\n资产:现金 ¥-1\n\n2024-01-01 b\n支出:餐饮 ¥1\n资产:现金 ¥-1\n";
        let blocks = tokenize(input);
        let mut tree = AccountTree::new();
        assert!(parse_transactions(&blocks, &mut tree).is_err());
    }

    #[test]
    fn extracts_tags_and_inline_date() {
        let input = "2024-01-01 gift <birthday> @2024-01-05\n支出:数码:手机 ¥100\n资产:现金 ¥-100\n";
        let blocks = tokenize(input);
        let mut tree = AccountTree::new();
        let xacts = parse_transactions(&blocks, &mut tree).unwrap();
        let phone_entry = &xacts[0].entries[0];
        assert!(phone_entry.tags.contains("birthday"));
        assert_eq!(phone_entry.time, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn item_kind_synthesizes_virtual_entries() {
        let input = "2024-01-01 phone\n支出:数码 ¥100 A new phone\n资产:现金 ¥-100\n";
        let blocks = tokenize(input);
        let mut tree = AccountTree::new();
        let xacts = parse_transactions(&blocks, &mut tree).unwrap();
        assert_eq!(xacts[0].entries.len(), 4);
        assert!(xacts[0].entries[1].synthetic);
        assert!(xacts[0].entries[2].synthetic);
        // synthetic entries carry the transaction's header description, not
        // the triggering entry's own description.
        assert_eq!(xacts[0].entries[1].description, "phone");
        assert_eq!(xacts[0].entries[2].description, "phone");
    }

    #[test]
    fn no_item_tag_suppresses_synthesis() {
        let input = "2024-01-01 phone <!item>\n支出:数码 ¥100\n资产:现金 ¥-100\n";
        let blocks = tokenize(input);
        let mut tree = AccountTree::new();
        let xacts = parse_transactions(&blocks, &mut tree).unwrap();
        assert_eq!(xacts[0].entries.len(), 2);
    }
}
