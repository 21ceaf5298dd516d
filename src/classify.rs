//! Fixed classification sets from the glossary: item kinds eligible for
//! virtual-entry synthesis, consumable kinds, top-levels that are never
//! suppressed by zero-balance collapsing, and the synthetic inventory unit.

use std::sync::OnceLock;

use regex::Regex;

/// Expense leaf names that trigger item virtual-entry synthesis (§4.3 step 5).
pub const ITEM_KINDS: &[&str] = &["数码", "物品", "衣物服饰", "书籍"];

/// Consumable kinds, a subset of interest for `--monthly`/`--props` framing.
pub const CONSUMABLE_KINDS: &[&str] = &["消耗品", "保健品", "药物"];

/// Top-level account names whose subtrees are never collapsed even when
/// every balance in them is zero.
pub const NEVER_SKIP_TOP_LEVELS: &[&str] = &["保险", "消耗品", "物品"];

/// The expense top-level under which item-kind accounts must live to
/// trigger synthesis.
pub const EXPENSE_TOP_LEVEL: &str = "支出";

/// The liabilities top-level whose `YYMM`-named leaves get a time override.
pub const LIABILITIES_TOP_LEVEL: &str = "负债";

/// The synthetic currency used for item-inventory virtual entries.
pub const SYNTHETIC_UNIT: char = '/';

/// Tag that suppresses virtual-entry synthesis for an entry.
pub const NO_ITEM_TAG: &str = "!item";

/// Fixed sibling-ordering priority for top-level accounts (§4.6 rule 1).
/// Smaller weight sorts first; accounts absent from this table are
/// considered unweighted and sort after any weighted sibling.
pub const TOP_LEVEL_PRIORITY: &[(&str, i32)] = &[
    ("基金", -1),
    ("保险", 1),
    ("消耗品", 2),
    ("不可用资产", 3),
    ("负债", 4),
    ("资产", 5),
];

pub fn top_level_priority(name: &str) -> Option<i32> {
    TOP_LEVEL_PRIORITY
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, w)| *w)
}

pub fn is_item_kind(name: &str) -> bool {
    ITEM_KINDS.contains(&name)
}

pub fn is_never_skip_top_level(name: &str) -> bool {
    NEVER_SKIP_TOP_LEVELS.contains(&name)
}

fn regex_cell(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern is valid"))
}

/// `^[0-9]+\.[0-9]{3}$` — a share-price account name, e.g. `12.340`.
pub fn share_price_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex_cell(&RE, r"^[0-9]+\.[0-9]{3}$")
}

/// `^[0-9x]{4}$` — a year-month ordering token, tolerating a redacted `x`.
pub fn year_month_token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex_cell(&RE, r"^[0-9x]{4}$")
}

/// `^[0-9]{4}$` — a `YYMM` liability leaf name used for inline time override.
pub fn yymm_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex_cell(&RE, r"^[0-9]{4}$")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_lookup() {
        assert_eq!(top_level_priority("基金"), Some(-1));
        assert_eq!(top_level_priority("资产"), Some(5));
        assert_eq!(top_level_priority("其他"), None);
    }

    #[test]
    fn share_price_matches() {
        assert!(share_price_pattern().is_match("12.340"));
        assert!(!share_price_pattern().is_match("12.34"));
    }

    #[test]
    fn year_month_token_tolerates_x() {
        assert!(year_month_token_pattern().is_match("24xx"));
        assert!(year_month_token_pattern().is_match("2407"));
        assert!(!year_month_token_pattern().is_match("240"));
    }
}
