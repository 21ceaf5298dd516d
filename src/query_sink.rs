//! Loads parsed transactions into an embedded, ephemeral relational engine
//! and installs a fixed catalog of named views. Stands in for the source
//! system's `initdb`/`postgres` process pair with an in-process `rusqlite`
//! connection; schema and view intent are carried over.

use rusqlite::Connection;

use crate::account::AccountTree;
use crate::error::{Kind, LedgerError};
use crate::transaction::Transaction;

const SCHEMA: &str = "
CREATE TABLE entries (
    id INTEGER PRIMARY KEY,
    transaction_id INTEGER NOT NULL,
    transaction_description TEXT NOT NULL,
    date TEXT NOT NULL,
    account TEXT NOT NULL,
    currency TEXT NOT NULL,
    amount REAL NOT NULL,
    description TEXT NOT NULL
);
CREATE TABLE entry_accounts (
    entry_id INTEGER NOT NULL,
    depth INTEGER NOT NULL,
    name TEXT NOT NULL
);
";

/// The fixed catalog of named views installed after the entries load,
/// mirroring the reporting surface the original ephemeral database exposed
/// for ad-hoc querying.
pub const VIEWS: &[(&str, &str)] = &[
    (
        "things",
        "CREATE VIEW things AS SELECT * FROM entries WHERE account LIKE '物品%'",
    ),
    (
        "consumables",
        "CREATE VIEW consumables AS SELECT * FROM entries WHERE account LIKE '消耗品%' OR account LIKE '保健品%' OR account LIKE '药物%'",
    ),
    (
        "yearly",
        "CREATE VIEW yearly AS SELECT substr(date,1,4) AS period, currency, sum(amount) AS total FROM entries GROUP BY period, currency",
    ),
    (
        "monthly",
        "CREATE VIEW monthly AS SELECT substr(date,1,7) AS period, currency, sum(amount) AS total FROM entries GROUP BY period, currency",
    ),
    (
        "weekly",
        "CREATE VIEW weekly AS SELECT strftime('%Y-%W', date) AS period, currency, sum(amount) AS total FROM entries GROUP BY period, currency",
    ),
    (
        "daily",
        "CREATE VIEW daily AS SELECT date AS period, currency, sum(amount) AS total FROM entries GROUP BY period, currency",
    ),
    (
        "yearly_expenses",
        "CREATE VIEW yearly_expenses AS SELECT substr(date,1,4) AS period, currency, sum(amount) AS total FROM entries WHERE account LIKE '支出%' GROUP BY period, currency",
    ),
    (
        "balance_sheet",
        "CREATE VIEW balance_sheet AS SELECT account, currency, sum(amount) AS total FROM entries WHERE account LIKE '资产%' OR account LIKE '负债%' GROUP BY account, currency",
    ),
    (
        "net_asset_changes",
        "CREATE VIEW net_asset_changes AS SELECT substr(date,1,7) AS period, currency, sum(amount) AS total FROM entries WHERE account LIKE '资产%' GROUP BY period, currency",
    ),
    (
        "assurance",
        "CREATE VIEW assurance AS SELECT * FROM entries WHERE account LIKE '保险%'",
    ),
];

/// Opens an in-memory database, creates the schema, loads every entry of
/// every transaction, and installs the view catalog.
pub fn load(tree: &AccountTree, transactions: &[Transaction]) -> Result<Connection, LedgerError> {
    let conn = Connection::open_in_memory()
        .map_err(|e| LedgerError::with_source(Kind::ReadInput, "opening query-view sink", e))?;
    conn.execute_batch(SCHEMA)
        .map_err(|e| LedgerError::with_source(Kind::ReadInput, "creating sink schema", e))?;

    for (xact_id, xact) in transactions.iter().enumerate() {
        for entry in &xact.entries {
            let account_path = tree.path_string(entry.account);
            let amount_f64 = num_traits::ToPrimitive::to_f64(&entry.amount).unwrap_or(0.0);
            conn.execute(
                "INSERT INTO entries (transaction_id, transaction_description, date, account, currency, amount, description) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    xact_id as i64,
                    xact.description,
                    entry.time.format("%Y-%m-%d").to_string(),
                    account_path,
                    entry.currency.to_string(),
                    amount_f64,
                    entry.description,
                ],
            )
            .map_err(|e| LedgerError::with_source(Kind::ReadInput, "loading entry into sink", e))?;

            let entry_id = conn.last_insert_rowid();
            for (depth, part) in crate::account::split_path(&account_path).iter().enumerate() {
                conn.execute(
                    "INSERT INTO entry_accounts (entry_id, depth, name) VALUES (?1, ?2, ?3)",
                    rusqlite::params![entry_id, depth as i64, part],
                )
                .map_err(|e| LedgerError::with_source(Kind::ReadInput, "loading entry_accounts", e))?;
            }
        }
    }

    for (_, sql) in VIEWS {
        conn.execute_batch(sql)
            .map_err(|e| LedgerError::with_source(Kind::ReadInput, "installing view", e))?;
    }

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountTree;
    use crate::balance::accumulate;
    use crate::tokenizer::tokenize;
    use crate::transaction::parse_transactions;

    #[test]
    fn loads_entries_and_installs_views() {
        let input = "2024-01-01 lunch\n支出:餐饮 ¥50\n资产:现金 ¥-50\n";
        let blocks = tokenize(input);
        let mut tree = AccountTree::new();
        let xacts = parse_transactions(&blocks, &mut tree).unwrap();
        accumulate(&mut tree, &xacts).unwrap();

        let conn = load(&tree, &xacts).unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM entries", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);

        let monthly_count: i64 = conn
            .query_row("SELECT count(*) FROM monthly", [], |r| r.get(0))
            .unwrap();
        assert!(monthly_count >= 1);
    }
}
