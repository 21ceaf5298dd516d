//! The background canonical-reformat pass: reflows the original ledger text
//! into column-aligned, block-sorted form and rewrites the file atomically
//! if that differs from the bytes on disk. Runs on its own thread, joined at
//! the end of `main`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use console::measure_text_width;

use crate::tokenizer::{self, Block};

/// Builds the canonical text for a set of tokenized blocks, reordered
/// chronologically: each entry line's fields padded to the widest value
/// within its block (in terminal cells), blocks separated by one blank line.
pub fn canonicalize(blocks: &[Block]) -> String {
    let blocks = tokenizer::sorted_by_date(blocks);
    let mut out = String::new();
    for block in &blocks {
        if block.lines.is_empty() {
            continue;
        }
        out.push_str(&block.lines[0]);
        out.push('\n');

        let entry_lines = &block.lines[1..];
        let fields: Vec<Vec<&str>> = entry_lines
            .iter()
            .map(|l| l.split_whitespace().collect())
            .collect();
        let col_widths = column_widths(&fields);

        for row in &fields {
            let mut line = String::new();
            for (i, field) in row.iter().enumerate() {
                if i > 0 {
                    line.push(' ');
                }
                line.push_str(field);
                if i + 1 < row.len() {
                    let w = measure_text_width(field);
                    let target = col_widths.get(i).copied().unwrap_or(w);
                    for _ in w..target {
                        line.push(' ');
                    }
                }
            }
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

fn column_widths(rows: &[Vec<&str>]) -> Vec<usize> {
    let mut widths = Vec::new();
    for row in rows {
        for (i, field) in row.iter().enumerate() {
            let w = measure_text_width(field);
            if i >= widths.len() {
                widths.push(w);
            } else if w > widths[i] {
                widths[i] = w;
            }
        }
    }
    widths
}

/// Spawns the background reformatter. Shares only immutable data with the
/// core: a cloned path, the original bytes, and the tokenized blocks.
pub fn spawn(path: PathBuf, original: Arc<String>, blocks: Arc<Vec<Block>>) -> JoinHandle<Option<String>> {
    thread::spawn(move || {
        let canonical = canonicalize(&blocks);
        if canonical.trim_end() == original.trim_end() {
            return None;
        }
        match write_atomically(&path, &canonical) {
            Ok(()) => Some(format!("formatted {}", path.display())),
            Err(e) => Some(format!("failed to format {}: {e}", path.display())),
        }
    })
}

fn write_atomically(path: &Path, contents: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp-fmt");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use pretty_assertions::assert_eq;

    #[test]
    fn canonicalize_pads_entry_columns() {
        let input = "2024-01-01 lunch\n支出 ¥5\n资产:现金:钱包很长 ¥-5\n";
        let blocks = tokenize(input);
        let canonical = canonicalize(&blocks);
        assert!(canonical.starts_with("2024-01-01 lunch\n"));
        assert!(canonical.ends_with("\n\n") || canonical.ends_with('\n'));
    }

    #[test]
    fn unchanged_input_is_not_rewritten() {
        let input = "2024-01-01 a\nacc 1\n";
        let blocks = tokenize(input);
        let canonical = canonicalize(&blocks);
        assert_eq!(canonical.trim_end(), "2024-01-01 a\nacc 1".trim_end());
    }
}
