//! Splits raw ledger text into blank-line-delimited blocks, preserving their
//! original file order (the parser relies on this order to catch
//! out-of-sequence headers). [`sorted_by_date`] produces the separate
//! chronological order used only for the canonical reformatter's output.

/// A contiguous run of non-blank lines, with the source line number of its
/// first line (1-based) and the raw header-date token (the first
/// whitespace-separated token of the first line).
#[derive(Debug, Clone)]
pub struct Block {
    pub header_date: String,
    pub start_line: usize,
    pub lines: Vec<String>,
}

impl Block {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

fn normalize_newlines(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

/// Tokenizes `input` into blocks, in the order they appear in the file.
pub fn tokenize(input: &str) -> Vec<Block> {
    let normalized = normalize_newlines(input);
    let mut blocks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_start = 0usize;

    for (idx, raw_line) in normalized.split('\n').enumerate() {
        let line_no = idx + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                blocks.push(finish_block(current_start, std::mem::take(&mut current)));
            }
            continue;
        }
        if current.is_empty() {
            current_start = line_no;
        }
        current.push(trimmed.to_string());
    }
    if !current.is_empty() {
        blocks.push(finish_block(current_start, current));
    }

    blocks
}

/// Stably reorders `blocks` by `(header_date, start_line)`. Dates use
/// fixed-width `YYYY-MM-DD`, so lexicographic string order on `header_date`
/// is chronological order. Used only to produce the reformatter's canonical
/// output; the parser works on file order instead so that an out-of-sequence
/// header is still caught rather than silently reordered away.
pub fn sorted_by_date(blocks: &[Block]) -> Vec<Block> {
    let mut out = blocks.to_vec();
    out.sort_by(|a, b| {
        a.header_date
            .cmp(&b.header_date)
            .then(a.start_line.cmp(&b.start_line))
    });
    out
}

fn finish_block(start_line: usize, lines: Vec<String>) -> Block {
    let header_date = lines[0]
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string();
    Block {
        header_date,
        start_line,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_on_blank_lines() {
        let input = "2024-01-01 a\nacc 1\n\n2024-01-02 b\nacc2 2\n";
        let blocks = tokenize(input);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].header_date, "2024-01-01");
        assert_eq!(blocks[1].header_date, "2024-01-02");
    }

    #[test]
    fn tokenize_preserves_file_order() {
        let input = "2024-02-01 late\nacc 1\n\n2024-01-01 early\nacc 1\n";
        let blocks = tokenize(input);
        assert_eq!(blocks[0].header_date, "2024-02-01");
        assert_eq!(blocks[1].header_date, "2024-01-01");
    }

    #[test]
    fn sorted_by_date_reorders_stably() {
        let input = "2024-02-01 late\nacc 1\n\n2024-01-01 early\nacc 1\n";
        let blocks = sorted_by_date(&tokenize(input));
        assert_eq!(blocks[0].header_date, "2024-01-01");
        assert_eq!(blocks[1].header_date, "2024-02-01");
    }

    #[test]
    fn normalizes_crlf() {
        let input = "2024-01-01 a\r\nacc 1\r\n";
        let blocks = tokenize(input);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines[1], "acc 1");
    }

    #[test]
    fn blank_only_input_yields_no_blocks() {
        assert!(tokenize("\n\n  \n").is_empty());
    }
}
