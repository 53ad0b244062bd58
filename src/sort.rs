use std::cmp::Ordering;

use crate::record::{CellValue, ColumnId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: ColumnId,
    pub direction: Direction,
}

/// Next sort state when the header of `column` is toggled:
/// none -> ascending -> descending -> none.
pub fn toggle(current: Option<SortState>, column: ColumnId) -> Option<SortState> {
    match current {
        Some(SortState {
            column: c,
            direction: Direction::Ascending,
        }) if c == column => Some(SortState {
            column,
            direction: Direction::Descending,
        }),
        Some(SortState {
            column: c,
            direction: Direction::Descending,
        }) if c == column => None,
        _ => Some(SortState {
            column,
            direction: Direction::Ascending,
        }),
    }
}

/// Natural ordering: runs of digits compare numerically, everything else
/// compares case-insensitively.
pub fn alphanumeric_cmp(a: &str, b: &str) -> Ordering {
    let chunks_a = chunks(a);
    let chunks_b = chunks(b);
    for (ca, cb) in chunks_a.iter().zip(chunks_b.iter()) {
        let ord = match (ca.parse::<u128>(), cb.parse::<u128>()) {
            (Ok(na), Ok(nb)) => na.cmp(&nb),
            _ => ca.to_lowercase().cmp(&cb.to_lowercase()),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    chunks_a.len().cmp(&chunks_b.len())
}

fn chunks(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut digits: Option<bool> = None;
    for (idx, chr) in s.char_indices() {
        let is_digit = chr.is_ascii_digit();
        if let Some(d) = digits
            && d != is_digit
        {
            out.push(&s[start..idx]);
            start = idx;
        }
        digits = Some(is_digit);
    }
    if start < s.len() {
        out.push(&s[start..]);
    }
    out
}

/// Compare two cells of the same column, numbers numerically, everything
/// else alphanumerically.
pub fn cell_cmp(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Number(x), CellValue::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        _ => alphanumeric_cmp(&a.display(), &b.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_cycles_through_states() {
        let s = toggle(None, ColumnId::Sent);
        assert_eq!(s.map(|s| s.direction), Some(Direction::Ascending));
        let s = toggle(s, ColumnId::Sent);
        assert_eq!(s.map(|s| s.direction), Some(Direction::Descending));
        assert_eq!(toggle(s, ColumnId::Sent), None);
    }

    #[test]
    fn toggle_on_other_column_starts_ascending() {
        let s = toggle(None, ColumnId::Sent);
        let s = toggle(s, ColumnId::Title).unwrap();
        assert_eq!(s.column, ColumnId::Title);
        assert_eq!(s.direction, Direction::Ascending);
    }

    #[test]
    fn alphanumeric_compares_digit_runs_as_numbers() {
        assert_eq!(alphanumeric_cmp("item 2", "item 10"), Ordering::Less);
        assert_eq!(alphanumeric_cmp("2024-01-05", "2024-01-31"), Ordering::Less);
        assert_eq!(alphanumeric_cmp("abc", "ABC"), Ordering::Equal);
        assert_eq!(alphanumeric_cmp("ab", "abc"), Ordering::Less);
        assert_eq!(alphanumeric_cmp("", "a"), Ordering::Less);
    }

    #[test]
    fn numbers_compare_numerically() {
        assert_eq!(
            cell_cmp(&CellValue::Number(9.0), &CellValue::Number(10.0)),
            Ordering::Less
        );
    }
}
