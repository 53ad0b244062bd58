use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::column::{self, ColumnDef};
use crate::record::{CellValue, ColumnId, PushAlert};

/// How a column is filtered and which control edits the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVariant {
    Text,
    Range,
    Select,
    Checkbox,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Range(Option<f64>, Option<f64>),
    Select(String),
    Checkbox(BTreeSet<String>),
}

impl FilterValue {
    /// An empty filter value matches every row and is never stored.
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Text(s) | FilterValue::Select(s) => s.is_empty(),
            FilterValue::Range(min, max) => min.is_none() && max.is_none(),
            FilterValue::Checkbox(set) => set.is_empty(),
        }
    }

    /// Parse raw editor input for the given variant. Never fails, input that
    /// can not be understood turns into "no constraint".
    pub fn parse(variant: FilterVariant, input: &str) -> FilterValue {
        match variant {
            FilterVariant::Text => FilterValue::Text(input.to_string()),
            FilterVariant::Range => {
                let (min, max) = parse_range(input);
                FilterValue::Range(min, max)
            }
            FilterVariant::Select => FilterValue::Select(input.trim().to_string()),
            FilterVariant::Checkbox => FilterValue::Checkbox(
                input
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
        }
    }

    /// Inverse of `parse`, used to prefill the filter editor.
    pub fn to_input(&self) -> String {
        match self {
            FilterValue::Text(s) | FilterValue::Select(s) => s.clone(),
            FilterValue::Range(min, max) => {
                let fmt = |b: &Option<f64>| b.map(|v| v.to_string()).unwrap_or_default();
                format!("{}..{}", fmt(min), fmt(max))
            }
            FilterValue::Checkbox(set) => set.iter().cloned().collect::<Vec<_>>().join(","),
        }
    }
}

/// A single numeric bound. Empty, unparseable and NaN input is no bound.
pub fn parse_bound(input: &str) -> Option<f64> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    match input.parse::<f64>() {
        Ok(v) if !v.is_nan() => Some(v),
        _ => {
            debug!("Ignoring invalid range bound {input:?}");
            None
        }
    }
}

/// Parse `min..max`, either side may be omitted. A bare number is a lower bound.
pub fn parse_range(input: &str) -> (Option<f64>, Option<f64>) {
    match input.split_once("..") {
        Some((min, max)) => (parse_bound(min), parse_bound(max)),
        None => (parse_bound(input), None),
    }
}

/// Decide whether a cell passes the filter.
pub fn matches(value: &CellValue, filter: &FilterValue) -> bool {
    match filter {
        FilterValue::Text(needle) => {
            needle.is_empty()
                || value
                    .display()
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
        }
        FilterValue::Range(min, max) => {
            let (mut min, mut max) = (*min, *max);
            if min.is_none() && max.is_none() {
                return true;
            }
            if let (Some(lo), Some(hi)) = (min, max)
                && lo > hi
            {
                (min, max) = (Some(hi), Some(lo));
            }
            match value.as_number() {
                Some(v) => min.is_none_or(|lo| v >= lo) && max.is_none_or(|hi| v <= hi),
                None => false,
            }
        }
        FilterValue::Select(selected) => {
            selected.is_empty()
                || match value {
                    CellValue::Tags(tags) => tags.iter().any(|t| t == selected),
                    other => other.display() == *selected,
                }
        }
        FilterValue::Checkbox(set) => {
            set.is_empty()
                || match value {
                    CellValue::Tags(tags) => tags.iter().any(|t| set.contains(t)),
                    other => set.contains(&other.display()),
                }
        }
    }
}

/// Filter state of all columns of a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnFilters {
    filters: BTreeMap<ColumnId, FilterValue>,
}

impl ColumnFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a filter, an empty value removes the filter of the column.
    pub fn set(&mut self, column: ColumnId, value: FilterValue) {
        if value.is_empty() {
            self.filters.remove(&column);
        } else {
            self.filters.insert(column, value);
        }
    }

    pub fn get(&self, column: ColumnId) -> Option<&FilterValue> {
        self.filters.get(&column)
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// A record passes when every filter of a known column matches.
    /// Filters on columns the table does not have are ignored.
    pub fn matches_record(&self, record: &PushAlert, columns: &[ColumnDef]) -> bool {
        self.filters.iter().all(|(&id, filter)| {
            if column::find(columns, id).is_none() {
                return true;
            }
            matches(&record.value(id), filter)
        })
    }
}

/// Unique values of a column in first seen order, tags are flattened.
pub fn unique_options(records: &[PushAlert], column: ColumnId) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut options = Vec::new();
    let mut push = |value: String| {
        if seen.insert(value.clone()) {
            options.push(value);
        }
    };
    for record in records {
        match record.value(column) {
            CellValue::Tags(tags) => tags.into_iter().for_each(&mut push),
            other => push(other.display()),
        }
    }
    options
}
