use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

use crate::column::{self, ColumnDef};
use crate::domain::TableFeatures;
use crate::filter::{self, ColumnFilters, FilterValue};
use crate::fuzzy::{Ranker, fuzzy_cmp};
use crate::pagination::Pagination;
use crate::record::{ColumnId, PushAlert};
use crate::reorder::{ColumnOrder, DragEnd};
use crate::sort::{self, Direction, SortState, cell_cmp};
use crate::visibility::ColumnVisibility;

/// Rows that survived filtering, in display order.
#[derive(Debug, Default, Clone)]
pub struct RowModel {
    pub rows: Vec<usize>, // Indices into the record list
    pub ranks: HashMap<usize, BTreeMap<ColumnId, u32>>, // Fuzzy rank per record and column
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub label: String,
    pub span: usize,
    pub placeholder: bool,
}

/// Computes the row and column model of a table from its state. Every state
/// change recomputes the whole model.
pub struct TableEngine {
    records: Arc<Vec<PushAlert>>,
    columns: Vec<ColumnDef>,
    features: TableFeatures,
    filters: ColumnFilters,
    global_filter: String,
    sorting: Option<SortState>,
    order: ColumnOrder,
    visibility: ColumnVisibility,
    pagination: Pagination,
    row_model: RowModel,
}

impl TableEngine {
    pub fn new(
        records: Arc<Vec<PushAlert>>,
        columns: Vec<ColumnDef>,
        features: TableFeatures,
        page_size: usize,
    ) -> Self {
        let order = ColumnOrder::new(columns.iter().map(|c| c.id));
        let mut engine = Self {
            records,
            columns,
            features,
            filters: ColumnFilters::new(),
            global_filter: String::new(),
            sorting: None,
            order,
            visibility: ColumnVisibility::default(),
            pagination: Pagination::new(page_size),
            row_model: RowModel::default(),
        };
        engine.recompute();
        debug!(
            "Table with {} records, {} columns, {} rows per page, {:?}",
            engine.records.len(),
            engine.columns.len(),
            engine.pagination.page_size(),
            engine.features
        );
        engine
    }

    pub fn features(&self) -> &TableFeatures {
        &self.features
    }

    pub fn records(&self) -> &[PushAlert] {
        &self.records
    }

    pub fn record(&self, idx: usize) -> Option<&PushAlert> {
        self.records.get(idx)
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, id: ColumnId) -> Option<&ColumnDef> {
        column::find(&self.columns, id)
    }

    pub fn filters(&self) -> &ColumnFilters {
        &self.filters
    }

    pub fn global_filter(&self) -> &str {
        &self.global_filter
    }

    pub fn sorting(&self) -> Option<SortState> {
        self.sorting
    }

    pub fn visibility(&self) -> &ColumnVisibility {
        &self.visibility
    }

    /// Fuzzy rank of a record on a column, `None` without a search match.
    pub fn rank(&self, idx: usize, column: ColumnId) -> Option<u32> {
        self.row_model.ranks.get(&idx)?.get(&column).copied()
    }

    pub fn filtered_count(&self) -> usize {
        self.row_model.rows.len()
    }

    pub fn page_count(&self) -> usize {
        if self.features.enable_pagination {
            self.pagination.page_count(self.filtered_count())
        } else {
            1
        }
    }

    pub fn page_index(&self) -> usize {
        if self.features.enable_pagination {
            self.pagination.page_index()
        } else {
            0
        }
    }

    /// Record indices of the current page.
    pub fn page_rows(&self) -> &[usize] {
        if self.features.enable_pagination {
            &self.row_model.rows[self.pagination.page_range(self.row_model.rows.len())]
        } else {
            &self.row_model.rows
        }
    }

    /// Visible columns in display order.
    pub fn visible_columns(&self) -> Vec<&ColumnDef> {
        self.order
            .ids()
            .iter()
            .filter(|&&id| self.visibility.is_visible(id))
            .filter_map(|&id| self.column(id))
            .collect()
    }

    /// All columns in display order, hidden ones included.
    pub fn ordered_columns(&self) -> Vec<&ColumnDef> {
        self.order
            .ids()
            .iter()
            .filter_map(|&id| self.column(id))
            .collect()
    }

    /// Header rows, group headers first when enabled. Adjacent columns of the
    /// same group share one group cell, ungrouped columns get a placeholder.
    pub fn header_groups(&self) -> Vec<Vec<HeaderCell>> {
        let visible = self.visible_columns();
        let leaves = visible
            .iter()
            .map(|c| HeaderCell {
                label: c.label.to_string(),
                span: 1,
                placeholder: false,
            })
            .collect();
        if !self.features.group_headers || visible.iter().all(|c| c.group.is_none()) {
            return vec![leaves];
        }

        let mut groups: Vec<HeaderCell> = Vec::new();
        for c in visible.iter() {
            match (groups.last_mut(), c.group) {
                (Some(last), Some(group)) if !last.placeholder && last.label == group => {
                    last.span += 1
                }
                (_, Some(group)) => groups.push(HeaderCell {
                    label: group.to_string(),
                    span: 1,
                    placeholder: false,
                }),
                (_, None) => groups.push(HeaderCell {
                    label: String::new(),
                    span: 1,
                    placeholder: true,
                }),
            }
        }
        vec![groups, leaves]
    }

    /// Options of a select or checkbox filter, derived from the data.
    pub fn filter_options(&self, column: ColumnId) -> Vec<String> {
        filter::unique_options(&self.records, column)
    }

    // -------------------- State changes ---------------------- //

    pub fn set_filter(&mut self, column: ColumnId, value: FilterValue) {
        if !self.features.enable_filter {
            return;
        }
        let variant = self.column(column).and_then(|c| c.filter_variant);
        if variant.is_none() {
            warn!("Column {column} can not be filtered, ignoring {value:?}");
            return;
        }
        debug!("Set filter {column} = {value:?}");
        self.filters.set(column, value);
        self.pagination.first_page();
        self.recompute();
    }

    /// Apply a `column=value` filter given as text, e.g. from the command line.
    /// Unknown columns are ignored.
    pub fn apply_filter_text(&mut self, column: &str, input: &str) -> bool {
        let Some(def) = ColumnId::from_key(column).and_then(|id| self.column(id)) else {
            warn!("Ignoring filter on unknown column \"{column}\"");
            return false;
        };
        let Some(variant) = def.filter_variant else {
            warn!("Ignoring filter on column \"{column}\" without filter");
            return false;
        };
        let id = def.id;
        self.set_filter(id, FilterValue::parse(variant, input));
        true
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.pagination.first_page();
        self.recompute();
    }

    pub fn set_global_filter(&mut self, query: &str) {
        if !self.features.enable_fuzzy_search {
            return;
        }
        debug!("Set global filter {query:?}");
        self.global_filter = query.to_string();
        self.pagination.first_page();
        self.recompute();
    }

    pub fn toggle_sort(&mut self, column: ColumnId) {
        if self.features.enable_sort && self.column(column).is_some() {
            self.sorting = sort::toggle(self.sorting, column);
            self.recompute();
        }
    }

    pub fn set_sort(&mut self, column: ColumnId, direction: Direction) {
        if self.features.enable_sort && self.column(column).is_some() {
            self.sorting = Some(SortState { column, direction });
            self.recompute();
        }
    }

    pub fn apply_drag(&mut self, event: DragEnd) -> bool {
        if !self.features.enable_reorder || !self.order.apply_drag(event) {
            return false;
        }
        debug_assert!(self.order.is_permutation_of(&self.column_ids()));
        true
    }

    pub fn reverse_columns(&mut self) {
        if self.features.enable_reorder {
            self.order.reverse();
        }
    }

    pub fn reset_columns(&mut self) {
        if self.features.enable_reorder {
            self.order.reset();
        }
    }

    pub fn toggle_visibility(&mut self, column: ColumnId) {
        if self.features.enable_visibility_toggle {
            self.visibility.toggle(column);
        }
    }

    pub fn toggle_all_visibility(&mut self) {
        if self.features.enable_visibility_toggle {
            let ids = self.column_ids();
            self.visibility.toggle_all(&ids);
        }
    }

    fn column_ids(&self) -> Vec<ColumnId> {
        self.columns.iter().map(|c| c.id).collect()
    }

    pub fn next_page(&mut self) -> bool {
        self.features.enable_pagination && self.pagination.next_page(self.row_model.rows.len())
    }

    pub fn previous_page(&mut self) -> bool {
        self.features.enable_pagination && self.pagination.previous_page()
    }

    pub fn first_page(&mut self) {
        self.pagination.first_page();
    }

    pub fn last_page(&mut self) {
        if self.features.enable_pagination {
            self.pagination.last_page(self.row_model.rows.len());
        }
    }

    // -------------------- Row model ---------------------- //

    fn recompute(&mut self) {
        let start_time = Instant::now();
        let records = &self.records;

        let mut rows: Vec<usize> = (0..records.len())
            .filter(|&idx| self.filters.matches_record(&records[idx], &self.columns))
            .collect();

        let mut ranks: HashMap<usize, BTreeMap<ColumnId, u32>> = HashMap::new();
        let query = self.global_filter.trim();
        if self.features.enable_fuzzy_search && !query.is_empty() {
            // Rank every column in its own thread
            let per_column: Vec<(ColumnId, Vec<Option<u32>>)> = self
                .columns
                .par_iter()
                .map(|c| {
                    let mut ranker = Ranker::new(query);
                    let column_ranks = rows
                        .iter()
                        .map(|&idx| ranker.rank(&records[idx].value(c.id).display()))
                        .collect();
                    (c.id, column_ranks)
                })
                .collect();

            for (column, column_ranks) in per_column {
                for (pos, rank) in column_ranks.into_iter().enumerate() {
                    if let Some(rank) = rank {
                        ranks.entry(rows[pos]).or_default().insert(column, rank);
                    }
                }
            }
            rows.retain(|idx| ranks.contains_key(idx));
        }

        if self.features.enable_sort
            && let Some(sorting) = self.sorting
            && let Some(def) = column::find(&self.columns, sorting.column)
        {
            let fuzzy = def.fuzzy_sort && !ranks.is_empty();
            let rank_of = |idx: usize| ranks.get(&idx).and_then(|r| r.get(&def.id)).copied();
            rows.sort_by(|&a, &b| {
                let va = records[a].value(def.id);
                let vb = records[b].value(def.id);
                let ord = if fuzzy {
                    fuzzy_cmp(rank_of(a), &va.display(), rank_of(b), &vb.display())
                } else {
                    cell_cmp(&va, &vb)
                };
                match sorting.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        self.pagination.clamp(rows.len());
        trace!(
            "Recomputed row model: {} of {} rows in {}us",
            rows.len(),
            records.len(),
            start_time.elapsed().as_micros()
        );
        self.row_model = RowModel { rows, ranks };
    }
}
