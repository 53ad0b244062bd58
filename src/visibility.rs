use std::collections::BTreeSet;

use crate::record::ColumnId;

/// Hidden columns. Columns not listed are visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnVisibility {
    hidden: BTreeSet<ColumnId>,
}

impl ColumnVisibility {
    pub fn is_visible(&self, column: ColumnId) -> bool {
        !self.hidden.contains(&column)
    }

    pub fn set_visible(&mut self, column: ColumnId, visible: bool) {
        if visible {
            self.hidden.remove(&column);
        } else {
            self.hidden.insert(column);
        }
    }

    pub fn toggle(&mut self, column: ColumnId) -> bool {
        let visible = !self.is_visible(column);
        self.set_visible(column, visible);
        visible
    }

    pub fn all_visible(&self, columns: &[ColumnId]) -> bool {
        columns.iter().all(|&c| self.is_visible(c))
    }

    /// Hide everything if all columns are visible, otherwise show everything.
    pub fn toggle_all(&mut self, columns: &[ColumnId]) {
        if self.all_visible(columns) {
            self.hidden.extend(columns.iter().copied());
        } else {
            self.hidden.clear();
        }
    }
}
