use tracing::{debug, warn};

use crate::record::ColumnId;

/// Emitted when a dragged column is dropped onto another column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragEnd {
    pub active: ColumnId,
    pub over: ColumnId,
}

/// Display order of the columns. Always a permutation of the initial ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnOrder {
    initial: Vec<ColumnId>,
    order: Vec<ColumnId>,
}

impl ColumnOrder {
    pub fn new(ids: impl IntoIterator<Item = ColumnId>) -> Self {
        let mut initial: Vec<ColumnId> = Vec::new();
        for id in ids {
            if !initial.contains(&id) {
                initial.push(id);
            }
        }
        Self {
            order: initial.clone(),
            initial,
        }
    }

    pub fn ids(&self) -> &[ColumnId] {
        &self.order
    }

    pub fn position(&self, id: ColumnId) -> Option<usize> {
        self.order.iter().position(|&c| c == id)
    }

    /// Move `active` to the current index of `target`, shifting the columns
    /// in between by one. Returns false and leaves the order untouched when
    /// the ids are equal or one of them is not part of the order.
    pub fn move_column(&mut self, active: ColumnId, target: ColumnId) -> bool {
        if active == target {
            return false;
        }
        let (Some(from), Some(to)) = (self.position(active), self.position(target)) else {
            warn!("Ignoring move of {active} onto {target}, unknown column");
            return false;
        };
        let moved = self.order.remove(from);
        self.order.insert(to, moved);
        let order = &self.order;
        debug!("Moved column {active} from {from} to {to}: {order:?}");
        true
    }

    pub fn apply_drag(&mut self, event: DragEnd) -> bool {
        self.move_column(event.active, event.over)
    }

    /// Shuffle action of the column order demo.
    pub fn reverse(&mut self) {
        self.order.reverse();
    }

    pub fn reset(&mut self) {
        self.order = self.initial.clone();
    }

    pub fn is_permutation_of(&self, ids: &[ColumnId]) -> bool {
        self.order.len() == ids.len() && ids.iter().all(|id| self.order.contains(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ColumnId::*;

    const IDS: [ColumnId; 8] = [
        Title, Frequency, Status, StartDate, EndDate, Os, Sent, OpenRatio,
    ];

    fn order() -> ColumnOrder {
        ColumnOrder::new(IDS)
    }

    fn without(ids: &[ColumnId], moved: ColumnId) -> Vec<ColumnId> {
        ids.iter().copied().filter(|&c| c != moved).collect()
    }

    fn assert_relative_order_kept(before: &[ColumnId], after: &[ColumnId], moved: ColumnId) {
        assert_eq!(without(before, moved), without(after, moved));
    }

    #[test]
    fn move_forward_lands_on_target_index() {
        let mut o = order();
        let before = o.ids().to_vec();
        assert!(o.move_column(Frequency, EndDate));
        let expected = [
            Title, Status, StartDate, EndDate, Frequency, Os, Sent, OpenRatio,
        ];
        assert_eq!(o.ids(), &expected);
        assert!(o.is_permutation_of(&before));
        assert_relative_order_kept(&before, o.ids(), Frequency);
    }

    #[test]
    fn move_backward_lands_on_target_index() {
        let mut o = order();
        let before = o.ids().to_vec();
        assert!(o.move_column(OpenRatio, Frequency));
        let expected = [
            Title, OpenRatio, Frequency, Status, StartDate, EndDate, Os, Sent,
        ];
        assert_eq!(o.ids(), &expected);
        assert_relative_order_kept(&before, o.ids(), OpenRatio);
    }

    #[test]
    fn every_move_keeps_a_permutation() {
        let all = order().ids().to_vec();
        for &a in &all {
            for &b in &all {
                let mut o = order();
                let target_index = o.position(b).unwrap();
                o.move_column(a, b);
                assert!(o.is_permutation_of(&all));
                assert_eq!(o.position(a), Some(target_index));
                assert_relative_order_kept(&all, o.ids(), a);
            }
        }
    }

    #[test]
    fn same_column_is_a_noop() {
        let mut o = order();
        let same = DragEnd {
            active: Sent,
            over: Sent,
        };
        assert!(!o.apply_drag(same));
        assert_eq!(o, order());
    }

    #[test]
    fn unknown_column_is_ignored() {
        let mut o = ColumnOrder::new([Title, Status]);
        assert!(!o.move_column(Sent, Title));
        assert!(!o.move_column(Title, Sent));
        assert_eq!(o.ids(), &[Title, Status]);
    }

    #[test]
    fn duplicates_are_dropped_on_creation() {
        let o = ColumnOrder::new([Title, Status, Title]);
        assert_eq!(o.ids(), &[Title, Status]);
    }

    #[test]
    fn reverse_and_reset() {
        let mut o = order();
        o.reverse();
        assert_eq!(o.ids()[0], OpenRatio);
        o.move_column(Title, Sent);
        o.reset();
        assert_eq!(o, order());
    }
}
