use crate::filter::FilterVariant;
use crate::record::ColumnId;

/// Per column configuration handed to the table engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub id: ColumnId,
    pub label: &'static str,
    pub group: Option<&'static str>,
    pub filter_variant: Option<FilterVariant>,
    /// Sort by fuzzy rank first when a global search is active.
    pub fuzzy_sort: bool,
}

impl ColumnDef {
    fn new(id: ColumnId, label: &'static str, group: &'static str) -> Self {
        Self {
            id,
            label,
            group: Some(group),
            filter_variant: None,
            fuzzy_sort: false,
        }
    }

    fn filter(mut self, variant: FilterVariant) -> Self {
        self.filter_variant = Some(variant);
        self
    }

    fn fuzzy(mut self) -> Self {
        self.fuzzy_sort = true;
        self
    }
}

pub fn default_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new(ColumnId::Title, "Title", "Alert Details")
            .filter(FilterVariant::Text)
            .fuzzy(),
        ColumnDef::new(ColumnId::Frequency, "Frequency", "Alert Details")
            .filter(FilterVariant::Select)
            .fuzzy(),
        ColumnDef::new(ColumnId::Status, "Status", "Alert Details").filter(FilterVariant::Select),
        ColumnDef::new(ColumnId::StartDate, "Start Date", "Dates").filter(FilterVariant::Text),
        ColumnDef::new(ColumnId::EndDate, "End Date", "Dates").filter(FilterVariant::Text),
        ColumnDef::new(ColumnId::Sent, "Sent", "Metrics").filter(FilterVariant::Range),
        ColumnDef::new(ColumnId::OpenRatio, "Open Ratio", "Metrics").filter(FilterVariant::Range),
        ColumnDef::new(ColumnId::Os, "OS", "Platform").filter(FilterVariant::Checkbox),
    ]
}

pub fn find(columns: &[ColumnDef], id: ColumnId) -> Option<&ColumnDef> {
    columns.iter().find(|c| c.id == id)
}
