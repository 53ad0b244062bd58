use std::fmt;

/// A single push alert. Records are never mutated after loading, views only
/// hold indices into the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PushAlert {
    pub id: u32,
    pub title: String,
    pub frequency: String,
    pub status: String,
    pub start_date: String,
    pub end_date: String,
    pub os: Vec<String>,
    pub sent: u64,
    pub open_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnId {
    Id,
    Title,
    Frequency,
    Status,
    StartDate,
    EndDate,
    Os,
    Sent,
    OpenRatio,
}

impl ColumnId {
    pub const ALL: [ColumnId; 9] = [
        ColumnId::Id,
        ColumnId::Title,
        ColumnId::Frequency,
        ColumnId::Status,
        ColumnId::StartDate,
        ColumnId::EndDate,
        ColumnId::Os,
        ColumnId::Sent,
        ColumnId::OpenRatio,
    ];

    /// Identifier as used in data files and on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            ColumnId::Id => "id",
            ColumnId::Title => "title",
            ColumnId::Frequency => "frequency",
            ColumnId::Status => "status",
            ColumnId::StartDate => "startDate",
            ColumnId::EndDate => "endDate",
            ColumnId::Os => "OS",
            ColumnId::Sent => "sent",
            ColumnId::OpenRatio => "openRatio",
        }
    }

    /// Case insensitive lookup, unknown identifiers yield `None`.
    pub fn from_key(key: &str) -> Option<ColumnId> {
        ColumnId::ALL
            .into_iter()
            .find(|c| c.key().eq_ignore_ascii_case(key.trim()))
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Tags(Vec<String>),
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Tags(tags) => tags.join(" "),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl PushAlert {
    pub fn value(&self, column: ColumnId) -> CellValue {
        match column {
            ColumnId::Id => CellValue::Number(self.id as f64),
            ColumnId::Title => CellValue::Text(self.title.clone()),
            ColumnId::Frequency => CellValue::Text(self.frequency.clone()),
            ColumnId::Status => CellValue::Text(self.status.clone()),
            ColumnId::StartDate => CellValue::Text(self.start_date.clone()),
            ColumnId::EndDate => CellValue::Text(self.end_date.clone()),
            ColumnId::Os => CellValue::Tags(self.os.clone()),
            ColumnId::Sent => CellValue::Number(self.sent as f64),
            ColumnId::OpenRatio => CellValue::Number(self.open_ratio),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_keys_roundtrip_case_insensitive() {
        assert_eq!(ColumnId::from_key("openratio"), Some(ColumnId::OpenRatio));
        assert_eq!(ColumnId::from_key(" OS "), Some(ColumnId::Os));
        assert_eq!(ColumnId::from_key("nope"), None);
    }

    #[test]
    fn cell_display() {
        assert_eq!(CellValue::Number(42.0).display(), "42");
        assert_eq!(CellValue::Number(0.25).display(), "0.25");
        assert_eq!(
            CellValue::Tags(vec!["iOS".into(), "Web".into()]).display(),
            "iOS Web"
        );
    }
}
