use std::fmt;
use std::io::Error;

use clap::ValueEnum;
use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

use crate::record::ColumnId;

#[derive(Debug)]
pub enum AVError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    InvalidArgument(String),
}

impl fmt::Display for AVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AVError::IoError(e) => write!(f, "I/O error: {e}"),
            AVError::PolarsError(e) => write!(f, "Could not read data: {e}"),
            AVError::LoadingFailed(msg) => write!(f, "Loading failed: {msg}"),
            AVError::FileNotFound => f.write_str("File not found"),
            AVError::PermissionDenied => f.write_str("Permission denied"),
            AVError::UnknownFileType => {
                f.write_str("Unknown file type, expected csv, parquet or arrow")
            }
            AVError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
        }
    }
}

impl std::error::Error for AVError {}

impl From<Error> for AVError {
    fn from(err: Error) -> Self {
        AVError::IoError(err)
    }
}

impl From<PolarsError> for AVError {
    fn from(err: PolarsError) -> Self {
        AVError::PolarsError(err)
    }
}

/// Which table features are switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Setters)]
pub struct TableFeatures {
    pub enable_sort: bool,
    pub enable_filter: bool,
    pub enable_reorder: bool,
    pub enable_visibility_toggle: bool,
    pub enable_pagination: bool,
    pub enable_fuzzy_search: bool,
    pub group_headers: bool,
}

impl Default for TableFeatures {
    fn default() -> Self {
        Variant::Full.features()
    }
}

/// Feature presets, one per demo table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    Full,
    ColumnOrder,
    ColumnDnd,
    ColumnFilters,
    FuzzyFilters,
    FiltersVisibility,
    FiltersVisibilityDnd,
}

impl Variant {
    pub fn features(&self) -> TableFeatures {
        let none = TableFeatures {
            enable_sort: false,
            enable_filter: false,
            enable_reorder: false,
            enable_visibility_toggle: false,
            enable_pagination: false,
            enable_fuzzy_search: false,
            group_headers: false,
        };
        match self {
            Variant::Full => none
                .enable_sort(true)
                .enable_filter(true)
                .enable_reorder(true)
                .enable_visibility_toggle(true)
                .enable_pagination(true)
                .enable_fuzzy_search(true),
            Variant::ColumnOrder => none
                .enable_reorder(true)
                .enable_visibility_toggle(true)
                .group_headers(true),
            Variant::ColumnDnd => none.enable_reorder(true).enable_pagination(true),
            Variant::ColumnFilters => none.enable_filter(true).enable_pagination(true),
            Variant::FuzzyFilters => none
                .enable_sort(true)
                .enable_pagination(true)
                .enable_fuzzy_search(true),
            Variant::FiltersVisibility => none
                .enable_sort(true)
                .enable_filter(true)
                .enable_visibility_toggle(true)
                .enable_pagination(true),
            Variant::FiltersVisibilityDnd => none
                .enable_filter(true)
                .enable_reorder(true)
                .enable_visibility_toggle(true)
                .enable_pagination(true),
        }
    }
}

#[derive(Debug, Clone, Setters)]
pub struct AVConfig {
    pub event_poll_time: u64,
    pub debounce_ms: u64,
    pub page_size: usize,
    pub max_column_width: usize,
    pub features: TableFeatures,
    /// Filters applied at startup, as `column=value` pairs.
    pub initial_filters: Vec<(String, String)>,
}

impl Default for AVConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            debounce_ms: crate::debounce::DEFAULT_DEBOUNCE.as_millis() as u64,
            page_size: crate::pagination::DEFAULT_PAGE_SIZE,
            max_column_width: 24,
            features: TableFeatures::default(),
            initial_filters: Vec::new(),
        }
    }
}

/// Parse a `column=value` command line filter.
pub fn parse_filter_arg(arg: &str) -> Result<(String, String), AVError> {
    match arg.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), value.to_string()))
        }
        _ => Err(AVError::InvalidArgument(format!(
            "expected COLUMN=VALUE, got \"{arg}\""
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CMDMode {
    Filter(ColumnId),
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    NextPage,
    PreviousPage,
    FirstPage,
    LastPage,
    ToggleSort,
    SortAscending,
    SortDescending,
    EditFilter,
    ClearFilters,
    Search,
    ColumnPanel,
    ToggleSelected,
    ToggleAllColumns,
    GrabColumn,
    ReverseColumns,
    ResetColumns,
    CopyCell,
    CopyRow,
    Help,
    Enter,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
q          quit
arrows/hjkl move
n / p      next / previous page
g / G      first / last page
s          toggle sort of column
a / d      sort ascending / descending
f          edit filter of column
F          clear all filters
/          fuzzy search all columns
c          show / hide columns
m          grab column, move, Enter drops
R          reverse column order
0          reset column order
y / Y      copy cell / row
?          this help
Esc        close / cancel";
