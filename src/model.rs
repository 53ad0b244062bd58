use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

use crate::column::default_columns;
use crate::debounce::Debouncer;
use crate::domain::{AVConfig, AVError, CMDMode, HELP_TEXT, Message};
use crate::filter::{FilterValue, FilterVariant};
use crate::inputter::{InputResult, Inputter};
use crate::record::{ColumnId, PushAlert};
use crate::reorder::DragEnd;
use crate::sort::Direction;
use crate::table::{HeaderCell, TableEngine};

pub const COLUMN_WIDTH_MARGIN: usize = 1;
pub const MIN_COLUMN_WIDTH: usize = 4;

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    CMDINPUT,
    SELECT,
    COLUMNS,
    DRAG,
    POPUP,
}

/// A change held back by the debouncer until typing pauses.
#[derive(Debug, Clone, PartialEq)]
enum PendingInput {
    Filter(ColumnId, FilterValue),
    Search(String),
}

/// Option list of a select or checkbox filter.
struct OptionList {
    column: ColumnId,
    variant: FilterVariant,
    options: Vec<String>,
    curser: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
    pub matched: Vec<bool>, // Cell matched the fuzzy search
    pub sort: Option<Direction>,
    pub filter: Option<String>,
    pub dragged: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PopupItem {
    pub checked: Option<bool>,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PopupView {
    pub title: String,
    pub items: Vec<PopupItem>,
    pub selected: Option<usize>,
}

#[derive(Default, Clone, Debug)]
struct UILayout {
    width: usize,
    height: usize,
}

pub struct UIData {
    pub name: String,
    pub header_groups: Vec<Vec<HeaderCell>>,
    pub table: Vec<ColumnView>,
    pub show_filters: bool,
    pub nrows: usize, // Rows on the current page
    pub selected_row: usize,
    pub selected_column: usize,
    pub page_index: usize,
    pub page_count: usize,
    pub filtered_rows: usize,
    pub total_rows: usize,
    pub global_filter: String,
    pub popup: Option<PopupView>,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub pending_input: bool,
    pub dragging: Option<String>,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            header_groups: Vec::new(),
            table: Vec::new(),
            show_filters: false,
            nrows: 0,
            selected_row: 0,
            selected_column: 0,
            page_index: 0,
            page_count: 1,
            filtered_rows: 0,
            total_rows: 0,
            global_filter: String::new(),
            popup: None,
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            pending_input: false,
            dragging: None,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

pub struct Model {
    config: AVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    table: TableEngine,
    curser_row: usize,    // Row on the current page
    curser_column: usize, // Index into the visible columns
    panel_curser: usize,
    option_list: Option<OptionList>,
    dragged: Option<ColumnId>,
    input: Inputter,
    last_input: InputResult,
    cmd_mode: Option<CMDMode>,
    debouncer: Debouncer<PendingInput>,
    restore: Option<PendingInput>,
    clipboard: Option<Clipboard>,
    uilayout: UILayout,
    uidata: UIData,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(
        config: &AVConfig,
        records: Vec<PushAlert>,
        ui_width: usize,
        ui_height: usize,
    ) -> Result<Self, AVError> {
        let mut table = TableEngine::new(
            Arc::new(records),
            default_columns(),
            config.features,
            config.page_size,
        );
        for (column, value) in config.initial_filters.iter() {
            table.apply_filter_text(column, value);
        }

        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            table,
            curser_row: 0,
            curser_column: 0,
            panel_curser: 0,
            option_list: None,
            dragged: None,
            input: Inputter::default(),
            last_input: InputResult::default(),
            cmd_mode: None,
            debouncer: Debouncer::new(Duration::from_millis(config.debounce_ms)),
            restore: None,
            clipboard: None,
            uilayout: UILayout {
                width: ui_width,
                height: ui_height,
            },
            uidata: UIData::empty(),
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        info!(
            "Showing {} of {} records",
            model.table.filtered_count(),
            model.table.records().len()
        );
        debug!("Debouncing input by {:?}", model.debouncer.delay());
        model.set_status_message("Press ? for help");
        model.refresh();
        Ok(model)
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    /// When the next debounced value is due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// In command input mode the controller forwards raw keys.
    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn quit(&mut self) {
        self.debouncer.cancel();
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), AVError> {
        self.update_at(message, Instant::now())
    }

    /// Handle a message as if it arrived at `now`.
    pub fn update_at(&mut self, message: Option<Message>, now: Instant) -> Result<(), AVError> {
        self.tick(now);

        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveUp => self.move_row(-1),
                    Message::MoveDown => self.move_row(1),
                    Message::MoveLeft => self.move_column(-1),
                    Message::MoveRight => self.move_column(1),
                    Message::NextPage => self.next_page(),
                    Message::PreviousPage => self.previous_page(),
                    Message::FirstPage => {
                        self.table.first_page();
                        self.curser_row = 0;
                    }
                    Message::LastPage => {
                        self.table.last_page();
                        self.curser_row = 0;
                    }
                    Message::ToggleSort => self.sort_current_column(None),
                    Message::SortAscending => self.sort_current_column(Some(Direction::Ascending)),
                    Message::SortDescending => {
                        self.sort_current_column(Some(Direction::Descending))
                    }
                    Message::EditFilter => self.edit_filter(),
                    Message::ClearFilters => {
                        let n = self.table.filters().len();
                        if n > 0 {
                            self.table.clear_filters();
                            self.set_status_message(format!("Cleared {n} filters"));
                        }
                    }
                    Message::Search => self.start_search(),
                    Message::ColumnPanel => self.open_column_panel(),
                    Message::GrabColumn => self.grab_column(),
                    Message::ReverseColumns => self.reverse_columns(),
                    Message::ResetColumns => self.reset_columns(),
                    Message::CopyCell => self.copy_table_cell(),
                    Message::CopyRow => self.copy_table_row(),
                    Message::Help => self.show_help(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::DRAG => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveLeft => self.move_column(-1),
                    Message::MoveRight => self.move_column(1),
                    Message::Enter | Message::GrabColumn => self.drop_column(),
                    Message::Exit => {
                        self.dragged = None;
                        self.modus = Modus::TABLE;
                    }
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::COLUMNS => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveUp => self.panel_curser = self.panel_curser.saturating_sub(1),
                    Message::MoveDown => {
                        let n = self.table.columns().len();
                        self.panel_curser = (self.panel_curser + 1).min(n.saturating_sub(1));
                    }
                    Message::ToggleSelected | Message::Enter => {
                        let column = self
                            .table
                            .ordered_columns()
                            .get(self.panel_curser)
                            .map(|c| c.id);
                        if let Some(id) = column {
                            self.table.toggle_visibility(id);
                        }
                    }
                    Message::ToggleAllColumns => self.table.toggle_all_visibility(),
                    Message::Exit | Message::ColumnPanel => self.modus = Modus::TABLE,
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::SELECT => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveUp => {
                        if let Some(list) = self.option_list.as_mut() {
                            list.curser = list.curser.saturating_sub(1);
                        }
                    }
                    Message::MoveDown => {
                        if let Some(list) = self.option_list.as_mut() {
                            let last = list.options.len().saturating_sub(1);
                            list.curser = (list.curser + 1).min(last);
                        }
                    }
                    Message::ToggleSelected => self.toggle_option(),
                    Message::Enter => self.choose_option(),
                    Message::Exit => self.close_option_list(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Enter | Message::Help => {
                        self.modus = self.previous_modus;
                        self.previous_modus = Modus::POPUP;
                    }
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::CMDINPUT => match msg {
                    Message::RawKey(key) => self.raw_input(key, now),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
            self.refresh();
        }
        Ok(())
    }

    /// Propagate a debounced value once its delay elapsed.
    pub fn tick(&mut self, now: Instant) {
        if let Some(pending) = self.debouncer.poll(now) {
            trace!("Propagating debounced {pending:?}");
            self.apply_pending(pending);
            self.refresh();
        }
    }

    // -------------------- Filter and search input ---------------------- //

    fn apply_pending(&mut self, pending: PendingInput) {
        match pending {
            PendingInput::Filter(column, value) => self.table.set_filter(column, value),
            PendingInput::Search(query) => self.table.set_global_filter(&query),
        }
        self.curser_row = 0;
        self.set_status_message(format!(
            "{} of {} rows",
            self.table.filtered_count(),
            self.table.records().len()
        ));
    }

    fn edit_filter(&mut self) {
        if !self.table.features().enable_filter {
            return;
        }
        let Some(column) = self.current_column() else {
            return;
        };
        let Some(variant) = self.table.column(column).and_then(|c| c.filter_variant) else {
            self.set_status_message(format!("Column {column} has no filter"));
            return;
        };
        match variant {
            FilterVariant::Text | FilterVariant::Range => {
                let current = self
                    .table
                    .filters()
                    .get(column)
                    .cloned()
                    .unwrap_or_else(|| FilterValue::parse(variant, ""));
                let prefill = if current.is_empty() {
                    String::new()
                } else {
                    current.to_input()
                };
                self.restore = Some(PendingInput::Filter(column, current));
                self.enter_cmd_mode(CMDMode::Filter(column), &prefill);
            }
            FilterVariant::Select | FilterVariant::Checkbox => {
                self.open_option_list(column, variant)
            }
        }
    }

    fn start_search(&mut self) {
        if !self.table.features().enable_fuzzy_search {
            return;
        }
        let current = self.table.global_filter().to_string();
        self.restore = Some(PendingInput::Search(current.clone()));
        self.enter_cmd_mode(CMDMode::Search, &current);
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode, prefill: &str) {
        trace!("Entering command mode {mode:?}");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.input.clear();
        self.input.set(prefill);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent, now: Instant) {
        self.last_input = self.input.read(key);
        if self.last_input.changed
            && let Some(pending) = self.pending_from_input()
        {
            self.debouncer.input(pending, now);
        }
        if self.last_input.finished {
            self.handle_cmd_input();
        }
    }

    fn pending_from_input(&self) -> Option<PendingInput> {
        let input = &self.last_input.input;
        match self.cmd_mode? {
            CMDMode::Filter(column) => {
                let variant = self.table.column(column)?.filter_variant?;
                let value = FilterValue::parse(variant, input);
                Some(PendingInput::Filter(column, value))
            }
            CMDMode::Search => Some(PendingInput::Search(input.clone())),
        }
    }

    /// Leaving the editor either commits the pending value right away or
    /// drops it, nothing fires after the editor is closed.
    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {:?}", self.last_input);
        let restore = self.restore.take();
        if self.last_input.canceled {
            self.debouncer.cancel();
            if let Some(previous) = restore
                && !self.is_current(&previous)
            {
                self.apply_pending(previous);
            }
            self.set_status_message("Canceled");
        } else {
            let committed = self.debouncer.flush().or_else(|| self.pending_from_input());
            if let Some(pending) = committed
                && !self.is_current(&pending)
            {
                self.apply_pending(pending);
            }
        }
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;
        self.cmd_mode = None;
        self.input.clear();
        self.last_input = self.input.get();
    }

    fn is_current(&self, pending: &PendingInput) -> bool {
        match pending {
            PendingInput::Filter(column, value) => match self.table.filters().get(*column) {
                Some(current) => current == value,
                None => value.is_empty(),
            },
            PendingInput::Search(query) => self.table.global_filter() == query,
        }
    }

    fn open_option_list(&mut self, column: ColumnId, variant: FilterVariant) {
        let mut options = self.table.filter_options(column);
        if variant == FilterVariant::Select {
            options.insert(0, String::new()); // "All"
        }
        debug!("Options of {column}: {options:?}");
        self.option_list = Some(OptionList {
            column,
            variant,
            options,
            curser: 0,
        });
        self.previous_modus = self.modus;
        self.modus = Modus::SELECT;
    }

    fn close_option_list(&mut self) {
        self.option_list = None;
        self.modus = Modus::TABLE;
    }

    fn toggle_option(&mut self) {
        let Some(list) = self.option_list.as_ref() else {
            return;
        };
        if list.variant != FilterVariant::Checkbox {
            return;
        }
        let column = list.column;
        let Some(option) = list.options.get(list.curser).cloned() else {
            return;
        };
        let mut selected = match self.table.filters().get(column) {
            Some(FilterValue::Checkbox(set)) => set.clone(),
            _ => BTreeSet::new(),
        };
        if !selected.remove(&option) {
            selected.insert(option);
        }
        let value = FilterValue::Checkbox(selected);
        self.apply_pending(PendingInput::Filter(column, value));
    }

    fn choose_option(&mut self) {
        let Some(list) = self.option_list.as_ref() else {
            return;
        };
        if list.variant == FilterVariant::Select
            && let Some(option) = list.options.get(list.curser).cloned()
        {
            let column = list.column;
            self.apply_pending(PendingInput::Filter(column, FilterValue::Select(option)));
        }
        self.close_option_list();
    }

    // -------------------- Columns ---------------------- //

    fn current_column(&self) -> Option<ColumnId> {
        self.table
            .visible_columns()
            .get(self.curser_column)
            .map(|c| c.id)
    }

    fn sort_current_column(&mut self, direction: Option<Direction>) {
        let Some(column) = self.current_column() else {
            return;
        };
        match direction {
            Some(direction) => self.table.set_sort(column, direction),
            None => self.table.toggle_sort(column),
        }
        self.curser_row = 0;
    }

    fn open_column_panel(&mut self) {
        if self.table.features().enable_visibility_toggle {
            self.panel_curser = 0;
            self.modus = Modus::COLUMNS;
        }
    }

    fn grab_column(&mut self) {
        if !self.table.features().enable_reorder {
            return;
        }
        if let Some(column) = self.current_column() {
            debug!("Grabbed column {column}");
            self.dragged = Some(column);
            self.modus = Modus::DRAG;
        }
    }

    fn drop_column(&mut self) {
        let (Some(active), Some(over)) = (self.dragged.take(), self.current_column()) else {
            self.modus = Modus::TABLE;
            return;
        };
        if self.table.apply_drag(DragEnd { active, over }) {
            self.set_status_message(format!("Moved {active} to the place of {over}"));
        }
        // Keep the curser on the moved column
        if let Some(pos) = self
            .table
            .visible_columns()
            .iter()
            .position(|c| c.id == active)
        {
            self.curser_column = pos;
        }
        self.modus = Modus::TABLE;
    }

    fn reverse_columns(&mut self) {
        if self.table.features().enable_reorder {
            self.table.reverse_columns();
            self.set_status_message("Reversed column order");
        }
    }

    fn reset_columns(&mut self) {
        if self.table.features().enable_reorder {
            self.table.reset_columns();
            self.set_status_message("Reset column order");
        }
    }

    // -------------------- Navigation ---------------------- //

    fn move_row(&mut self, step: isize) {
        let nrows = self.table.page_rows().len();
        if nrows == 0 {
            return;
        }
        self.curser_row = self.curser_row.saturating_add_signed(step).min(nrows - 1);
    }

    fn next_page(&mut self) {
        if self.table.next_page() {
            self.curser_row = 0;
        }
    }

    fn previous_page(&mut self) {
        if self.table.previous_page() {
            self.curser_row = 0;
        }
    }

    fn move_column(&mut self, step: isize) {
        let ncols = self.table.visible_columns().len();
        if ncols == 0 {
            return;
        }
        self.curser_column = self
            .curser_column
            .saturating_add_signed(step)
            .min(ncols - 1);
    }

    fn clamp_curser(&mut self) {
        let nrows = self.table.page_rows().len();
        let ncols = self.table.visible_columns().len();
        self.curser_row = self.curser_row.min(nrows.saturating_sub(1));
        self.curser_column = self.curser_column.min(ncols.saturating_sub(1));
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout { width, height };
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    // -------------------- Clipboard ---------------------- //

    fn selected_record(&self) -> Option<&PushAlert> {
        let idx = *self.table.page_rows().get(self.curser_row)?;
        self.table.record(idx)
    }

    fn copy_table_cell(&mut self) {
        let cell = match (self.selected_record(), self.current_column()) {
            (Some(record), Some(column)) => record.value(column).display(),
            _ => return,
        };
        trace!("Cell content: {}", cell);
        self.copy_to_clipboard(cell);
    }

    fn copy_table_row(&mut self) {
        let Some(record) = self.selected_record() else {
            return;
        };
        let row_content = self
            .table
            .visible_columns()
            .iter()
            .map(|c| wrap_cell_content(&record.value(c.id).display()))
            .collect::<Vec<String>>()
            .join(",");
        self.copy_to_clipboard(row_content);
    }

    fn copy_to_clipboard(&mut self, content: String) {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    error!("Clipboard not available: {e:?}");
                    self.set_status_message("Clipboard not available");
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(content) {
                Ok(_) => self.set_status_message("Copied to clipboard"),
                Err(e) => {
                    error!("Error copying to clipboard: {e:?}");
                    self.set_status_message("Copy failed");
                }
            }
        }
    }

    // -------------------- UI data ---------------------- //

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    fn refresh(&mut self) {
        self.clamp_curser();
        let table = &self.table;
        let page_rows = table.page_rows();
        let sorting = table.sorting();
        // Shrink columns so that all of them fit on the screen
        let ncols = table.visible_columns().len().max(1);
        let max_column_width = self
            .config
            .max_column_width
            .min((self.uilayout.width / ncols).max(MIN_COLUMN_WIDTH));

        let columns: Vec<ColumnView> = table
            .visible_columns()
            .iter()
            .map(|c| {
                let data: Vec<String> = page_rows
                    .iter()
                    .filter_map(|&idx| table.record(idx))
                    .map(|r| r.value(c.id).display())
                    .collect();
                let matched = page_rows
                    .iter()
                    .map(|&idx| table.rank(idx, c.id).is_some())
                    .collect();
                let sort = sorting.filter(|s| s.column == c.id).map(|s| s.direction);
                let filter = table.filters().get(c.id).map(describe_filter);
                let name = c.label.to_string();
                let width = calculate_column_width(&name, &data, max_column_width);
                ColumnView {
                    name,
                    width,
                    data,
                    matched,
                    sort,
                    filter,
                    dragged: self.dragged == Some(c.id),
                }
            })
            .collect();

        let popup = match self.modus {
            Modus::POPUP => Some(PopupView {
                title: " Help ".to_string(),
                items: HELP_TEXT
                    .lines()
                    .map(|l| PopupItem {
                        checked: None,
                        label: l.to_string(),
                    })
                    .collect(),
                selected: None,
            }),
            Modus::COLUMNS => Some(PopupView {
                title: " Columns (space: toggle, A: all) ".to_string(),
                items: table
                    .ordered_columns()
                    .iter()
                    .map(|c| PopupItem {
                        checked: Some(table.visibility().is_visible(c.id)),
                        label: c.label.to_string(),
                    })
                    .collect(),
                selected: Some(self.panel_curser),
            }),
            Modus::SELECT => self.option_list.as_ref().map(|list| {
                let checked = |option: &String| match table.filters().get(list.column) {
                    Some(FilterValue::Checkbox(set)) => Some(set.contains(option)),
                    Some(FilterValue::Select(s)) => Some(s == option),
                    _ => Some(option.is_empty()),
                };
                PopupView {
                    title: format!(" Filter {} ", list.column),
                    items: list
                        .options
                        .iter()
                        .map(|o| PopupItem {
                            checked: checked(o),
                            label: option_label(o),
                        })
                        .collect(),
                    selected: Some(list.curser),
                }
            }),
            _ => None,
        };

        self.uidata = UIData {
            name: "Push alerts".to_string(),
            header_groups: table.header_groups(),
            nrows: page_rows.len(),
            table: columns,
            show_filters: table.features().enable_filter,
            selected_row: self.curser_row,
            selected_column: self.curser_column,
            page_index: table.page_index(),
            page_count: table.page_count(),
            filtered_rows: table.filtered_count(),
            total_rows: table.records().len(),
            global_filter: table.global_filter().to_string(),
            popup,
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.modus == Modus::CMDINPUT,
            pending_input: self.debouncer.pending().is_some(),
            dragging: self.dragged.map(|c| c.to_string()),
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        };
    }
}

fn describe_filter(filter: &FilterValue) -> String {
    match filter {
        FilterValue::Text(s) => format!("~{s}"),
        FilterValue::Range(..) => filter.to_input(),
        FilterValue::Select(s) => format!("={s}"),
        FilterValue::Checkbox(set) => format!("{{{}}}", filter_set(set)),
    }
}

fn filter_set(set: &BTreeSet<String>) -> String {
    set.iter().cloned().collect::<Vec<_>>().join(",")
}

fn calculate_column_width(name: &str, data: &[String], max_column_width: usize) -> usize {
    let widest = data
        .iter()
        .map(|s| s.chars().count())
        .chain(std::iter::once(name.chars().count() + 2)) // Room for the sort marker
        .max()
        .unwrap_or(0);
    let upper = max_column_width.max(MIN_COLUMN_WIDTH);
    (widest + COLUMN_WIDTH_MARGIN).clamp(MIN_COLUMN_WIDTH, upper)
}

/// The empty select option stands for "no filter".
fn option_label(option: &str) -> String {
    if option.is_empty() {
        String::from("All")
    } else {
        option.to_string()
    }
}

fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping || needs_escaping {
        out = format!("\"{out}\"");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::static_alerts;
    use crate::domain::Variant;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    fn model() -> Model {
        Model::init(&AVConfig::default(), static_alerts(), 120, 40).unwrap()
    }

    fn model_with(variant: Variant) -> Model {
        let config = AVConfig::default().features(variant.features());
        Model::init(&config, static_alerts(), 120, 40).unwrap()
    }

    fn key(c: char) -> Option<Message> {
        special(KeyCode::Char(c))
    }

    fn special(code: KeyCode) -> Option<Message> {
        Some(Message::RawKey(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn send(m: &mut Model, msg: Message) {
        m.update(Some(msg)).unwrap();
    }

    fn type_at(m: &mut Model, text: &str, t: Instant, step_ms: u64) {
        for (i, c) in text.chars().enumerate() {
            m.update_at(key(c), t + ms(i as u64 * step_ms)).unwrap();
        }
    }

    fn first_column_titles(m: &Model) -> Vec<String> {
        m.get_uidata().table[0].data.clone()
    }

    #[test]
    fn initial_page() {
        let m = model();
        let ui = m.get_uidata();
        assert_eq!(ui.nrows, 10);
        assert_eq!(ui.page_count, 3);
        assert_eq!(ui.filtered_rows, 22);
        assert_eq!(ui.table[0].name, "Title");
        assert_eq!(ui.table[0].data[0], "Welcome aboard");
    }

    #[test]
    fn initial_filters_from_config() {
        let config = AVConfig::default().initial_filters(vec![
            ("status".to_string(), "paused".to_string()),
            ("bogus".to_string(), "1".to_string()),
        ]);
        let m = Model::init(&config, static_alerts(), 120, 40).unwrap();
        assert_eq!(m.get_uidata().filtered_rows, 3);
    }

    #[test]
    fn text_filter_is_debounced() {
        let mut m = model();
        let t = Instant::now();
        m.update_at(Some(Message::EditFilter), t).unwrap();
        assert!(m.raw_keyevents());

        type_at(&mut m, "sale", t, 10);
        // Nothing propagated while typing
        m.update_at(None, t + ms(400)).unwrap();
        assert_eq!(m.get_uidata().filtered_rows, 22);

        m.update_at(None, t + ms(30 + 510)).unwrap();
        assert_eq!(m.get_uidata().filtered_rows, 2);
        assert_eq!(
            m.table.filters().get(ColumnId::Title),
            Some(&FilterValue::Text("sale".into()))
        );
        // Still editing
        assert!(m.raw_keyevents());
    }

    #[test]
    fn pending_input_is_reported() {
        let mut m = model();
        let t = Instant::now();
        m.update_at(Some(Message::EditFilter), t).unwrap();
        assert_eq!(m.next_deadline(), None);
        type_at(&mut m, "s", t, 10);
        assert!(m.get_uidata().pending_input);
        assert_eq!(m.next_deadline(), Some(t + ms(500)));
        m.update_at(None, t + Duration::from_secs(1)).unwrap();
        assert!(!m.get_uidata().pending_input);
    }

    #[test]
    fn enter_commits_pending_filter_immediately() {
        let mut m = model();
        let t = Instant::now();
        m.update_at(Some(Message::EditFilter), t).unwrap();
        type_at(&mut m, "weekly", t, 10);
        m.update_at(special(KeyCode::Enter), t + ms(100)).unwrap();
        assert!(!m.raw_keyevents());
        assert_eq!(m.get_uidata().filtered_rows, 2);
    }

    #[test]
    fn escape_cancels_pending_filter() {
        let mut m = model();
        let t = Instant::now();
        m.update_at(Some(Message::EditFilter), t).unwrap();
        type_at(&mut m, "sale", t, 10);
        m.update_at(special(KeyCode::Esc), t + ms(50)).unwrap();
        m.update_at(None, t + Duration::from_secs(5)).unwrap();
        assert!(m.table.filters().is_empty());
        assert_eq!(m.get_uidata().filtered_rows, 22);
    }

    #[test]
    fn escape_restores_already_propagated_filter() {
        let mut m = model();
        let t = Instant::now();
        m.update_at(Some(Message::EditFilter), t).unwrap();
        type_at(&mut m, "sale", t, 10);
        m.update_at(None, t + Duration::from_secs(1)).unwrap();
        assert_eq!(m.get_uidata().filtered_rows, 2);
        m.update_at(special(KeyCode::Esc), t + Duration::from_secs(2))
            .unwrap();
        assert!(m.table.filters().is_empty());
    }

    #[test]
    fn range_filter_on_sent() {
        let mut m = model();
        // Title, Frequency, Status, Start Date, End Date, Sent
        for _ in 0..5 {
            send(&mut m, Message::MoveRight);
        }
        let t = Instant::now();
        m.update_at(Some(Message::EditFilter), t).unwrap();
        type_at(&mut m, "50000..", t, 1);
        m.update_at(special(KeyCode::Enter), t + ms(20)).unwrap();
        assert_eq!(m.get_uidata().filtered_rows, 4);
        assert_eq!(m.get_uidata().table[5].filter.as_deref(), Some("50000.."));
    }

    #[test]
    fn select_filter_via_option_list() {
        let mut m = model();
        send(&mut m, Message::MoveRight);
        send(&mut m, Message::MoveRight);
        send(&mut m, Message::EditFilter);
        let popup = m.get_uidata().popup.clone().unwrap();
        assert_eq!(popup.items[0].label, "All");
        let paused = popup.items.iter().position(|i| i.label == "paused");
        for _ in 0..paused.unwrap() {
            send(&mut m, Message::MoveDown);
        }
        send(&mut m, Message::Enter);
        assert!(m.get_uidata().popup.is_none());
        assert_eq!(m.get_uidata().filtered_rows, 3);
    }

    #[test]
    fn checkbox_filter_via_option_list() {
        let mut m = model();
        for _ in 0..7 {
            send(&mut m, Message::MoveRight);
        }
        send(&mut m, Message::EditFilter);
        let popup = m.get_uidata().popup.clone().unwrap();
        let web = popup.items.iter().position(|i| i.label == "Web").unwrap();
        for _ in 0..web {
            send(&mut m, Message::MoveDown);
        }
        send(&mut m, Message::ToggleSelected);
        assert_eq!(m.get_uidata().filtered_rows, 10);
        send(&mut m, Message::ToggleSelected);
        assert_eq!(m.get_uidata().filtered_rows, 22);
        send(&mut m, Message::Exit);
        assert!(m.get_uidata().popup.is_none());
    }

    #[test]
    fn global_search_is_debounced() {
        let mut m = model();
        let t = Instant::now();
        m.update_at(Some(Message::Search), t).unwrap();
        type_at(&mut m, "digest", t, 10);
        m.update_at(None, t + ms(50 + 510)).unwrap();
        assert_eq!(m.get_uidata().global_filter, "digest");
        let title = &m.get_uidata().table[0];
        let row = title.data.iter().position(|t| t == "Daily digest").unwrap();
        assert!(title.matched[row]);
        let titles = first_column_titles(&m);
        assert!(titles.iter().any(|t| t == "Daily digest"));
        assert!(m.get_uidata().filtered_rows < 22);
    }

    #[test]
    fn pagination_moves_pages() {
        let mut m = model();
        send(&mut m, Message::MoveDown);
        send(&mut m, Message::NextPage);
        assert_eq!(m.get_uidata().page_index, 1);
        assert_eq!(m.get_uidata().selected_row, 0);
        send(&mut m, Message::LastPage);
        assert_eq!(m.get_uidata().nrows, 2);
        send(&mut m, Message::NextPage);
        assert_eq!(m.get_uidata().page_index, 2);
        send(&mut m, Message::FirstPage);
        assert_eq!(m.get_uidata().page_index, 0);
    }

    #[test]
    fn drag_moves_column() {
        let mut m = model();
        send(&mut m, Message::GrabColumn);
        assert_eq!(m.get_uidata().dragging.as_deref(), Some("title"));
        send(&mut m, Message::MoveRight);
        send(&mut m, Message::MoveRight);
        send(&mut m, Message::Enter);
        let table = &m.get_uidata().table;
        let names: Vec<&str> = table.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(&names[..3], &["Frequency", "Status", "Title"]);
        assert_eq!(m.get_uidata().selected_column, 2);
        assert!(m.get_uidata().dragging.is_none());
    }

    #[test]
    fn drag_can_be_cancelled() {
        let mut m = model();
        send(&mut m, Message::GrabColumn);
        send(&mut m, Message::MoveRight);
        send(&mut m, Message::Exit);
        assert_eq!(m.get_uidata().table[0].name, "Title");
    }

    #[test]
    fn column_panel_toggles_visibility() {
        let mut m = model();
        send(&mut m, Message::ColumnPanel);
        send(&mut m, Message::ToggleSelected);
        assert_eq!(m.get_uidata().table[0].name, "Frequency");
        let popup = m.get_uidata().popup.clone().unwrap();
        assert_eq!(popup.items[0].checked, Some(false));
        send(&mut m, Message::ToggleAllColumns);
        assert_eq!(m.get_uidata().table.len(), 8);
        send(&mut m, Message::Exit);
        assert!(m.get_uidata().popup.is_none());
    }

    #[test]
    fn sort_marks_column() {
        let mut m = model();
        send(&mut m, Message::ToggleSort);
        assert_eq!(m.get_uidata().table[0].sort, Some(Direction::Ascending));
        assert_eq!(m.get_uidata().table[0].data[0], "App update available");
        send(&mut m, Message::SortDescending);
        assert_eq!(m.get_uidata().table[0].data[0], "Welcome aboard");
    }

    #[test]
    fn disabled_features_do_nothing() {
        let mut m = model_with(Variant::ColumnFilters);
        send(&mut m, Message::GrabColumn);
        send(&mut m, Message::ColumnPanel);
        send(&mut m, Message::Search);
        send(&mut m, Message::ToggleSort);
        assert!(!m.raw_keyevents());
        assert!(m.get_uidata().popup.is_none());
        assert!(m.get_uidata().dragging.is_none());
        assert_eq!(m.get_uidata().table[0].sort, None);
    }

    #[test]
    fn reverse_and_reset_column_order() {
        let mut m = model_with(Variant::ColumnOrder);
        send(&mut m, Message::ReverseColumns);
        assert_eq!(m.get_uidata().table[0].name, "OS");
        send(&mut m, Message::ResetColumns);
        assert_eq!(m.get_uidata().table[0].name, "Title");

        let mut m = model_with(Variant::ColumnFilters);
        send(&mut m, Message::ReverseColumns);
        assert_eq!(m.get_uidata().table[0].name, "Title");
    }

    #[test]
    fn column_order_variant_has_group_headers() {
        let m = model_with(Variant::ColumnOrder);
        assert_eq!(m.get_uidata().header_groups.len(), 2);
        assert_eq!(m.get_uidata().nrows, 22);
    }

    #[test]
    fn help_popup_and_quit() {
        let mut m = model();
        send(&mut m, Message::Help);
        assert!(m.get_uidata().popup.is_some());
        send(&mut m, Message::Exit);
        assert!(m.get_uidata().popup.is_none());
        send(&mut m, Message::Quit);
        assert_eq!(m.status, Status::QUITTING);
    }

    #[test]
    fn wraps_csv_cells() {
        assert_eq!(wrap_cell_content("plain"), "plain");
        assert_eq!(wrap_cell_content("a b"), "\"a b\"");
        assert_eq!(wrap_cell_content("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
