use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState},
};

use crate::domain::{AVConfig, CMDMode};
use crate::model::{ColumnView, PopupView, UIData};
use crate::sort::Direction;
use crate::table::HeaderCell;

const CMDLINE_HEIGHT: u16 = 1;
const STATUSLINE_HEIGHT: u16 = 1;
const COLUMN_SPACING: u16 = 1;
const POPUP_MIN_WIDTH: u16 = 30;
const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);
const DRAG_HINT: &str = "←/→ pick target, Enter drop, Esc cancel";

pub struct TableUI {
    max_column_width: usize,
}

impl TableUI {
    pub fn new(cfg: &AVConfig) -> Self {
        Self {
            max_column_width: cfg.max_column_width,
        }
    }

    pub fn draw(&mut self, uidata: &UIData, frame: &mut Frame) {
        let [title_area, table_area, status_area, cmd_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT),
            Constraint::Length(CMDLINE_HEIGHT),
        ])
        .areas(frame.area());

        frame.render_widget(
            Line::from(format!(" {} ", uidata.name).bold()).centered(),
            title_area,
        );

        self.draw_table(uidata, frame, table_area);
        frame.render_widget(status_line(uidata), status_area);
        self.draw_cmdline(uidata, frame, cmd_area);

        if let Some(popup) = uidata.popup.as_ref() {
            draw_popup(popup, frame);
        }
    }

    /// Group cells spanning the width of the columns below them.
    fn group_line(&self, groups: &[HeaderCell], columns: &[ColumnView]) -> Line<'static> {
        let mut spans = Vec::with_capacity(groups.len());
        let mut col = 0;
        for group in groups {
            let width: usize = columns
                .iter()
                .skip(col)
                .take(group.span)
                .map(|c| c.width + COLUMN_SPACING as usize)
                .sum();
            col += group.span;
            let label = truncate(&group.label, width.saturating_sub(1));
            let span = Span::raw(format!("{label:^width$}"));
            spans.push(if group.placeholder {
                span
            } else {
                span.add_modifier(Modifier::BOLD).underlined()
            });
        }
        Line::from(spans)
    }

    /// Bordered table. The group row shares the border and the column
    /// origin of the table so the groups line up with their columns.
    fn draw_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let block = Block::bordered();
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let group_height = u16::from(uidata.header_groups.len() > 1);
        let constraints = [Constraint::Length(group_height), Constraint::Min(0)];
        let [group_area, rows_area] = Layout::vertical(constraints).areas(inner);
        if let Some(groups) = uidata.header_groups.first()
            && group_height > 0
        {
            frame.render_widget(self.group_line(groups, &uidata.table), group_area);
        }

        let widths: Vec<Constraint> = uidata
            .table
            .iter()
            .map(|c| Constraint::Length(c.width as u16))
            .collect();

        let header_height = if uidata.show_filters { 2 } else { 1 };
        let header_cells = uidata
            .table
            .iter()
            .map(|c| self.header_cell(c, uidata.show_filters));
        let header = Row::new(header_cells).height(header_height).bold();

        let rows = (0..uidata.nrows).map(|row| {
            Row::new(uidata.table.iter().map(|c| {
                let value = c.data.get(row).map(String::as_str).unwrap_or_default();
                let cell = Cell::from(truncate(value, c.width));
                if c.matched.get(row).copied().unwrap_or(false) {
                    cell.fg(Color::Yellow)
                } else {
                    cell
                }
            }))
        });

        let mut state = TableState::default();
        if uidata.nrows > 0 {
            state.select(Some(uidata.selected_row));
        }
        if !uidata.table.is_empty() {
            state.select_column(Some(uidata.selected_column));
        }

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(COLUMN_SPACING)
            .row_highlight_style(Style::new().bg(Color::Blue))
            .cell_highlight_style(Style::new().bg(Color::LightBlue).fg(Color::Black));
        frame.render_stateful_widget(table, rows_area, &mut state);
    }

    fn header_cell(&self, column: &ColumnView, show_filters: bool) -> Cell<'static> {
        let marker = match column.sort {
            Some(Direction::Ascending) => " ▲",
            Some(Direction::Descending) => " ▼",
            None => "",
        };
        let name_width = column.width.saturating_sub(marker.chars().count());
        let name = truncate(&column.name, name_width);
        let mut lines = vec![Line::from(format!("{name}{marker}"))];
        if show_filters {
            let filter = column.filter.as_deref().unwrap_or("·");
            let width = column.width.min(self.max_column_width);
            lines.push(Line::from(truncate(filter, width)).italic().dim());
        }
        let cell = Cell::from(Text::from(lines));
        if column.dragged {
            cell.style(Style::new().fg(Color::Black).bg(Color::Yellow))
        } else {
            cell
        }
    }

    fn draw_cmdline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if !uidata.active_cmdinput {
            let hint = match uidata.dragging.as_ref() {
                Some(column) => format!("Moving {column}: {DRAG_HINT}"),
                None => String::from("? help"),
            };
            frame.render_widget(Line::from(hint).dim(), area);
            return;
        }
        let prompt = match uidata.cmd_mode {
            Some(CMDMode::Filter(column)) => format!("Filter {column}: "),
            Some(CMDMode::Search) | None => String::from("Search: "),
        };
        let offset = prompt.chars().count() + uidata.cmdinput.curser_pos;
        let mut spans = vec![prompt.bold(), Span::raw(uidata.cmdinput.input.clone())];
        if uidata.pending_input {
            spans.push(" …".dim());
        }
        frame.render_widget(Line::from(spans), area);
        let x = area.x + (offset as u16).min(area.width.saturating_sub(1));
        frame.set_cursor_position(Position::new(x, area.y));
    }
}

fn status_line(uidata: &UIData) -> Line<'static> {
    let (filtered, total) = (uidata.filtered_rows, uidata.total_rows);
    let mut spans = vec![
        format!(" Page {} of {} ", uidata.page_index + 1, uidata.page_count).bold(),
        Span::raw(format!("| Filtered Rows: {filtered} of {total} ")),
    ];
    if !uidata.global_filter.is_empty() {
        spans.push(format!("| Search: {} ", uidata.global_filter).yellow());
    }
    if !uidata.status_message.is_empty()
        && uidata.last_status_message_update.elapsed() < STATUS_MESSAGE_TIMEOUT
    {
        spans.push(format!("| {}", uidata.status_message).dim());
    }
    Line::from(spans)
}

fn draw_popup(popup: &PopupView, frame: &mut Frame) {
    let lines: Vec<Line> = popup
        .items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let text = match item.checked {
                Some(true) => format!("[x] {}", item.label),
                Some(false) => format!("[ ] {}", item.label),
                None => item.label.clone(),
            };
            if popup.selected == Some(idx) {
                Line::from(text).reversed()
            } else {
                Line::from(text)
            }
        })
        .collect();

    let content_width = lines.iter().map(|l| l.width()).max().unwrap_or(0) as u16;
    let width = (content_width + 4)
        .max(POPUP_MIN_WIDTH)
        .max(popup.title.chars().count() as u16 + 4);
    let area = centered_rect(frame.area(), width, lines.len() as u16 + 2);

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(Block::bordered().title(popup.title.clone().bold())),
        area,
    );
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Cut a string to `width` chars, marking the cut with `…`.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(width - 1).collect();
    out.push('…');
    out
}
