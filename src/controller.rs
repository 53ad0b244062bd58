use std::time::{Duration, Instant};
use tracing::trace;

use crate::domain::{AVConfig, AVError, Message};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &AVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, AVError> {
        let mut timeout = Duration::from_millis(self.event_poll_time);
        if let Some(deadline) = model.next_deadline() {
            timeout = timeout.min(deadline.saturating_duration_since(Instant::now()));
        }
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(self.handle_key(key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    pub fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Up | KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Down | KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Left | KeyCode::Char('h'), _) => Some(Message::MoveLeft),
            (KeyCode::Right | KeyCode::Char('l'), _) => Some(Message::MoveRight),
            (KeyCode::PageDown | KeyCode::Char('n'), _) => Some(Message::NextPage),
            (KeyCode::PageUp | KeyCode::Char('p'), _) => Some(Message::PreviousPage),
            (KeyCode::Home | KeyCode::Char('g'), _) => Some(Message::FirstPage),
            (KeyCode::End | KeyCode::Char('G'), _) => Some(Message::LastPage),
            (KeyCode::Char('s'), _) => Some(Message::ToggleSort),
            (KeyCode::Char('a'), _) => Some(Message::SortAscending),
            (KeyCode::Char('d'), _) => Some(Message::SortDescending),
            (KeyCode::Char('f'), _) => Some(Message::EditFilter),
            (KeyCode::Char('F'), _) => Some(Message::ClearFilters),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('c'), _) => Some(Message::ColumnPanel),
            (KeyCode::Char(' '), _) => Some(Message::ToggleSelected),
            (KeyCode::Char('A'), _) => Some(Message::ToggleAllColumns),
            (KeyCode::Char('m'), _) => Some(Message::GrabColumn),
            (KeyCode::Char('R'), _) => Some(Message::ReverseColumns),
            (KeyCode::Char('0'), _) => Some(Message::ResetColumns),
            (KeyCode::Char('y'), _) => Some(Message::CopyCell),
            (KeyCode::Char('Y'), _) => Some(Message::CopyRow),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn map(code: KeyCode, modifiers: KeyModifiers) -> Option<Message> {
        Controller::new(&AVConfig::default()).handle_key(KeyEvent::new(code, modifiers))
    }

    fn key(code: KeyCode) -> Option<Message> {
        map(code, KeyModifiers::NONE)
    }

    #[test]
    fn maps_navigation_keys() {
        assert_eq!(key(KeyCode::Char('j')), Some(Message::MoveDown));
        assert_eq!(key(KeyCode::Left), Some(Message::MoveLeft));
        assert_eq!(key(KeyCode::PageDown), Some(Message::NextPage));
        let shift_g = map(KeyCode::Char('G'), KeyModifiers::SHIFT);
        assert_eq!(shift_g, Some(Message::LastPage));
    }

    #[test]
    fn ctrl_c_quits_and_plain_c_opens_columns() {
        let ctrl_c = map(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(ctrl_c, Some(Message::Quit));
        assert_eq!(key(KeyCode::Char('c')), Some(Message::ColumnPanel));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        assert_eq!(key(KeyCode::Char('z')), None);
        assert_eq!(key(KeyCode::F(5)), None);
    }
}
